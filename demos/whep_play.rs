//! WHEP playback demo
//!
//! Connects to a WHEP endpoint, logs incoming tracks and packet counts, and tears the
//! session down on Ctrl+C.
//!
//! Usage:
//!   cargo run --example whep_play -- --url http://localhost:8889/mystream/whep
//!   cargo run --example whep_play -- --url http://localhost:4000/api/whep --pc-config http://localhost:4000/api/pc-config
//!   RUST_LOG=debug cargo run --example whep_play -- --url https://example.com/whep --token secret

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};

use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

use whep_client::blocking::{self, WhepClient};
use whep_client::{google_stun_servers, PeerConfig, WhepConfig};

struct Args {
    url: String,
    pc_config: Option<String>,
    token: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut url = None;
    let mut pc_config = None;
    let mut token = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or(format!("{} needs a value", arg));
        match arg.as_str() {
            "--url" => url = Some(value()?),
            "--pc-config" => pc_config = Some(value()?),
            "--token" => token = Some(value()?),
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }

    Ok(Args {
        url: url.ok_or("--url is required")?,
        pc_config,
        token,
    })
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: whep_play --url <whep endpoint> [--pc-config <url>] [--token <token>]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let peer_config = match &args.pc_config {
        Some(url) => blocking::fetch_peer_config(url)?,
        None => PeerConfig {
            ice_servers: google_stun_servers(),
            ..Default::default()
        },
    };
    println!(
        "Using {} ICE server(s), transport policy {:?}",
        peer_config.ice_servers.len(),
        peer_config.ice_transport_policy
    );

    let rtc_config: RTCConfiguration = peer_config.into_rtc_configuration();
    let engine = blocking::create_engine(rtc_config)?;

    let packets = Arc::new(AtomicU64::new(0));
    let packets_for_track = packets.clone();
    engine.peer_connection().on_track(Box::new(
        move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
            println!(
                "New track: {} (ssrc {})",
                track.codec().capability.mime_type,
                track.ssrc()
            );
            let packets = packets_for_track.clone();
            Box::pin(async move {
                // Drain RTP so interceptors (NACK, reports) keep running
                while track.read_rtp().await.is_ok() {
                    packets.fetch_add(1, Ordering::Relaxed);
                }
            })
        },
    ));
    engine
        .peer_connection()
        .on_peer_connection_state_change(Box::new(|state: RTCPeerConnectionState| {
            println!("Peer connection state: {}", state);
            Box::pin(async {})
        }));

    let config = WhepConfig {
        endpoint_url: args.url,
        auth_token: args.token,
        ..Default::default()
    };
    let mut client = WhepClient::with_config(config, engine)?;

    client.connect()?;
    if let Some(resource) = client.resource_url() {
        println!("Connected, resource {}", resource);
    }

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;
    println!("Receiving, press Ctrl+C to stop");
    let _ = stop_rx.recv();

    println!("Received {} RTP packets", packets.load(Ordering::Relaxed));
    client.disconnect()?;
    println!("Disconnected");
    Ok(())
}
