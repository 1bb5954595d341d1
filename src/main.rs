//! hls-relay server
//!
//! Run with: cargo run -- --bind 0.0.0.0:3000
//! Then request: curl http://localhost:3000/api/streams/1

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, Command};
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

use hls_relay::api;
use hls_relay::camera::CameraRegistry;
use hls_relay::config::{parse_bind_addr, RelayConfig};
use hls_relay::supervisor::StreamSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hls_relay=info")),
        )
        .init();

    let matches = Command::new("hls-relay")
        .version(env!("CARGO_PKG_VERSION"))
        .about("On-demand RTSP to HLS relay for IP cameras")
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDR")
                .help("Address to listen on (overrides BIND_ADDR)"),
        )
        .arg(
            Arg::new("streams-dir")
                .short('d')
                .long("streams-dir")
                .value_name("DIR")
                .help("Directory for playlists and segments (overrides STREAMS_DIR)"),
        )
        .get_matches();

    let mut config = RelayConfig::from_env()?;
    if let Some(bind) = matches.get_one::<String>("bind") {
        config = config.bind_addr(parse_bind_addr(bind)?);
    }
    if let Some(dir) = matches.get_one::<String>("streams-dir") {
        config = config.streams_dir(PathBuf::from(dir));
    }

    let registry = config.registry();
    tracing::info!(
        cameras = registry.cameras().len(),
        max_streams = registry.limits().max_concurrent_streams,
        auto_stop_secs = registry.limits().auto_stop.as_secs(),
        streams_dir = %config.streams_dir.display(),
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.streams_dir).await?;

    let supervisor = StreamSupervisor::new(
        config.supervisor_config(),
        Arc::new(registry),
        Arc::new(config.transcoder()),
    );
    supervisor.spawn_maintenance_task();

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Relay listening");

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
        }
    };

    api::serve(listener, supervisor, shutdown).await?;

    Ok(())
}
