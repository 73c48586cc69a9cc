use clap::Parser;
use duet_server::{ServerConfig, serve};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signaling relay for one-to-one audio/video calls.
#[derive(Parser, Debug)]
#[command(name = "duet-server", version, about)]
struct Args {
    /// Interface to bind (overrides DUET_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides DUET_PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// Member cap per room, 0 for unlimited (overrides DUET_MAX_ROOM_MEMBERS).
    #[arg(long)]
    max_room_members: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max) = args.max_room_members {
        config.max_room_members = (max > 0).then_some(max);
    }

    info!("Starting duet signaling server with {:?}", config);
    serve(config).await
}
