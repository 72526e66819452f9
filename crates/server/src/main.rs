use std::sync::Arc;

use clap::Parser;
use relaymux_cluster::{ChannelTransport, ClusterNode, GossipTransport, KeyRing, Membership, PeerId};
use relaymux_nflog::NflogStore;
use relaymux_server::persistence::SnapshotPaths;
use relaymux_server::state::AppState;
use relaymux_silence::SilenceStore;
use relaymux_state::StateStore;
use relaymux_state_memory::MemoryStateStore;
use tracing::info;

/// RelayMux alert routing and notification gateway.
#[derive(Parser, Debug)]
#[command(name = "relaymux-server", about = "Standalone HTTP server for RelayMux")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "relaymux.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Override the bind port.
    #[arg(long, default_value_t = 9093)]
    port: u16,

    /// Stable identity of this node within a cluster. Defaults to a
    /// single-node overlay.
    #[arg(long, default_value = "local")]
    peer_id: String,

    /// Hex-encoded 32-byte primary key used to encrypt gossip frames. When
    /// unset, gossip frames are sent in plaintext.
    #[arg(long)]
    gossip_key: Option<String>,

    /// Additional hex-encoded 32-byte keys still accepted for decrypt
    /// during a key rotation, most recently retired first.
    #[arg(long, value_delimiter = ',')]
    gossip_additional_keys: Vec<String>,

    /// Directory for the periodic silence/notify-log snapshots. Pass an
    /// empty string to disable durable persistence.
    #[arg(long, default_value = "./data")]
    state_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = relaymux_config::load(&cli.config)?;

    let addr = format!("{}:{}", cli.host, cli.port);

    let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
    let silences = Arc::new(SilenceStore::new(store.clone()));
    let nflog = Arc::new(NflogStore::new(store.clone()));

    let snapshot_paths =
        if cli.state_dir.trim().is_empty() { None } else { Some(SnapshotPaths::in_dir(std::path::Path::new(&cli.state_dir))) };
    if let Some(paths) = &snapshot_paths {
        relaymux_server::persistence::restore(&silences, &nflog, paths).await;
    }

    let membership = Membership::new(PeerId::new(cli.peer_id), addr.clone());
    let mut channel_transport = ChannelTransport::new(64);
    if let Some(primary) = &cli.gossip_key {
        let keyring = KeyRing::from_hex(primary, &cli.gossip_additional_keys)?;
        channel_transport = channel_transport.with_keyring(keyring);
        info!("gossip frames encrypted under configured key ring");
    }
    let transport: Arc<dyn GossipTransport> = Arc::new(channel_transport);
    let cluster = Arc::new(ClusterNode::new(Arc::new(membership), transport, nflog.clone(), silences.clone()));

    let state = AppState::new(config, store, silences, nflog, cluster, snapshot_paths);
    relaymux_server::scheduler::spawn(state.clone());
    let shutdown_state = state.clone();

    let app = relaymux_server::api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "relaymux-server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if let Some(paths) = &shutdown_state.snapshot_paths
        && let Err(err) = relaymux_server::persistence::persist(&shutdown_state.silences, &shutdown_state.nflog, paths).await
    {
        tracing::warn!(error = %err, "failed to write final state snapshot on shutdown");
    }

    info!("relaymux-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
