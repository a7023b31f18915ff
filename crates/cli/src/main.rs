//! # Ferrous LB
//!
//! Runs the configured logical DNS clusters on a pool of worker threads and
//! serves their status on the admin API.

use clap::Parser;
use ferrous_lb_api::{create_api_routes, AppState};
use ferrous_lb_domain::CliOverrides;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

use di::ClusterManager;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "ferrous-lb")]
#[command(version)]
#[command(about = "Logical DNS upstream clusters for worker-per-thread proxies")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Admin API port
    #[arg(short = 'p', long)]
    admin_port: Option<u16>,

    /// Admin API bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Number of worker threads
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        admin_port: cli.admin_port,
        bind_address: cli.bind,
        worker_threads: cli.workers,
        log_level: cli.log_level,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Ferrous LB");

    let workers = bootstrap::start_workers(&config)?;
    let mut clusters = ClusterManager::build(&config.clusters, &workers)?;
    clusters.initialize().await?;

    let state = AppState {
        get_clusters: Arc::new(clusters.get_clusters_use_case()),
    };

    let admin_addr: SocketAddr =
        format!("{}:{}", config.server.bind_address, config.server.admin_port).parse()?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut admin = tokio::spawn(server::start_admin_server(
        admin_addr,
        create_api_routes(state),
        async move {
            let _ = stop_rx.await;
        },
    ));

    info!("Ready, press Ctrl+C to stop");
    let admin_result = tokio::select! {
        signal = signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
            let _ = stop_tx.send(());
            (&mut admin).await
        }
        result = &mut admin => result,
    };
    match admin_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Admin server failed"),
        Err(e) => error!(error = %e, "Admin server task panicked"),
    }

    clusters.shutdown().await;
    workers.shutdown();

    info!("Ferrous LB stopped");
    Ok(())
}
