use ferrous_lb_domain::Config;
use ferrous_lb_infrastructure::worker::WorkerPool;
use tracing::info;

pub fn start_workers(config: &Config) -> anyhow::Result<WorkerPool> {
    let workers = WorkerPool::start(&config.workers)?;

    info!(
        threads = workers.len(),
        prefix = %config.workers.name_prefix,
        "Workers ready"
    );

    Ok(workers)
}
