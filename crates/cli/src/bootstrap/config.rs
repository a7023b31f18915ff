use ferrous_lb_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = config_path.unwrap_or("default"),
        admin_port = config.server.admin_port,
        bind = %config.server.bind_address,
        workers = config.workers.threads,
        clusters = config.clusters.len(),
        "Configuration loaded"
    );

    Ok(config)
}
