pub mod config;
pub mod logging;
pub mod workers;

pub use config::load_config;
pub use logging::init_logging;
pub use workers::start_workers;
