use serde::{Deserialize, Serialize};

/// Worker thread pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Number of worker threads (default: available parallelism)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Prefix for worker thread names (default: "worker")
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            name_prefix: default_name_prefix(),
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_name_prefix() -> String {
    "worker".to_string()
}
