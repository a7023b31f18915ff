use serde::{Deserialize, Serialize};

/// Admin server binding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_admin_port")]
    pub admin_port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_admin_port() -> u16 {
    9901
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            admin_port: default_admin_port(),
            bind_address: default_bind_address(),
        }
    }
}
