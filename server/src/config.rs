use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::routes::RouterOptions;
use crate::ws::Keepalive;

/// Chat presence and delivery server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "chat-server", version, about = "Chat presence and delivery server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "CHAT_PORT", default_value = "5000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "CHAT_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./chat.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "CHAT_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, keys)
    #[arg(long, env = "CHAT_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// Browser origins allowed by CORS (comma separated)
    #[arg(
        long,
        env = "CHAT_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173"
    )]
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in megabytes
    #[arg(long, env = "CHAT_MAX_BODY_MB", default_value = "4")]
    pub max_body_mb: usize,

    /// Seconds between WebSocket pings
    #[arg(long, env = "CHAT_PING_INTERVAL_SECS", default_value = "30")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping the session
    #[arg(long, env = "CHAT_PONG_TIMEOUT_SECS", default_value = "10")]
    pub pong_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            config: "./chat.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_body_mb: 4,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (CHAT_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            // Origin lists come through clap, which splits on commas
            .merge(
                Env::prefixed("CHAT_")
                    .filter(|key| !key.as_str().eq_ignore_ascii_case("allowed_origins")),
            )
            .merge(Serialized::defaults(cli))
            .extract()
    }

    pub fn keepalive(&self) -> Keepalive {
        Keepalive {
            ping_interval: Duration::from_secs(self.ping_interval_secs.max(1)),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs.max(1)),
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            allowed_origins: self.allowed_origins.clone(),
            max_body_bytes: self.max_body_mb * 1024 * 1024,
        }
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Chat Server Configuration
# Place this file at ./chat.toml or specify with --config <path>
# All settings can be overridden via environment variables (CHAT_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite message store and JWT signing key
# data_dir = "./data"

# Browser origins allowed to call the API
# allowed_origins = ["http://localhost:5173"]

# Maximum request body in megabytes (image messages are sent inline)
# max_body_mb = 4

# WebSocket keepalive
# ping_interval_secs = 30
# pong_timeout_secs = 10
"#
    .to_string()
}
