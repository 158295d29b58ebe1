use std::time::Duration;

use clap::Parser;

pub const DEFAULT_BIND: &str = "0.0.0.0:3001";

/// Airwave live-stream signaling server
#[derive(Parser, Debug, Clone)]
#[command(name = "airwave")]
#[command(about = "Signaling relay for peer-to-peer live audio", long_about = None)]
pub struct ServerConfig {
    /// WebSocket listen address
    #[arg(long, env = "AIRWAVE_BIND", default_value = DEFAULT_BIND)]
    pub bind: String,

    /// Origins allowed to open a socket (empty allows any)
    #[arg(long = "allowed-origin", env = "AIRWAVE_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Seconds between keepalive pings
    #[arg(long, env = "AIRWAVE_PING_INTERVAL_SECS", default_value = "30")]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping the connection
    #[arg(long, env = "AIRWAVE_PONG_TIMEOUT_SECS", default_value = "10")]
    pub pong_timeout_secs: u64,

    /// Capacity of the coordinator command queue
    #[arg(long, env = "AIRWAVE_COMMAND_BUFFER", default_value = "1024")]
    pub command_buffer: usize,

    /// Log filter, e.g. "info" or "airwave=debug"
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            allowed_origins: Vec::new(),
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            command_buffer: 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs.max(1))
    }

    /// Whether a handshake carrying `origin` may proceed
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            _ if self.allowed_origins.is_empty() => true,
            None => true,
            Some(origin) => self.allowed_origins.iter().any(|o| o == origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let config = ServerConfig::parse_from([
            "airwave",
            "--bind",
            "127.0.0.1:9000",
            "--allowed-origin",
            "http://localhost:8080,http://localhost:3000",
            "--ping-interval-secs",
            "5",
        ]);
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:8080", "http://localhost:3000"]
        );
        assert_eq!(config.ping_interval(), Duration::from_secs(5));
    }

    #[test]
    fn default_matches_flag_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.ping_interval(), Duration::from_secs(30));
        assert_eq!(config.pong_timeout(), Duration::from_secs(10));
        assert_eq!(config.command_buffer, 1024);
    }

    #[test]
    fn origin_check() {
        let open = ServerConfig::default();
        assert!(open.origin_allowed(Some("http://evil.example")));

        let locked = ServerConfig {
            allowed_origins: vec!["http://localhost:8080".to_string()],
            ..ServerConfig::default()
        };
        assert!(locked.origin_allowed(Some("http://localhost:8080")));
        assert!(locked.origin_allowed(None));
        assert!(!locked.origin_allowed(Some("http://evil.example")));
    }
}
