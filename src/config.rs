use std::time::Duration;

/// Connection settings for an sqscpp server.
///
/// Every request goes to the same base URL, `{protocol}://{host}:{port}/`.
#[derive(Debug, Clone)]
pub struct Config {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Whole-request timeout. `None` leaves the HTTP client's default (no
    /// timeout) in place.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Renders `{protocol}://{host}:{port}`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            timeout: None,
        }
    }
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.config.protocol = protocol.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout = Some(Duration::from_millis(ms));
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
