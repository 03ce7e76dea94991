//! Engine address parsing

use std::fmt;

/// Port used when the configured host carries none
pub const DEFAULT_ENGINE_PORT: u16 = 8085;

/// Where the engine listens, parsed from `host:port` or a full URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl EngineEndpoint {
    /// Parses `localhost:8085`, `http://127.0.0.1:9000/` or a bare host name
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (scheme, rest) = match input.split_once("://") {
            Some((scheme, rest)) => (scheme.to_lowercase(), rest),
            None => ("http".to_string(), input),
        };
        let authority = rest.split('/').next().unwrap_or_default();

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => (host, port),
                Err(_) => (authority, DEFAULT_ENGINE_PORT),
            },
            None => (authority, DEFAULT_ENGINE_PORT),
        };

        let host = if host.is_empty() { "localhost" } else { host };

        Self {
            scheme,
            host: host.to_string(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `scheme://host:port` with no trailing slash
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Absolute URL for an engine path such as `/health`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

impl fmt::Display for EngineEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
