use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

/// Settings shared by client and server setup.
///
/// Every field has a default, so a partial JSON document is a valid config:
///
/// ```
/// let config = contractrpc::RpcConfig::from_json_str(r#"{"port": 8080, "retry": 2}"#).unwrap();
/// assert_eq!(config.base_url(), "http://127.0.0.1:8080");
/// assert_eq!(config.timeout, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    pub host: String,
    pub port: Option<u16>,
    /// Default call timeout in seconds.
    pub timeout: f64,
    /// Default number of retries after a failed attempt.
    pub retry: u32,
    /// Check implementations against their interface during server setup.
    pub secure_build: bool,
    /// Wrap request bodies in an extra JSON string layer for older servers.
    pub legacy_double_encoding: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: None,
            timeout: 1.0,
            retry: 0,
            secure_build: true,
            legacy_double_encoding: false,
        }
    }
}

impl RpcConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.timeout_duration()?;
        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_secure_build(mut self, secure_build: bool) -> Self {
        self.secure_build = secure_build;
        self
    }

    pub fn with_legacy_double_encoding(mut self, enabled: bool) -> Self {
        self.legacy_double_encoding = enabled;
        self
    }

    pub fn timeout_duration(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.timeout).map_err(|_| ConfigError::InvalidTimeout(self.timeout))
    }

    pub fn base_url(&self) -> String {
        match self.port {
            Some(port) => format!("http://{}:{}", self.host, port),
            None => format!("http://{}", self.host),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port = self.port.ok_or(ConfigError::MissingPort)?;
        let resolve_err = |source| ConfigError::Resolve {
            host: self.host.clone(),
            port,
            source,
        };
        (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(resolve_err)?
            .next()
            .ok_or_else(|| {
                resolve_err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no address",
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RpcConfig::default();
        assert_eq!(config.timeout_duration().unwrap(), Duration::from_secs(1));
        assert_eq!(config.retry, 0);
        assert!(config.secure_build);
        assert!(!config.legacy_double_encoding);
        assert_eq!(config.base_url(), "http://127.0.0.1");
        assert!(matches!(config.socket_addr(), Err(ConfigError::MissingPort)));
    }

    #[test]
    fn builder_and_parsing_agree() {
        let built = RpcConfig::new("localhost")
            .with_port(9000)
            .with_timeout(0.25)
            .with_retry(3)
            .with_secure_build(false);
        let parsed = RpcConfig::from_json_str(
            r#"{"host":"localhost","port":9000,"timeout":0.25,"retry":3,"secure_build":false}"#,
        )
        .unwrap();
        assert_eq!(built, parsed);
        assert_eq!(parsed.timeout_duration().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_timeouts() {
        assert!(matches!(
            RpcConfig::from_json_str(r#"{"timeout": -1}"#),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(RpcConfig::default().with_timeout(f64::NAN).timeout_duration().is_err());
        assert!(matches!(
            RpcConfig::from_json_str(r#"{"retry": -1}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn resolves_socket_addr() {
        let addr = RpcConfig::new("127.0.0.1").with_port(4000).socket_addr().unwrap();
        assert_eq!(addr.port(), 4000);
        assert!(addr.ip().is_loopback());
    }
}
