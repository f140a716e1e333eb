//! Session configuration
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. Optional config file (TOML, YAML or JSON, picked by extension)
//! 3. Environment variables prefixed `PLC_LINK_` (e.g. `PLC_LINK_PORT=1502`)

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};
use crate::transport::Endpoint;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PLC_LINK_";

/// Register session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// PLC host name or IP address
    pub host: String,
    /// Modbus TCP port
    pub port: u16,
    /// Default signedness for single register words
    pub signed: bool,
    /// Per request timeout, also the pause between connect attempts
    pub timeout_secs: f64,
    /// Connect attempts before giving up
    pub max_retries: u32,
    /// Modbus unit id
    pub slave_id: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 502,
            signed: true,
            timeout_secs: 5.0,
            max_retries: 20,
            slave_id: 1,
        }
    }
}

impl LinkConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs_f64();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_slave_id(mut self, slave_id: u8) -> Self {
        self.slave_id = slave_id;
        self
    }

    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(LinkConfig::default()));

        if let Some(path) = path {
            // figment treats a missing file as empty
            if !path.is_file() {
                return Err(LinkError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let extension = path
                .extension()
                .and_then(|s| s.to_str())
                .ok_or_else(|| LinkError::config("Config file must have an extension"))?;

            figment = match extension {
                "toml" => figment.merge(Toml::file(path)),
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "json" => figment.merge(Json::file(path)),
                _ => {
                    return Err(LinkError::config(format!(
                        "Unsupported config file format: {}",
                        extension
                    )))
                },
            };
        }

        let config: LinkConfig = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| LinkError::config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values no session can run with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(LinkError::config("host must not be empty"));
        }
        if self.max_retries == 0 {
            return Err(LinkError::config("max_retries must be at least 1"));
        }
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            return Err(LinkError::config(format!(
                "timeout_secs must be a positive number, got {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Request timeout. Zero when `timeout_secs` does not pass `validate`.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::ZERO)
    }
}
