use std::net::SocketAddr;
use std::time::Duration;

use common::config::Validate;
use common::defaults::{DEFAULT_BIND_ADDRESS, DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_LOG_LEVEL};
use common::logger::is_valid_level;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Devices idle for longer than this are evicted on the next sweep.
    pub inactivity_timeout_secs: u64,
    /// Period of the background sweep; zero leaves only the sweeps that run
    /// on device reads.
    pub cleanup_interval_secs: u64,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            cleanup_interval_secs: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.inactivity_timeout_secs == 0 {
            return Err("Inactivity timeout must be at least one second".to_string());
        }
        if self.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.bind_address));
        }
        if !is_valid_level(&self.log_level) {
            return Err(format!("Unknown log level: {}", self.log_level));
        }
        Ok(())
    }
}
