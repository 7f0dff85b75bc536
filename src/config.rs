/// Manager and sensor configuration
///
/// A TOML file describes the local interface, the boards behind it and the
/// facade knobs:
///
/// ```toml
/// local_address = "192.168.111.254"
/// port = 64321
/// timeout_ms = 50
///
/// [[boards]]
/// address = "192.168.111.1"
/// tcp_service = true
/// tcp_port = 64321
/// udp_service = true
/// udp_port = 64321
///
/// [sensor]
/// settle_time_ms = 310
/// tcp_read_timeout_ms = 1000
/// ```
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{MultitorqueError, Result};
use crate::ft_sensor::CalibrationLimits;
use crate::{DEFAULT_PORT, MAX_NUM_BOARDS};

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    50
}

fn default_settle_time_ms() -> u64 {
    310
}

fn enabled() -> bool {
    true
}

/// One manager: local endpoint, poll timeout and its boards
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ManagerConfig {
    /// IPv4 address of the local interface facing the boards
    pub local_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Receive poll timeout and liveness threshold
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub boards: Vec<BoardConfig>,
    #[serde(default)]
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BoardConfig {
    pub address: String,
    #[serde(default = "enabled")]
    pub tcp_service: bool,
    #[serde(default = "default_port")]
    pub tcp_port: u16,
    #[serde(default = "enabled")]
    pub udp_service: bool,
    #[serde(default = "default_port")]
    pub udp_port: u16,
}

/// Facade settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Wait between the offset calibration command and the residual check
    #[serde(default = "default_settle_time_ms")]
    pub settle_time_ms: u64,
    /// Bound on each TCP reply wait; unset blocks indefinitely
    #[serde(default)]
    pub tcp_read_timeout_ms: Option<u64>,
    #[serde(default)]
    pub limits: CalibrationLimits,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            settle_time_ms: default_settle_time_ms(),
            tcp_read_timeout_ms: None,
            limits: CalibrationLimits::default(),
        }
    }
}

impl SensorConfig {
    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_time_ms)
    }

    pub fn tcp_read_timeout(&self) -> Option<Duration> {
        self.tcp_read_timeout_ms.map(Duration::from_millis)
    }
}

impl BoardConfig {
    pub fn new(address: Ipv4Addr, port: u16) -> Self {
        Self {
            address: address.to_string(),
            tcp_service: true,
            tcp_port: port,
            udp_service: true,
            udp_port: port,
        }
    }

    pub fn ip(&self) -> Result<Ipv4Addr> {
        parse_ipv4(&self.address)
    }
}

impl ManagerConfig {
    pub fn new(local_address: Ipv4Addr) -> Self {
        Self {
            local_address: local_address.to_string(),
            port: DEFAULT_PORT,
            timeout_ms: default_timeout_ms(),
            boards: Vec::new(),
            sensor: SensorConfig::default(),
        }
    }

    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MultitorqueError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| MultitorqueError::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.boards.len() > MAX_NUM_BOARDS {
            return Err(MultitorqueError::Config(format!(
                "{} boards configured, at most {} supported",
                self.boards.len(),
                MAX_NUM_BOARDS
            )));
        }
        if self.timeout_ms == 0 {
            return Err(MultitorqueError::Config(
                "timeout_ms must be positive".to_string(),
            ));
        }
        self.local_ip()?;
        for board in &self.boards {
            board.ip()?;
        }
        Ok(())
    }

    pub fn local_ip(&self) -> Result<Ipv4Addr> {
        parse_ipv4(&self.local_address)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_ipv4(address: &str) -> Result<Ipv4Addr> {
    address
        .parse()
        .map_err(|_| MultitorqueError::Config(format!("invalid IPv4 address: {:?}", address)))
}
