//! Configuration management
//!
//! The CLI surface is two positional arguments, `[port] [host]`, with
//! everything else fixed at validated defaults.

use anyhow::{bail, Context, Result};

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;
/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Listen backlog
pub const DEFAULT_BACKLOG: u32 = 5;
/// Connection pool capacity (hard admission bound)
pub const DEFAULT_CONNECTION_SLOTS: usize = 256;
/// Read buffer pool capacity
pub const DEFAULT_BUFFER_SLOTS: usize = 512;

/// Root configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Host name or address to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Listen backlog
    pub backlog: u32,
    pub pool: PoolConfig,
    pub logging: LoggingConfig,
}

/// Memory pool configuration
///
/// Capacities are fixed before the first connection is accepted; beyond
/// them the pools report exhaustion instead of growing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection record slots
    pub connection_slots: usize,
    /// Read buffer slots
    pub buffer_slots: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Output format: "json" or "pretty"
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            pool: PoolConfig {
                connection_slots: DEFAULT_CONNECTION_SLOTS,
                buffer_slots: DEFAULT_BUFFER_SLOTS,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl Config {
    /// Build a configuration from positional arguments `[port] [host]`
    pub fn from_args<I>(mut args: I) -> Result<Self>
    where
        I: Iterator<Item = String>,
    {
        let mut config = Config::default();

        if let Some(port) = args.next() {
            config.port = port
                .parse()
                .with_context(|| format!("invalid port argument: {port:?}"))?;
        }
        if let Some(host) = args.next() {
            config.host = host;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("host must not be empty");
        }
        if self.backlog == 0 {
            bail!("backlog must be > 0");
        }
        if self.pool.connection_slots == 0 {
            bail!("connection_slots must be > 0");
        }
        if self.pool.buffer_slots == 0 {
            bail!("buffer_slots must be > 0");
        }
        Ok(())
    }
}
