//! Service Configuration
//! Mission: Every path, secret and cadence comes from flags or the environment

use crate::store::gate::DEFAULT_SLOW_HOLD_MS;
use anyhow::{ensure, Result};
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Parser, Debug, Clone)]
#[command(name = "riskdesk")]
#[command(about = "Broker account table service with token login and a random-number stream")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "RISKDESK_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Live CSV table
    #[arg(long, env = "RISKDESK_TABLE_PATH", default_value = "backend_table.csv")]
    pub table_path: PathBuf,

    /// Single-slot backup of the table, rewritten before every mutation
    #[arg(
        long,
        env = "RISKDESK_BACKUP_PATH",
        default_value = "backend_table.backup.csv"
    )]
    pub backup_path: PathBuf,

    /// SQLite file holding sessions and the random-number log
    #[arg(long, env = "RISKDESK_DB_PATH", default_value = "app.db")]
    pub db_path: PathBuf,

    /// HS256 signing secret for access tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in days
    #[arg(long, env = "RISKDESK_TOKEN_TTL_DAYS", default_value_t = 365)]
    pub token_ttl_days: i64,

    /// Delay between random-number stream ticks
    #[arg(long, env = "RISKDESK_STREAM_INTERVAL_MS", default_value_t = 1000)]
    pub stream_interval_ms: u64,

    /// Table gate holds longer than this are logged at WARN
    #[arg(long, env = "RISKDESK_GATE_SLOW_HOLD_MS", default_value_t = DEFAULT_SLOW_HOLD_MS)]
    pub gate_slow_hold_ms: u64,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.jwt_secret.trim().is_empty(),
            "JWT_SECRET must not be empty"
        );
        ensure!(self.token_ttl_days > 0, "token TTL must be at least one day");
        ensure!(
            self.stream_interval_ms > 0,
            "stream interval must be greater than zero"
        );
        Ok(())
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms)
    }

    pub fn gate_slow_hold(&self) -> Duration {
        Duration::from_millis(self.gate_slow_hold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_with_secret_flag() {
        let config = Config::try_parse_from(["riskdesk", "--jwt-secret", "s3cret"]).unwrap();

        assert_eq!(config.token_ttl_days, 365);
        assert_eq!(config.stream_interval(), Duration::from_secs(1));
        assert_eq!(config.table_path, PathBuf::from("backend_table.csv"));
        assert_eq!(config.backup_path, PathBuf::from("backend_table.backup.csv"));
        assert_eq!(config.db_path, PathBuf::from("app.db"));
        assert_eq!(
            config.gate_slow_hold(),
            Duration::from_millis(DEFAULT_SLOW_HOLD_MS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_secret_rejected() {
        let config = Config::try_parse_from(["riskdesk", "--jwt-secret", "  "]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config::try_parse_from([
            "riskdesk",
            "--jwt-secret",
            "s3cret",
            "--stream-interval-ms",
            "0",
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }
}
