//! Runtime configuration, read from `TALLY_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use tally_ledger::TransferStrategy;
use tally_observability::LogFormat;

pub const ENV_BIND_ADDR: &str = "TALLY_BIND_ADDR";
pub const ENV_TRANSFER_STRATEGY: &str = "TALLY_TRANSFER_STRATEGY";
pub const ENV_TRANSFER_TIMEOUT_MS: &str = "TALLY_TRANSFER_TIMEOUT_MS";
pub const ENV_TRANSFER_BACKOFF_US: &str = "TALLY_TRANSFER_BACKOFF_US";
pub const ENV_LOG_FORMAT: &str = "TALLY_LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub transfer_strategy: TransferStrategy,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            transfer_strategy: TransferStrategy::Ordered,
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(ENV_BIND_ADDR, &bind, e))?;

        let log_format = match lookup(ENV_LOG_FORMAT) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid(ENV_LOG_FORMAT, &raw, e))?,
            None => LogFormat::default(),
        };

        let transfer_strategy = match lookup(ENV_TRANSFER_STRATEGY).as_deref().map(str::trim) {
            None | Some("ordered") => TransferStrategy::Ordered,
            Some("try_lock") => {
                let timeout = duration_var(&lookup, ENV_TRANSFER_TIMEOUT_MS, Duration::from_millis)?
                    .unwrap_or(TransferStrategy::DEFAULT_TIMEOUT);
                let backoff = duration_var(&lookup, ENV_TRANSFER_BACKOFF_US, Duration::from_micros)?
                    .unwrap_or(TransferStrategy::DEFAULT_BACKOFF);
                TransferStrategy::TryLock { timeout, backoff }
            }
            Some(other) => {
                return Err(ConfigError::invalid(
                    ENV_TRANSFER_STRATEGY,
                    other,
                    "expected 'ordered' or 'try_lock'",
                ));
            }
        };

        Ok(Self {
            bind_addr,
            transfer_strategy,
            log_format,
        })
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    unit: fn(u64) -> Duration,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::invalid(var, &raw, e))?;
    if value == 0 {
        return Err(ConfigError::invalid(var, &raw, "must be greater than zero"));
    }
    Ok(Some(unit(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config_from(&[]).unwrap(), ApiConfig::default());
    }

    #[test]
    fn try_lock_strategy_reads_timeout_and_backoff() {
        let config = config_from(&[
            (ENV_TRANSFER_STRATEGY, "try_lock"),
            (ENV_TRANSFER_TIMEOUT_MS, "250"),
            (ENV_TRANSFER_BACKOFF_US, "20"),
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
            (ENV_LOG_FORMAT, "pretty"),
        ])
        .unwrap();

        assert_eq!(
            config.transfer_strategy,
            TransferStrategy::TryLock {
                timeout: Duration::from_millis(250),
                backoff: Duration::from_micros(20),
            }
        );
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn try_lock_without_tuning_uses_defaults() {
        let config = config_from(&[(ENV_TRANSFER_STRATEGY, "try_lock")]).unwrap();
        assert_eq!(config.transfer_strategy, TransferStrategy::try_lock());
    }

    #[test]
    fn invalid_values_are_reported_with_their_variable() {
        let cases = [
            (ENV_TRANSFER_STRATEGY, "optimistic"),
            (ENV_BIND_ADDR, "not-an-addr"),
            (ENV_LOG_FORMAT, "xml"),
        ];
        for (var, value) in cases {
            match config_from(&[(var, value)]) {
                Err(ConfigError::Invalid { var: reported, .. }) => assert_eq!(reported, var),
                other => panic!("expected error for {var}={value}, got {other:?}"),
            }
        }

        let err = config_from(&[
            (ENV_TRANSFER_STRATEGY, "try_lock"),
            (ENV_TRANSFER_TIMEOUT_MS, "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_TRANSFER_TIMEOUT_MS, .. }));
    }
}
