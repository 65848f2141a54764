//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use chrono::TimeDelta;
use faultgate_core::PolicyError;
use faultgate_core::domain::GatePolicy;

/// Configuration errors surfaced at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid gate policy: {0}")]
    Policy(#[from] PolicyError),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match env::var("RUST_ENV").as_deref() {
            Ok("development") | Ok("dev") => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        *self == Environment::Development
    }
}

/// Circuit gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub policy: GatePolicy,
    /// Contact shown to blocked clients.
    pub support_contact: String,
    /// Key anonymous clients by `Forwarded` / `X-Forwarded-For` instead of the peer address.
    pub trust_forwarded: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policy: GatePolicy::default(),
            support_contact: "support@example.com".to_string(),
            trust_forwarded: false,
        }
    }
}

impl GateConfig {
    /// Load the gate policy from `GATE_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = GatePolicy::default();

        let policy = GatePolicy {
            failure_threshold: parse_var("GATE_FAILURE_THRESHOLD")?
                .unwrap_or(defaults.failure_threshold),
            window: seconds_var("GATE_WINDOW_SECS")?.unwrap_or(defaults.window),
            cooldown: seconds_var("GATE_COOLDOWN_SECS")?.unwrap_or(defaults.cooldown),
            retention: seconds_var("GATE_RETENTION_SECS")?.unwrap_or(defaults.retention),
            idle_horizon: seconds_var("GATE_IDLE_HORIZON_SECS")?.unwrap_or(defaults.idle_horizon),
        };
        policy.validate()?;

        Ok(Self {
            policy,
            support_contact: env::var("GATE_SUPPORT_CONTACT")
                .unwrap_or_else(|_| "support@example.com".to_string()),
            trust_forwarded: env::var("GATE_TRUST_FORWARDED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// Idle tracker sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Cron expression (with seconds) for the sweep job.
    pub schedule: String,
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            schedule: "0 0 * * * *".to_string(),
            enabled: true,
        }
    }
}

impl SweepConfig {
    pub fn from_env() -> Self {
        Self {
            schedule: env::var("TRACKER_SWEEP_CRON").unwrap_or_else(|_| "0 0 * * * *".to_string()),
            enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub gate: GateConfig,
    pub sweep: SweepConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT")?.unwrap_or(8080),
            environment: Environment::from_env(),
            gate: GateConfig::from_env()?,
            sweep: SweepConfig::from_env(),
        })
    }
}

/// Unset variables yield `None`; set but unparsable ones are an error.
fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

fn seconds_var(name: &'static str) -> Result<Option<TimeDelta>, ConfigError> {
    parse_var::<i64>(name)?
        .map(|secs| {
            TimeDelta::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
                name,
                value: secs.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_config_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.policy, GatePolicy::default());
        assert!(!config.trust_forwarded);
    }

    #[test]
    fn test_sweep_defaults_to_hourly() {
        assert_eq!(SweepConfig::default().schedule, "0 0 * * * *");
    }
}
