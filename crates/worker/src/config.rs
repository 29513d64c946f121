use std::time::Duration;

use showroom_core::types::ModelIdentifier;
use showroom_pipeline::PollConfig;

/// Default target model when `TARGET_MODELS` is unset.
const DEFAULT_TARGET_MODEL: &str = "triposr";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL of the generation backend.
    pub api_url: String,
    pub poll: PollConfig,
    pub request_timeout: Duration,
    /// Models requested when the command line names none.
    pub target_models: Vec<ModelIdentifier>,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Required | Default   |
    /// |------------------------|----------|-----------|
    /// | `SHOWROOM_API_URL`     | yes      | --        |
    /// | `POLL_INTERVAL_SECS`   | no       | `5`       |
    /// | `POLL_MAX_ATTEMPTS`    | no       | `60`      |
    /// | `REQUEST_TIMEOUT_SECS` | no       | `30`      |
    /// | `TARGET_MODELS`        | no       | `triposr` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("SHOWROOM_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("SHOWROOM_API_URL"))?;

        let defaults = PollConfig::default();
        let interval_secs = parse_or(
            &lookup,
            "POLL_INTERVAL_SECS",
            "a whole number of seconds",
            defaults.interval.as_secs(),
        )?;
        let max_attempts: u32 = parse_or(
            &lookup,
            "POLL_MAX_ATTEMPTS",
            "a positive integer",
            defaults.max_attempts,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "POLL_MAX_ATTEMPTS",
                expected: "a positive integer",
                value: "0".into(),
            });
        }
        let request_timeout_secs: u64 = parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            "a whole number of seconds",
            30,
        )?;

        let target_models: Vec<ModelIdentifier> = lookup("TARGET_MODELS")
            .unwrap_or_else(|| DEFAULT_TARGET_MODEL.into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ModelIdentifier::new)
            .collect();
        if target_models.is_empty() {
            return Err(ConfigError::Invalid {
                name: "TARGET_MODELS",
                expected: "a comma-separated list of model identifiers",
                value: lookup("TARGET_MODELS").unwrap_or_default(),
            });
        }

        Ok(Self {
            api_url,
            poll: PollConfig {
                interval: Duration::from_secs(interval_secs),
                max_attempts,
            },
            request_timeout: Duration::from_secs(request_timeout_secs),
            target_models,
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = load(&[("SHOWROOM_API_URL", "https://api.example.com")]).unwrap();
        assert_eq!(config.api_url, "https://api.example.com");
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.target_models, vec![ModelIdentifier::new("triposr")]);
    }

    #[test]
    fn missing_url_is_an_error() {
        assert_eq!(
            load(&[]).unwrap_err(),
            ConfigError::Missing("SHOWROOM_API_URL")
        );
        assert_eq!(
            load(&[("SHOWROOM_API_URL", "  ")]).unwrap_err(),
            ConfigError::Missing("SHOWROOM_API_URL")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("SHOWROOM_API_URL", "https://api.example.com"),
            ("POLL_INTERVAL_SECS", "2"),
            ("POLL_MAX_ATTEMPTS", "10"),
            ("REQUEST_TIMEOUT_SECS", "15"),
            ("TARGET_MODELS", "modelA, modelB,,"),
        ])
        .unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(
            config.target_models,
            vec![ModelIdentifier::new("modelA"), ModelIdentifier::new("modelB")]
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[
            ("SHOWROOM_API_URL", "https://api.example.com"),
            ("POLL_INTERVAL_SECS", "soon"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "POLL_INTERVAL_SECS", .. });
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = load(&[
            ("SHOWROOM_API_URL", "https://api.example.com"),
            ("POLL_MAX_ATTEMPTS", "0"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "POLL_MAX_ATTEMPTS", .. });
    }

    #[test]
    fn blank_model_list_is_rejected() {
        let err = load(&[
            ("SHOWROOM_API_URL", "https://api.example.com"),
            ("TARGET_MODELS", " , "),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "TARGET_MODELS", .. });
    }
}
