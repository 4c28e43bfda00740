//! Controller configuration, loaded once from environment variables.

use std::time::Duration;

use thiserror::Error;

use crate::aws::sigv4::Credentials;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Log verbosity accepted in `LOG_LEVEL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Parse a level name, falling back to `info` for anything unrecognized.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "info" => Self::Info,
            "debug" => Self::Debug,
            _ => Self::Info,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_LEVEL").unwrap_or_default())
    }

    /// `EnvFilter` directive. Critical events are logged at error level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Endpoints and identity used by the AWS service clients.
#[derive(Clone, Debug)]
pub struct AwsConfig {
    pub region: String,
    /// Static keys from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// optionally `AWS_SESSION_TOKEN`. Profiles, container and instance
    /// metadata credentials are not read.
    pub credentials: Credentials,
    pub codebuild_endpoint: String,
    pub codecommit_endpoint: String,
    pub logs_endpoint: String,
    pub request_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct FlowConfig {
    /// Build project started for every triggering event.
    pub project_name: String,
    pub log_level: LogLevel,
    pub aws: AwsConfig,
}

impl FlowConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let project_name = required("PROJECT_NAME")?;
        let log_level = LogLevel::parse(&var("LOG_LEVEL").unwrap_or_default());

        let region = var("AWS_REGION")
            .or_else(|| var("AWS_DEFAULT_REGION"))
            .ok_or(ConfigError::Missing("AWS_REGION"))?;
        let credentials = Credentials {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            session_token: var("AWS_SESSION_TOKEN"),
        };

        let endpoint = |name: &str, service: &str| {
            var(name).unwrap_or_else(|| format!("https://{service}.{region}.amazonaws.com"))
        };
        let codebuild_endpoint = endpoint("FLOW_CODEBUILD_ENDPOINT", "codebuild");
        let codecommit_endpoint = endpoint("FLOW_CODECOMMIT_ENDPOINT", "codecommit");
        let logs_endpoint = endpoint("FLOW_LOGS_ENDPOINT", "logs");

        let request_timeout = match var("FLOW_HTTP_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    name: "FLOW_HTTP_TIMEOUT_SECS",
                    value,
                })?,
            None => Duration::from_secs(10),
        };

        if credentials.session_token.is_none() {
            tracing::debug!("AWS_SESSION_TOKEN not set -- signing with long-term credentials");
        }

        Ok(Self {
            project_name,
            log_level,
            aws: AwsConfig {
                region,
                credentials,
                codebuild_endpoint,
                codecommit_endpoint,
                logs_endpoint,
                request_timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("PROJECT_NAME", "app-ci"),
        ("AWS_REGION", "eu-west-1"),
        ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
        ("AWS_SECRET_ACCESS_KEY", "secret"),
    ];

    #[test]
    fn log_level_falls_back_to_info() {
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("warning"), LogLevel::Warning);
        assert_eq!(LogLevel::parse("critical").as_filter(), "error");
        assert_eq!(LogLevel::parse("verbose"), LogLevel::Info);
        assert_eq!(LogLevel::parse(""), LogLevel::Info);
    }

    #[test]
    fn project_name_is_required() {
        let err = FlowConfig::from_lookup(lookup(&BASE[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PROJECT_NAME")));

        let mut blank = BASE.to_vec();
        blank[0] = ("PROJECT_NAME", "  ");
        assert!(FlowConfig::from_lookup(lookup(&blank)).is_err());
    }

    #[test]
    fn endpoints_default_to_regional_hosts() {
        let config = FlowConfig::from_lookup(lookup(BASE)).unwrap();

        assert_eq!(config.project_name, "app-ci");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.aws.codebuild_endpoint, "https://codebuild.eu-west-1.amazonaws.com");
        assert_eq!(config.aws.codecommit_endpoint, "https://codecommit.eu-west-1.amazonaws.com");
        assert_eq!(config.aws.logs_endpoint, "https://logs.eu-west-1.amazonaws.com");
        assert_eq!(config.aws.request_timeout, Duration::from_secs(10));
        assert_eq!(config.aws.credentials.session_token, None);
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("LOG_LEVEL", "debug"),
            ("AWS_SESSION_TOKEN", "token"),
            ("FLOW_LOGS_ENDPOINT", "http://localhost:4566"),
            ("FLOW_HTTP_TIMEOUT_SECS", "3"),
        ]);

        let config = FlowConfig::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.aws.logs_endpoint, "http://localhost:4566");
        assert_eq!(config.aws.request_timeout, Duration::from_secs(3));
        assert_eq!(config.aws.credentials.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn region_falls_back_to_default_region() {
        let mut vars: Vec<_> = BASE.iter().filter(|(k, _)| *k != "AWS_REGION").copied().collect();
        assert!(matches!(
            FlowConfig::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::Missing("AWS_REGION")
        ));

        vars.push(("AWS_DEFAULT_REGION", "ap-southeast-2"));
        let config = FlowConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.aws.region, "ap-southeast-2");
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("FLOW_HTTP_TIMEOUT_SECS", "soon"));

        assert!(matches!(
            FlowConfig::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::Invalid { name: "FLOW_HTTP_TIMEOUT_SECS", .. }
        ));
    }

    #[test]
    fn credentials_come_only_from_the_environment() {
        for missing in ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"] {
            let vars: Vec<_> = BASE.iter().filter(|(k, _)| *k != missing).copied().collect();
            let err = FlowConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(name) if name == missing));
        }

        let config = FlowConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.aws.credentials.access_key_id, "AKIDEXAMPLE");
        assert_eq!(config.aws.credentials.secret_access_key, "secret");
    }
}
