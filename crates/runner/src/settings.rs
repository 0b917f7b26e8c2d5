//! Runner settings
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables such as `ALARM_RECONCILER_NOTIFICATION_TARGET` or
//! `ALARM_RECONCILER_RECONCILER__DRY_RUN=true`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use coverage_reconciler::ReconcilerConfig;
use monitoring_client::{NotificationTarget, RateLimitConfig};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "ALARM_RECONCILER_CONFIG";

const ENV_PREFIX: &str = "ALARM_RECONCILER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address of the pre-provisioned notification channel
    pub notification_target: String,
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwsSettings {
    /// Region override; the AWS config chain decides when unset
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Validated notification target
    pub fn notification_target(&self) -> Result<NotificationTarget, ConfigError> {
        let address = self.notification_target.trim();
        if address.is_empty() {
            return Err(ConfigError::Message(
                "notification_target must not be empty".to_string(),
            ));
        }
        Ok(NotificationTarget::new(address))
    }
}

/// Load settings from `path` (if any) and the environment
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    build(builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    ))
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.notification_target()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use coverage_reconciler::ExitPolicy;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_minimal_settings() {
        let settings = from_toml(r#"notification_target = "arn:aws:sns:us-east-1:000000000000:ops""#).unwrap();

        assert_eq!(
            settings.notification_target().unwrap().address(),
            "arn:aws:sns:us-east-1:000000000000:ops"
        );
        assert!(settings.aws.region.is_none());
        assert_eq!(settings.reconciler.max_concurrency, 4);
        assert!(settings.rate_limit.enabled);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_full_settings() {
        let settings = from_toml(
            r#"
            notification_target = "ops-topic"

            [aws]
            region = "ap-northeast-1"

            [reconciler]
            max_concurrency = 8
            call_timeout_ms = 2500
            namespace = "AWS/Lambda"
            dry_run = true
            exit_policy = "require_progress"

            [rate_limit]
            enabled = false

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.aws.region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(settings.reconciler.max_concurrency, 8);
        assert_eq!(settings.reconciler.call_timeout_ms, 2500);
        assert_eq!(settings.reconciler.namespace.as_deref(), Some("AWS/Lambda"));
        assert!(settings.reconciler.dry_run);
        assert_eq!(settings.reconciler.exit_policy, ExitPolicy::RequireProgress);
        assert_eq!(settings.reconciler.alarm_period_seconds, 300);
        assert!(!settings.rate_limit.enabled);
        assert_eq!(settings.rate_limit.per_second, 10);
        assert!(settings.logging.json);
    }

    #[test]
    fn test_missing_target_rejected() {
        assert!(from_toml("[reconciler]\ndry_run = true").is_err());
    }

    #[test]
    fn test_blank_target_rejected() {
        assert!(from_toml(r#"notification_target = "  ""#).is_err());
    }
}
