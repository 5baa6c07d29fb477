// ABOUTME: Tracing subscriber setup driven by RUST_LOG, LOG_FORMAT and ENVIRONMENT
// ABOUTME: Also holds the structured audit events for sign-in, account linking and publishing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! Structured logging

use std::env;
use std::io;

use anyhow::Result;
use nora_core::constants::service_names;
use tracing::info;
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Dependencies whose own logs are capped regardless of `RUST_LOG`
const QUIET_TARGETS: &[&str] = &[
    "hyper=warn",
    "reqwest=warn",
    "sqlx=warn",
    "tower_http=info",
];

/// How log lines are rendered on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, for log shippers
    Json,
    /// Multi-field human readable lines
    Pretty,
    /// Single-line output without targets
    Compact,
}

impl LogFormat {
    /// Interpret a `LOG_FORMAT` value; unknown values fall back to pretty
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("compact") => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `nora_health_server=debug`
    pub level: String,
    /// Output rendering
    pub format: LogFormat,
    /// Emit file and line of each event
    pub include_location: bool,
    /// Emit span enter and close events
    pub include_spans: bool,
    /// `development`, `testing` or `production`
    pub environment: String,
    /// `service.name` on the startup event
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            environment: "development".into(),
            service_name: service_names::NORA_HEALTH_SERVER.into(),
        }
    }
}

impl LoggingConfig {
    /// Read settings from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: LogFormat::parse(env::var("LOG_FORMAT").ok().as_deref()),
            include_location: environment == "production"
                || env::var_os("LOG_INCLUDE_LOCATION").is_some(),
            include_spans: env::var_os("LOG_INCLUDE_SPANS").is_some(),
            environment,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| service_names::NORA_HEALTH_SERVER.into()),
        }
    }

    /// Filter built from `level` with dependency noise capped
    ///
    /// A bare level such as `debug` is also applied to this crate explicitly so
    /// it survives the per-target caps.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let own_crate = (!self.level.contains('='))
            .then(|| format!("nora_health_server={}", self.level));

        QUIET_TARGETS
            .iter()
            .map(|d| (*d).to_owned())
            .chain(own_crate)
            .filter_map(|d| d.parse::<Directive>().ok())
            .fold(EnvFilter::new(&self.level), EnvFilter::add_directive)
    }

    fn output_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer().with_writer(io::stdout).with_span_events(spans);

        match self.format {
            LogFormat::Json => base
                .json()
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .boxed(),
            LogFormat::Pretty => base
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .boxed(),
            LogFormat::Compact => base.compact().with_target(false).boxed(),
        }
    }

    /// Install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        tracing_subscriber::registry()
            .with(self.output_layer())
            .with(self.env_filter())
            .try_init()?;

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            environment = %self.environment,
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );
        Ok(())
    }
}

/// Install the global subscriber from environment variables
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Audit events with stable field names
pub struct AppLogger;

impl AppLogger {
    /// Sign-in, refresh or logout
    pub fn log_auth_event(user_id: &str, event: &str, success: bool, details: Option<&str>) {
        info!(
            user.id = %user_id,
            auth.event = %event,
            auth.success = success,
            auth.details = details.unwrap_or_default(),
            "Authentication event"
        );
    }

    /// Social account linked or unlinked
    pub fn log_oauth_event(user_id: &str, platform: &str, event: &str, success: bool) {
        info!(
            user.id = %user_id,
            oauth.platform = %platform,
            oauth.event = %event,
            oauth.success = success,
            "Account link event"
        );
    }

    /// Outcome of delivering one post to one platform
    pub fn log_publish_event(post_id: &str, platform: &str, success: bool, error: Option<&str>) {
        if success {
            info!(post.id = %post_id, publish.platform = %platform, "Post delivered");
        } else {
            tracing::warn!(
                post.id = %post_id,
                publish.platform = %platform,
                publish.error = error.unwrap_or_default(),
                "Post delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("compact")), LogFormat::Compact);
        assert_eq!(LogFormat::parse(Some("anything")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn test_bare_level_applies_to_own_crate() {
        let config = LoggingConfig {
            level: "debug".into(),
            ..LoggingConfig::default()
        };
        let rendered = config.env_filter().to_string();
        assert!(rendered.contains("nora_health_server=debug"));
        assert!(rendered.contains("hyper=warn"));
    }

    #[test]
    fn test_explicit_directives_are_kept_as_given() {
        let config = LoggingConfig {
            level: "warn,nora_health_server::services=trace".into(),
            ..LoggingConfig::default()
        };
        let rendered = config.env_filter().to_string();
        assert!(rendered.contains("nora_health_server::services=trace"));
        assert!(!rendered.contains("nora_health_server=warn"));
    }
}
