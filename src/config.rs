//! Portal settings.
//!
//! Sources are layered lowest to highest: built-in defaults, `config/default.toml`,
//! `config/{APP_ENV}.toml`, then `APP__`-prefixed environment variables
//! (`APP__CORS__ALLOWED_ORIGINS` for nested keys).

use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const ENV_VAR: &str = "APP_ENV";
const DEVELOPMENT: &str = "development";
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Profile name; also picks `config/{environment}.toml`.
    #[serde(default = "defaults::environment")]
    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "defaults::log_level")]
    #[validate(custom = "check_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Deployment URL of the managed backend. Required.
    #[validate(custom = "check_backend_url")]
    pub backend_url: String,

    /// Identity provider host; tokens are issued by `https://{identity_hostname}`.
    #[serde(default = "defaults::identity_hostname")]
    #[validate(length(min = 1))]
    pub identity_hostname: String,

    /// Header the sign-in gateway fills with the signed-in user id.
    #[serde(default = "defaults::identity_header")]
    #[validate(custom = "check_header_name")]
    pub identity_header: String,

    /// A `backend_url` containing this text is the production deployment.
    #[serde(default = "defaults::production_backend_marker")]
    pub production_backend_marker: String,

    /// Seconds allowed for one backend call.
    #[serde(default = "defaults::request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    #[serde(default = "defaults::max_body_size")]
    pub max_body_size: usize,

    /// Timeline events are grouped into days at this offset from UTC.
    #[serde(default)]
    #[validate(custom = "check_utc_offset")]
    pub timeline_utc_offset_minutes: i32,

    #[serde(default)]
    pub cors: CorsConfig,
}

/// Cross-origin policy for the browser portal.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Comma separated origin list.
    #[serde(default)]
    pub allowed_origins: Option<String>,
    /// Outside development, permissive CORS must be asked for explicitly.
    #[serde(default)]
    pub allow_any_origin: bool,
    #[serde(default)]
    pub allow_credentials: bool,
}

impl CorsConfig {
    /// Non-empty trimmed entries of `allowed_origins`.
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

mod defaults {
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        8080
    }
    pub fn environment() -> String {
        super::DEVELOPMENT.into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn identity_hostname() -> String {
        "gorgeous-ladybird-14.clerk.accounts.dev".into()
    }
    pub fn identity_header() -> String {
        "x-user-id".into()
    }
    pub fn production_backend_marker() -> String {
        "enduring-llama-536".into()
    }
    pub fn request_timeout_secs() -> u64 {
        15
    }
    pub fn max_body_size() -> usize {
        10 << 20
    }
}

impl AppConfig {
    /// Settings with every default applied except the backend deployment.
    pub fn new(backend_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            environment: environment.into(),
            log_level: defaults::log_level(),
            log_json: false,
            backend_url: backend_url.into(),
            identity_hostname: defaults::identity_hostname(),
            identity_header: defaults::identity_header(),
            production_backend_marker: defaults::production_backend_marker(),
            request_timeout_secs: defaults::request_timeout_secs(),
            max_body_size: defaults::max_body_size(),
            timeline_utc_offset_minutes: 0,
            cors: CorsConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEVELOPMENT)
    }

    /// Permissive CORS is used when no origins are listed and either the
    /// profile is development or the operator opted in.
    pub fn permissive_cors(&self) -> bool {
        self.is_development() || self.cors.allow_any_origin
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn identity_issuer(&self) -> String {
        format!("https://{}", self.identity_hostname.trim_end_matches('/'))
    }

    /// Offset for day bucketing; UTC when the configured value is out of range.
    pub fn timeline_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timeline_utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn is_production_backend(&self) -> bool {
        !self.production_backend_marker.is_empty()
            && self.backend_url.contains(&self.production_backend_marker)
    }

    pub fn theme(&self) -> ThemePalette {
        ThemePalette::for_backend(self.is_production_backend())
    }

    fn check_cors(&self) -> Result<(), ValidationErrors> {
        if self.permissive_cors() || !self.cors.origins().is_empty() {
            return Ok(());
        }
        let mut err = ValidationError::new("cors_origins_required");
        err.message = Some(
            format!(
                "profile `{}` needs APP__CORS__ALLOWED_ORIGINS or APP__CORS__ALLOW_ANY_ORIGIN=true",
                self.environment
            )
            .into(),
        );
        let mut errors = ValidationErrors::new();
        errors.add("cors", err);
        Err(errors)
    }
}

/// Accent colours announcing which backend deployment the portal talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePalette {
    pub primary: &'static str,
    pub primary_hover: &'static str,
    pub primary_light: &'static str,
}

impl ThemePalette {
    pub const PRODUCTION: ThemePalette = ThemePalette {
        primary: "#FF6700",
        primary_hover: "#E55D00",
        primary_light: "#FFAB7D",
    };

    pub const DEVELOPMENT: ThemePalette = ThemePalette {
        primary: "#8B5CF6",
        primary_hover: "#7C3AED",
        primary_light: "#A78BFA",
    };

    pub fn for_backend(is_production: bool) -> Self {
        if is_production {
            Self::PRODUCTION
        } else {
            Self::DEVELOPMENT
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not read settings: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid settings: {0}")]
    Validation(#[from] ValidationErrors),
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn check_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(invalid("log_level", "expected trace, debug, info, warn or error"))
    }
}

fn check_backend_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value.trim()) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(invalid("backend_url", "backend_url must be an absolute http(s) URL")),
    }
}

fn check_header_name(value: &str) -> Result<(), ValidationError> {
    axum::http::HeaderName::from_bytes(value.as_bytes())
        .map(|_| ())
        .map_err(|_| invalid("identity_header", "identity_header is not a valid header name"))
}

fn check_utc_offset(minutes: i32) -> Result<(), ValidationError> {
    if minutes.abs() <= MAX_UTC_OFFSET_MINUTES {
        Ok(())
    } else {
        Err(invalid(
            "timeline_utc_offset_minutes",
            "timeline_utc_offset_minutes must be within +/- 14 hours",
        ))
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(format!("woid_portal={level},tower_http=debug")));

    let builder = fmt().with_env_filter(filter);
    // A second init (tests, the report binary) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Reads settings for the profile named by `APP_ENV` (default `development`).
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let profile = env::var(ENV_VAR).unwrap_or_else(|_| DEVELOPMENT.to_string());
    load_config_from(Path::new(CONFIG_DIR), &profile)
}

pub fn load_config_from(dir: &Path, profile: &str) -> Result<AppConfig, AppConfigError> {
    info!(profile, dir = %dir.display(), "loading settings");
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "settings directory missing, using defaults and environment");
    }

    let layered = Config::builder()
        .set_default("environment", profile)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(profile)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if layered.get_string("backend_url").is_err() {
        error!("backend_url is not set; export APP__BACKEND_URL");
        return Err(ConfigError::NotFound("backend_url".into()).into());
    }

    let settings: AppConfig = layered.try_deserialize()?;
    if let Err(errors) = settings.validate().and_then(|()| settings.check_cors()) {
        error!(%errors, "settings rejected");
        return Err(errors.into());
    }

    info!(
        environment = %settings.environment,
        production_backend = settings.is_production_backend(),
        "settings loaded"
    );
    Ok(settings)
}
