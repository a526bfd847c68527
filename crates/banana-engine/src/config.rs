use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

const DEFAULT_TIMEOUT_S: f64 = 90.0;
const MIN_TIMEOUT_S: f64 = 5.0;
const MAX_TIMEOUT_S: f64 = 300.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({expected})")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// What to do with the 9:20 "mobile" ratio, which the image service has no
/// native value for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MobileRatioPolicy {
    #[default]
    MapToPortrait,
    Reject,
}

impl FromStr for MobileRatioPolicy {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "map" | "portrait" | "map_to_portrait" => Ok(MobileRatioPolicy::MapToPortrait),
            "reject" => Ok(MobileRatioPolicy::Reject),
            _ => Err(ConfigError::InvalidValue {
                key: "BANANA_MOBILE_RATIO",
                value: raw.to_string(),
                expected: "map or reject",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub text_model: String,
    pub image_model: String,
    pub api_base: String,
    pub api_key_vars: Vec<String>,
    pub request_timeout: Duration,
    pub mobile_ratio_policy: MobileRatioPolicy,
    pub history_path: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key_vars: API_KEY_VARS.iter().map(|key| key.to_string()).collect(),
            request_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_S),
            mobile_ratio_policy: MobileRatioPolicy::default(),
            history_path: default_history_path(),
            export_dir: default_export_dir(),
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(non_empty_env)
    }

    /// Builds a config from an arbitrary variable source; unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(model) = lookup("BANANA_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(model) = lookup("BANANA_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(base) = lookup("GEMINI_API_BASE") {
            let trimmed = base.trim().trim_end_matches('/').to_string();
            if !trimmed.is_empty() {
                config.api_base = trimmed;
            }
        }
        if let Some(raw) = lookup("BANANA_REQUEST_TIMEOUT") {
            config.request_timeout = parse_timeout(&raw)?;
        }
        if let Some(raw) = lookup("BANANA_MOBILE_RATIO") {
            config.mobile_ratio_policy = raw.parse()?;
        }
        if let Some(path) = lookup("BANANA_HISTORY_PATH") {
            config.history_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("BANANA_EXPORT_DIR") {
            config.export_dir = PathBuf::from(path);
        }
        Ok(config)
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let seconds = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "BANANA_REQUEST_TIMEOUT",
            value: raw.to_string(),
            expected: "seconds as a number",
        })?;
    Ok(Duration::from_secs_f64(
        seconds.clamp(MIN_TIMEOUT_S, MAX_TIMEOUT_S),
    ))
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("nano-banana"))
        .unwrap_or_else(|| PathBuf::from(".nano-banana"))
        .join("history.json")
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
