use std::path::PathBuf;
use std::time::Duration;
use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;
const MIN_INTERVAL_FLOOR_MS: u64 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_VIEWPORT_PADDING: f64 = 0.5;
const DEFAULT_VIEWPORT_MIN_SPAN: f64 = 0.05;
const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 200;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub geocoder_endpoint: String,
    pub geocoder_api_key: Option<SecretString>,
    pub geocoder_user_agent: String,
    pub geocoder_min_interval_ms: u64,
    pub geocoder_timeout_secs: u64,
    pub viewport_padding: f64,
    pub viewport_min_span: f64,
    pub diagnostics_capacity: usize,
    pub diagnostics_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub geocoder_endpoint: String,
    pub geocoder_user_agent: String,
    pub geocoder_min_interval_ms: u64,
    pub geocoder_timeout_secs: u64,
    pub viewport_padding: f64,
    pub viewport_min_span: f64,
    pub diagnostics_capacity: usize,
    pub has_geocoder_api_key: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            geocoder_endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            geocoder_api_key: None,
            geocoder_user_agent: default_user_agent(),
            geocoder_min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            geocoder_timeout_secs: DEFAULT_TIMEOUT_SECS,
            viewport_padding: DEFAULT_VIEWPORT_PADDING,
            viewport_min_span: DEFAULT_VIEWPORT_MIN_SPAN,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            diagnostics_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            geocoder_endpoint: env::var("GEOCODER_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEOCODER_ENDPOINT.to_string()),
            geocoder_api_key: env::var("GEOCODER_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(default_user_agent),
            geocoder_min_interval_ms: parse_u64("GEOCODER_MIN_INTERVAL_MS", DEFAULT_MIN_INTERVAL_MS)
                .max(MIN_INTERVAL_FLOOR_MS),
            geocoder_timeout_secs: parse_u64("GEOCODER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS).max(1),
            viewport_padding: parse_f64("VIEWPORT_PADDING", DEFAULT_VIEWPORT_PADDING).max(0.0),
            viewport_min_span: positive_or(
                parse_f64("VIEWPORT_MIN_SPAN", DEFAULT_VIEWPORT_MIN_SPAN),
                DEFAULT_VIEWPORT_MIN_SPAN,
            ),
            diagnostics_capacity: parse_usize(
                "DIAGNOSTICS_CAPACITY",
                DEFAULT_DIAGNOSTICS_CAPACITY,
            )
            .max(1),
            diagnostics_file: env::var("DIAGNOSTICS_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.geocoder_min_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder_timeout_secs)
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            geocoder_endpoint: self.geocoder_endpoint.clone(),
            geocoder_user_agent: self.geocoder_user_agent.clone(),
            geocoder_min_interval_ms: self.geocoder_min_interval_ms,
            geocoder_timeout_secs: self.geocoder_timeout_secs,
            viewport_padding: self.viewport_padding,
            viewport_min_span: self.viewport_min_span,
            diagnostics_capacity: self.diagnostics_capacity,
            has_geocoder_api_key: self.geocoder_api_key.is_some(),
        }
    }
}

fn default_user_agent() -> String {
    format!("property-locator/{}", env!("CARGO_PKG_VERSION"))
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        default
    }
}
