use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use session_core::{
    controller::{DEFAULT_BASE_PERIOD, DEFAULT_SIM_SPEED},
    DEFAULT_REQUEST_TIMEOUT,
};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub base_period_ms: u64,
    pub request_timeout_ms: u64,
    pub sim_speed: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            base_period_ms: DEFAULT_BASE_PERIOD.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            sim_speed: DEFAULT_SIM_SPEED,
        }
    }
}

impl Settings {
    pub fn base_period(&self) -> Duration {
        Duration::from_millis(self.base_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    base_period_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    sim_speed: Option<f64>,
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.base_period_ms {
        settings.base_period_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = v;
    }
    if let Some(v) = file_cfg.sim_speed {
        settings.sim_speed = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SIM_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__BASE_PERIOD_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.base_period_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_ms = parsed;
        }
    }
    if let Some(v) = lookup("APP__SIM_SPEED") {
        if let Ok(parsed) = v.parse::<f64>() {
            settings.sim_speed = parsed;
        }
    }
}

pub fn normalize_server_url(raw_server_url: &str) -> anyhow::Result<String> {
    let raw_server_url = raw_server_url.trim();
    if raw_server_url.is_empty() {
        return Ok(Settings::default().server_url);
    }

    let with_scheme = if raw_server_url.contains("://") {
        raw_server_url.to_string()
    } else {
        format!("http://{raw_server_url}")
    };
    let parsed = Url::parse(&with_scheme)
        .map_err(|err| anyhow!("invalid server url '{raw_server_url}': {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("server url must use http or https, got '{raw_server_url}'");
    }
    Ok(with_scheme.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
