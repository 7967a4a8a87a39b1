use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_SETTINGS_FILE: &str = "backoffice.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub admin_token: Option<String>,
    pub request_timeout_secs: u64,
    pub success_reset_ms: u64,
    pub confirm_reorder_with_refetch: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000/api".into(),
            admin_token: None,
            request_timeout_secs: 10,
            success_reset_ms: 2000,
            confirm_reorder_with_refetch: false,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn success_reset_delay(&self) -> Duration {
        Duration::from_millis(self.success_reset_ms)
    }

    /// Base URL with a trailing slash so relative joins keep the `/api` prefix.
    pub fn base_url(&self) -> ClientResult<url::Url> {
        let raw = self.api_base_url.trim();
        let normalized = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        url::Url::parse(&normalized)
            .map_err(|e| ClientError::Config(format!("api_base_url '{raw}': {e}")))
    }
}

/// Defaults, then `backoffice.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unreadable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("api_base_url").and_then(|v| v.as_str()) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("admin_token").and_then(|v| v.as_str()) {
        settings.admin_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("request_timeout_secs").and_then(|v| v.as_integer()) {
        if let Ok(v) = u64::try_from(v) {
            settings.request_timeout_secs = v;
        }
    }
    if let Some(v) = file_cfg.get("success_reset_ms").and_then(|v| v.as_integer()) {
        if let Ok(v) = u64::try_from(v) {
            settings.success_reset_ms = v;
        }
    }
    if let Some(v) = file_cfg
        .get("confirm_reorder_with_refetch")
        .and_then(|v| v.as_bool())
    {
        settings.confirm_reorder_with_refetch = v;
    }
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("ADMIN_TOKEN") {
        settings.admin_token = Some(v);
    }
    if let Some(v) = var("APP__ADMIN_TOKEN") {
        settings.admin_token = Some(v);
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
    if let Some(v) = var("APP__SUCCESS_RESET_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.success_reset_ms = parsed;
        }
    }
    if let Some(v) = var("APP__CONFIRM_REORDER_WITH_REFETCH") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.confirm_reorder_with_refetch = parsed;
        }
    }
}
