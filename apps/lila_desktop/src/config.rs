use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "lila.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub log_filter: String,
    pub operation_timeout_secs: Option<u64>,
    pub window_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "ws://127.0.0.1:9892/eel".into(),
            log_filter: "info".into(),
            operation_timeout_secs: None,
            window_title: "Lila".into(),
        }
    }
}

impl Settings {
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_url: Option<String>,
    log_filter: Option<String>,
    operation_timeout_secs: Option<u64>,
    window_title: Option<String>,
}

/// Defaults, then the config file, then environment overrides.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => {
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        Err(err) if config_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |name| std::env::var(name).ok());
    settings.backend_url = normalize_backend_url(&settings.backend_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.backend_url {
        settings.backend_url = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.operation_timeout_secs {
        settings.operation_timeout_secs = Some(v);
    }
    if let Some(v) = file_cfg.window_title {
        settings.window_title = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("LILA_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = var("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = var("APP__OPERATION_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.operation_timeout_secs = Some(parsed);
        }
    }
}

/// Accepts `ws(s)://` as-is and maps `http(s)://` onto the websocket scheme.
pub fn normalize_backend_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Settings::default().backend_url);
    }

    if raw.starts_with("ws://") || raw.starts_with("wss://") {
        Ok(raw.to_string())
    } else if raw.starts_with("https://") {
        Ok(raw.replacen("https://", "wss://", 1))
    } else if raw.starts_with("http://") {
        Ok(raw.replacen("http://", "ws://", 1))
    } else {
        Err(anyhow!(
            "backend url must start with ws://, wss://, http:// or https://: {raw}"
        ))
    }
}
