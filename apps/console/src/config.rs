use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use client_core::{api::normalize_base_url, PageSize};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleSettings {
    pub api_base_url: String,
    pub login_provider: String,
    pub default_page_size: PageSize,
    pub request_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".into(),
            login_provider: "github".into(),
            default_page_size: PageSize::default(),
            request_timeout_secs: Some(30),
            log_level: "info".into(),
        }
    }
}

impl ConsoleSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Keys accepted in `console.toml`.
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    login_provider: Option<String>,
    default_page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    log_level: Option<String>,
}

/// Settings plus the values that were ignored while loading them. Logging is
/// not up yet at that point, so the caller reports these afterwards.
#[derive(Debug, Default)]
pub struct LoadedSettings {
    pub settings: ConsoleSettings,
    pub warnings: Vec<String>,
}

/// Defaults, then the config file, then the environment.
///
/// A missing file is only an error when `path` was given explicitly.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<LoadedSettings> {
    let mut loaded = LoadedSettings::default();

    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    match fs::read_to_string(file) {
        Ok(raw) => apply_file(&mut loaded, &raw)
            .with_context(|| format!("invalid config file '{}'", file.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound && path.is_none() => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", file.display()))
        }
    }

    apply_env(&mut loaded, |key| std::env::var(key).ok());
    Ok(loaded)
}

fn apply_file(loaded: &mut LoadedSettings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    let settings = &mut loaded.settings;

    if let Some(v) = file.api_base_url {
        settings.api_base_url = normalize_base_url(&v);
    }
    if let Some(v) = file.login_provider {
        settings.login_provider = v;
    }
    if let Some(v) = file.default_page_size {
        match PageSize::try_from(v) {
            Ok(size) => settings.default_page_size = size,
            Err(err) => loaded.warnings.push(format!("default_page_size: {err}")),
        }
    }
    if let Some(v) = file.request_timeout_secs {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = file.log_level {
        settings.log_level = v;
    }
    Ok(())
}

fn apply_env(loaded: &mut LoadedSettings, var: impl Fn(&str) -> Option<String>) {
    let settings = &mut loaded.settings;

    if let Some(v) = var("ISP_CONSOLE_API_BASE_URL") {
        settings.api_base_url = normalize_base_url(&v);
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = normalize_base_url(&v);
    }

    if let Some(v) = var("APP__LOGIN_PROVIDER") {
        settings.login_provider = v;
    }

    if let Some(v) = var("APP__DEFAULT_PAGE_SIZE") {
        match v.trim().parse::<u32>().map(PageSize::try_from) {
            Ok(Ok(size)) => settings.default_page_size = size,
            Ok(Err(err)) => loaded
                .warnings
                .push(format!("APP__DEFAULT_PAGE_SIZE: {err}")),
            Err(_) => loaded
                .warnings
                .push(format!("APP__DEFAULT_PAGE_SIZE: '{v}' is not a number")),
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(secs) => settings.request_timeout_secs = Some(secs),
            Err(_) => loaded
                .warnings
                .push(format!("APP__REQUEST_TIMEOUT_SECS: '{v}' is not a number")),
        }
    }

    if let Some(v) = var("APP__LOG_LEVEL") {
        settings.log_level = v;
    }
}
