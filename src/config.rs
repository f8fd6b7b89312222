use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;
use url::Url;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub output_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_analysis_model: String,
    pub gemini_image_model: String,
    pub gemini_temperature: Option<f32>,
    pub gemini_safety_settings: String,
    pub gemini_timeout_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_optional_f32(name: &str) -> Option<f32> {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f32>().ok())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn resolve_api_key() -> String {
    for name in ["GEMINI_API_KEY", "API_KEY"] {
        if let Ok(value) = env::var(name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

fn normalize_base_url(value: String) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let trimmed = if trimmed.is_empty() {
        DEFAULT_GEMINI_BASE_URL
    } else {
        trimmed
    };
    let parsed = Url::parse(trimmed)
        .map_err(|err| anyhow!("Invalid GEMINI_BASE_URL '{trimmed}': {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "GEMINI_BASE_URL must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string("LOG_DIR", "logs")),
            output_dir: PathBuf::from(env_string("OUTPUT_DIR", "output")),
            gemini_api_key: resolve_api_key(),
            gemini_base_url: normalize_base_url(env_string(
                "GEMINI_BASE_URL",
                DEFAULT_GEMINI_BASE_URL,
            ))?,
            gemini_analysis_model: env_string("GEMINI_ANALYSIS_MODEL", "gemini-2.5-flash"),
            gemini_image_model: env_string(
                "GEMINI_IMAGE_MODEL",
                "gemini-2.5-flash-image-preview",
            ),
            gemini_temperature: env_optional_f32("GEMINI_TEMPERATURE"),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 120).max(1),
        })
    }
}
