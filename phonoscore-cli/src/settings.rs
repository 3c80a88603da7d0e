//! Persistent CLI settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use phonoscore_core::{DecisionPolicy, EngineConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_STT_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_STT_MODEL: &str = "whisper-1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    /// CMUdict-format file. Required for scoring; usually given once here.
    pub dictionary_path: Option<PathBuf>,
    /// Directory of `<word>.wav` reference recordings.
    pub reference_dir: Option<PathBuf>,
    pub tolerance_factor: f64,
    pub alignment_ceiling: f64,
    /// 0 disables silence trimming.
    pub silence_threshold: f32,
    pub stt_url: String,
    pub stt_model: String,
    pub stt_api_key: Option<String>,
    pub stt_timeout_secs: u64,
    pub language_hint: String,
    pub history_enabled: bool,
    pub retention_days: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        let policy = DecisionPolicy::default();
        Self {
            dictionary_path: None,
            reference_dir: None,
            tolerance_factor: policy.tolerance_factor,
            alignment_ceiling: policy.alignment_ceiling,
            silence_threshold: 0.01,
            stt_url: DEFAULT_STT_URL.into(),
            stt_model: DEFAULT_STT_MODEL.into(),
            stt_api_key: None,
            stt_timeout_secs: 20,
            language_hint: "en".into(),
            history_enabled: true,
            retention_days: 90,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        if !self.tolerance_factor.is_finite() {
            self.tolerance_factor = DecisionPolicy::default().tolerance_factor;
        }
        self.tolerance_factor = self.tolerance_factor.clamp(0.0, 4.0);
        if !self.alignment_ceiling.is_finite() {
            self.alignment_ceiling = DecisionPolicy::default().alignment_ceiling;
        }
        self.alignment_ceiling = self.alignment_ceiling.clamp(1.0, 1.0e6);
        self.silence_threshold = self.silence_threshold.clamp(0.0, 0.5);
        self.stt_url = normalize_or(&self.stt_url, DEFAULT_STT_URL);
        self.stt_model = normalize_or(&self.stt_model, DEFAULT_STT_MODEL);
        self.language_hint = normalize_language_hint(&self.language_hint);
        self.stt_api_key = self
            .stt_api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.stt_timeout_secs = self.stt_timeout_secs.clamp(1, 300);
        self.retention_days = self.retention_days.clamp(1, 3650);
    }

    /// Environment wins over the file for the STT endpoint and key.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("PHONOSCORE_STT_API_KEY") {
            self.stt_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("PHONOSCORE_STT_URL") {
            self.stt_url = url;
        }
        self.normalize();
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            silence_threshold: (self.silence_threshold > 0.0).then_some(self.silence_threshold),
            decision: DecisionPolicy {
                tolerance_factor: self.tolerance_factor,
                alignment_ceiling: self.alignment_ceiling,
                ..defaults.decision
            },
            ..defaults
        }
    }
}

fn normalize_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.into()
    } else {
        trimmed.into()
    }
}

pub fn normalize_language_hint(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "en" | "eng" | "english" => "en".into(),
        "auto" => "auto".into(),
        other => other.into(),
    }
}

pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Phonoscore")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("phonoscore")
    }
}

pub fn default_settings_path() -> PathBuf {
    default_data_dir().join("settings.json")
}

pub fn default_db_path() -> PathBuf {
    default_data_dir().join("history.sqlite3")
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
