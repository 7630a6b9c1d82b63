use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Feature toggles for a single send. Snapshotted by the caller and passed
/// into the processing code; nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseConfig {
    pub is_assistant_enabled: bool,
    pub is_text_to_speech_enabled: bool,
    pub is_rag_enabled: bool,
    pub model: String,
    pub voice: String,
    pub top_k: u32,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            is_assistant_enabled: false,
            is_text_to_speech_enabled: false,
            is_rag_enabled: false,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            top_k: 5,
        }
    }
}

/// Settings loaded from ~/.config/chat-assistant/settings.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Base URL of the chat backend, e.g. http://localhost:3000
    pub backend_url: String,
    pub user_email: String,
    /// Directory where synthesized audio clips are written
    pub audio_dir: Option<PathBuf>,
    pub response: ResponseConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            user_email: String::new(),
            audio_dir: None,
            response: ResponseConfig::default(),
        }
    }
}

/// Get the configuration directory, creating it if needed
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home.join(".config").join("chat-assistant");
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

impl Settings {
    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_dir()?.join("settings.json");
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        if let Some(resolved) = substitute_env_vars(&settings.backend_url) {
            settings.backend_url = resolved;
        }
        if let Some(resolved) = substitute_env_vars(&settings.user_email) {
            settings.user_email = resolved;
        }

        Ok(settings)
    }
}

/// Replace `${VAR}` references with environment values. Returns `None` when
/// nothing was substituted or a referenced variable is unset.
fn substitute_env_vars(input: &str) -> Option<String> {
    let mut result = input.to_string();
    let mut changed = false;
    while let Some(start) = result.find("${") {
        let end = result[start..].find('}')?;
        let end = start + end;
        let var_name = &result[start + 2..end];
        let var_value = std::env::var(var_name).ok()?;
        result.replace_range(start..=end, &var_value);
        changed = true;
    }

    if changed {
        Some(result)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.backend_url, "http://localhost:3000");
        assert_eq!(settings.response, ResponseConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"userEmail": "a@b.c", "response": {{"isTextToSpeechEnabled": true, "topK": 3}}}}"#
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.user_email, "a@b.c");
        assert!(settings.response.is_text_to_speech_enabled);
        assert!(!settings.response.is_assistant_enabled);
        assert_eq!(settings.response.top_k, 3);
        assert_eq!(settings.response.voice, "alloy");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("CHAT_ASSISTANT_TEST_HOST", "example.org");
        assert_eq!(
            substitute_env_vars("https://${CHAT_ASSISTANT_TEST_HOST}/api").as_deref(),
            Some("https://example.org/api")
        );
        assert_eq!(substitute_env_vars("plain"), None);
        assert_eq!(substitute_env_vars("${CHAT_ASSISTANT_UNSET_VAR_XYZ}"), None);
    }
}
