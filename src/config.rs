use crate::defaults;
use crate::error::{CloneVoiceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub voice: VoiceConfig,
    pub session: SessionConfig,
}

/// Remote assistant backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub user_name: String,
}

/// Speech engine preferences
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub locale: String,
    pub greeting: String,
}

/// Turn-taking timings and canned replies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub speech_settle_ms: u64,
    pub capture_restart_ms: u64,
    pub apology: String,
    pub not_understood: String,
    pub persona_history: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: defaults::API_URL.to_string(),
            token: None,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            user_name: defaults::USER_NAME.to_string(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: defaults::LOCALE.to_string(),
            greeting: defaults::GREETING.to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speech_settle_ms: defaults::SPEECH_SETTLE_MS,
            capture_restart_ms: defaults::CAPTURE_RESTART_MS,
            apology: defaults::APOLOGY.to_string(),
            not_understood: defaults::NOT_UNDERSTOOD.to_string(),
            persona_history: defaults::PERSONA_HISTORY,
        }
    }
}

impl SessionConfig {
    pub fn speech_settle(&self) -> Duration {
        Duration::from_millis(self.speech_settle_ms)
    }

    pub fn capture_restart(&self) -> Duration {
        Duration::from_millis(self.capture_restart_ms)
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CloneVoiceError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CloneVoiceError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CloneVoiceError::ConfigFileNotFound { .. }) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_display_toml()?)?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CLONEVOICE_API_URL → backend.url
    /// - CLONEVOICE_TOKEN → backend.token
    /// - CLONEVOICE_LOCALE → voice.locale
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CLONEVOICE_API_URL")
            && !url.is_empty()
        {
            self.backend.url = url;
        }

        if let Ok(token) = std::env::var("CLONEVOICE_TOKEN")
            && !token.is_empty()
        {
            self.backend.token = Some(token);
        }

        if let Ok(locale) = std::env::var("CLONEVOICE_LOCALE")
            && !locale.is_empty()
        {
            self.voice.locale = locale;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/clonevoice/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clonevoice")
            .join("config.toml")
    }

    /// Render the full configuration as TOML.
    pub fn to_display_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read a value by dotted key path (e.g. `backend.url`).
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self)?;
        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| CloneVoiceError::ConfigUnknownKey {
                    key: key.to_string(),
                })?;
        }
        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Return a copy with the value at `key` replaced.
    ///
    /// The new value is parsed with the type of the existing one, so
    /// `session.speech_settle_ms = "abc"` is rejected. Unset optional
    /// values (such as `backend.token`) accept strings.
    pub fn with_value_by_path(&self, key: &str, value: &str) -> Result<Self> {
        let (section, field) =
            key.split_once('.')
                .ok_or_else(|| CloneVoiceError::ConfigUnknownKey {
                    key: key.to_string(),
                })?;

        let mut root = toml::Value::try_from(self)?;
        let table = root
            .get_mut(section)
            .and_then(|v| v.as_table_mut())
            .ok_or_else(|| CloneVoiceError::ConfigUnknownKey {
                key: key.to_string(),
            })?;

        let parsed = match table.get(field) {
            Some(toml::Value::Integer(_)) => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| CloneVoiceError::ConfigInvalidValue {
                        key: key.to_string(),
                        message: format!("expected an integer, got '{value}'"),
                    })?;
                toml::Value::Integer(n)
            }
            Some(toml::Value::Boolean(_)) => {
                let b: bool = value
                    .parse()
                    .map_err(|_| CloneVoiceError::ConfigInvalidValue {
                        key: key.to_string(),
                        message: format!("expected true or false, got '{value}'"),
                    })?;
                toml::Value::Boolean(b)
            }
            Some(_) => toml::Value::String(value.to_string()),
            None if Self::is_optional_key(key) => toml::Value::String(value.to_string()),
            None => {
                return Err(CloneVoiceError::ConfigUnknownKey {
                    key: key.to_string(),
                });
            }
        };
        table.insert(field.to_string(), parsed);

        let updated: Config = root
            .try_into()
            .map_err(|e: toml::de::Error| CloneVoiceError::ConfigInvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(updated)
    }

    /// Load (or default) the file at `path`, set one value and write it back.
    pub fn set_value_by_path(path: &Path, key: &str, value: &str) -> Result<()> {
        let config = Self::load_or_default(path)?.with_value_by_path(key, value)?;
        config.save(path)
    }

    fn is_optional_key(key: &str) -> bool {
        key == "backend.token"
    }
}
