//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default technique and duration, and how often progress is written
//! - Backing track volume, mute state and default track
//! - Which progress backend to use
//! - Technique and duration overrides for the catalog
//!
//! Configuration is stored at `~/.config/breathwork/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::catalog::{builtin_durations, builtin_techniques, Catalog, DurationOption, TechniqueSpec};
use crate::error::{CatalogError, ConfigError, Result};

/// Session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_technique")]
    pub default_technique: String,
    /// Minutes value of a catalog duration option.
    #[serde(default = "default_duration")]
    pub default_duration: u32,
    /// Persist elapsed time every N ticks.
    #[serde(default = "default_persist_every")]
    pub persist_every_ticks: u32,
}

/// Backing track configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
    /// URL or file path of the track to play.
    #[serde(default)]
    pub default_track: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Sqlite,
    Http,
}

/// Progress backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: PersistenceBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the bearer token for the HTTP backend.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/breathwork/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Replaces the built-in techniques when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub techniques: Vec<TechniqueSpec>,
    /// Replaces the built-in duration options when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub durations: Vec<DurationOption>,
}

fn default_technique() -> String {
    "box".into()
}
fn default_duration() -> u32 {
    2
}
fn default_persist_every() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_volume() -> f32 {
    0.3
}
fn default_token_env() -> String {
    "BREATHWORK_TOKEN".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_technique: default_technique(),
            default_duration: default_duration(),
            persist_every_ticks: default_persist_every(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
            muted: false,
            default_track: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Sqlite,
            base_url: None,
            token_env: default_token_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            audio: AudioConfig::default(),
            persistence: PersistenceConfig::default(),
            techniques: Vec::new(),
            durations: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dotted key in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit it.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a value by dotted key, validate the result and save.
    ///
    /// Nothing changes, in memory or on disk, when validation fails.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.clone();
        next.apply(key, value)?;
        next.validate()?;
        next.save()?;
        *self = next;
        Ok(())
    }

    /// Build the catalog and check that the session defaults name entries
    /// in it.
    pub fn validate(&self) -> Result<Catalog> {
        let catalog = self.catalog()?;
        if catalog.technique(&self.session.default_technique).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "session.default_technique".into(),
                message: format!("unknown technique: {}", self.session.default_technique),
            }
            .into());
        }
        if catalog.duration(self.session.default_duration).is_none() {
            return Err(ConfigError::InvalidValue {
                key: "session.default_duration".into(),
                message: format!("no {}-minute duration option", self.session.default_duration),
            }
            .into());
        }
        Ok(catalog)
    }

    /// Build the technique catalog, substituting built-ins for empty lists.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure among the overrides.
    pub fn catalog(&self) -> Result<Catalog, CatalogError> {
        if self.techniques.is_empty() && self.durations.is_empty() {
            return Ok(Catalog::builtin());
        }
        let techniques = if self.techniques.is_empty() {
            builtin_techniques()
        } else {
            self.techniques.clone()
        };
        let durations = if self.durations.is_empty() {
            builtin_durations()
        } else {
            self.durations.clone()
        };
        Catalog::new(techniques, durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.session.default_technique, "box");
        assert_eq!(parsed.audio.volume, 0.3);
        assert_eq!(parsed.persistence.backend, PersistenceBackend::Sqlite);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.default_duration").as_deref(), Some("2"));
        assert_eq!(cfg.get("persistence.backend").as_deref(), Some("sqlite"));
        assert_eq!(cfg.get("audio.muted").as_deref(), Some("false"));
        assert!(cfg.get("audio.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("audio.volume", "0.75").unwrap();
        cfg.apply("audio.muted", "true").unwrap();
        cfg.apply("session.persist_every_ticks", "5").unwrap();
        cfg.apply("persistence.backend", "http").unwrap();
        cfg.apply("persistence.base_url", "https://api.example.com").unwrap();
        assert_eq!(cfg.audio.volume, 0.75);
        assert!(cfg.audio.muted);
        assert_eq!(cfg.session.persist_every_ticks, 5);
        assert_eq!(cfg.persistence.backend, PersistenceBackend::Http);
        assert_eq!(cfg.persistence.base_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn apply_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("audio.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.apply("audio.muted", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("persistence.backend", "carrier-pigeon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg.persistence.backend, PersistenceBackend::Sqlite);
    }

    #[test]
    fn load_from_writes_defaults_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.session.default_duration, 2);
        assert!(path.exists());

        let mut cfg = cfg;
        cfg.apply("session.default_technique", "478").unwrap();
        cfg.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.session.default_technique, "478");
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = 12").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn technique_overrides_build_catalog() {
        let toml_str = r#"
            [[techniques]]
            id = "coherent"
            name = "Coherent Breathing"
            phases = ["Inhale", "Exhale"]
            durations = [5, 5]

            [[durations]]
            minutes = 5
            cycles = 30
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        let catalog = cfg.catalog().unwrap();
        assert_eq!(catalog.techniques().len(), 1);
        assert_eq!(catalog.default_technique().cycle_secs(), 10);
        assert_eq!(catalog.durations().len(), 1);
        assert_eq!(catalog.default_duration().cycles, 30);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let toml_str = r#"
            [[techniques]]
            id = "broken"
            name = "Broken"
            phases = ["Inhale"]
            durations = [4]
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            cfg.catalog(),
            Err(CatalogError::TooFewPhases { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_session_defaults() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());

        cfg.apply("session.default_technique", "missing").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "session.default_technique"
        ));

        let mut cfg = Config::default();
        cfg.apply("session.default_duration", "4").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(CoreError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "session.default_duration"
        ));
    }

    #[test]
    fn validate_checks_defaults_against_overrides() {
        let mut cfg = Config::default();
        cfg.durations = vec![DurationOption {
            minutes: 4,
            cycles: 15,
        }];
        cfg.session.default_duration = 4;
        assert_eq!(cfg.validate().unwrap().durations().len(), 1);
    }
}
