use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::timer::state::DEFAULT_COUNTDOWN_SECS;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundSettings {
    /// Audio file to ring instead of the bundled bell.
    pub path: Option<PathBuf>,
    pub volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            path: None,
            volume: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    pub sound: SoundSettings,
    pub countdown_secs: u32,
    pub keep_awake: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            sound: SoundSettings::default(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            keep_awake: true,
        }
    }
}

impl UserSettings {
    fn normalized(mut self) -> Self {
        self.sound.volume = if self.sound.volume.is_finite() {
            self.sound.volume.clamp(0.0, 1.0)
        } else {
            SoundSettings::default().volume
        };
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// `settings.json` under the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("no config directory on this platform")?;
        Ok(dir.join("trance-bell").join("settings.json"))
    }

    /// A missing or malformed file yields defaults; the file is only written
    /// by [`SettingsStore::update`].
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("ignoring malformed settings {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data.normalized()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> UserSettings {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The stored settings with `change` applied for this run only. Goes
    /// through the same clamping as [`SettingsStore::update`] but writes
    /// nothing.
    pub fn with_overrides(&self, change: impl FnOnce(&mut UserSettings)) -> UserSettings {
        let mut next = self.settings();
        change(&mut next);
        next.normalized()
    }

    pub fn update(&self, change: impl FnOnce(&mut UserSettings)) -> Result<UserSettings> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut next = guard.clone();
        change(&mut next);
        let next = next.normalized();
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let settings = store.settings();
        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.countdown_secs, 10);
        assert!(settings.sound.path.is_none());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .update(|s| {
                s.countdown_secs = 3;
                s.sound.path = Some("/tmp/bowl.wav".into());
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap().settings();
        assert_eq!(reloaded.countdown_secs, 3);
        assert_eq!(reloaded.sound.path, Some(PathBuf::from("/tmp/bowl.wav")));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "countdown_secs": 5 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().settings();
        assert_eq!(settings.countdown_secs, 5);
        assert_eq!(settings.sound, SoundSettings::default());
        assert!(settings.keep_awake);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), UserSettings::default());
    }

    #[test]
    fn volume_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "sound": { "volume": 4.0 } }"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings().sound.volume, 1.0);

        let updated = store.update(|s| s.sound.volume = -1.0).unwrap();
        assert_eq!(updated.sound.volume, 0.0);
    }

    #[test]
    fn overrides_are_clamped_but_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let run = store.with_overrides(|s| s.sound.volume = f32::NAN);
        assert_eq!(run.sound.volume, 0.8);

        let run = store.with_overrides(|s| s.sound.volume = 2.5);
        assert_eq!(run.sound.volume, 1.0);

        assert!(!path.exists());
        assert_eq!(store.settings(), UserSettings::default());
    }
}
