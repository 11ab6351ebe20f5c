use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::detection::DEFAULT_SPEED_THRESHOLD;
use crate::hos::{HosLimits, RestWindowPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    pub poll_interval_secs: u64,
    pub tick_interval_ms: u64,
    /// How often a submission parked behind an in-flight one is retried.
    pub retry_interval_ms: u64,
    pub speed_threshold: f64,
    pub auto_status_enabled: bool,
    pub rest_window_policy: RestWindowPolicy,
    pub limits: HosLimits,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            tick_interval_ms: 1000,
            retry_interval_ms: 1000,
            speed_threshold: DEFAULT_SPEED_THRESHOLD,
            auto_status_enabled: true,
            rest_window_policy: RestWindowPolicy::Latched,
            limits: HosLimits::default(),
        }
    }
}

impl EngineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }
}

/// Engine settings backed by a pretty-printed JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    /// Missing or unreadable files fall back to defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                EngineSettings::default()
            })
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineSettings = serde_json::from_str(&contents)?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
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

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join("hos-engine-tests")
            .join(format!("settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path()).unwrap();
        let settings = store.engine();
        assert_eq!(settings.poll_interval_secs, 60);
        assert_eq!(settings.speed_threshold, 5.0);
        assert_eq!(settings.rest_window_policy, RestWindowPolicy::Latched);
        assert_eq!(settings.limits.drive_secs, 28_800);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"pollIntervalSecs": 30, "restWindowPolicy": "continuous"}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().engine();
        assert_eq!(settings.poll_interval_secs, 30);
        assert_eq!(settings.rest_window_policy, RestWindowPolicy::Continuous);
        assert!(settings.auto_status_enabled);
    }

    #[test]
    fn updates_survive_a_reload() {
        let path = temp_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut settings = store.engine();
        settings.auto_status_enabled = false;
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        reopened.reload().unwrap();
        assert_eq!(reopened.engine(), settings);
    }
}
