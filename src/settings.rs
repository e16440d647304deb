//! Persisted tracking preferences.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::storage::{keys, Record, SharedStore};
use crate::types::LocationSettings;

impl Record for LocationSettings {
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LegacySettings {
            tracking_enabled: Option<bool>,
            path_recording: Option<bool>,
        }

        let legacy: LegacySettings = serde_json::from_value(value)?;
        let defaults = LocationSettings::default();
        Ok(LocationSettings {
            tracking_enabled: legacy.tracking_enabled.unwrap_or(defaults.tracking_enabled),
            path_recording: legacy.path_recording.unwrap_or(defaults.path_recording),
        })
    }
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub tracking_enabled: Option<bool>,
    pub path_recording: Option<bool>,
}

#[derive(Clone)]
pub struct SettingsStore {
    store: SharedStore,
}

impl SettingsStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn get(&self) -> LocationSettings {
        self.store.load(keys::SETTINGS)
    }

    /// Merge `patch` into the stored settings and return the result.
    pub fn update(&self, patch: SettingsPatch) -> Result<LocationSettings> {
        self.store
            .update(keys::SETTINGS, |settings: &mut LocationSettings| {
                let before = *settings;
                if let Some(enabled) = patch.tracking_enabled {
                    settings.tracking_enabled = enabled;
                }
                if let Some(recording) = patch.path_recording {
                    settings.path_recording = recording;
                }
                (*settings, *settings != before)
            })
    }
}
