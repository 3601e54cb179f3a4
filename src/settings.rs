use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::dispatch::{ClickAction, ClickRegion, Rect};
use crate::gesture::{ClassifierConfig, Viewport};
use crate::modes::{DrawConfig, ZoomConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    pub activation_threshold_ms: u64,
    pub poll_interval_ms: u64,
    pub detect_timeout_ms: u64,
    pub classifier_retry_attempts: u32,
    pub classifier_retry_delay_ms: u64,
    pub viewport: Viewport,
    pub classifier: ClassifierConfig,
    pub draw: DrawConfig,
    pub zoom: ZoomConfig,
    pub click_targets: Vec<ClickRegion>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let viewport = Viewport::default();
        Self {
            activation_threshold_ms: 500,
            poll_interval_ms: 10,
            detect_timeout_ms: 1000,
            classifier_retry_attempts: 3,
            classifier_retry_delay_ms: 1000,
            viewport,
            classifier: ClassifierConfig::default(),
            draw: DrawConfig::default(),
            zoom: ZoomConfig::default(),
            click_targets: vec![ClickRegion {
                id: "detection-toggle".into(),
                rect: Rect {
                    x: viewport.width as i32 - 120,
                    y: 20,
                    width: 100,
                    height: 60,
                },
                action: ClickAction::ToggleDetection,
            }],
        }
    }
}

impl PipelineSettings {
    pub fn activation_threshold(&self) -> Duration {
        Duration::from_millis(self.activation_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }

    pub fn classifier_retry_delay(&self) -> Duration {
        Duration::from_millis(self.classifier_retry_delay_ms)
    }
}

/// Pipeline settings backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<PipelineSettings>,
}

impl SettingsStore {
    /// Loads `path` if present. A file that does not parse falls back to
    /// defaults rather than failing startup.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("ignoring malformed settings at {}: {err}", path.display());
                PipelineSettings::default()
            })
        } else {
            PipelineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> PipelineSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: PipelineSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: PipelineSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &PipelineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, PipelineSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, PipelineSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
