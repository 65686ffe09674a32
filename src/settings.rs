use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

const DEFAULT_ROSTER: [&str; 8] = [
    "Zhang Wei",
    "Li Na",
    "Wang Feng",
    "Chen Jie",
    "Liu Yang",
    "Zhao Min",
    "Sun Lei",
    "Zhou Hui",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    pub course_name: String,
    pub class_name: String,
}

impl Default for CourseDetails {
    fn default() -> Self {
        Self {
            course_name: "Mathematics 101".into(),
            class_name: "Group A".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordingSettings {
    pub duration_ticks: u32,
    pub tick_ms: u64,
    /// Ticks between two samples; only 1 or 2 keep the payload bounded.
    pub sample_every_ticks: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            duration_ticks: 10,
            tick_ms: 1_000,
            sample_every_ticks: 1,
        }
    }
}

impl RecordingSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Clamps values read from disk into the supported range.
    pub fn normalized(&self) -> Self {
        Self {
            duration_ticks: self.duration_ticks.max(1),
            tick_ms: self.tick_ms.max(1),
            sample_every_ticks: self.sample_every_ticks.clamp(1, 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VisionSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-3-flash-preview".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

impl VisionSettings {
    /// Reads the key from the configured variable, falling back to `API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    course: CourseDetails,
    roster: Vec<String>,
    recording: RecordingSettings,
    vision: VisionSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            course: CourseDetails::default(),
            roster: DEFAULT_ROSTER.iter().map(|name| name.to_string()).collect(),
            recording: RecordingSettings::default(),
            vision: VisionSettings::default(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn course(&self) -> CourseDetails {
        self.read().course.clone()
    }

    pub fn roster_names(&self) -> Vec<String> {
        self.read().roster.clone()
    }

    pub fn recording(&self) -> RecordingSettings {
        self.read().recording.normalized()
    }

    pub fn vision(&self) -> VisionSettings {
        self.read().vision.clone()
    }

    pub fn update_course(&self, course: CourseDetails) -> Result<()> {
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.course = course;
        self.persist(&guard)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserSettings> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
