//! Persisted training preferences
//!
//! Exercise selection and order, reps, rounds and camera choices as saved by
//! the setup screen. The coordinator never reads this file; the host resolves
//! it into a [`SessionConfig`] before starting a session.

use super::ConfigError;
use crate::session::state::{CameraPair, CameraRef, SessionConfig, SessionMode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DEFAULT_REPS: u32 = 10;
const DEFAULT_ROUNDS: u32 = 3;

/// Camera choice as stored by the setup form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CameraSetting {
    Physical(u32),
    Ip(String),
}

impl CameraSetting {
    fn resolve(&self, view: &str) -> Result<CameraRef, ConfigError> {
        match self {
            CameraSetting::Physical(index) => Ok(CameraRef::Physical { index: *index }),
            CameraSetting::Ip(url) if url.trim().is_empty() => Err(ConfigError::Invalid(
                format!("{} camera stream URL is empty", view),
            )),
            CameraSetting::Ip(url) => Ok(CameraRef::Ip {
                url: url.trim().to_string(),
            }),
        }
    }
}

/// Camera choices for both views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub front: CameraSetting,
    pub profile: CameraSetting,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            front: CameraSetting::Physical(0),
            profile: CameraSetting::Ip(String::new()),
        }
    }
}

/// Saved training setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingPreferences {
    /// Exercise identifiers in the order they are performed
    pub exercises: Vec<String>,

    /// Target reps per exercise
    pub reps_per_exercise: BTreeMap<String, u32>,

    /// Older single target applied to every exercise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps_per_set: Option<u32>,

    pub rounds: u32,

    pub camera_settings: CameraSettings,

    /// Recalibrate even if stored calibration exists
    pub force_calibration: bool,
}

impl Default for TrainingPreferences {
    fn default() -> Self {
        Self {
            exercises: vec!["bicep_curl".to_string(), "overhead_press".to_string()],
            reps_per_exercise: BTreeMap::new(),
            reps_per_set: None,
            rounds: DEFAULT_ROUNDS,
            camera_settings: CameraSettings::default(),
            force_calibration: false,
        }
    }
}

impl TrainingPreferences {
    /// Read preferences, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let preferences: TrainingPreferences = serde_json::from_str(&content)?;
        Ok(preferences)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!("Saved training preferences to {:?}", path);
        Ok(())
    }

    /// Target reps for an exercise
    pub fn reps_for(&self, exercise: &str) -> u32 {
        self.reps_per_exercise
            .get(exercise)
            .copied()
            .or(self.reps_per_set)
            .unwrap_or(DEFAULT_REPS)
    }

    /// Move an exercise from one position to another
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ConfigError> {
        if from >= self.exercises.len() || to >= self.exercises.len() {
            return Err(ConfigError::Invalid(format!(
                "cannot move exercise {} to {} in a list of {}",
                from,
                to,
                self.exercises.len()
            )));
        }
        let exercise = self.exercises.remove(from);
        self.exercises.insert(to, exercise);
        Ok(())
    }

    /// Build the configuration handed to the coordinator
    pub fn resolve(&self, mode: SessionMode) -> Result<SessionConfig, ConfigError> {
        let cameras = CameraPair {
            front: self.camera_settings.front.resolve("front")?,
            profile: self.camera_settings.profile.resolve("profile")?,
        };

        let plan = match mode {
            SessionMode::Calibration => None,
            SessionMode::Training | SessionMode::Unified => {
                if self.exercises.is_empty() {
                    return Err(ConfigError::Invalid("no exercises selected".to_string()));
                }
                if self.rounds == 0 {
                    return Err(ConfigError::Invalid("rounds must be at least 1".to_string()));
                }

                let reps: BTreeMap<&str, u32> = self
                    .exercises
                    .iter()
                    .map(|e| (e.as_str(), self.reps_for(e)))
                    .collect();

                Some(json!({
                    "exercises": self.exercises,
                    "repsPerExercise": reps,
                    "rounds": self.rounds,
                    "forceCalibration": self.force_calibration,
                }))
            }
        };

        Ok(SessionConfig {
            cameras,
            mode,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn with_ip_profile() -> TrainingPreferences {
        TrainingPreferences {
            camera_settings: CameraSettings {
                front: CameraSetting::Physical(1),
                profile: CameraSetting::Ip("http://192.168.1.20:8080/video".to_string()),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let prefs = TrainingPreferences::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(prefs, TrainingPreferences::default());
    }

    #[test]
    fn test_legacy_reps_per_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(
            &path,
            r#"{
                "exercises": ["bicep_curl"],
                "repsPerSet": 12,
                "rounds": 2,
                "cameraSettings": {
                    "front": { "type": "physical", "value": 0 },
                    "profile": { "type": "ip", "value": "http://cam" }
                }
            }"#,
        )
        .unwrap();

        let prefs = TrainingPreferences::load(&path).unwrap();
        assert_eq!(prefs.reps_for("bicep_curl"), 12);
        assert_eq!(prefs.rounds, 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = with_ip_profile();
        prefs.reps_per_exercise.insert("overhead_press".to_string(), 8);
        prefs.save(&path).unwrap();

        assert_eq!(TrainingPreferences::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_resolve_unified() {
        let mut prefs = with_ip_profile();
        prefs.reps_per_exercise.insert("overhead_press".to_string(), 8);

        let config = prefs.resolve(SessionMode::Unified).unwrap();
        assert_eq!(config.cameras.front, CameraRef::Physical { index: 1 });
        let plan = config.plan.unwrap();
        assert_eq!(plan["repsPerExercise"]["overhead_press"], 8);
        assert_eq!(plan["repsPerExercise"]["bicep_curl"], 10);
        assert_eq!(plan["rounds"], 3);
    }

    #[test]
    fn test_resolve_rejects_empty_ip() {
        let prefs = TrainingPreferences::default();
        assert!(matches!(
            prefs.resolve(SessionMode::Training),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_calibration_mode_has_no_plan() {
        let config = with_ip_profile().resolve(SessionMode::Calibration).unwrap();
        assert!(config.plan.is_none());
    }

    #[test]
    fn test_reorder() {
        let mut prefs = TrainingPreferences::default();
        prefs.reorder(1, 0).unwrap();
        assert_eq!(prefs.exercises, vec!["overhead_press", "bicep_curl"]);
        assert!(prefs.reorder(0, 5).is_err());
    }
}
