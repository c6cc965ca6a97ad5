//! Session state management
//!
//! Defines the session phase machine, the metric counters and the
//! configuration handed to the streaming service on start.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Coarse-grained stage of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No session has been started yet
    Idle,
    /// Start command sent, waiting for the service to announce a phase
    Connecting,
    /// User is holding calibration poses
    Calibrating,
    /// Reps are being counted
    Exercising,
    /// Service reported the training plan finished
    Complete,
    /// Channel lost or session stopped
    Disconnected,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Connecting => "connecting",
            SessionPhase::Calibrating => "calibrating",
            SessionPhase::Exercising => "exercising",
            SessionPhase::Complete => "complete",
            SessionPhase::Disconnected => "disconnected",
        }
    }

    /// Whether a new session may be started from this phase
    pub fn can_start(&self) -> bool {
        matches!(self, SessionPhase::Idle | SessionPhase::Disconnected)
    }

    /// Whether the channel is considered live in this phase
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionPhase::Connecting
                | SessionPhase::Calibrating
                | SessionPhase::Exercising
                | SessionPhase::Complete
        )
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the session flow the service should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Calibration only
    Calibration,
    /// Training with stored calibration
    Training,
    /// Calibration followed by training
    Unified,
}

impl SessionMode {
    /// Whether `phase` can be reached in this mode
    pub fn allows(&self, phase: SessionPhase) -> bool {
        match (self, phase) {
            (SessionMode::Calibration, SessionPhase::Exercising) => false,
            (SessionMode::Training, SessionPhase::Calibrating) => false,
            _ => true,
        }
    }
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::Unified
    }
}

/// Reference to a camera source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CameraRef {
    /// Locally attached device by index
    Physical { index: u32 },
    /// Network stream
    Ip { url: String },
}

/// Camera sources for both views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPair {
    pub front: CameraRef,
    pub profile: CameraRef,
}

impl Default for CameraPair {
    fn default() -> Self {
        Self {
            front: CameraRef::Physical { index: 0 },
            profile: CameraRef::Ip { url: String::new() },
        }
    }
}

/// Configuration for starting a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Camera sources
    pub cameras: CameraPair,

    /// Session flow to run
    pub mode: SessionMode,

    /// Exercise plan, passed through to the service untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
}

/// Form error reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    TrunkTilted,
    ArmNotVertical,
    BothArmsFlexed,
    ConsecutiveSameSide,
    ArmsNotSynchronized,
    ElbowsTooWide,
    IncompleteLockout,
    BackArchExcessive,
    /// Kind this client does not know about
    Other(String),
}

impl ErrorKind {
    /// Wire identifier
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::TrunkTilted => "trunk_tilted",
            ErrorKind::ArmNotVertical => "arm_not_vertical",
            ErrorKind::BothArmsFlexed => "both_arms_flexed",
            ErrorKind::ConsecutiveSameSide => "consecutive_same_side",
            ErrorKind::ArmsNotSynchronized => "arms_not_synchronized",
            ErrorKind::ElbowsTooWide => "elbows_too_wide",
            ErrorKind::IncompleteLockout => "incomplete_lockout",
            ErrorKind::BackArchExcessive => "back_arch_excessive",
            ErrorKind::Other(raw) => raw,
        }
    }

    /// Spoken description used when no phrase override exists
    pub fn default_phrase(&self) -> String {
        let phrase = match self {
            ErrorKind::TrunkTilted => "Keep your back straight",
            ErrorKind::ArmNotVertical => "Keep your arm vertical",
            ErrorKind::BothArmsFlexed => "Don't work both arms at once",
            ErrorKind::ConsecutiveSameSide => "Alternate your arms",
            ErrorKind::ArmsNotSynchronized => "Raise both arms evenly",
            ErrorKind::ElbowsTooWide => "Keep your elbows forward",
            ErrorKind::IncompleteLockout => "Fully straighten your arms at the top",
            ErrorKind::BackArchExcessive => "Don't arch your back",
            ErrorKind::Other(raw) => return raw.replace('_', " "),
        };
        phrase.to_string()
    }
}

impl From<String> for ErrorKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "trunk_tilted" => ErrorKind::TrunkTilted,
            "arm_not_vertical" => ErrorKind::ArmNotVertical,
            "both_arms_flexed" => ErrorKind::BothArmsFlexed,
            "consecutive_same_side" => ErrorKind::ConsecutiveSameSide,
            "arms_not_synchronized" => ErrorKind::ArmsNotSynchronized,
            "elbows_too_wide" => ErrorKind::ElbowsTooWide,
            "incomplete_lockout" => ErrorKind::IncompleteLockout,
            "back_arch_excessive" => ErrorKind::BackArchExcessive,
            _ => ErrorKind::Other(raw),
        }
    }
}

impl From<&str> for ErrorKind {
    fn from(raw: &str) -> Self {
        ErrorKind::from(raw.to_string())
    }
}

impl From<ErrorKind> for String {
    fn from(kind: ErrorKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Rep and error counters for the current session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub right_reps: u32,
    pub left_reps: u32,
    /// Error kinds that already triggered a spoken cue
    pub errors_seen: BTreeSet<ErrorKind>,
}

/// What changed after applying a metric update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsDelta {
    pub right_increased: bool,
    pub left_increased: bool,
    /// Kinds seen for the first time, in update order
    pub new_errors: Vec<ErrorKind>,
}

impl Metrics {
    /// Fold an inbound update into the counters.
    ///
    /// Counts only move forward on a strict increase, so a re-delivered value
    /// produces an empty delta. A lower count means the service restarted the
    /// set and becomes the new baseline, so a stale value redelivered out of
    /// order (2, 1, 2) plays one extra tone.
    pub fn apply(&mut self, right_reps: u32, left_reps: u32, errors: &[ErrorKind]) -> MetricsDelta {
        let mut delta = MetricsDelta::default();

        if right_reps > self.right_reps {
            delta.right_increased = true;
        }
        self.right_reps = right_reps;

        if left_reps > self.left_reps {
            delta.left_increased = true;
        }
        self.left_reps = left_reps;

        for kind in errors {
            if self.errors_seen.insert(kind.clone()) {
                delta.new_errors.push(kind.clone());
            }
        }

        delta
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Position within the training plan, as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingProgress {
    /// Display name of the current exercise
    pub current_exercise: Option<String>,
    /// Exercise identifier, e.g. `bicep_curl`
    pub current_exercise_type: Option<String>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub target_reps: u32,
    pub exercise_index: u32,
    pub total_exercises: u32,
}

/// Final rep totals reported at the end of training
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingTotals {
    #[serde(alias = "total_right_reps")]
    pub total_right_reps: u32,
    #[serde(alias = "total_left_reps")]
    pub total_left_reps: u32,
}
