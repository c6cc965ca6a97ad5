//! Calibration step sequencing
//!
//! Tracks how far the user got through the fixed order of calibration poses.
//! Completed steps are stored as a count into the canonical order, so they
//! are always a prefix of it and the current step is always the next one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a calibration pose
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name, falling back to the raw identifier
    pub fn label(&self) -> String {
        step_label(&self.0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Step id the service sends once every pose has been captured
pub const COMPLETE_STEP: &str = "complete";

/// Poses every calibration runs through
pub const BASE_STEPS: [&str; 5] = [
    "neutral",
    "right_flex",
    "right_extend",
    "left_flex",
    "left_extend",
];

/// Extra poses captured when the plan contains an overhead press
pub const OVERHEAD_STEPS: [&str; 2] = ["overhead_start", "overhead_top"];

fn step_label(id: &str) -> String {
    let label = match id {
        "neutral" => "Neutral position",
        "right_flex" => "Right arm - flex",
        "right_extend" => "Right arm - extend",
        "left_flex" => "Left arm - flex",
        "left_extend" => "Left arm - extend",
        "overhead_start" => "Overhead - start position",
        "overhead_top" => "Overhead - top position",
        COMPLETE_STEP => "Complete",
        other => return other.to_string(),
    };
    label.to_string()
}

/// Result of feeding a step into the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Current step moved forward
    Moved,
    /// Step was already current or is behind the current one
    Unchanged,
    /// Step id is not part of the canonical order
    Unknown,
}

/// Display state of the calibration panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationView {
    pub current_step: Option<StepId>,
    pub completed_steps: Vec<StepId>,
    pub step_label: String,
    pub instruction: String,
    /// Fraction in `[0, 1]`
    pub progress: f64,
}

/// Ordered calibration poses and progress through them
#[derive(Debug, Clone)]
pub struct CalibrationSequencer {
    order: Vec<StepId>,
    completed: usize,
    /// Last raw step id reported, kept for display when it is not in `order`
    reported: Option<String>,
    instruction: String,
}

impl CalibrationSequencer {
    /// Sequencer over the base poses
    pub fn new() -> Self {
        Self::with_order(BASE_STEPS.iter().map(|s| StepId::new(*s)).collect())
    }

    pub fn with_order(order: Vec<StepId>) -> Self {
        Self {
            order,
            completed: 0,
            reported: None,
            instruction: String::new(),
        }
    }

    /// Sequencer covering every exercise in the plan
    pub fn for_exercises<S: AsRef<str>>(exercises: &[S]) -> Self {
        let mut order: Vec<StepId> = BASE_STEPS.iter().map(|s| StepId::new(*s)).collect();
        if exercises.iter().any(|e| e.as_ref() == "overhead_press") {
            order.extend(OVERHEAD_STEPS.iter().map(|s| StepId::new(*s)));
        }
        Self::with_order(order)
    }

    pub fn order(&self) -> &[StepId] {
        &self.order
    }

    /// First step not yet completed, `None` once all are done
    pub fn current_step(&self) -> Option<&StepId> {
        self.order.get(self.completed)
    }

    pub fn completed_steps(&self) -> &[StepId] {
        &self.order[..self.completed]
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.order.len()
    }

    /// Move to `step`.
    ///
    /// Steps ahead of the current one complete everything before them; a
    /// step at or behind the current one leaves progress alone.
    pub fn advance(&mut self, step: &str, instruction: &str) -> Advance {
        self.reported = Some(step.to_string());
        self.instruction = instruction.to_string();

        if step == COMPLETE_STEP {
            return if self.complete_all() {
                Advance::Moved
            } else {
                Advance::Unchanged
            };
        }

        let Some(index) = self.order.iter().position(|s| s.as_str() == step) else {
            tracing::warn!("Unknown calibration step '{}'", step);
            return Advance::Unknown;
        };

        if index <= self.completed {
            if index < self.completed {
                tracing::debug!(
                    "Ignoring stale calibration step '{}' (current {:?})",
                    step,
                    self.current_step()
                );
            }
            return Advance::Unchanged;
        }

        if index > self.completed + 1 {
            tracing::debug!(
                "Calibration skipped {} step(s) before '{}'",
                index - self.completed - 1,
                step
            );
        }
        self.completed = index;
        Advance::Moved
    }

    /// Mark every step completed. Returns false if that was already the case.
    pub fn complete_all(&mut self) -> bool {
        let changed = !self.is_complete();
        self.completed = self.order.len();
        changed
    }

    /// Fraction of steps before the current one, clamped to `[0, 1]`.
    ///
    /// An unknown reported step shows as zero progress.
    pub fn progress(&self) -> f64 {
        if self.reported_is_unknown() || self.order.is_empty() {
            return 0.0;
        }
        (self.completed as f64 / self.order.len() as f64).clamp(0.0, 1.0)
    }

    fn reported_is_unknown(&self) -> bool {
        match &self.reported {
            Some(raw) => raw != COMPLETE_STEP && !self.order.iter().any(|s| s.as_str() == raw),
            None => false,
        }
    }

    pub fn view(&self) -> CalibrationView {
        let step_label = match (&self.reported, self.current_step()) {
            (Some(raw), _) if self.reported_is_unknown() => step_label(raw),
            (_, Some(current)) => current.label(),
            (_, None) => step_label(COMPLETE_STEP),
        };

        CalibrationView {
            current_step: self.current_step().cloned(),
            completed_steps: self.completed_steps().to_vec(),
            step_label,
            instruction: self.instruction.clone(),
            progress: self.progress(),
        }
    }

    pub fn reset(&mut self) {
        self.completed = 0;
        self.reported = None;
        self.instruction.clear();
    }
}

impl Default for CalibrationSequencer {
    fn default() -> Self {
        Self::new()
    }
}
