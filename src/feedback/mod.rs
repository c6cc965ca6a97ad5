//! Audio and spoken feedback
//!
//! - `NotificationCue` is one unit of feedback
//! - `NotificationQueue` plays cues one at a time, in order
//! - `CueRenderer` implementations do the actual playback

pub mod queue;
pub mod renderer;

pub use queue::NotificationQueue;
pub use renderer::{renderer_for, CommandRenderer, CueRenderer, PacedRenderer, RenderError};

use serde::{Deserialize, Serialize};

/// A single feedback cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum NotificationCue {
    /// Short audible pulse, one per counted rep
    Tone,
    /// Spoken phrase
    Speech(String),
}

impl NotificationCue {
    pub fn speech(text: impl Into<String>) -> Self {
        NotificationCue::Speech(text.into())
    }

    /// Short label for logs and tests
    pub fn label(&self) -> String {
        match self {
            NotificationCue::Tone => "tone".to_string(),
            NotificationCue::Speech(text) => format!("speech '{}'", text),
        }
    }
}
