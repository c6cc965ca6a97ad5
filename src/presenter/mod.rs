//! Camera frame presentation

pub mod frame;

pub use frame::{DisplayResource, FrameHandle, FramePresenter, FrameSurface, MemorySurface};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera view a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraView {
    Front,
    Profile,
}

impl CameraView {
    pub const ALL: [CameraView; 2] = [CameraView::Front, CameraView::Profile];

    /// Event name frames for this view arrive under
    pub fn frame_event(&self) -> &'static str {
        match self {
            CameraView::Front => "front-frame",
            CameraView::Profile => "profile-frame",
        }
    }
}

impl fmt::Display for CameraView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraView::Front => f.write_str("front"),
            CameraView::Profile => f.write_str("profile"),
        }
    }
}
