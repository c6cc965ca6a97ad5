//! Calibration progress tracking

pub mod sequencer;

pub use sequencer::{Advance, CalibrationSequencer, CalibrationView, StepId};
