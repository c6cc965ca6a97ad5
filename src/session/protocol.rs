//! Wire protocol between the client and the streaming service
//!
//! Commands and events are named messages. JSON payloads accept both the
//! camelCase and snake_case spellings the service has used over time.

use super::state::{ErrorKind, SessionConfig, TrainingProgress, TrainingTotals};
use crate::presenter::CameraView;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Command sent from the client to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ChannelCommand {
    StartSession(SessionConfig),
    EndSession,
    StartAnalysis,
    StopAnalysis,
}

impl ChannelCommand {
    /// Event name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ChannelCommand::StartSession(_) => "start-session",
            ChannelCommand::EndSession => "end-session",
            ChannelCommand::StartAnalysis => "start-analysis",
            ChannelCommand::StopAnalysis => "stop-analysis",
        }
    }
}

/// Phase announced by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseAnnouncement {
    Waiting,
    Analyzing,
    Calibration,
    Exercise,
    #[serde(alias = "completed")]
    Complete,
    Error,
}

/// Rep counts and form errors for the current set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsUpdate {
    #[serde(alias = "right_reps")]
    pub right_reps: u32,
    #[serde(alias = "left_reps")]
    pub left_reps: u32,
    pub errors: Vec<ErrorKind>,
}

/// Event received from the service
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// `status` and `session-phase` announcements
    Phase(PhaseAnnouncement),
    TrainingState(TrainingProgress),
    Metrics(MetricsUpdate),
    CalibrationStep { step: String, instruction: String },
    CalibrationComplete,
    TrainingComplete(TrainingTotals),
    Frame { view: CameraView, bytes: Vec<u8> },
    ConnectionError { message: String },
    SessionEnded,
    /// Event this client does not understand
    Unknown { name: String },
}

/// Inbound payload could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed '{event}' payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{event}' expects a binary payload")]
    ExpectedBinary { event: String },
}

#[derive(Deserialize)]
struct StatusPayload {
    state: PhaseAnnouncement,
}

#[derive(Deserialize)]
struct PhasePayload {
    phase: PhaseAnnouncement,
}

#[derive(Deserialize)]
struct CalibrationStepPayload {
    step: String,
    #[serde(default)]
    instruction: String,
}

#[derive(Deserialize)]
struct ConnectionErrorPayload {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct TrainingCompletePayload {
    #[serde(default)]
    totals: Option<TrainingTotals>,
    #[serde(flatten)]
    flat: TrainingTotals,
}

fn parse<T: for<'de> Deserialize<'de>>(event: &str, payload: Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|source| DecodeError::Malformed {
        event: event.to_string(),
        source,
    })
}

impl ChannelEvent {
    /// Decode a named JSON event.
    ///
    /// Names this client does not know become [`ChannelEvent::Unknown`];
    /// a known name with an unusable payload is an error.
    pub fn decode(name: &str, payload: Value) -> Result<Self, DecodeError> {
        let event = match name {
            "status" => {
                let payload: StatusPayload = parse(name, payload)?;
                ChannelEvent::Phase(payload.state)
            }
            "session-phase" => {
                let payload: PhasePayload = parse(name, payload)?;
                ChannelEvent::Phase(payload.phase)
            }
            "training-state" => ChannelEvent::TrainingState(parse(name, payload)?),
            "metrics" => ChannelEvent::Metrics(parse(name, payload)?),
            "calibration-step" => {
                let payload: CalibrationStepPayload = parse(name, payload)?;
                ChannelEvent::CalibrationStep {
                    step: payload.step,
                    instruction: payload.instruction,
                }
            }
            "calibration-complete" => ChannelEvent::CalibrationComplete,
            "training-complete" => {
                let payload: TrainingCompletePayload = parse(name, payload)?;
                ChannelEvent::TrainingComplete(payload.totals.unwrap_or(payload.flat))
            }
            "connection-error" => {
                let payload: ConnectionErrorPayload = parse(name, payload)?;
                ChannelEvent::ConnectionError {
                    message: payload.message,
                }
            }
            "session-ended" => ChannelEvent::SessionEnded,
            "front-frame" | "profile-frame" => {
                return Err(DecodeError::ExpectedBinary {
                    event: name.to_string(),
                })
            }
            other => ChannelEvent::Unknown {
                name: other.to_string(),
            },
        };

        Ok(event)
    }

    /// Decode a named binary event
    pub fn decode_binary(name: &str, bytes: Vec<u8>) -> Self {
        match name {
            "front-frame" => ChannelEvent::Frame {
                view: CameraView::Front,
                bytes,
            },
            "profile-frame" => ChannelEvent::Frame {
                view: CameraView::Profile,
                bytes,
            },
            other => ChannelEvent::Unknown {
                name: other.to_string(),
            },
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &str {
        match self {
            ChannelEvent::Phase(_) => "phase",
            ChannelEvent::TrainingState(_) => "training-state",
            ChannelEvent::Metrics(_) => "metrics",
            ChannelEvent::CalibrationStep { .. } => "calibration-step",
            ChannelEvent::CalibrationComplete => "calibration-complete",
            ChannelEvent::TrainingComplete(_) => "training-complete",
            ChannelEvent::Frame { view, .. } => view.frame_event(),
            ChannelEvent::ConnectionError { .. } => "connection-error",
            ChannelEvent::SessionEnded => "session-ended",
            ChannelEvent::Unknown { name } => name,
        }
    }
}
