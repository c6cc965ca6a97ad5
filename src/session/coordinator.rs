//! Session coordinator
//!
//! Owns the client's view of a live session and is the only place its state
//! changes. Inbound events go through [`SessionCoordinator::on_channel_event`],
//! user intent through the lifecycle methods.

use super::channel::{ChannelError, SessionChannel};
use super::protocol::{ChannelCommand, ChannelEvent, MetricsUpdate, PhaseAnnouncement};
use super::state::{
    ErrorKind, Metrics, SessionConfig, SessionMode, SessionPhase, TrainingProgress, TrainingTotals,
};
use super::timer::{format_elapsed, SessionTimer, TimerState};
use crate::calibration::{Advance, CalibrationSequencer, CalibrationView};
use crate::config::{ClientConfig, Phrases};
use crate::feedback::{renderer_for, CueRenderer, NotificationCue, NotificationQueue};
use crate::presenter::{CameraView, FramePresenter, FrameSurface};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session-level errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: SessionPhase,
    },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Notifications for whoever renders the session screen
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    CalibrationVisible(bool),
    /// User-facing error message
    Error(String),
    TrainingComplete(Option<TrainingTotals>),
}

/// Everything the session screen displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub phase: SessionPhase,
    pub mode: Option<SessionMode>,
    pub analyzing: bool,
    pub right_reps: u32,
    pub left_reps: u32,
    pub errors_seen: Vec<ErrorKind>,
    pub timer: TimerState,
    /// Elapsed time as `mm:ss`
    pub elapsed: String,
    pub calibration_visible: bool,
    pub calibration: CalibrationView,
    pub training: Option<TrainingProgress>,
    pub totals: Option<TrainingTotals>,
    pub last_error: Option<String>,
}

/// Exercise identifiers listed in an opaque plan, if it has any
fn plan_exercises(config: &SessionConfig) -> Vec<String> {
    config
        .plan
        .as_ref()
        .and_then(|plan| plan.get("exercises"))
        .and_then(|list| list.as_array())
        .map(|list| {
            list.iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Coordinates one live session at a time
pub struct SessionCoordinator {
    phase: SessionPhase,
    mode: Option<SessionMode>,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,

    channel: Arc<dyn SessionChannel>,

    metrics: Metrics,
    timer: SessionTimer,
    analyzing: bool,

    calibration: CalibrationSequencer,
    calibration_visible: bool,
    /// Last (step, instruction) spoken, so a re-delivered step stays quiet
    last_instruction: Option<(String, String)>,

    presenter: FramePresenter,
    queue: NotificationQueue,
    phrases: Phrases,

    training: Option<TrainingProgress>,
    totals: Option<TrainingTotals>,
    last_error: Option<String>,

    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionCoordinator {
    /// Create a coordinator around an injected channel, frame surface and renderer
    pub fn new(
        channel: Arc<dyn SessionChannel>,
        surface: Arc<dyn FrameSurface>,
        renderer: Arc<dyn CueRenderer>,
        phrases: Phrases,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            phase: SessionPhase::Idle,
            mode: None,
            session_id: None,
            started_at: None,
            channel,
            metrics: Metrics::default(),
            timer: SessionTimer::new(),
            analyzing: false,
            calibration: CalibrationSequencer::new(),
            calibration_visible: false,
            last_instruction: None,
            presenter: FramePresenter::new(surface),
            queue: NotificationQueue::new(renderer),
            phrases,
            training: None,
            totals: None,
            last_error: None,
            event_tx,
        }
    }

    /// Create a coordinator with the renderer the configuration asks for
    pub fn from_config(
        channel: Arc<dyn SessionChannel>,
        surface: Arc<dyn FrameSurface>,
        config: &ClientConfig,
    ) -> Self {
        let renderer = renderer_for(&config.tone, &config.speech);
        Self::new(channel, surface, renderer, config.phrases.clone())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn timer(&self) -> TimerState {
        self.timer.state()
    }

    pub fn calibration(&self) -> &CalibrationSequencer {
        &self.calibration
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.queue
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Subscribe to session notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Start a new session.
    ///
    /// Only valid from `Idle` or `Disconnected`. All per-session state is
    /// reset before the start command goes out.
    pub async fn start_session(&mut self, config: SessionConfig) -> SessionResult<()> {
        if !self.phase.can_start() {
            return Err(SessionError::InvalidTransition {
                action: "start session",
                phase: self.phase,
            });
        }

        let session_id = Uuid::new_v4();
        tracing::info!("Starting session {} in {:?} mode", session_id, config.mode);

        self.reset_session_state();
        self.calibration = CalibrationSequencer::for_exercises(&plan_exercises(&config));
        self.mode = Some(config.mode);
        self.session_id = Some(session_id);
        self.started_at = Some(Utc::now());
        self.presenter.set_connected(true);
        self.set_phase(SessionPhase::Connecting);

        if let Err(e) = self.channel.send(ChannelCommand::StartSession(config)).await {
            tracing::error!("Failed to send start command: {}", e);
            self.fail(e.to_string());
            return Err(e.into());
        }

        Ok(())
    }

    /// End the session.
    ///
    /// The end command is best-effort; local state always tears down.
    pub async fn end_session(&mut self) -> SessionResult<()> {
        if self.channel.is_open() {
            if let Err(e) = self.channel.send(ChannelCommand::EndSession).await {
                tracing::warn!("Failed to send end command: {}", e);
            }
        }

        tracing::info!("Ending session {:?}", self.session_id);
        self.teardown();
        Ok(())
    }

    /// Ask the service to start counting reps
    pub async fn start_analysis(&mut self) -> SessionResult<()> {
        self.send_analysis(ChannelCommand::StartAnalysis, "start analysis")
            .await
    }

    /// Ask the service to pause counting reps
    pub async fn stop_analysis(&mut self) -> SessionResult<()> {
        self.send_analysis(ChannelCommand::StopAnalysis, "stop analysis")
            .await
    }

    async fn send_analysis(
        &mut self,
        command: ChannelCommand,
        action: &'static str,
    ) -> SessionResult<()> {
        if !matches!(
            self.phase,
            SessionPhase::Connecting | SessionPhase::Calibrating | SessionPhase::Exercising
        ) {
            return Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            });
        }
        self.channel.send(command).await?;
        Ok(())
    }

    /// End any live session and release everything this coordinator holds
    pub async fn dispose(mut self) {
        if self.phase.is_connected() {
            let _ = self.end_session().await;
        } else {
            self.teardown();
        }
    }

    /// Apply one inbound event
    pub fn on_channel_event(&mut self, event: ChannelEvent) {
        if !self.phase.is_connected() {
            tracing::debug!("Ignoring '{}' while {}", event.kind(), self.phase);
            return;
        }

        tracing::trace!("Event '{}' in {}", event.kind(), self.phase);

        match event {
            ChannelEvent::Phase(announcement) => self.on_phase(announcement),
            ChannelEvent::TrainingState(progress) => self.training = Some(progress),
            ChannelEvent::Metrics(update) => self.on_metrics(update),
            ChannelEvent::CalibrationStep { step, instruction } => {
                self.on_calibration_step(step, instruction)
            }
            ChannelEvent::CalibrationComplete => self.on_calibration_complete(),
            ChannelEvent::TrainingComplete(totals) => {
                if matches!(
                    self.phase,
                    SessionPhase::Calibrating | SessionPhase::Exercising
                ) {
                    self.complete(Some(totals));
                }
            }
            ChannelEvent::Frame { view, bytes } => self.on_frame(view, bytes),
            ChannelEvent::ConnectionError { message } => {
                tracing::error!("Connection error: {}", message);
                self.fail(message);
            }
            ChannelEvent::SessionEnded => {
                tracing::info!("Service ended session {:?}", self.session_id);
                self.teardown();
            }
            ChannelEvent::Unknown { name } => {
                tracing::debug!("Ignoring unknown event '{}'", name);
            }
        }
    }

    fn on_phase(&mut self, announcement: PhaseAnnouncement) {
        use PhaseAnnouncement as Announced;
        use SessionPhase as Phase;

        match (self.phase, announcement) {
            (Phase::Connecting, Announced::Waiting) => {
                self.analyzing = false;
                let phrase = self.phrases.waiting.clone();
                self.speak(phrase);
            }
            (Phase::Exercising, Announced::Waiting) => {
                self.analyzing = false;
                self.timer.pause();
            }
            (Phase::Connecting, Announced::Calibration) if self.mode_allows(Phase::Calibrating) => {
                self.calibration.reset();
                self.last_instruction = None;
                self.set_calibration_visible(true);
                self.set_phase(Phase::Calibrating);
                let phrase = self.phrases.calibration_start.clone();
                self.speak(phrase);
            }
            (Phase::Connecting | Phase::Calibrating, Announced::Analyzing | Announced::Exercise)
                if self.mode_allows(Phase::Exercising) =>
            {
                self.set_calibration_visible(false);
                self.set_phase(Phase::Exercising);
                self.analyzing = true;
                self.timer.start();
            }
            (Phase::Exercising, Announced::Analyzing | Announced::Exercise) => {
                self.analyzing = true;
                self.timer.start();
            }
            (Phase::Calibrating | Phase::Exercising, Announced::Complete) => self.complete(None),
            (_, Announced::Error) => {
                self.fail("The coaching service reported an error".to_string())
            }
            (phase, announcement) => {
                tracing::debug!("Ignoring phase {:?} while {}", announcement, phase);
            }
        }
    }

    fn on_metrics(&mut self, update: MetricsUpdate) {
        if self.phase == SessionPhase::Complete {
            return;
        }

        let delta = self
            .metrics
            .apply(update.right_reps, update.left_reps, &update.errors);

        if delta.right_increased {
            self.queue.enqueue(NotificationCue::Tone);
        }
        if delta.left_increased {
            self.queue.enqueue(NotificationCue::Tone);
        }
        for kind in &delta.new_errors {
            tracing::debug!("First occurrence of form error {}", kind.as_str());
            let phrase = self.phrases.error_name(kind);
            self.speak(phrase);
        }
    }

    fn on_calibration_step(&mut self, step: String, instruction: String) {
        match self.phase {
            SessionPhase::Connecting if self.mode_allows(SessionPhase::Calibrating) => {
                self.set_calibration_visible(true);
                self.set_phase(SessionPhase::Calibrating);
            }
            SessionPhase::Calibrating => {}
            phase => {
                tracing::debug!("Ignoring calibration step '{}' while {}", step, phase);
                return;
            }
        }

        if self.calibration.advance(&step, &instruction) == Advance::Moved {
            tracing::info!("Calibration step {}", step);
        }

        let key = (step, instruction);
        if key.1.is_empty() || self.last_instruction.as_ref() == Some(&key) {
            return;
        }
        self.speak(key.1.clone());
        self.last_instruction = Some(key);
    }

    fn on_calibration_complete(&mut self) {
        if !matches!(
            self.phase,
            SessionPhase::Connecting | SessionPhase::Calibrating
        ) {
            return;
        }

        self.calibration.complete_all();
        let phrase = self.phrases.calibration_complete.clone();
        self.speak(phrase);

        if self.mode == Some(SessionMode::Calibration) {
            self.complete(None);
        }
    }

    fn on_frame(&mut self, view: CameraView, bytes: Vec<u8>) {
        if self.phase == SessionPhase::Disconnected {
            return;
        }
        self.presenter.present(view, bytes);
    }

    fn complete(&mut self, totals: Option<TrainingTotals>) {
        self.timer.pause();
        self.analyzing = false;
        self.set_calibration_visible(false);
        if totals.is_some() {
            self.totals = totals;
        }
        self.set_phase(SessionPhase::Complete);

        let phrase = self.phrases.training_complete.clone();
        self.speak(phrase);
        let _ = self.event_tx.send(SessionEvent::TrainingComplete(self.totals));
    }

    /// Fatal error: release resources and surface `message`
    fn fail(&mut self, message: String) {
        self.timer.pause();
        self.analyzing = false;
        self.queue.clear();
        self.presenter.clear_all();
        self.presenter.set_connected(false);
        self.set_calibration_visible(false);
        self.set_phase(SessionPhase::Disconnected);

        self.last_error = Some(message.clone());
        let _ = self.event_tx.send(SessionEvent::Error(message));
    }

    /// Explicit or service-initiated end
    fn teardown(&mut self) {
        self.reset_session_state();
        self.presenter.set_connected(false);
        self.set_phase(SessionPhase::Disconnected);
    }

    fn reset_session_state(&mut self) {
        self.timer.reset();
        self.queue.clear();
        self.presenter.clear_all();
        self.metrics.reset();
        self.calibration.reset();
        self.last_instruction = None;
        self.set_calibration_visible(false);
        self.analyzing = false;
        self.training = None;
        self.totals = None;
        self.last_error = None;
    }

    fn mode_allows(&self, phase: SessionPhase) -> bool {
        self.mode.map_or(true, |mode| mode.allows(phase))
    }

    fn speak(&self, text: String) {
        self.queue.enqueue(NotificationCue::Speech(text));
    }

    fn set_calibration_visible(&mut self, visible: bool) {
        if self.calibration_visible != visible {
            self.calibration_visible = visible;
            let _ = self.event_tx.send(SessionEvent::CalibrationVisible(visible));
        }
    }

    fn set_phase(&mut self, to: SessionPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        tracing::info!("Session phase {} -> {}", from, to);
        let _ = self.event_tx.send(SessionEvent::PhaseChanged { from, to });
    }

    /// Current display state
    pub fn snapshot(&self) -> SessionSnapshot {
        let timer = self.timer.state();
        SessionSnapshot {
            session_id: self.session_id,
            started_at: self.started_at,
            phase: self.phase,
            mode: self.mode,
            analyzing: self.analyzing,
            right_reps: self.metrics.right_reps,
            left_reps: self.metrics.left_reps,
            errors_seen: self.metrics.errors_seen.iter().cloned().collect(),
            timer,
            elapsed: format_elapsed(timer.elapsed_seconds),
            calibration_visible: self.calibration_visible,
            calibration: self.calibration.view(),
            training: self.training.clone(),
            totals: self.totals,
            last_error: self.last_error.clone(),
        }
    }
}
