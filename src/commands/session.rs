//! Session commands for a UI host
//!
//! Wraps the coordinator in shared state and feeds it from the channel's
//! event stream, one event at a time in arrival order.

use crate::config::ClientConfig;
use crate::presenter::FrameSurface;
use crate::session::{
    ChannelEvent, SessionChannel, SessionConfig, SessionCoordinator, SessionEvent, SessionSnapshot,
};
use crate::utils::ErrorResponse;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// Shared session state for the host
pub struct SessionService {
    pub coordinator: Arc<Mutex<SessionCoordinator>>,
    channel: Arc<dyn SessionChannel>,
    pump: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionService {
    pub fn new(
        channel: Arc<dyn SessionChannel>,
        surface: Arc<dyn FrameSurface>,
        config: &ClientConfig,
    ) -> Self {
        let coordinator = SessionCoordinator::from_config(channel.clone(), surface, config);
        Self::with_coordinator(channel, coordinator)
    }

    /// Use a coordinator built elsewhere. `channel` must be the one it sends on.
    pub fn with_coordinator(channel: Arc<dyn SessionChannel>, coordinator: SessionCoordinator) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            channel,
            pump: parking_lot::Mutex::new(None),
        }
    }

    /// Start feeding channel events into the coordinator.
    ///
    /// The event stream can only be taken once, later calls are no-ops.
    /// When the stream ends while a session is live it is reported as a
    /// connection error.
    pub fn spawn_event_pump(&self) {
        let mut pump = self.pump.lock();
        if pump.is_some() {
            return;
        }

        let Some(mut events) = self.channel.take_events() else {
            tracing::warn!("Event stream of channel {} already taken", self.channel.id());
            return;
        };

        let coordinator = self.coordinator.clone();
        let channel_id = self.channel.id().to_string();

        *pump = Some(tokio::spawn(async move {
            tracing::debug!("Event pump started for channel {}", channel_id);

            while let Some(event) = events.recv().await {
                coordinator.lock().await.on_channel_event(event);
            }

            let mut coordinator = coordinator.lock().await;
            if coordinator.phase().is_connected() {
                coordinator.on_channel_event(ChannelEvent::ConnectionError {
                    message: "Connection to the coaching service was lost".to_string(),
                });
            }
            tracing::debug!("Event pump stopped for channel {}", channel_id);
        }));
    }

    /// Start a session
    pub async fn start_session(&self, config: SessionConfig) -> Result<(), ErrorResponse> {
        self.spawn_event_pump();
        let mut coordinator = self.coordinator.lock().await;
        coordinator.start_session(config).await.map_err(Into::into)
    }

    /// End the current session
    pub async fn end_session(&self) -> Result<(), ErrorResponse> {
        let mut coordinator = self.coordinator.lock().await;
        coordinator.end_session().await.map_err(Into::into)
    }

    pub async fn start_analysis(&self) -> Result<(), ErrorResponse> {
        let mut coordinator = self.coordinator.lock().await;
        coordinator.start_analysis().await.map_err(Into::into)
    }

    pub async fn stop_analysis(&self) -> Result<(), ErrorResponse> {
        let mut coordinator = self.coordinator.lock().await;
        coordinator.stop_analysis().await.map_err(Into::into)
    }

    /// Current display state
    pub async fn get_snapshot(&self) -> SessionSnapshot {
        self.coordinator.lock().await.snapshot()
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.lock().await.subscribe()
    }

    /// End any live session and stop the pump
    pub async fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }

        let mut coordinator = self.coordinator.lock().await;
        if coordinator.phase().is_connected() {
            if let Err(e) = coordinator.end_session().await {
                tracing::warn!("Failed to end session on shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::{CameraView, MemorySurface};
    use crate::session::protocol::{MetricsUpdate, PhaseAnnouncement};
    use crate::session::state::{CameraPair, CameraRef};
    use crate::session::{ChannelCommand, MemoryChannel, SessionMode, SessionPhase};
    use std::time::Duration;

    fn service() -> (SessionService, Arc<MemoryChannel>, Arc<MemorySurface>) {
        let channel = Arc::new(MemoryChannel::new("service-test"));
        let surface = Arc::new(MemorySurface::new());
        let service = SessionService::new(channel.clone(), surface.clone(), &ClientConfig::default());
        (service, channel, surface)
    }

    fn training() -> SessionConfig {
        SessionConfig {
            cameras: CameraPair {
                front: CameraRef::Physical { index: 0 },
                profile: CameraRef::Ip {
                    url: "http://cam".to_string(),
                },
            },
            mode: SessionMode::Training,
            plan: None,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_reach_coordinator_in_order() {
        let (service, channel, surface) = service();
        let injector = channel.injector();
        service.start_session(training()).await.unwrap();

        injector.push(ChannelEvent::Phase(PhaseAnnouncement::Analyzing));
        for right in [1, 1, 2] {
            injector.push(ChannelEvent::Metrics(MetricsUpdate {
                right_reps: right,
                ..Default::default()
            }));
        }
        injector.push(ChannelEvent::Frame {
            view: CameraView::Front,
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
        });
        settle().await;

        let snapshot = service.get_snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Exercising);
        assert_eq!(snapshot.right_reps, 2);
        assert!(snapshot.timer.running);
        assert!(surface.latest(CameraView::Front).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_start_maps_to_error_response() {
        let (service, channel, _) = service();
        service.start_session(training()).await.unwrap();

        let err = service.start_session(training()).await.unwrap_err();
        assert_eq!(err.code, "INVALID_TRANSITION");
        assert_eq!(channel.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_maps_to_channel_error() {
        let (service, channel, _) = service();
        channel.set_open(false);

        let err = service.start_session(training()).await.unwrap_err();
        assert_eq!(err.code, "CHANNEL_ERROR");
        assert_eq!(service.get_snapshot().await.phase, SessionPhase::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_live_session() {
        let (service, channel, _) = service();
        service.start_session(training()).await.unwrap();

        service.shutdown().await;

        assert_eq!(service.get_snapshot().await.phase, SessionPhase::Disconnected);
        assert_eq!(channel.sent().last(), Some(&ChannelCommand::EndSession));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_errors() {
        let (service, channel, _) = service();
        let mut events = service.subscribe().await;
        service.start_session(training()).await.unwrap();

        channel.injector().push(ChannelEvent::ConnectionError {
            message: "stream dropped".to_string(),
        });
        settle().await;

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if event == SessionEvent::Error("stream dropped".to_string()) {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }
}
