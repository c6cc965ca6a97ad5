//! Form Coach client - live session coordination for camera-based coaching.
//!
//! This is the main library crate. It owns the client side of a coaching
//! session: connection lifecycle, calibration progress, rep counting, audio
//! feedback, the session timer and camera frame display.

pub mod calibration;
pub mod commands;
pub mod config;
pub mod feedback;
pub mod history;
pub mod presenter;
pub mod session;
pub mod utils;

pub use commands::SessionService;
pub use config::ClientConfig;
pub use session::{SessionCoordinator, SessionPhase, SessionSnapshot};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "form_coach_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("Starting Form Coach client v{}", env!("CARGO_PKG_VERSION"));
    }
}
