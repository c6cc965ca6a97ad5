//! Live session coordination
//!
//! The coordinator owns the phase machine and drives the timer, the
//! notification queue and the frame presenter from inbound channel events.

pub mod channel;
pub mod coordinator;
pub mod protocol;
pub mod state;
pub mod timer;

pub use channel::{ChannelError, EventInjector, MemoryChannel, SessionChannel};
pub use coordinator::{SessionCoordinator, SessionError, SessionEvent, SessionSnapshot};
pub use protocol::{ChannelCommand, ChannelEvent, DecodeError, PhaseAnnouncement};
pub use state::{SessionConfig, SessionMode, SessionPhase};
pub use timer::{format_elapsed, SessionTimer, TimerState};
