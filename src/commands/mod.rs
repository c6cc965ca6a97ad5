//! Command handlers for a UI host
//!
//! Each handler returns `Result<_, ErrorResponse>` so a host can forward
//! failures without knowing the internal error types.

pub mod session;

pub use session::SessionService;
