// ── Core error types ──
//
// Errors a caller of emsmon-core can observe. Transport and decode
// failures inside the session worker are logged and absorbed; they
// surface as `SessionEvent::Log` lines and state changes instead.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Session is already running")]
    AlreadyRunning,
}
