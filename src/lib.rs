// Library surface for headless/integration tests and reuse.
// The binary in main.rs owns the CLI and terminal lifecycle only.
pub mod config;
pub mod limiter;
pub mod moves;
pub mod pad;
pub mod runtime;
pub mod session;
pub mod store;
pub mod ui;

/// Input polling cadence of the validation screen; the countdown and the
/// verdict delays are derived from it.
pub const TICK_RATE_MS: u64 = 50;
