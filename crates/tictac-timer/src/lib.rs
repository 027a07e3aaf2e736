//! Time-based scheduling for tictac.
//!
//! Two pieces, both built on Tokio's clock so tests can run under paused
//! virtual time (`#[tokio::test(start_paused = true)]`) and advance it
//! deterministically instead of sleeping:
//!
//! - [`Timers`]: a small set of keyed, cancellable one-shot deadlines.
//!   A room actor uses it for the deferred draw restart and the
//!   reconnection grace expiry.
//! - [`SweepSchedule`]: a periodic schedule that drives the registry's
//!   cleanup sweep, with first-sweep jitter and overrun handling.
//!
//! # Integration
//!
//! Both are designed to sit inside a `tokio::select!` loop. When nothing is
//! scheduled the wait futures pend forever, so the other branches keep
//! running:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         key = timers.next_due() => { /* re-validate, then act */ }
//!     }
//! }
//! ```

mod sweep;
mod timers;

pub use sweep::{SweepConfig, SweepMetrics, SweepSchedule, SweepTick};
pub use timers::Timers;
