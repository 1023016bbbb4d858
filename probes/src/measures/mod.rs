//! Built-in measures.
//!
//! - [`ClockMeasure`]: monotonic wall clock in nanoseconds, registered as the
//!   [`CLOCK`] meter by every runtime.
//! - [`CounterMeasure`]: reads a per-thread [`Counter`](crate::Counter), so
//!   counted events show up next to time in change sets.

mod clock;
mod counter;

pub use clock::ClockMeasure;
pub use counter::CounterMeasure;

/// Name of the wall-clock meter, enabled by default.
pub const CLOCK: &str = "clock";
