//! Ready-to-use interceptors.
//!
//! - [`Tracer`] - logs every begin and end via the `tracing` crate
//! - [`Recorder`] - writes each metered firing to a JSON Lines file
//!   (requires the `recorder` feature)
//!
//! # Example
//!
//! ```ignore
//! use probes::interceptors::Tracer;
//!
//! let runtime = Runtime::builder().with_interceptor(Tracer).build()?;
//! ```

mod tracer;
pub use tracer::Tracer;

#[cfg(feature = "recorder")]
mod recorder;

#[cfg(feature = "recorder")]
pub use recorder::Recorder;
