//! Extension points of the metering runtime.
//!
//! Each extension comes as a factory, registered once on the
//! [`RuntimeBuilder`](crate::RuntimeBuilder), and a per-thread instance the
//! factory creates for every new [`Context`](crate::Context):
//!
//! - [`MeasureFactory`] / [`Measure`]: the resource behind a meter.
//! - [`StrategyFactory`] / [`Strategy`]: votes on whether a firing is metered.
//! - [`InterceptorFactory`] / [`Interceptor`]: observes `begin()`/`end()`
//!   after the runtime's own accounting.
//!
//! Factories are initialized with the configuration [`Environment`](crate::Environment)
//! exactly once, when the runtime is built. Per-thread instances are chained in
//! registration order and are invoked synchronously on the metered thread, so
//! they must not block.

mod interceptor;
mod measure;
mod strategy;

pub use interceptor::{Interceptor, InterceptorFactory};
pub use measure::{Measure, MeasureFactory};
pub use strategy::{Strategy, StrategyFactory};
