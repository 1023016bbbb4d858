//! Probes - in-process activity metering
//!
//! Measure how much of a resource (wall-clock time, allocations, rows read,
//! anything that only grows) a named piece of work consumes, per thread and
//! with nesting taken into account.
//!
//! - A [`Runtime`] interns hierarchical [`Name`]s, knows the [`Meter`]s and
//!   holds the registered extensions.
//! - Every thread gets its own [`Context`]; a [`Probe`] fires on it between
//!   `begin()` and `end()`, charging what it consumed to its name and every
//!   prefix of it.
//! - A [`SavePoint`] captures the totals; comparing two of them yields a
//!   [`ChangeSet`].
//!
//! ```rust
//! use probes::{Config, Runtime};
//!
//! let runtime = Runtime::new(Config::default()).unwrap();
//! let context = runtime.context();
//! let before = context.savepoint();
//!
//! context.run(&runtime.parse("db.query"), || {
//!     context.run(&runtime.parse("db.query.parse"), || ());
//! });
//!
//! let changes = context.compare(&before).unwrap();
//! let query = changes.changepoint(&runtime.parse("db.query")).unwrap();
//! assert_eq!(query.change(&runtime.name("clock")).unwrap().count(), 1);
//! ```

mod changeset;
mod config;
mod context;
mod counter;
mod environment;
mod error;
mod global;
mod label;
mod meter;
mod name;
mod probe;
mod reading;
mod runtime;
mod savepoint;

mod internal;

pub mod extension;
pub mod interceptors;
pub mod measures;

#[cfg(any(test, feature = "test-harness"))]
pub mod testing;

pub use changeset::{Change, ChangePoint, ChangeSet};
pub use config::{Config, LabelRule, Setting};
pub use context::Context;
pub use counter::Counter;
pub use environment::{Environment, Value};
pub use error::Error;
pub use global::{begin, context, create, install, label, meter, name, parse, run, runtime};
pub use label::Label;
pub use meter::Meter;
pub use name::{Ancestors, Name};
pub use probe::{Probe, ProbeState};
pub use reading::Reading;
pub use runtime::{Runtime, RuntimeBuilder};
pub use savepoint::SavePoint;

#[doc(hidden)]
pub use global::__private;

#[cfg(feature = "macros")]
pub use probes_macros::metered;

pub type Result<T = ()> = std::result::Result<T, Error>;
