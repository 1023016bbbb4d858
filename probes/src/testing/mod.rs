//! Helpers for testing code that is metered, and extensions themselves.
//!
//! Enable with the `test-harness` feature:
//!
//! ```toml
//! [dev-dependencies]
//! probes = { version = "0.1", features = ["test-harness"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! let work = ManualMeasure::new();
//! let spy = ProbeSpy::new();
//! let runtime = Runtime::builder()
//!     .with_config(Config::default().with_meters(["work"]))
//!     .with_measure("work", work.clone())
//!     .with_interceptor(spy.clone())
//!     .build()?;
//!
//! runtime.run(&runtime.parse("job"), || work.advance(10));
//! assert_eq!(spy.ends().len(), 1);
//! ```

mod fixed_vote;
mod manual_measure;
mod probe_spy;

pub use fixed_vote::FixedVote;
pub use manual_measure::ManualMeasure;
pub use probe_spy::{ProbeSpy, SpyEvent, SpyEventKind};
