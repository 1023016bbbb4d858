use crate::{Context, Environment, Result};

/// Per-thread source of a meter's values.
pub trait Measure {
    /// The cumulative value, specific to the calling thread.
    ///
    /// Called on every metered `begin()` and `end()`. Values must never
    /// decrease between two calls.
    fn value(&mut self) -> u64;
}

/// Creates the [`Measure`] backing a meter for every thread context.
pub trait MeasureFactory: Send + Sync + 'static {
    /// Called once, before the first [`create`](MeasureFactory::create).
    fn init(&mut self, environment: &Environment) -> Result<()> {
        let _e = environment;
        Ok(())
    }

    fn create(&self, context: &Context) -> Box<dyn Measure>;
}
