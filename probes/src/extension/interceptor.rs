use crate::{Context, Environment, Probe, Result};

/// Per-thread observer of probe firings.
///
/// Callbacks run after the runtime has done its own bookkeeping for the call,
/// so `end` sees the probe already idle with its final readings. Interceptors
/// observe only; they cannot change how a firing is accounted.
pub trait Interceptor {
    fn begin(&mut self, probe: &Probe) {
        let _p = probe;
    }

    fn end(&mut self, probe: &Probe) {
        let _p = probe;
    }
}

pub trait InterceptorFactory: Send + Sync + 'static {
    /// Called once, before the first [`create`](InterceptorFactory::create).
    fn init(&mut self, environment: &Environment) -> Result<()> {
        let _e = environment;
        Ok(())
    }

    fn create(&self, context: &Context) -> Box<dyn Interceptor>;
}
