use crate::{Context, Environment, Probe, Result};

/// Per-thread voter consulted before a probe firing is metered.
pub trait Strategy {
    /// A negative value is a *no* vote, a positive value a *yes* vote and zero
    /// abstains. The firing is left unmetered when the *no* votes of the chain
    /// outnumber the *yes* votes.
    fn vote(&mut self, probe: &Probe) -> i32;
}

pub trait StrategyFactory: Send + Sync + 'static {
    /// Called once, before the first [`create`](StrategyFactory::create).
    fn init(&mut self, environment: &Environment) -> Result<()> {
        let _e = environment;
        Ok(())
    }

    fn create(&self, context: &Context) -> Box<dyn Strategy>;
}
