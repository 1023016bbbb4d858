mod ledger;
mod stack;
mod threads;

pub(crate) use ledger::{Ledger, MeterTally, Tally};
pub(crate) use stack::{Close, ProbeStack};
pub(crate) use threads::{current_context, release_context};
