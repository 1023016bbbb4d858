#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use probes::{
    Config, Context, Runtime,
    extension::{Measure, MeasureFactory},
};

/// Measure advanced by hand, shared by every thread.
#[derive(Clone, Default)]
pub struct Ticks(Arc<AtomicU64>);

impl Ticks {
    pub fn advance(&self, by: u64) {
        self.0.fetch_add(by, Ordering::Relaxed);
    }
}

impl Measure for Ticks {
    fn value(&mut self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl MeasureFactory for Ticks {
    fn create(&self, _context: &Context) -> Box<dyn Measure> {
        Box::new(self.clone())
    }
}

/// A runtime metering `ticks` only.
pub fn runtime_with(config: Config) -> (Runtime, Ticks) {
    let ticks = Ticks::default();
    let runtime = Runtime::builder()
        .with_config(config.with_meters(["ticks"]))
        .with_measure("ticks", ticks.clone())
        .build()
        .unwrap();
    (runtime, ticks)
}

pub fn runtime() -> (Runtime, Ticks) {
    runtime_with(Config::default())
}
