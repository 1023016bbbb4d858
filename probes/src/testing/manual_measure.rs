use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    Context,
    extension::{Measure, MeasureFactory},
};

/// A measure whose value only changes when the test says so.
///
/// Clones share the same value, so keep one to drive the measure after
/// handing another to the runtime builder.
#[derive(Debug, Clone, Default)]
pub struct ManualMeasure {
    value: Arc<AtomicU64>,
}

impl ManualMeasure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: u64) {
        self.value.fetch_add(by, Ordering::Relaxed);
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Measure for ManualMeasure {
    fn value(&mut self) -> u64 {
        self.get()
    }
}

impl MeasureFactory for ManualMeasure {
    fn create(&self, _context: &Context) -> Box<dyn Measure> {
        Box::new(self.clone())
    }
}
