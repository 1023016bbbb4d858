use std::time::Instant;

use crate::{
    Context,
    extension::{Measure, MeasureFactory},
};

/// Nanoseconds elapsed since the thread context was created.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockMeasure;

struct Clock {
    origin: Instant,
}

impl Measure for Clock {
    fn value(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

impl MeasureFactory for ClockMeasure {
    fn create(&self, _context: &Context) -> Box<dyn Measure> {
        Box::new(Clock {
            origin: Instant::now(),
        })
    }
}
