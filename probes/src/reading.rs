use crate::Name;

/// The last two values read from one meter by a probe.
///
/// Every read rolls the previous `high` into `low`, so once a probe has ended
/// `delta()` is the consumption of its last firing. Before a second read
/// `low` is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    name: Name,
    low: u64,
    high: u64,
}

impl Reading {
    pub(crate) fn new(name: Name) -> Self {
        Self {
            name,
            low: 0,
            high: 0,
        }
    }

    /// Name of the meter this reading belongs to.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn low(&self) -> u64 {
        self.low
    }

    #[inline]
    pub fn high(&self) -> u64 {
        self.high
    }

    #[inline]
    pub fn delta(&self) -> u64 {
        self.high.saturating_sub(self.low)
    }

    /// Forgets both values, e.g. when the meter could not be read.
    pub(crate) fn clear(&mut self) {
        self.low = 0;
        self.high = 0;
    }

    /// Records a new value. Returns false if the measure went backwards, in
    /// which case the previous value is kept so the delta is zero.
    pub(crate) fn update(&mut self, value: u64) -> bool {
        self.low = self.high;
        if value < self.high {
            return false;
        }
        self.high = value;
        true
    }
}
