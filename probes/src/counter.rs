use std::{cell::Cell, rc::Rc};

use crate::{Error, Name, Result};

/// A named, thread-owned, ever increasing counter.
///
/// Obtained from [`Context::counter`](crate::Context::counter); every handle
/// for the same name on the same thread shares one value. Counters are cheaper
/// than probes for plain event counting and can be exposed as meters through
/// [`CounterMeasure`](crate::measures::CounterMeasure).
#[derive(Clone)]
pub struct Counter {
    name: Name,
    value: Rc<Cell<u64>>,
}

impl Counter {
    pub(crate) fn new(name: Name) -> Self {
        Self {
            name,
            value: Rc::new(Cell::new(0)),
        }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value.get()
    }

    #[inline]
    pub fn inc(&self) {
        self.value.set(self.value.get().saturating_add(1));
    }

    /// Adds `value`, which must not be negative.
    pub fn inc_by(&self, value: i64) -> Result<()> {
        let value = u64::try_from(value).map_err(|_| Error::NegativeIncrement(value))?;
        self.value.set(self.value.get().saturating_add(value));
        Ok(())
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("value", &self.value())
            .finish()
    }
}
