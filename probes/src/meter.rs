use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use dashmap::DashMap;

use crate::{Error, Name, Result, extension::MeasureFactory};

/// A kind of resource measurement, identified by a [`Name`].
///
/// A meter is not a value; values are taken per thread through the
/// [`Measure`](crate::extension::Measure) created by the meter's factory.
/// Meters are created on first reference and may exist without a measure,
/// in which case they can be named but not enabled.
#[derive(Clone)]
pub struct Meter(Arc<MeterInner>);

struct MeterInner {
    name: Name,
    measure: OnceLock<Arc<dyn MeasureFactory>>,
}

impl Meter {
    #[inline]
    pub fn name(&self) -> &Name {
        &self.0.name
    }

    /// True once a measure has been plugged in for this meter.
    pub fn is_measured(&self) -> bool {
        self.0.measure.get().is_some()
    }

    pub(crate) fn measure(&self) -> Option<&Arc<dyn MeasureFactory>> {
        self.0.measure.get()
    }
}

impl PartialEq for Meter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Meter {}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("name", &self.0.name)
            .field("measured", &self.is_measured())
            .finish()
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

/// Name to meter mapping shared by all threads of a runtime.
#[derive(Default)]
pub(crate) struct MeterRegistry {
    meters: DashMap<Name, Meter>,
}

impl MeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the meter for `name`, creating it without a measure if absent.
    pub fn meter(&self, name: &Name) -> Meter {
        if let Some(meter) = self.meters.get(name) {
            return meter.clone();
        }
        self.meters
            .entry(name.clone())
            .or_insert_with(|| {
                Meter(Arc::new(MeterInner {
                    name: name.clone(),
                    measure: OnceLock::new(),
                }))
            })
            .clone()
    }

    /// Plugs a measure into the meter for `name`. A meter's measure can be
    /// set only once.
    pub fn register(&self, name: &Name, factory: Arc<dyn MeasureFactory>) -> Result<Meter> {
        let meter = self.meter(name);
        meter
            .0
            .measure
            .set(factory)
            .map_err(|_| Error::MeasureAlreadyRegistered(name.clone()))?;
        Ok(meter)
    }

    pub fn meters(&self) -> Vec<Meter> {
        let mut meters: Vec<Meter> = self.meters.iter().map(|m| m.value().clone()).collect();
        meters.sort_by(|a, b| a.name().cmp(b.name()));
        meters
    }
}
