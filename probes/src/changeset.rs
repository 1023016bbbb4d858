use std::sync::Arc;

use crate::{
    Error, Meter, Name, Result,
    internal::{Ledger, MeterTally, Tally},
};

/// Difference of one meter within one group between two points in time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Change {
    meter: Name,
    count: u64,
    total: u64,
    inherent_total: u64,
}

impl Change {
    /// Name of the meter.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.meter
    }

    /// Number of outermost firings in the group.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Inclusive consumption of those firings.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// `total / count`, or 0 without firings.
    pub fn avg(&self) -> f64 {
        ratio(self.total, self.count)
    }

    /// Consumption of the group's firings excluding nested firings of other
    /// groups.
    #[inline]
    pub fn inherent_total(&self) -> u64 {
        self.inherent_total
    }

    /// `inherent_total / count`, or 0 without firings.
    ///
    /// `count` only includes the group's outermost firings while
    /// `inherent_total` includes nested ones too, so for recursive groups this
    /// is the inherent consumption per outermost firing, not per firing.
    pub fn inherent_avg(&self) -> f64 {
        ratio(self.inherent_total, self.count)
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.total == 0 && self.inherent_total == 0
    }
}

/// The changes of one name group: a probe name or any of its prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChangePoint {
    name: Name,
    changes: Vec<Change>,
}

impl ChangePoint {
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// One change per enabled meter, in reading order.
    pub fn changes(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn change(&self, meter: &Name) -> Option<&Change> {
        self.changes.iter().find(|c| c.name() == meter)
    }
}

/// Everything that changed on a thread between two savepoints.
///
/// `changes()` covers the whole thread; `changepoints()` lists every group
/// with a non-zero change, ordered by dotted path so parents precede their
/// children.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ChangeSet {
    changes: Vec<Change>,
    changepoints: Vec<ChangePoint>,
}

const THREAD_GROUP: &str = "<thread>";

impl ChangeSet {
    pub(crate) fn between(newer: &Ledger, older: &Ledger, meters: &[Meter]) -> Result<Self> {
        let changes = diff(THREAD_GROUP, &newer.thread, &older.thread, meters)?;

        let empty = Tally::new(meters.len());
        let mut changepoints = Vec::new();
        for (name, tally) in &newer.groups {
            let before = older.groups.get(name).unwrap_or(&empty);
            let changes = diff(name.path(), tally, before, meters)?;
            if changes.iter().any(|c| !c.is_zero()) {
                changepoints.push(ChangePoint {
                    name: name.clone(),
                    changes,
                });
            }
        }
        for (name, tally) in &older.groups {
            if !newer.groups.contains_key(name) {
                diff(name.path(), &empty, tally, meters)?;
            }
        }
        changepoints.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            changes,
            changepoints,
        })
    }

    /// Thread-level changes, one per enabled meter.
    pub fn changes(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    pub fn change(&self, meter: &Name) -> Option<&Change> {
        self.changes.iter().find(|c| c.name() == meter)
    }

    pub fn changepoints(&self) -> std::slice::Iter<'_, ChangePoint> {
        self.changepoints.iter()
    }

    pub fn changepoint(&self, name: &Name) -> Option<&ChangePoint> {
        self.changepoints
            .binary_search_by(|point| point.name.cmp(name))
            .ok()
            .map(|index| &self.changepoints[index])
    }

    /// Change points directly beneath `name`.
    pub fn children<'a>(&'a self, name: &'a Name) -> impl Iterator<Item = &'a ChangePoint> + 'a {
        self.changepoints
            .iter()
            .filter(move |point| point.name.prefix() == Some(name))
    }

    /// Change points of root names.
    pub fn roots(&self) -> impl Iterator<Item = &ChangePoint> {
        self.changepoints.iter().filter(|point| point.name.prefix().is_none())
    }

    /// True if nothing was metered in between.
    pub fn is_empty(&self) -> bool {
        self.changepoints.is_empty() && self.changes.iter().all(Change::is_zero)
    }
}

fn ratio(sum: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn diff(group: &str, newer: &Tally, older: &Tally, meters: &[Meter]) -> Result<Vec<Change>> {
    let negative = |meter: &Meter| Error::NegativeDelta {
        group: Arc::from(group),
        meter: meter.name().clone(),
    };

    meters
        .iter()
        .enumerate()
        .map(|(index, meter)| {
            let new = newer.meters.get(index).copied().unwrap_or_default();
            let old: MeterTally = older.meters.get(index).copied().unwrap_or_default();
            Ok(Change {
                meter: meter.name().clone(),
                count: newer.count.checked_sub(older.count).ok_or_else(|| negative(meter))?,
                total: new.total.checked_sub(old.total).ok_or_else(|| negative(meter))?,
                inherent_total: new
                    .inherent
                    .checked_sub(old.inherent)
                    .ok_or_else(|| negative(meter))?,
            })
        })
        .collect()
}
