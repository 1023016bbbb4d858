use std::collections::HashMap;

use crate::Name;

/// Accumulated consumption of one meter within one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MeterTally {
    /// Inclusive consumption of the group's outermost firings.
    pub total: u64,
    /// Exclusive consumption of every firing in the group.
    pub inherent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    /// Number of outermost firings in the group.
    pub count: u64,
    /// One entry per enabled meter, in context meter order.
    pub meters: Vec<MeterTally>,
}

impl Tally {
    pub fn new(meter_count: usize) -> Self {
        Self {
            count: 0,
            meters: vec![MeterTally::default(); meter_count],
        }
    }

    fn add(&mut self, outermost: bool, deltas: &[u64], children: &[u64]) {
        if outermost {
            self.count += 1;
        }
        for ((tally, delta), child) in self.meters.iter_mut().zip(deltas).zip(children) {
            if outermost {
                tally.total = tally.total.saturating_add(*delta);
            }
            tally.inherent = tally.inherent.saturating_add(delta.saturating_sub(*child));
        }
    }
}

/// Everything a context has accumulated since it was created: one tally for
/// the whole thread plus one per name group (every prefix of every fired
/// probe name).
///
/// The ledger is append-only; a savepoint is a clone of it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Ledger {
    pub thread: Tally,
    pub groups: HashMap<Name, Tally>,
}

impl Ledger {
    pub fn new(meter_count: usize) -> Self {
        Self {
            thread: Tally::new(meter_count),
            groups: HashMap::new(),
        }
    }

    /// Rolls a closed metered frame into the thread tally and the tally of
    /// every group the probe's name belongs to.
    ///
    /// `outermost(group)` tells whether no other open metered frame belongs
    /// to `group`; only those firings add to counts and totals.
    pub fn record(
        &mut self,
        name: &Name,
        deltas: &[u64],
        children: &[u64],
        thread_outermost: bool,
        outermost: impl Fn(&Name) -> bool,
    ) {
        if let Some((meter, (delta, child))) = deltas
            .iter()
            .zip(children)
            .enumerate()
            .find(|(_, (delta, child))| child > delta)
        {
            tracing::warn!(
                probe = %name,
                meter,
                delta,
                child,
                "Nested firings consumed more than their parent; inherent clamped to zero"
            );
        }

        let meter_count = self.thread.meters.len();
        self.thread.add(thread_outermost, deltas, children);
        for group in name.ancestors() {
            self.groups
                .entry(group.clone())
                .or_insert_with(|| Tally::new(meter_count))
                .add(outermost(group), deltas, children);
        }
    }
}
