use std::collections::HashMap;

use crate::{Name, Reading, internal::Ledger};

struct Frame {
    seq: u64,
    name: Name,
    metered: bool,
    /// Per-meter consumption of nested metered firings that already closed.
    children: Vec<u64>,
}

/// Outcome of [`ProbeStack::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Close {
    /// The frame was closed; `abandoned` frames above it were discarded.
    Closed { abandoned: usize },
    /// No open frame carries the sequence number.
    NotFound,
}

/// The open firings of one thread, innermost last.
///
/// Besides the frames themselves the stack tracks, per name group, how many
/// metered frames belonging to that group are open. A firing adds to a
/// group's count and total only when it is the group's outermost open
/// firing, so recursion and nested calls within the same subtree are not
/// counted twice.
pub(crate) struct ProbeStack {
    frames: Vec<Frame>,
    open: HashMap<Name, u32>,
    open_metered: u32,
    spare: Vec<Vec<u64>>,
    meter_count: usize,
}

impl ProbeStack {
    pub fn new(meter_count: usize, capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            open: HashMap::new(),
            open_metered: 0,
            spare: Vec::new(),
            meter_count,
        }
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Name of the innermost open firing.
    pub fn top(&self) -> Option<&Name> {
        self.frames.last().map(|f| &f.name)
    }

    pub fn push(&mut self, seq: u64, name: &Name, metered: bool) {
        let mut children = self.spare.pop().unwrap_or_default();
        children.clear();
        if metered {
            children.resize(self.meter_count, 0);
            for group in name.ancestors() {
                *self.open.entry(group.clone()).or_insert(0) += 1;
            }
            self.open_metered += 1;
        }
        self.frames.push(Frame {
            seq,
            name: name.clone(),
            metered,
            children,
        });
    }

    /// Closes the frame opened with `seq`, recording a metered frame into
    /// `ledger` and charging its consumption to the nearest metered frame
    /// below it. A metered frame closed without a full set of readings is
    /// not recorded.
    ///
    /// Frames opened after it and still open are discarded without being
    /// recorded. What their own closed children consumed is handed down to
    /// the nearest metered frame below, so it is not charged twice.
    pub fn close(&mut self, seq: u64, readings: &[Reading], ledger: &mut Ledger) -> Close {
        let Some(position) = self.frames.iter().rposition(|f| f.seq == seq) else {
            return Close::NotFound;
        };

        let abandoned = self.frames.len() - position - 1;
        while self.frames.len() > position + 1 {
            if let Some(frame) = self.frames.pop() {
                tracing::warn!(probe = %frame.name, "Discarding firing that was never ended");
                if frame.metered {
                    self.charge_parent(&frame.children);
                }
                self.release(frame);
            }
        }

        let Some(frame) = self.frames.pop() else {
            return Close::NotFound;
        };

        if frame.metered && readings.len() == self.meter_count {
            let deltas: Vec<u64> = readings.iter().map(Reading::delta).collect();
            let open = &self.open;
            ledger.record(
                &frame.name,
                &deltas,
                &frame.children,
                self.open_metered == 1,
                |group| open.get(group).copied() == Some(1),
            );
            self.charge_parent(&deltas);
        } else if frame.metered {
            self.charge_parent(&frame.children);
        }

        self.release(frame);
        Close::Closed { abandoned }
    }

    /// Adds `deltas` to the children sums of the innermost open metered frame.
    fn charge_parent(&mut self, deltas: &[u64]) {
        if let Some(parent) = self.frames.iter_mut().rev().find(|f| f.metered) {
            for (sum, delta) in parent.children.iter_mut().zip(deltas) {
                *sum = sum.saturating_add(*delta);
            }
        }
    }

    fn release(&mut self, frame: Frame) {
        if frame.metered {
            for group in frame.name.ancestors() {
                if let Some(count) = self.open.get_mut(group) {
                    *count -= 1;
                    if *count == 0 {
                        self.open.remove(group);
                    }
                }
            }
            self.open_metered = self.open_metered.saturating_sub(1);
        }
        self.spare.push(frame.children);
    }
}
