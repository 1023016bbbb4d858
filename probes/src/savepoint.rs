use std::sync::Arc;

use crate::{ChangeSet, Error, Meter, Result, internal::Ledger};

/// A snapshot of everything a [`Context`](crate::Context) has accumulated.
///
/// Savepoints are captured with [`Context::savepoint`](crate::Context::savepoint)
/// and compared either against the live context
/// ([`Context::compare`](crate::Context::compare)) or against each other
/// ([`SavePoint::compare`]). They are plain data and may be sent to other
/// threads, but only compare with savepoints of the same context.
#[derive(Debug, Clone)]
pub struct SavePoint {
    context: u128,
    seq: u64,
    meters: Arc<[Meter]>,
    ledger: Ledger,
}

impl SavePoint {
    pub(crate) fn new(context: u128, seq: u64, meters: Arc<[Meter]>, ledger: Ledger) -> Self {
        Self {
            context,
            seq,
            meters,
            ledger,
        }
    }

    /// Id of the context this savepoint was captured on.
    #[inline]
    pub fn context_id(&self) -> u128 {
        self.context
    }

    /// Capture order within the owning context, starting at 1.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn meters(&self) -> impl Iterator<Item = &Meter> {
        self.meters.iter()
    }

    /// What happened between `older` and this savepoint.
    ///
    /// Fails if `older` belongs to another context or was captured after
    /// `self`.
    pub fn compare(&self, older: &SavePoint) -> Result<ChangeSet> {
        if older.context != self.context {
            return Err(Error::ContextMismatch {
                expected: self.context,
                found: older.context,
            });
        }
        if older.seq > self.seq {
            return Err(Error::SavePointOrder {
                newer: self.seq,
                older: older.seq,
            });
        }
        ChangeSet::between(&self.ledger, &older.ledger, &self.meters)
    }

    pub(crate) fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn overwrite(&mut self, seq: u64, ledger: &Ledger) {
        self.seq = seq;
        self.ledger.clone_from(ledger);
    }
}
