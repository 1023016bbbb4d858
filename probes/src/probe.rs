use std::fmt;

use crate::{Context, Error, Name, Reading, Result};

/// Lifecycle of a [`Probe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeState {
    #[default]
    Idle,
    /// Firing, with readings taken at `begin`.
    Metered,
    /// Firing, but voted out (or disabled): nothing is read or accounted.
    Unmetered,
}

impl ProbeState {
    /// `0` when idle, positive while metered, negative while unmetered.
    pub fn value(self) -> i32 {
        match self {
            ProbeState::Idle => 0,
            ProbeState::Metered => 1,
            ProbeState::Unmetered => -1,
        }
    }

    #[inline]
    pub fn is_idle(self) -> bool {
        self == ProbeState::Idle
    }

    #[inline]
    pub fn is_firing(self) -> bool {
        !self.is_idle()
    }
}

/// A named, thread-owned measurement point.
///
/// A probe fires between [`begin`](Probe::begin) and [`end`](Probe::end).
/// While metered it reads every enabled meter at both ends and charges the
/// difference to its name group; nested firings on the same thread are
/// charged to their own groups and subtracted from the enclosing firing's
/// inherent consumption.
///
/// The same probe can fire any number of times; its readings always hold the
/// values of the last metered firing. Dropping a firing probe ends it.
///
/// ```ignore
/// let mut probe = context.create(&runtime.parse("db.query"));
/// probe.begin()?;
/// run_query();
/// probe.end();
/// let elapsed = probe.reading(&runtime.name("clock")).map(|r| r.delta());
/// ```
pub struct Probe {
    context: Context,
    name: Name,
    state: ProbeState,
    last: ProbeState,
    readings: Vec<Reading>,
    frame: u64,
}

impl Probe {
    pub(crate) fn new(context: Context, name: Name) -> Self {
        Self {
            context,
            name,
            state: ProbeState::Idle,
            last: ProbeState::Idle,
            readings: Vec::new(),
            frame: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[inline]
    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// State of the most recent firing, kept after the probe went idle.
    #[inline]
    pub fn last_state(&self) -> ProbeState {
        self.last
    }

    /// One reading per enabled meter; empty until the first metered firing.
    pub fn readings(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    /// The reading of the meter named `meter`.
    pub fn reading(&self, meter: &Name) -> Option<&Reading> {
        self.readings.iter().find(|r| r.name() == meter)
    }

    /// Starts a firing. Fails if the probe is already firing.
    pub fn begin(&mut self) -> Result<()> {
        if self.state.is_firing() {
            return Err(Error::AlreadyFiring(self.name.clone()));
        }
        self.fire();
        Ok(())
    }

    /// Ends the current firing. Ending an idle probe does nothing.
    pub fn end(&mut self) {
        if self.state.is_idle() {
            tracing::trace!(probe = %self.name, "End of an idle probe ignored");
            return;
        }
        let read = self.state == ProbeState::Unmetered || self.context.read(&mut self.readings);
        if read {
            self.context.pop(&self.name, self.frame, &self.readings);
        } else {
            self.last = ProbeState::Unmetered;
            self.context.pop(&self.name, self.frame, &[]);
        }
        self.state = ProbeState::Idle;
        tracing::trace!(probe = %self.name, metered = self.last == ProbeState::Metered, "end");
        self.context.intercept_end(self);
    }

    /// Fires the probe around `f`. The firing is ended even if `f` panics.
    pub fn run<T>(&mut self, f: impl FnOnce() -> T) -> Result<T> {
        self.begin()?;
        let firing = Firing(self);
        let value = f();
        drop(firing);
        Ok(value)
    }

    pub(crate) fn fire(&mut self) {
        let metered = !self.name.is_disabled()
            && self.context.vote(self) >= 0
            && self.context.read(&mut self.readings);
        self.frame = self.context.push(&self.name, metered);
        self.state = if metered {
            ProbeState::Metered
        } else {
            ProbeState::Unmetered
        };
        self.last = self.state;
        tracing::trace!(probe = %self.name, metered, "begin");
        self.context.intercept_begin(self);
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if self.state.is_firing() {
            self.end();
        }
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("readings", &self.readings)
            .finish()
    }
}

struct Firing<'a>(&'a mut Probe);

impl Drop for Firing<'_> {
    fn drop(&mut self) {
        self.0.end();
    }
}
