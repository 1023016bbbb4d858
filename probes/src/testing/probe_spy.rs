use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Context, Name, Probe, ProbeState,
    extension::{Interceptor, InterceptorFactory},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpyEventKind {
    Begin,
    End,
}

/// One intercepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpyEvent {
    pub kind: SpyEventKind,
    pub probe: Name,
    /// Probe state as seen by the interceptor.
    pub state: ProbeState,
    /// State of the firing the call belongs to.
    pub firing: ProbeState,
    /// Per-meter deltas after the call, in reading order.
    pub deltas: Vec<u64>,
}

/// Interceptor recording every begin and end, from every thread.
#[derive(Debug, Clone, Default)]
pub struct ProbeSpy {
    events: Arc<Mutex<Vec<SpyEvent>>>,
}

impl ProbeSpy {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in call order.
    pub fn events(&self) -> Vec<SpyEvent> {
        self.lock().clone()
    }

    pub fn begins(&self) -> Vec<SpyEvent> {
        self.of_kind(SpyEventKind::Begin)
    }

    pub fn ends(&self) -> Vec<SpyEvent> {
        self.of_kind(SpyEventKind::End)
    }

    /// Number of recorded events for `probe`.
    pub fn count_for(&self, probe: &Name) -> usize {
        self.lock().iter().filter(|e| &e.probe == probe).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn of_kind(&self, kind: SpyEventKind) -> Vec<SpyEvent> {
        self.lock().iter().filter(|e| e.kind == kind).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SpyEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, kind: SpyEventKind, probe: &Probe) {
        self.lock().push(SpyEvent {
            kind,
            probe: probe.name().clone(),
            state: probe.state(),
            firing: probe.last_state(),
            deltas: probe.readings().map(|r| r.delta()).collect(),
        });
    }
}

impl InterceptorFactory for ProbeSpy {
    fn create(&self, _context: &Context) -> Box<dyn Interceptor> {
        Box::new(self.clone())
    }
}

impl Interceptor for ProbeSpy {
    fn begin(&mut self, probe: &Probe) {
        self.record(SpyEventKind::Begin, probe);
    }

    fn end(&mut self, probe: &Probe) {
        self.record(SpyEventKind::End, probe);
    }
}
