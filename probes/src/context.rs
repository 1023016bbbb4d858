use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    collections::HashMap,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
    sync::Arc,
};

use crate::{
    ChangeSet, Counter, Environment, Error, Meter, Name, Probe, Reading, Result, Runtime,
    SavePoint,
    extension::{Interceptor, Measure, Strategy},
    internal::{Close, Ledger, ProbeStack},
};

/// The per-thread half of a [`Runtime`].
///
/// A context owns everything a thread accumulates: the stack of open
/// firings, per-group tallies, counters, the thread's [`Environment`] and the
/// per-thread instances of every registered extension. It is created lazily
/// by [`Runtime::context`] and lives as long as the thread (or until
/// [`Runtime::release_context`]).
///
/// Use it to:
/// - `create(name)` / `begin(name)`: get a probe for a name
/// - `run(name, f)`: meter a closure
/// - `savepoint()` / `compare(&savepoint)`: measure what happened in between
/// - `counter(name)`: get a named per-thread counter
///
/// A context is `!Send`: handles are cheap clones of the same thread-owned
/// state and cannot leave the thread.
#[derive(Clone)]
pub struct Context(Rc<ContextInner>);

struct ContextInner {
    id: u128,
    name: Arc<str>,
    runtime: Runtime,
    meters: Arc<[Meter]>,
    measures: RefCell<Vec<Option<Box<dyn Measure>>>>,
    strategies: RefCell<Vec<Box<dyn Strategy>>>,
    interceptors: RefCell<Vec<Box<dyn Interceptor>>>,
    stack: RefCell<ProbeStack>,
    ledger: RefCell<Ledger>,
    environment: RefCell<Environment>,
    counters: RefCell<HashMap<Name, Counter>>,
    next_frame: Cell<u64>,
    next_savepoint: Cell<u64>,
}

impl Context {
    pub(crate) fn new(runtime: &Runtime) -> Self {
        let meters = runtime.enabled_meters();
        let thread = std::thread::current();
        let name: Arc<str> = match thread.name() {
            Some(name) => Arc::from(name),
            None => format!("{:?}", thread.id()).into(),
        };

        let context = Context(Rc::new(ContextInner {
            id: uuid::Uuid::new_v4().as_u128(),
            name,
            runtime: runtime.clone(),
            stack: RefCell::new(ProbeStack::new(meters.len(), runtime.config().stack_capacity)),
            ledger: RefCell::new(Ledger::new(meters.len())),
            environment: RefCell::new(runtime.environment().clone()),
            meters,
            measures: RefCell::new(Vec::new()),
            strategies: RefCell::new(Vec::new()),
            interceptors: RefCell::new(Vec::new()),
            counters: RefCell::new(HashMap::new()),
            next_frame: Cell::new(0),
            next_savepoint: Cell::new(0),
        }));

        // Factories receive the context itself, so instances are attached
        // once it exists.
        let measures = context
            .0
            .meters
            .iter()
            .map(|meter| {
                let factory = meter.measure()?;
                catch_unwind(AssertUnwindSafe(|| factory.create(&context)))
                    .inspect_err(|_| tracing::error!(meter = %meter, "Measure factory panicked"))
                    .ok()
            })
            .collect();
        *context.0.measures.borrow_mut() = measures;

        let strategies = runtime
            .strategy_factories()
            .filter_map(|factory| {
                catch_unwind(AssertUnwindSafe(|| factory.create(&context)))
                    .inspect_err(|_| tracing::error!("Strategy factory panicked"))
                    .ok()
            })
            .collect();
        *context.0.strategies.borrow_mut() = strategies;

        let interceptors = runtime
            .interceptor_factories()
            .filter_map(|factory| {
                catch_unwind(AssertUnwindSafe(|| factory.create(&context)))
                    .inspect_err(|_| tracing::error!("Interceptor factory panicked"))
                    .ok()
            })
            .collect();
        *context.0.interceptors.borrow_mut() = interceptors;

        tracing::debug!(
            context = %context.name(),
            meters = context.0.meters.len(),
            "Created thread context"
        );
        context
    }

    /// Unique id of this context, distinct for every thread and runtime.
    #[inline]
    pub fn id(&self) -> u128 {
        self.0.id
    }

    /// Name of the thread the context was created on.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.0.runtime
    }

    /// The meters enabled for this context, in reading order.
    pub fn meters(&self) -> impl Iterator<Item = &Meter> {
        self.0.meters.iter()
    }

    /// Returns an idle probe for `name`.
    pub fn create(&self, name: &Name) -> Probe {
        Probe::new(self.clone(), name.clone())
    }

    /// Returns a probe for `name` that is already firing.
    pub fn begin(&self, name: &Name) -> Probe {
        let mut probe = self.create(name);
        probe.fire();
        probe
    }

    /// Meters `f` under `name`. The probe is ended even if `f` panics.
    pub fn run<T>(&self, name: &Name, f: impl FnOnce() -> T) -> T {
        let _probe = self.begin(name);
        f()
    }

    /// Number of open firings on this thread.
    pub fn depth(&self) -> usize {
        self.0.stack.borrow().depth()
    }

    /// Name of the innermost open firing, if any.
    pub fn current(&self) -> Option<Name> {
        self.0.stack.borrow().top().cloned()
    }

    /// The counter named `name`, created at zero on first use.
    pub fn counter(&self, name: &Name) -> Counter {
        self.0
            .counters
            .borrow_mut()
            .entry(name.clone())
            .or_insert_with(|| Counter::new(name.clone()))
            .clone()
    }

    pub fn environment(&self) -> Ref<'_, Environment> {
        self.0.environment.borrow()
    }

    pub fn environment_mut(&self) -> RefMut<'_, Environment> {
        self.0.environment.borrow_mut()
    }

    /// Captures everything accumulated so far.
    pub fn savepoint(&self) -> SavePoint {
        SavePoint::new(
            self.0.id,
            self.next_savepoint(),
            self.0.meters.clone(),
            self.0.ledger.borrow().clone(),
        )
    }

    /// Re-captures into an existing savepoint, reusing its buffers.
    pub fn refresh(&self, savepoint: &mut SavePoint) -> Result<()> {
        self.check_owner(savepoint)?;
        let seq = self.next_savepoint();
        savepoint.overwrite(seq, &self.0.ledger.borrow());
        Ok(())
    }

    /// What happened on this thread since `older` was captured.
    pub fn compare(&self, older: &SavePoint) -> Result<ChangeSet> {
        self.check_owner(older)?;
        ChangeSet::between(&self.0.ledger.borrow(), older.ledger(), &self.0.meters)
    }

    fn check_owner(&self, savepoint: &SavePoint) -> Result<()> {
        if savepoint.context_id() != self.0.id {
            return Err(Error::ContextMismatch {
                expected: self.0.id,
                found: savepoint.context_id(),
            });
        }
        Ok(())
    }

    fn next_savepoint(&self) -> u64 {
        let seq = self.0.next_savepoint.get() + 1;
        self.0.next_savepoint.set(seq);
        seq
    }
}

/// Probe plumbing.
impl Context {
    /// Net vote of the strategy chain: the sum of the signs of every vote.
    ///
    /// A strategy that fires probes itself sees an empty chain.
    pub(crate) fn vote(&self, probe: &Probe) -> i32 {
        let Ok(mut strategies) = self.0.strategies.try_borrow_mut() else {
            return 0;
        };
        let mut net = 0;
        strategies.retain_mut(|strategy| {
            match catch_unwind(AssertUnwindSafe(|| strategy.vote(probe))) {
                Ok(vote) => {
                    net += vote.signum();
                    true
                }
                Err(_) => {
                    tracing::error!(probe = %probe.name(), "Strategy panicked, removing");
                    false
                }
            }
        });
        net
    }

    /// Takes one value from every enabled meter into `readings`.
    ///
    /// Returns false if the measures are busy, i.e. a measure fired a probe
    /// while being read. `readings` are then cleared and the firing must not
    /// be metered.
    pub(crate) fn read(&self, readings: &mut Vec<Reading>) -> bool {
        if readings.len() != self.0.meters.len() {
            *readings = self
                .0
                .meters
                .iter()
                .map(|meter| Reading::new(meter.name().clone()))
                .collect();
        }
        let Ok(mut measures) = self.0.measures.try_borrow_mut() else {
            tracing::warn!("Measure fired a probe while being read; firing left unmetered");
            readings.iter_mut().for_each(Reading::clear);
            return false;
        };

        for (slot, reading) in measures.iter_mut().zip(readings.iter_mut()) {
            let value = match slot
                .as_mut()
                .map(|measure| catch_unwind(AssertUnwindSafe(|| measure.value())))
            {
                Some(Ok(value)) => value,
                Some(Err(_)) => {
                    tracing::error!(meter = %reading.name(), "Measure panicked, removing");
                    *slot = None;
                    reading.high()
                }
                None => reading.high(),
            };
            if !reading.update(value) {
                tracing::warn!(meter = %reading.name(), value, "Measure went backwards");
            }
        }
        true
    }

    pub(crate) fn push(&self, name: &Name, metered: bool) -> u64 {
        let seq = self.0.next_frame.get() + 1;
        self.0.next_frame.set(seq);
        self.0.stack.borrow_mut().push(seq, name, metered);
        seq
    }

    pub(crate) fn pop(&self, probe: &Name, seq: u64, readings: &[Reading]) {
        let mut ledger = self.0.ledger.borrow_mut();
        match self.0.stack.borrow_mut().close(seq, readings, &mut ledger) {
            Close::Closed { abandoned: 0 } => {}
            Close::Closed { abandoned } => {
                tracing::warn!(probe = %probe, abandoned, "Ended with nested firings still open");
            }
            Close::NotFound => {
                tracing::trace!(probe = %probe, "Firing was already discarded");
            }
        }
    }

    pub(crate) fn intercept_begin(&self, probe: &Probe) {
        self.intercept(probe, false, |interceptor, probe| interceptor.begin(probe));
    }

    pub(crate) fn intercept_end(&self, probe: &Probe) {
        self.intercept(probe, true, |interceptor, probe| interceptor.end(probe));
    }

    fn intercept(&self, probe: &Probe, reverse: bool, f: impl Fn(&mut dyn Interceptor, &Probe)) {
        // Firings made by an interceptor are not intercepted again.
        let Ok(mut chain) = self.0.interceptors.try_borrow_mut() else {
            return;
        };
        let length = chain.len();
        let mut failed = Vec::new();
        for step in 0..length {
            let index = if reverse { length - 1 - step } else { step };
            let interceptor = chain[index].as_mut();
            if catch_unwind(AssertUnwindSafe(|| f(interceptor, probe))).is_err() {
                tracing::error!(probe = %probe.name(), "Interceptor panicked, removing");
                failed.push(index);
            }
        }
        failed.sort_unstable();
        for index in failed.into_iter().rev() {
            chain.remove(index);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &format_args!("{:032x}", self.0.id))
            .field("name", &self.0.name)
            .field("meters", &self.0.meters)
            .field("depth", &self.depth())
            .finish()
    }
}
