use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    Config, Context, Environment, Error, Label, Meter, Name, Probe, Result, Setting, Value,
    extension::{InterceptorFactory, MeasureFactory, StrategyFactory},
    internal,
    label::LabelTable,
    measures::{CLOCK, ClockMeasure},
    meter::MeterRegistry,
    name::NameTable,
};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Owns the process-wide state of the metering system: interned names,
/// labels, meters and the registered extensions.
///
/// - Build one with [`Runtime::builder`] (or [`Runtime::new`] for a
///   config-only runtime).
/// - Intern names with `name`, `parse`, `parse_path` or `name_of`.
/// - Get the calling thread's [`Context`] with `context()`, or go straight
///   to probes with `create`, `begin` and `run`.
///
/// A runtime is a cheap, shareable handle. To make one available without
/// passing it around, [`install`](crate::install) it.
///
/// Every thread context keeps a handle to its runtime, so the runtime and its
/// interned names live until each thread that used it has exited or called
/// [`release_context`](Runtime::release_context). Short-lived runtimes used
/// from long-lived threads should release their contexts when done.
///
/// See also: [`Context`], [`Probe`], [`Config`].
#[derive(Clone)]
pub struct Runtime(Arc<RuntimeInner>);

struct RuntimeInner {
    id: u64,
    config: Config,
    names: Arc<NameTable>,
    labels: LabelTable,
    meters: MeterRegistry,
    enabled: Arc<[Meter]>,
    environment: Environment,
    strategies: Vec<Box<dyn StrategyFactory>>,
    interceptors: Vec<Box<dyn InterceptorFactory>>,
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        self.names.clear();
    }
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// A runtime with the built-in measures and no other extensions.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    pub(crate) fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// The configuration environment every context starts from.
    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.0.environment
    }

    /// The root name `value`. `value` is taken as a single segment.
    pub fn name(&self, value: &str) -> Name {
        self.0.names.name(value)
    }

    /// The name for a dotted path, e.g. `"db.query.select"`.
    pub fn parse(&self, value: &str) -> Name {
        self.0.names.parse(value, ".")
    }

    /// The name for a Rust path, e.g. `module_path!()`.
    pub fn parse_path(&self, value: &str) -> Name {
        self.0.names.parse(value, "::")
    }

    /// The name for the path of `T`, without generic arguments.
    pub fn name_of<T: ?Sized>(&self) -> Name {
        let path = std::any::type_name::<T>();
        let path = path.split_once('<').map_or(path, |(base, _)| base);
        self.parse_path(path)
    }

    /// The label for `value`, if it is built in or configured.
    pub fn label(&self, value: &str) -> Option<Label> {
        self.0.labels.get(value)
    }

    /// The meter named `name`, created without a measure if absent.
    pub fn meter(&self, name: &Name) -> Meter {
        self.0.meters.meter(name)
    }

    /// Every known meter, ordered by name.
    pub fn meters(&self) -> Vec<Meter> {
        self.0.meters.meters()
    }

    pub(crate) fn enabled_meters(&self) -> Arc<[Meter]> {
        self.0.enabled.clone()
    }

    pub(crate) fn strategy_factories(&self) -> impl Iterator<Item = &dyn StrategyFactory> {
        self.0.strategies.iter().map(|f| &**f)
    }

    pub(crate) fn interceptor_factories(&self) -> impl Iterator<Item = &dyn InterceptorFactory> {
        self.0.interceptors.iter().map(|f| &**f)
    }

    /// The calling thread's context, created on first use.
    pub fn context(&self) -> Context {
        internal::current_context(self)
    }

    /// Detaches the calling thread's context, e.g. before a pooled thread
    /// takes on unrelated work. The next `context()` call starts afresh.
    pub fn release_context(&self) -> bool {
        match internal::release_context(self) {
            Some(context) => {
                tracing::debug!(context = %context.name(), "Released thread context");
                true
            }
            None => false,
        }
    }

    /// An idle probe for `name` on the calling thread.
    pub fn create(&self, name: &Name) -> Probe {
        self.context().create(name)
    }

    /// A firing probe for `name` on the calling thread.
    pub fn begin(&self, name: &Name) -> Probe {
        self.context().begin(name)
    }

    /// Meters `f` under `name` on the calling thread.
    pub fn run<T>(&self, name: &Name, f: impl FnOnce() -> T) -> T {
        self.context().run(name, f)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("id", &self.0.id)
            .field("meters", &self.0.enabled)
            .field("strategies", &self.0.strategies.len())
            .field("interceptors", &self.0.interceptors.len())
            .finish()
    }
}

/// Collects configuration and extensions for a [`Runtime`].
///
/// ```rust
/// use probes::{Config, Runtime, interceptors::Tracer};
///
/// let runtime = Runtime::builder()
///     .with_config(Config::default().disable("health"))
///     .with_interceptor(Tracer)
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    config: Config,
    measures: Vec<(String, Box<dyn MeasureFactory>)>,
    strategies: Vec<Box<dyn StrategyFactory>>,
    interceptors: Vec<Box<dyn InterceptorFactory>>,
}

impl RuntimeBuilder {
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Plugs a measure into the meter with the dotted name `meter`. The meter
    /// is read only if it is also enabled in the config.
    pub fn with_measure(mut self, meter: &str, factory: impl MeasureFactory) -> Self {
        self.measures.push((meter.to_string(), Box::new(factory)));
        self
    }

    pub fn with_strategy(mut self, factory: impl StrategyFactory) -> Self {
        self.strategies.push(Box::new(factory));
        self
    }

    pub fn with_interceptor(mut self, factory: impl InterceptorFactory) -> Self {
        self.interceptors.push(Box::new(factory));
        self
    }

    /// Validates the config, initializes every factory with the
    /// configuration environment and builds the runtime.
    pub fn build(self) -> Result<Runtime> {
        let Self {
            config,
            mut measures,
            mut strategies,
            mut interceptors,
        } = self;

        let labels = LabelTable::new(config.labels.iter().map(String::as_str));
        let mut rules: HashMap<String, Vec<Label>> = HashMap::new();
        for rule in &config.rules {
            let label = labels
                .get(&rule.label)
                .ok_or_else(|| Error::Config(format!("unknown label '{}'", rule.label)))?;
            let attached = rules.entry(rule.name.clone()).or_default();
            if !attached.contains(&label) {
                attached.push(label);
            }
        }
        let names = NameTable::new(rules);

        let mut environment = Environment::new();
        for (key, setting) in &config.settings {
            let value = match setting {
                Setting::Long(v) => Value::Long(*v),
                Setting::Boolean(v) => Value::Boolean(*v),
                Setting::Int(v) => Value::Int(*v),
                Setting::Double(v) => Value::Double(*v),
                Setting::String(v) => Value::String(Arc::from(v.as_str())),
                Setting::Name(v) => Value::Name(names.parse(v, ".")),
            };
            environment.set(&names.parse(key, "."), value);
        }

        if !measures.iter().any(|(name, _)| name == CLOCK) {
            measures.push((CLOCK.to_string(), Box::new(ClockMeasure)));
        }
        let meters = MeterRegistry::new();
        for (name, mut factory) in measures {
            factory
                .init(&environment)
                .map_err(|e| Error::ExtensionInit(format!("measure '{name}': {e}").into()))?;
            meters.register(&names.parse(&name, "."), Arc::from(factory))?;
        }

        let enabled = config
            .meters
            .iter()
            .map(|name| {
                let meter = meters.meter(&names.parse(name, "."));
                if meter.is_measured() {
                    Ok(meter)
                } else {
                    Err(Error::UnknownMeasure(name.clone()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        for factory in &mut strategies {
            factory
                .init(&environment)
                .map_err(|e| Error::ExtensionInit(format!("strategy: {e}").into()))?;
        }
        for factory in &mut interceptors {
            factory
                .init(&environment)
                .map_err(|e| Error::ExtensionInit(format!("interceptor: {e}").into()))?;
        }

        let runtime = Runtime(Arc::new(RuntimeInner {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            config,
            names,
            labels,
            meters,
            enabled: enabled.into(),
            environment,
            strategies,
            interceptors,
        }));
        tracing::debug!(
            runtime = runtime.0.id,
            meters = ?runtime.0.config.meters,
            strategies = runtime.0.strategies.len(),
            interceptors = runtime.0.interceptors.len(),
            "Built probes runtime"
        );
        Ok(runtime)
    }
}
