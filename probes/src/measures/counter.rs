use crate::{
    Context, Counter,
    extension::{Measure, MeasureFactory},
};

/// Exposes the context counter with the given dotted name as a meter.
///
/// ```rust
/// use probes::{Config, Runtime, measures::CounterMeasure};
///
/// let runtime = Runtime::builder()
///     .with_config(Config::default().with_meter("rows"))
///     .with_measure("rows", CounterMeasure::new("db.rows"))
///     .build()
///     .unwrap();
///
/// let rows = runtime.context().counter(&runtime.parse("db.rows"));
/// let probe = runtime.begin(&runtime.parse("db.scan"));
/// rows.inc_by(128).unwrap();
/// drop(probe);
/// ```
#[derive(Debug, Clone)]
pub struct CounterMeasure {
    counter: String,
}

impl CounterMeasure {
    pub fn new(counter: &str) -> Self {
        Self {
            counter: counter.to_string(),
        }
    }
}

impl MeasureFactory for CounterMeasure {
    fn create(&self, context: &Context) -> Box<dyn Measure> {
        let name = context.runtime().parse(&self.counter);
        Box::new(CounterValue(context.counter(&name)))
    }
}

struct CounterValue(Counter);

impl Measure for CounterValue {
    fn value(&mut self) -> u64 {
        self.0.value()
    }
}
