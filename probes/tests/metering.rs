mod common;

use std::{
    cell::RefCell,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use common::{Ticks, runtime, runtime_with};
use probes::{
    Config, Context, Error, Probe, ProbeState, Runtime,
    extension::{Interceptor, InterceptorFactory, Measure, MeasureFactory, Strategy, StrategyFactory},
};

#[test]
fn nested_probes_split_inherent_and_inclusive() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let request = runtime.parse("http.request");
    let query = runtime.parse("db.query");
    let before = ctx.savepoint();

    let mut outer = ctx.create(&request);
    outer.begin().unwrap();
    ticks.advance(10);
    let mut inner = ctx.begin(&query);
    ticks.advance(15);
    inner.end();
    ticks.advance(15);
    outer.end();

    assert_eq!(outer.reading(&meter).unwrap().delta(), 40);
    assert_eq!(inner.reading(&meter).unwrap().delta(), 15);

    let changes = ctx.compare(&before).unwrap();
    let outer_change = changes.changepoint(&request).unwrap().change(&meter).unwrap();
    assert_eq!(outer_change.count(), 1);
    assert_eq!(outer_change.total(), 40);
    assert_eq!(outer_change.inherent_total(), 25);

    let inner_change = changes.changepoint(&query).unwrap().change(&meter).unwrap();
    assert_eq!(inner_change.total(), 15);
    assert_eq!(inner_change.inherent_total(), 15);

    let db = changes.changepoint(&runtime.name("db")).unwrap().change(&meter).unwrap();
    assert_eq!(db.total(), 15);

    let thread = changes.change(&meter).unwrap();
    assert_eq!(thread.count(), 1);
    assert_eq!(thread.total(), 40);
    assert_eq!(thread.inherent_total(), 40);
}

#[test]
fn refiring_a_probe_accumulates() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let name = runtime.parse("job.step");
    let before = ctx.savepoint();

    let mut probe = ctx.create(&name);
    for _ in 0..5 {
        probe.run(|| ticks.advance(7)).unwrap();
        assert_eq!(probe.reading(&meter).unwrap().delta(), 7);
    }

    let changes = ctx.compare(&before).unwrap();
    let change = changes.changepoint(&name).unwrap().change(&meter).unwrap();
    assert_eq!(change.count(), 5);
    assert_eq!(change.total(), 35);
    assert_eq!(change.avg(), 7.0);
    assert_eq!(change.inherent_avg(), 7.0);
}

#[test]
fn recursion_is_counted_once_per_outermost_call() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let name = runtime.parse("fib");
    let before = ctx.savepoint();

    fn recurse(ctx: &Context, name: &probes::Name, ticks: &Ticks, depth: u32) {
        ctx.run(name, || {
            ticks.advance(1);
            if depth > 0 {
                recurse(ctx, name, ticks, depth - 1);
            }
        });
    }
    recurse(&ctx, &name, &ticks, 3);

    let changes = ctx.compare(&before).unwrap();
    let change = changes.changepoint(&name).unwrap().change(&meter).unwrap();
    assert_eq!(change.count(), 1);
    assert_eq!(change.total(), 4);
    assert_eq!(change.inherent_total(), 4);
}

#[test]
fn begin_on_a_firing_probe_is_rejected() {
    let (runtime, _ticks) = runtime();
    let mut probe = runtime.create(&runtime.name("once"));
    probe.begin().unwrap();
    assert!(matches!(probe.begin(), Err(Error::AlreadyFiring(_))));
    assert_eq!(probe.state(), ProbeState::Metered);
    assert_eq!(runtime.context().depth(), 1);
    probe.end();
    assert_eq!(probe.state(), ProbeState::Idle);
    assert_eq!(runtime.context().depth(), 0);

    // ending an idle probe is tolerated
    probe.end();
    assert_eq!(probe.state().value(), 0);
}

#[test]
fn disabled_names_fire_unmetered() {
    let (runtime, ticks) = runtime_with(Config::default().disable("health"));
    let ctx = runtime.context();
    let before = ctx.savepoint();

    let mut probe = ctx.begin(&runtime.parse("health.live"));
    assert_eq!(probe.state(), ProbeState::Unmetered);
    assert_eq!(probe.state().value(), -1);
    assert_eq!(ctx.depth(), 1);
    ticks.advance(3);
    probe.end();

    assert_eq!(probe.readings().count(), 0);
    assert!(ctx.compare(&before).unwrap().is_empty());
}

#[test]
fn unmetered_firing_keeps_nesting_intact() {
    let (runtime, ticks) = runtime_with(Config::default().disable("quiet"));
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let before = ctx.savepoint();

    ctx.run(&runtime.name("loud"), || {
        ctx.run(&runtime.name("quiet"), || {
            ctx.run(&runtime.name("inner"), || ticks.advance(4));
        });
        ticks.advance(6);
    });

    let changes = ctx.compare(&before).unwrap();
    let loud = changes.changepoint(&runtime.name("loud")).unwrap().change(&meter).unwrap();
    assert_eq!(loud.total(), 10);
    assert_eq!(loud.inherent_total(), 6);
    assert!(changes.changepoint(&runtime.name("quiet")).is_none());
}

struct Veto {
    prefix: &'static str,
    vote: i32,
}

struct VetoStrategy {
    prefix: probes::Name,
    vote: i32,
}

impl Strategy for VetoStrategy {
    fn vote(&mut self, probe: &Probe) -> i32 {
        if probe.name().starts_with(&self.prefix) { self.vote } else { 0 }
    }
}

impl StrategyFactory for Veto {
    fn create(&self, context: &Context) -> Box<dyn Strategy> {
        Box::new(VetoStrategy {
            prefix: context.runtime().parse(self.prefix),
            vote: self.vote,
        })
    }
}

fn voting_runtime(votes: Vec<Veto>) -> (Runtime, Ticks) {
    let ticks = Ticks::default();
    let builder = Runtime::builder()
        .with_config(Config::default().with_meters(["ticks"]))
        .with_measure("ticks", ticks.clone());
    let runtime = votes
        .into_iter()
        .fold(builder, |builder, vote| builder.with_strategy(vote))
        .build()
        .unwrap();
    (runtime, ticks)
}

#[test]
fn negative_net_vote_leaves_firing_unmetered() {
    let (runtime, _ticks) = voting_runtime(vec![Veto { prefix: "sampled", vote: -5 }]);
    let probe = runtime.begin(&runtime.parse("sampled.out"));
    assert_eq!(probe.state(), ProbeState::Unmetered);
    let other = runtime.begin(&runtime.parse("kept"));
    assert_eq!(other.state(), ProbeState::Metered);
}

#[test]
fn votes_count_by_sign() {
    let (runtime, _ticks) = voting_runtime(vec![
        Veto { prefix: "x", vote: -100 },
        Veto { prefix: "x", vote: 1 },
    ]);
    let probe = runtime.begin(&runtime.name("x"));
    assert_eq!(probe.state(), ProbeState::Metered);
}

#[test]
fn ending_an_outer_probe_discards_open_children() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let before = ctx.savepoint();

    let mut outer = ctx.begin(&runtime.name("outer"));
    let mut leaked = ctx.begin(&runtime.name("leaked"));
    ticks.advance(9);
    outer.end();
    assert_eq!(ctx.depth(), 0);

    leaked.end();
    assert_eq!(leaked.state(), ProbeState::Idle);

    let changes = ctx.compare(&before).unwrap();
    assert!(changes.changepoint(&runtime.name("leaked")).is_none());
    let outer_change = changes.changepoint(&runtime.name("outer")).unwrap().change(&meter).unwrap();
    assert_eq!(outer_change.total(), 9);
    assert_eq!(outer_change.inherent_total(), 9);
}

#[test]
fn work_under_a_discarded_firing_is_not_charged_twice() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let outer_name = runtime.name("outer");
    let inner_name = runtime.name("inner");
    let before = ctx.savepoint();

    let mut outer = ctx.begin(&outer_name);
    let mut leaked = ctx.begin(&runtime.name("leaked"));
    ctx.run(&inner_name, || ticks.advance(5));
    ticks.advance(4);
    outer.end();
    leaked.end();

    let changes = ctx.compare(&before).unwrap();
    let thread = changes.change(&meter).unwrap();
    assert_eq!(thread.total(), 9);
    assert_eq!(thread.inherent_total(), 9);

    let outer_change = changes.changepoint(&outer_name).unwrap().change(&meter).unwrap();
    assert_eq!(outer_change.total(), 9);
    assert_eq!(outer_change.inherent_total(), 4);
    let inner_change = changes.changepoint(&inner_name).unwrap().change(&meter).unwrap();
    assert_eq!(inner_change.inherent_total(), 5);
}

#[test]
fn dropping_a_firing_probe_ends_it() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let before = ctx.savepoint();
    {
        let _probe = ctx.begin(&runtime.name("scoped"));
        ticks.advance(2);
        assert_eq!(ctx.current(), Some(runtime.name("scoped")));
    }
    assert_eq!(ctx.depth(), 0);
    let changes = ctx.compare(&before).unwrap();
    assert_eq!(changes.changepoint(&runtime.name("scoped")).unwrap().changes().next().unwrap().total(), 2);
}

#[test]
fn run_ends_the_probe_when_the_closure_panics() {
    let (runtime, _ticks) = runtime();
    let ctx = runtime.context();
    let name = runtime.name("explodes");
    let before = ctx.savepoint();

    fn explode() {
        panic!("boom");
    }
    let result = catch_unwind(AssertUnwindSafe(|| ctx.run(&name, explode)));
    assert!(result.is_err());
    assert_eq!(ctx.depth(), 0);
    let changes = ctx.compare(&before).unwrap();
    assert_eq!(changes.changepoint(&name).unwrap().changes().next().unwrap().count(), 1);
}

struct Broken;

impl Measure for Broken {
    fn value(&mut self) -> u64 {
        panic!("measure failure")
    }
}

impl MeasureFactory for Broken {
    fn create(&self, _context: &Context) -> Box<dyn Measure> {
        Box::new(Broken)
    }
}

#[test]
fn panicking_measure_is_isolated() {
    let ticks = Ticks::default();
    let runtime = Runtime::builder()
        .with_config(Config::default().with_meters(["broken", "ticks"]))
        .with_measure("broken", Broken)
        .with_measure("ticks", ticks.clone())
        .build()
        .unwrap();

    let mut probe = runtime.create(&runtime.name("work"));
    probe.run(|| ticks.advance(5)).unwrap();
    assert_eq!(probe.reading(&runtime.name("broken")).unwrap().delta(), 0);
    assert_eq!(probe.reading(&runtime.name("ticks")).unwrap().delta(), 5);

    probe.run(|| ticks.advance(1)).unwrap();
    assert_eq!(probe.reading(&runtime.name("ticks")).unwrap().delta(), 1);
}

thread_local! {
    static PENDING: RefCell<Option<Probe>> = const { RefCell::new(None) };
}

/// Fires the probe left in `PENDING`, if any, on every read.
struct Meddling(Ticks);

impl Measure for Meddling {
    fn value(&mut self) -> u64 {
        PENDING.with(|pending| {
            if let Some(probe) = pending.borrow_mut().as_mut() {
                probe.run(|| ()).unwrap();
            }
        });
        self.0.value()
    }
}

impl MeasureFactory for Meddling {
    fn create(&self, _context: &Context) -> Box<dyn Measure> {
        Box::new(Meddling(self.0.clone()))
    }
}

#[test]
fn firing_from_inside_a_measure_is_unmetered() {
    let ticks = Ticks::default();
    let runtime = Runtime::builder()
        .with_config(Config::default().with_meters(["ticks"]))
        .with_measure("ticks", Meddling(ticks.clone()))
        .build()
        .unwrap();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let nested = runtime.name("nested");
    let before = ctx.savepoint();

    let mut probe = ctx.create(&nested);
    probe.run(|| ticks.advance(3)).unwrap();
    ticks.advance(100);

    PENDING.with(|pending| *pending.borrow_mut() = Some(probe));
    ctx.run(&runtime.name("work"), || ticks.advance(2));
    let probe = PENDING.with(|pending| pending.borrow_mut().take()).unwrap();

    assert_eq!(probe.state(), ProbeState::Idle);
    assert_eq!(probe.last_state(), ProbeState::Unmetered);
    assert_eq!(probe.reading(&meter).unwrap().delta(), 0);

    let changes = ctx.compare(&before).unwrap();
    let nested_change = changes.changepoint(&nested).unwrap().change(&meter).unwrap();
    assert_eq!(nested_change.count(), 1);
    assert_eq!(nested_change.total(), 3);
    let work = changes.changepoint(&runtime.name("work")).unwrap().change(&meter).unwrap();
    assert_eq!(work.total(), 2);
}

#[derive(Clone, Default)]
struct Exploding(Arc<AtomicUsize>);

impl Interceptor for Exploding {
    fn begin(&mut self, _probe: &Probe) {
        self.0.fetch_add(1, Ordering::SeqCst);
        panic!("interceptor failure");
    }
}

impl InterceptorFactory for Exploding {
    fn create(&self, _context: &Context) -> Box<dyn Interceptor> {
        Box::new(self.clone())
    }
}

#[test]
fn panicking_interceptor_is_removed() {
    let calls = Exploding::default();
    let runtime = Runtime::builder().with_interceptor(calls.clone()).build().unwrap();
    let name = runtime.name("guarded");

    runtime.run(&name, || ());
    runtime.run(&name, || ());
    assert_eq!(calls.0.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.context().depth(), 0);
}

#[test]
fn threads_meter_independently() {
    let (runtime, ticks) = runtime();
    let name = runtime.name("shared");
    let main = runtime.context();
    let before = main.savepoint();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let runtime = runtime.clone();
            let name = name.clone();
            let ticks = ticks.clone();
            std::thread::spawn(move || {
                let ctx = runtime.context();
                let start = ctx.savepoint();
                ctx.run(&name, || ticks.advance(1));
                let changes = ctx.compare(&start).unwrap();
                (ctx.id(), changes.changepoint(&name).unwrap().changes().next().unwrap().count())
            })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let (id, count) = handle.join().unwrap();
        assert_eq!(count, 1);
        ids.push(id);
    }
    ids.push(main.id());
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert!(main.compare(&before).unwrap().is_empty());
}

#[test]
fn counters_are_per_thread_and_reject_negative_increments() {
    let runtime = Runtime::new(Config::default()).unwrap();
    let ctx = runtime.context();
    let name = runtime.parse("rows.read");
    let counter = ctx.counter(&name);
    counter.inc();
    counter.inc_by(41).unwrap();
    assert_eq!(ctx.counter(&name).value(), 42);
    assert!(matches!(counter.inc_by(-1), Err(Error::NegativeIncrement(-1))));

    let other = std::thread::spawn(move || runtime.context().counter(&name).value());
    assert_eq!(other.join().unwrap(), 0);
}

#[test]
fn counter_measure_meters_a_counter() {
    let runtime = Runtime::builder()
        .with_config(Config::default().with_meters(["rows"]))
        .with_measure("rows", probes::measures::CounterMeasure::new("db.rows"))
        .build()
        .unwrap();
    let ctx = runtime.context();
    let rows = ctx.counter(&runtime.parse("db.rows"));

    let mut probe = ctx.create(&runtime.parse("db.scan"));
    probe.run(|| rows.inc_by(128).unwrap()).unwrap();
    assert_eq!(probe.reading(&runtime.name("rows")).unwrap().delta(), 128);
}

#[test]
fn clock_meter_is_enabled_by_default() {
    let runtime = Runtime::new(Config::default()).unwrap();
    let mut probe = runtime.create(&runtime.name("sleepy"));
    probe
        .run(|| std::thread::sleep(std::time::Duration::from_millis(2)))
        .unwrap();
    let reading = probe.reading(&runtime.name("clock")).unwrap();
    assert!(reading.delta() >= 2_000_000);
}

#[test]
fn released_context_starts_afresh() {
    let (runtime, _ticks) = runtime();
    let first = runtime.context();
    assert_eq!(first.id(), runtime.context().id());
    assert!(runtime.release_context());
    assert!(!runtime.release_context());
    assert_ne!(first.id(), runtime.context().id());
}
