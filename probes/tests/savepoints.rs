mod common;

use common::runtime;
use probes::Error;

#[test]
fn savepoint_delta_reports_count_and_average() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let meter = runtime.name("ticks");
    let name = runtime.parse("batch.item");

    ctx.run(&name, || ticks.advance(100));
    let start = ctx.savepoint();
    for _ in 0..3 {
        ctx.run(&name, || ticks.advance(20));
    }
    let end = ctx.savepoint();

    let changes = end.compare(&start).unwrap();
    let change = changes.changepoint(&name).unwrap().change(&meter).unwrap();
    assert_eq!(change.count(), 3);
    assert_eq!(change.total(), 60);
    assert_eq!(change.avg(), 20.0);
    assert_eq!(changes.change(&meter).unwrap().total(), 60);

    let live = ctx.compare(&start).unwrap();
    assert_eq!(live, changes);
}

#[test]
fn back_to_back_savepoints_compare_as_zero() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    ctx.run(&runtime.name("warmup"), || ticks.advance(5));

    let first = ctx.savepoint();
    let second = ctx.savepoint();
    let changes = second.compare(&first).unwrap();
    assert!(changes.is_empty());
    assert_eq!(changes.changes().count(), 1);
    assert!(changes.changes().all(|c| c.count() == 0 && c.avg() == 0.0 && c.inherent_avg() == 0.0));
    assert_eq!(changes.changepoints().count(), 0);
}

#[test]
fn comparing_with_a_later_savepoint_is_rejected() {
    let (runtime, _ticks) = runtime();
    let ctx = runtime.context();
    let first = ctx.savepoint();
    let second = ctx.savepoint();
    assert!(second.sequence() > first.sequence());
    assert!(matches!(
        first.compare(&second),
        Err(Error::SavePointOrder { .. })
    ));
}

#[test]
fn savepoints_of_other_threads_are_rejected() {
    let (runtime, _ticks) = runtime();
    let ctx = runtime.context();
    let mine = ctx.savepoint();

    let foreign = {
        let runtime = runtime.clone();
        std::thread::spawn(move || runtime.context().savepoint())
            .join()
            .unwrap()
    };
    assert_ne!(foreign.context_id(), mine.context_id());
    assert!(matches!(
        ctx.compare(&foreign),
        Err(Error::ContextMismatch { .. })
    ));
    assert!(matches!(
        mine.compare(&foreign),
        Err(Error::ContextMismatch { .. })
    ));
}

#[test]
fn refresh_reuses_the_savepoint() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let name = runtime.name("loop");
    let mut checkpoint = ctx.savepoint();

    for round in 1..=3u64 {
        ctx.run(&name, || ticks.advance(round));
        let changes = ctx.compare(&checkpoint).unwrap();
        let change = changes.changepoint(&name).unwrap().changes().next().unwrap();
        assert_eq!(change.count(), 1);
        assert_eq!(change.total(), round);

        let before = checkpoint.sequence();
        ctx.refresh(&mut checkpoint).unwrap();
        assert!(checkpoint.sequence() > before);
        assert!(ctx.compare(&checkpoint).unwrap().is_empty());
    }
}

#[test]
fn refresh_rejects_foreign_savepoints() {
    let (runtime, _ticks) = runtime();
    let mut foreign = {
        let runtime = runtime.clone();
        std::thread::spawn(move || runtime.context().savepoint())
            .join()
            .unwrap()
    };
    assert!(matches!(
        runtime.context().refresh(&mut foreign),
        Err(Error::ContextMismatch { .. })
    ));
}

#[test]
fn changepoints_form_a_hierarchy() {
    let (runtime, ticks) = runtime();
    let ctx = runtime.context();
    let start = ctx.savepoint();

    ctx.run(&runtime.parse("app.db.read"), || ticks.advance(3));
    ctx.run(&runtime.parse("app.db.write"), || ticks.advance(4));
    ctx.run(&runtime.parse("app.cache"), || ticks.advance(1));

    let changes = ctx.compare(&start).unwrap();
    let paths: Vec<&str> = changes.changepoints().map(|p| p.name().path()).collect();
    assert_eq!(paths, vec!["app", "app.cache", "app.db", "app.db.read", "app.db.write"]);

    let app = runtime.name("app");
    let children: Vec<&str> = changes.children(&app).map(|p| p.name().path()).collect();
    assert_eq!(children, vec!["app.cache", "app.db"]);

    let db = changes.changepoint(&runtime.parse("app.db")).unwrap();
    let change = db.change(&runtime.name("ticks")).unwrap();
    assert_eq!(change.count(), 2);
    assert_eq!(change.total(), 7);
    assert_eq!(changes.roots().count(), 1);
}
