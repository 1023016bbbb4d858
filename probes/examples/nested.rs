use std::time::Duration;

use probes::{Config, Result, Runtime, interceptors::Tracer, measures::CounterMeasure, metered};

#[metered(name = "shop.checkout")]
fn checkout(items: u64) {
    for _ in 0..items {
        price_item();
    }
    charge_card();
}

#[metered(name = "shop.checkout.price")]
fn price_item() {
    std::thread::sleep(Duration::from_millis(2));
    if let Ok(ctx) = probes::context() {
        let _ = ctx.counter(&ctx.runtime().parse("shop.lookups")).inc_by(3);
    }
}

#[metered(name = "payments.charge")]
fn charge_card() {
    std::thread::sleep(Duration::from_millis(10));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let runtime = Runtime::builder()
        .with_config(Config::default().with_meter("lookups").disable("shop.checkout.audit"))
        .with_measure("lookups", CounterMeasure::new("shop.lookups"))
        .with_interceptor(Tracer)
        .build()?;
    probes::install(runtime.clone())?;

    let ctx = runtime.context();
    let start = ctx.savepoint();

    checkout(3);
    checkout(1);
    ctx.run(&runtime.parse("shop.checkout.audit"), || {
        std::thread::sleep(Duration::from_millis(1))
    });

    let changes = ctx.compare(&start)?;
    for point in changes.changepoints() {
        for change in point.changes() {
            println!(
                "{:<24} {:<8} count={:<3} total={:<10} avg={:<10.1} inherent={}",
                point.name(),
                change.name(),
                change.count(),
                change.total(),
                change.avg(),
                change.inherent_total()
            );
        }
    }
    Ok(())
}
