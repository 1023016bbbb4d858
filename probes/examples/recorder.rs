use probes::{Config, Result, Runtime, interceptors::Recorder};

fn main() -> Result<()> {
    // Create a recorder that logs to "probe_log.jsonl"
    let recorder = Recorder::new("probe_log.jsonl")?;

    let runtime = Runtime::builder()
        .with_config(Config::default())
        .with_interceptor(recorder)
        .build()?;

    let handles: Vec<_> = (0..3)
        .map(|worker| {
            let runtime = runtime.clone();
            std::thread::Builder::new()
                .name(format!("worker-{worker}"))
                .spawn(move || {
                    let task = runtime.parse("worker.task");
                    for _ in 0..2 {
                        runtime.run(&task, || {
                            runtime.run(&runtime.parse("worker.task.io"), || {
                                std::thread::sleep(std::time::Duration::from_millis(5))
                            })
                        });
                    }
                })
        })
        .collect::<std::io::Result<_>>()?;

    for handle in handles {
        let _ = handle.join();
    }

    println!("Firings recorded to probe_log.jsonl");
    Ok(())
}
