use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use serde::Serialize;

use crate::{
    Context, Probe, ProbeState, Result,
    extension::{Interceptor, InterceptorFactory},
};

/// An interceptor that records metered firings to a file in JSON Lines
/// format, one object per ended firing.
///
/// All threads share the same file; lines are written whole.
#[derive(Clone)]
pub struct Recorder {
    writer: Arc<Mutex<BufWriter<File>>>,
}

#[derive(Serialize)]
struct Record<'a> {
    context: &'a str,
    probe: &'a str,
    depth: usize,
    readings: Vec<RecordedReading<'a>>,
}

#[derive(Serialize)]
struct RecordedReading<'a> {
    meter: &'a str,
    low: u64,
    high: u64,
    delta: u64,
}

impl Recorder {
    /// Create a new recorder that writes to the specified path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    fn write(&self, record: &Record<'_>) -> Result<()> {
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::from)?;
        line.push(b'\n');
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("recorder writer poisoned"))?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

impl InterceptorFactory for Recorder {
    fn create(&self, _context: &Context) -> Box<dyn Interceptor> {
        Box::new(self.clone())
    }
}

impl Interceptor for Recorder {
    fn end(&mut self, probe: &Probe) {
        if probe.last_state() != ProbeState::Metered {
            return;
        }
        let record = Record {
            context: probe.context().name(),
            probe: probe.name().path(),
            depth: probe.context().depth(),
            readings: probe
                .readings()
                .map(|r| RecordedReading {
                    meter: r.name().path(),
                    low: r.low(),
                    high: r.high(),
                    delta: r.delta(),
                })
                .collect(),
        };
        if let Err(e) = self.write(&record) {
            tracing::warn!(probe = %probe.name(), error = %e, "Recorder failed to write firing");
        }
    }
}
