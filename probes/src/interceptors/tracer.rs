use crate::{
    Context, Probe,
    extension::{Interceptor, InterceptorFactory},
};

/// Interceptor that logs probe firings at `debug` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracer;

impl InterceptorFactory for Tracer {
    fn create(&self, _context: &Context) -> Box<dyn Interceptor> {
        Box::new(Tracer)
    }
}

impl Interceptor for Tracer {
    fn begin(&mut self, probe: &Probe) {
        tracing::debug!(
            context = %probe.context().name(),
            probe = %probe.name(),
            state = ?probe.state(),
            depth = probe.context().depth(),
            "Probe began"
        );
    }

    fn end(&mut self, probe: &Probe) {
        let deltas: Vec<(&str, u64)> = probe
            .readings()
            .map(|r| (r.name().path(), r.delta()))
            .collect();
        tracing::debug!(
            context = %probe.context().name(),
            probe = %probe.name(),
            metered = probe.last_state() == crate::ProbeState::Metered,
            ?deltas,
            "Probe ended"
        );
    }
}
