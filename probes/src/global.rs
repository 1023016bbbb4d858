//! The optional process-wide runtime.
//!
//! Libraries that should not thread a [`Runtime`] through their APIs (and the
//! `#[metered]` attribute) use the runtime installed here. It is installed
//! once and lives until the process exits.

use std::sync::OnceLock;

use crate::{Context, Error, Label, Meter, Name, Probe, Result, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Makes `runtime` the process-wide runtime. Fails if one is installed.
pub fn install(runtime: Runtime) -> Result<()> {
    RUNTIME.set(runtime).map_err(|_| Error::AlreadyInstalled)?;
    tracing::debug!("Installed process-wide probes runtime");
    Ok(())
}

pub fn runtime() -> Result<&'static Runtime> {
    RUNTIME.get().ok_or(Error::NotInstalled)
}

pub fn context() -> Result<Context> {
    Ok(runtime()?.context())
}

/// A firing probe for the dotted name `name`.
pub fn begin(name: &str) -> Result<Probe> {
    let runtime = runtime()?;
    Ok(runtime.begin(&runtime.parse(name)))
}

/// An idle probe for the dotted name `name`.
pub fn create(name: &str) -> Result<Probe> {
    let runtime = runtime()?;
    Ok(runtime.create(&runtime.parse(name)))
}

/// Meters `f` under the dotted name `name`.
pub fn run<T>(name: &str, f: impl FnOnce() -> T) -> Result<T> {
    let runtime = runtime()?;
    Ok(runtime.run(&runtime.parse(name), f))
}

pub fn name(value: &str) -> Result<Name> {
    Ok(runtime()?.name(value))
}

pub fn parse(value: &str) -> Result<Name> {
    Ok(runtime()?.parse(value))
}

pub fn label(value: &str) -> Result<Option<Label>> {
    Ok(runtime()?.label(value))
}

pub fn meter(name: &Name) -> Result<Meter> {
    Ok(runtime()?.meter(name))
}

/// Support for `#[metered]`; not part of the public API.
#[doc(hidden)]
pub mod __private {
    use std::sync::OnceLock;

    use crate::{Name, Probe};

    /// Begins the probe of a `#[metered]` function. `path` is split on
    /// `separator` the first time the function runs.
    ///
    /// # Panics
    ///
    /// If no runtime has been installed.
    pub fn enter(name: &'static OnceLock<Name>, path: &str, separator: &str) -> Probe {
        let runtime = match super::runtime() {
            Ok(runtime) => runtime,
            Err(e) => panic!("#[metered] function '{path}' called without a runtime: {e}"),
        };
        let name = name.get_or_init(|| match separator {
            "::" => runtime.parse_path(path),
            _ => runtime.parse(path),
        });
        runtime.begin(name)
    }
}
