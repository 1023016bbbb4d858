use std::sync::Arc;

use crate::Name;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Index {index} is out of range for a name of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    #[error("Counter increment must not be negative: {0}")]
    NegativeIncrement(i64),

    #[error("Probe '{0}' is already firing")]
    AlreadyFiring(Name),

    #[error("No measure registered for meter '{0}'")]
    UnknownMeasure(String),

    #[error("A measure is already registered for meter '{0}'")]
    MeasureAlreadyRegistered(Name),

    #[error("Save-point belongs to context {found:032x}, expected {expected:032x}")]
    ContextMismatch { expected: u128, found: u128 },

    #[error("Save-point #{older} was captured after #{newer}")]
    SavePointOrder { newer: u64, older: u64 },

    #[error("Negative delta for meter '{meter}' in group '{group}'")]
    NegativeDelta { group: Arc<str>, meter: Name },

    #[error("Extension failed to initialize: {0}")]
    ExtensionInit(Arc<str>),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No probes runtime has been installed")]
    NotInstalled,

    #[error("A probes runtime has already been installed")]
    AlreadyInstalled,

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
