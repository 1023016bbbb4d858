use std::collections::BTreeMap;

/// Runtime configuration: which meters are enabled, which labels exist and
/// where they are attached, and the settings passed to extensions.
///
/// Use the builder methods to customize, or [`Default`] for a runtime that
/// meters wall-clock time only.
///
/// # Examples
///
/// ```rust
/// use probes::Config;
///
/// let config = Config::default()
///     .with_meter("allocations")          // in addition to "clock"
///     .disable("http.health")             // never meter health checks
///     .with_label("db.query", "hotspot")
///     .with_setting("sampling.rate", probes::Setting::Double(0.1));
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Dotted names of the meters enabled for every thread context, in the
    /// order their readings are taken.
    /// Default: `["clock"]`
    pub meters: Vec<String>,

    /// Label tokens known in addition to the built-in `disabled` label.
    pub labels: Vec<String>,

    /// Labels attached to dotted name paths. A name inherits every label of
    /// its prefix.
    pub rules: Vec<LabelRule>,

    /// Initial settings of the configuration environment.
    pub settings: BTreeMap<String, Setting>,

    /// Initial capacity of each thread's probe stack.
    /// Default: 32
    pub stack_capacity: usize,
}

/// A label attached to a dotted name path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelRule {
    pub name: String,
    pub label: String,
}

/// A configured environment value. `Name` values are dotted paths that are
/// interned when the runtime is built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Setting {
    Long(i64),
    Boolean(bool),
    Int(i32),
    Double(f64),
    String(String),
    Name(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            meters: vec![crate::measures::CLOCK.to_string()],
            labels: Vec::new(),
            rules: Vec::new(),
            settings: BTreeMap::new(),
            stack_capacity: 32,
        }
    }
}

impl Config {
    /// Default configuration overridden by `PROBES_METERS` (comma separated
    /// meter names, replacing the defaults) and `PROBES_DISABLED` (comma
    /// separated names to label `disabled`).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(meters) = std::env::var("PROBES_METERS") {
            cfg.meters = split_list(&meters).map(String::from).collect();
        }
        if let Ok(disabled) = std::env::var("PROBES_DISABLED") {
            for name in split_list(&disabled) {
                cfg = cfg.disable(name);
            }
        }

        cfg
    }

    /// Enable a meter. Duplicates are ignored.
    pub fn with_meter(mut self, name: &str) -> Self {
        if !self.meters.iter().any(|m| m == name) {
            self.meters.push(name.to_string());
        }
        self
    }

    /// Replace the list of enabled meters.
    pub fn with_meters<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.meters.clear();
        names.into_iter().fold(self, |cfg, name| cfg.with_meter(name))
    }

    /// Attach a label to a dotted name path. Unknown label tokens are
    /// registered as custom labels.
    pub fn with_label(mut self, name: &str, label: &str) -> Self {
        if label != crate::Label::DISABLED && !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
        self.rules.push(LabelRule {
            name: name.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Label a dotted name path (and so everything beneath it) `disabled`.
    pub fn disable(self, name: &str) -> Self {
        self.with_label(name, crate::Label::DISABLED)
    }

    pub fn with_setting(mut self, name: &str, value: Setting) -> Self {
        self.settings.insert(name.to_string(), value);
        self
    }

    /// Set the initial capacity of each thread's probe stack.
    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}
