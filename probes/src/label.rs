use std::{collections::HashMap, fmt, sync::Arc};

/// Metadata attached to a [`Name`](crate::Name).
///
/// Labels are plain value objects: two labels with the same token are equal.
/// They are resolved through [`Runtime::label`](crate::Runtime::label), which
/// only knows the built-in labels plus the ones registered in
/// [`Config`](crate::Config).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(Arc<str>);

impl Label {
    /// Token of the built-in label that turns metering off for a name.
    pub const DISABLED: &'static str = "disabled";

    pub(crate) fn new(value: &str) -> Self {
        Self(Arc::from(value))
    }

    /// The token identifying this label.
    #[inline]
    pub fn value(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        &*self.0 == Self::DISABLED
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup table from tokens to labels. Fixed after the runtime is built.
#[derive(Debug)]
pub(crate) struct LabelTable {
    labels: HashMap<Arc<str>, Label>,
}

impl LabelTable {
    pub fn new<'a>(custom: impl IntoIterator<Item = &'a str>) -> Self {
        let labels = std::iter::once(Label::DISABLED)
            .chain(custom)
            .map(|token| {
                let label = Label::new(token);
                (label.0.clone(), label)
            })
            .collect();
        Self { labels }
    }

    pub fn get(&self, value: &str) -> Option<Label> {
        self.labels.get(value).cloned()
    }
}
