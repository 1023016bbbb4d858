use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};

use dashmap::DashMap;

use crate::{Error, Label, Result};

/// An interned, hierarchical name.
///
/// A name is one node of a prefix tree: a string `value` plus an optional
/// `prefix` (its parent). Names are created through a [`Runtime`](crate::Runtime)
/// (`name`, `parse`) and extended with [`Name::name`]; the same sequence of
/// values always yields the very same node, so equality is a pointer
/// comparison and hashing is a single integer.
///
/// Names are immutable. Labels are attached once, when the node is created,
/// from the runtime configuration.
///
/// ```ignore
/// let a = runtime.parse("db.query.select");
/// let b = runtime.parse("db").name("query").name("select");
/// assert_eq!(a, b);
/// assert!(a.starts_with(&runtime.parse("db.query")));
/// ```
#[derive(Clone)]
pub struct Name(Arc<Node>);

struct Node {
    id: u64,
    value: Arc<str>,
    prefix: Option<Name>,
    length: usize,
    path: Arc<str>,
    labels: Box<[Label]>,
    children: DashMap<Arc<str>, Name>,
    table: Arc<NameTable>,
}

impl Name {
    /// Number of parts, i.e. the number of prefixes plus one.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.length
    }

    /// Always false: a name has at least one part.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The value of this (last) part.
    #[inline]
    pub fn value(&self) -> &str {
        &self.0.value
    }

    /// The value of the part at a 0-based index, counted from the root.
    pub fn value_at(&self, index: usize) -> Result<&str> {
        let length = self.len();
        if index >= length {
            return Err(Error::IndexOutOfRange { index, length });
        }
        self.ancestors()
            .nth(length - 1 - index)
            .map(Name::value)
            .ok_or(Error::IndexOutOfRange { index, length })
    }

    #[inline]
    pub fn prefix(&self) -> Option<&Name> {
        self.0.prefix.as_ref()
    }

    /// Dotted representation of the full path, e.g. `"db.query.select"`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.0.path
    }

    /// Returns the interned name that has `self` as its prefix.
    pub fn name(&self, value: &str) -> Name {
        if let Some(child) = self.0.children.get(value) {
            return child.clone();
        }
        self.0
            .children
            .entry(Arc::from(value))
            .or_insert_with(|| self.0.table.create(Some(self), value))
            .clone()
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.0.labels.iter()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.0.labels.contains(label)
    }

    /// True if the name (or one of its prefixes) was labeled `disabled`.
    pub fn is_disabled(&self) -> bool {
        self.0.labels.iter().any(Label::is_disabled)
    }

    /// The first name, walking from `self` towards the root, whose value
    /// equals `value`.
    pub fn find(&self, value: &str) -> Option<&Name> {
        self.ancestors().find(|name| name.value() == value)
    }

    /// True if `other` is this name or one of its (direct or indirect) prefixes.
    pub fn starts_with(&self, other: &Name) -> bool {
        if other.len() > self.len() {
            return false;
        }
        self.ancestors()
            .nth(self.len() - other.len())
            .is_some_and(|ancestor| ancestor == other)
    }

    /// Iterates from this name up to its root, inclusive.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by dotted path; identical paths from different registries fall
/// back to creation order.
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path()
            .cmp(other.path())
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.path)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Name").field(&self.path()).finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}

/// Iterator over a name and its prefixes. See [`Name::ancestors`].
#[derive(Clone)]
pub struct Ancestors<'a> {
    next: Option<&'a Name>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Name;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.prefix();
        Some(current)
    }
}

/// The interning table behind every [`Name`] of one runtime.
///
/// Root names live in `roots`; every other node is owned by its parent's
/// `children` map. Lookups of existing names only take a shard read lock;
/// creation is an insert-if-absent on the owning map.
pub(crate) struct NameTable {
    roots: DashMap<Arc<str>, Name>,
    next_id: AtomicU64,
    rules: HashMap<String, Vec<Label>>,
}

impl NameTable {
    pub fn new(rules: HashMap<String, Vec<Label>>) -> Arc<Self> {
        Arc::new(Self {
            roots: DashMap::new(),
            next_id: AtomicU64::new(1),
            rules,
        })
    }

    pub fn name(self: &Arc<Self>, value: &str) -> Name {
        if let Some(root) = self.roots.get(value) {
            return root.clone();
        }
        self.roots
            .entry(Arc::from(value))
            .or_insert_with(|| self.create(None, value))
            .clone()
    }

    /// Interns every segment of `value` split on `separator`.
    pub fn parse(self: &Arc<Self>, value: &str, separator: &str) -> Name {
        let mut parts = value.split(separator);
        let first = parts.next().unwrap_or_default();
        parts.fold(self.name(first), |name, part| name.name(part))
    }

    /// Number of interned names, roots included.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        fn count(name: &Name) -> usize {
            1 + name.0.children.iter().map(|c| count(c.value())).sum::<usize>()
        }
        self.roots.iter().map(|root| count(root.value())).sum()
    }

    /// Drops the table's references to its nodes. Names still held by callers
    /// stay valid and keep their own prefixes alive.
    pub fn clear(&self) {
        fn clear_children(name: &Name) {
            let children: Vec<Name> = name.0.children.iter().map(|c| c.value().clone()).collect();
            name.0.children.clear();
            children.iter().for_each(clear_children);
        }
        let roots: Vec<Name> = self.roots.iter().map(|r| r.value().clone()).collect();
        self.roots.clear();
        roots.iter().for_each(clear_children);
    }

    fn create(self: &Arc<Self>, prefix: Option<&Name>, value: &str) -> Name {
        let path: Arc<str> = match prefix {
            Some(prefix) => format!("{}.{}", prefix.path(), value).into(),
            None => Arc::from(value),
        };

        let mut labels: Vec<Label> = prefix
            .map(|p| p.labels().cloned().collect())
            .unwrap_or_default();
        if let Some(configured) = self.rules.get(&*path) {
            for label in configured {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
        }

        Name(Arc::new(Node {
            id: self.next_id.fetch_add(1, AtomicOrdering::Relaxed),
            value: Arc::from(value),
            prefix: prefix.cloned(),
            length: prefix.map_or(1, |p| p.len() + 1),
            path,
            labels: labels.into_boxed_slice(),
            children: DashMap::new(),
            table: self.clone(),
        }))
    }
}
