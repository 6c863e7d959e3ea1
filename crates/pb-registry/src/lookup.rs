//! Node resolution by dotted name or id, plus the memoizing model cache.
//!
//! Resolution never fails loudly: a missing id, a missing segment, or an
//! unknown name all come back as `None`. Partial matches are never
//! returned.

use std::fmt;

use parking_lot::RwLock;
use pb_core::{FxHashMap, SchemaId};
use pb_schema::{NodeIndex, SchemaTree};

use crate::indexer::IdIndex;

/// A lookup key: either an assigned id or a dotted name.
///
/// # Examples
///
/// ```
/// use pb_core::SchemaId;
/// use pb_registry::LookupKey;
///
/// assert_eq!(LookupKey::from(3u32), LookupKey::Id(SchemaId::new(3)));
/// assert_eq!(LookupKey::from("app.User"), LookupKey::Name("app.User".to_owned()));
/// assert_eq!(LookupKey::parse("42"), LookupKey::Id(SchemaId::new(42)));
/// assert_eq!(LookupKey::parse("app"), LookupKey::Name("app".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    /// An id from the [`IdIndex`].
    Id(SchemaId),
    /// A dotted name such as `app.User.Profile`.
    Name(String),
}

impl LookupKey {
    /// Interprets command-line style input: all-digit text is an id,
    /// anything else a name.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        input
            .parse::<SchemaId>()
            .map_or_else(|_| Self::Name(input.to_owned()), Self::Id)
    }
}

impl From<SchemaId> for LookupKey {
    fn from(id: SchemaId) -> Self {
        Self::Id(id)
    }
}

impl From<u32> for LookupKey {
    fn from(id: u32) -> Self {
        Self::Id(SchemaId::new(id))
    }
}

impl From<&str> for LookupKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for LookupKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Resolves a key against the tree.
///
/// Ids are translated through `index` first. The root is only reachable
/// by its id; the empty name resolves to nothing.
#[must_use]
pub fn resolve(tree: &SchemaTree, index: &IdIndex, key: &LookupKey) -> Option<NodeIndex> {
    match key {
        LookupKey::Id(id) => match index.name_of(*id)? {
            "" => Some(SchemaTree::ROOT),
            name => resolve_name(tree, name),
        },
        LookupKey::Name(name) => resolve_name(tree, name),
    }
}

/// Walks a dotted name from the root, one child per segment.
///
/// The empty name names no child and resolves to `None`.
#[must_use]
pub fn resolve_name(tree: &SchemaTree, name: &str) -> Option<NodeIndex> {
    if name.is_empty() {
        return None;
    }
    if !name.contains('.') {
        return tree.child(SchemaTree::ROOT, name);
    }
    name.split('.')
        .try_fold(SchemaTree::ROOT, |at, segment| tree.child(at, segment))
}

/// Memoizes successful lookups by the exact key they were made with.
///
/// Entries are never invalidated by tree mutations. Names can't go stale
/// because nodes are never removed, but an id key keeps pointing at the node
/// it first resolved to even after a re-assignment pass renumbers the tree.
/// Call [`ModelCache::clear`] to start over.
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: RwLock<FxHashMap<LookupKey, NodeIndex>>,
}

impl ModelCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached node for `key`, or runs `resolve` and caches a hit.
    pub fn get_or_resolve(
        &self,
        key: &LookupKey,
        resolve: impl FnOnce(&LookupKey) -> Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        if let Some(ix) = self.entries.read().get(key) {
            return Some(*ix);
        }
        let ix = resolve(key)?;
        self.entries.write().insert(key.clone(), ix);
        Some(ix)
    }

    /// Number of cached keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
