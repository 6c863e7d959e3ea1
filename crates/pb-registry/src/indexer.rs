//! Id assignment and the two-way id/name index.
//!
//! [`IdIndexer::assign`] is a full re-assignment pass: the visit counter
//! resets to zero, both maps are cleared, and the tree is walked pre-order,
//! depth-first, with children taken in lexicographic order of their local
//! name. The id sequence therefore depends only on the final tree shape,
//! never on the order files were loaded in.
//!
//! # Policies
//!
//! | Policy | Id of a node |
//! |--------|--------------|
//! | [`IdPolicy::Auto`] | the visit counter (root = 0, dense `0..N`) |
//! | [`IdPolicy::File`] | the `{id}-` prefix of the backing file's basename |
//!
//! Under the file policy only the outermost node a file declares takes the
//! file's id. Nodes without a backing file (packages, the root) and nested
//! declarations of the same file are visited but get no id; the counter
//! still advances for them.

use pb_core::{FxHashMap, IdPolicy, SchemaId};
use pb_schema::{NodeIndex, SchemaTree};
use tracing::{debug, warn};

use crate::error::IdAssignError;

/// Two-way mapping between ids and dotted names.
///
/// Both directions are only ever written together, so for every pair
/// `name_of(id) == Some(name)` exactly when `id_of(name) == Some(id)`.
///
/// # Examples
///
/// ```
/// use pb_core::{IdPolicy, SchemaId};
/// use pb_registry::IdIndexer;
/// use pb_schema::SchemaTree;
///
/// let mut tree = SchemaTree::default();
/// tree.define(SchemaTree::ROOT, "app.User")?;
///
/// let mut indexer = IdIndexer::new(IdPolicy::Auto);
/// indexer.assign(&mut tree);
///
/// let index = indexer.index();
/// assert_eq!(index.id_of("app.User").map(|id| id.get()), Some(2));
/// assert_eq!(index.name_of(SchemaId::new(2)), Some("app.User"));
/// # Ok::<(), pb_schema::SchemaError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdIndex {
    id_to_name: FxHashMap<SchemaId, String>,
    name_to_id: FxHashMap<String, SchemaId>,
}

impl IdIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id assigned to a dotted name.
    #[inline]
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<SchemaId> {
        self.name_to_id.get(name).copied()
    }

    /// Returns the dotted name holding an id.
    #[inline]
    #[must_use]
    pub fn name_of(&self, id: SchemaId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Number of indexed nodes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    /// Whether nothing is indexed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    /// Iterates `(id, name)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &str)> {
        let mut entries: Vec<(SchemaId, &str)> = self
            .id_to_name
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries.into_iter()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.id_to_name.clear();
        self.name_to_id.clear();
    }

    fn insert(&mut self, id: SchemaId, name: String) {
        self.name_to_id.insert(name.clone(), id);
        self.id_to_name.insert(id, name);
    }
}

/// Outcome of one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignReport {
    /// Nodes visited, root included.
    pub visited: usize,
    /// Nodes that received an id.
    pub assigned: usize,
    /// Nodes left without an id, in visit order.
    pub errors: Vec<IdAssignError>,
}

/// Owns the visit counter and the [`IdIndex`] of one registry.
#[derive(Debug, Clone, Default)]
pub struct IdIndexer {
    policy: IdPolicy,
    counter: u32,
    index: IdIndex,
}

impl IdIndexer {
    /// Creates an indexer with an empty index.
    #[must_use]
    pub fn new(policy: IdPolicy) -> Self {
        Self {
            policy,
            counter: 0,
            index: IdIndex::new(),
        }
    }

    /// The configured policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> IdPolicy {
        self.policy
    }

    /// The index as of the last pass.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> &IdIndex {
        &self.index
    }

    /// Re-assigns every id in `tree` from scratch and stamps each node.
    ///
    /// Per-node failures are logged, collected in the report, and leave that
    /// node without an id; the pass itself never fails.
    pub fn assign(&mut self, tree: &mut SchemaTree) -> AssignReport {
        self.counter = 0;
        self.index.clear();

        let mut report = AssignReport::default();
        let mut stack = vec![SchemaTree::ROOT];

        while let Some(ix) = stack.pop() {
            let visit = self.counter;
            self.counter += 1;
            report.visited += 1;

            let name = tree.full_name(ix);
            let id = match self.policy {
                IdPolicy::Auto => Ok(Some(SchemaId::new(visit))),
                IdPolicy::File => file_id(tree, ix, &name),
            }
            .and_then(|id| match id {
                Some(id) => match self.index.name_of(id) {
                    Some(existing) => Err(IdAssignError::DuplicateId {
                        name: name.clone(),
                        id,
                        existing: existing.to_owned(),
                    }),
                    None => Ok(Some(id)),
                },
                None => Ok(None),
            });

            let id = id.unwrap_or_else(|err| {
                warn!(error = %err, "Node left without an id");
                report.errors.push(err);
                None
            });

            tree.node_mut(ix).set_assigned_id(id);
            if let Some(id) = id {
                self.index.insert(id, name);
                report.assigned += 1;
            }

            let children = tree.sorted_children(ix);
            stack.extend(children.into_iter().rev());
        }

        debug!(
            policy = self.policy.label(),
            visited = report.visited,
            assigned = report.assigned,
            skipped = report.errors.len(),
            "Assigned ids"
        );
        report
    }
}

/// Derives a node's id from its backing file name.
fn file_id(tree: &SchemaTree, ix: NodeIndex, name: &str) -> Result<Option<SchemaId>, IdAssignError> {
    let node = tree.node(ix);
    let Some(file) = node.source_file() else {
        return Ok(None);
    };
    let parent_file = node.parent().and_then(|parent| tree.node(parent).source_file());
    if parent_file == Some(file) {
        return Ok(None);
    }

    let basename = file.file_name().unwrap_or_default();
    let Some((prefix, _)) = basename.split_once('-') else {
        return Err(IdAssignError::MissingPrefix {
            name: name.to_owned(),
            file: file.to_owned(),
        });
    };
    prefix
        .parse::<SchemaId>()
        .map(Some)
        .map_err(|_| IdAssignError::InvalidPrefix {
            name: name.to_owned(),
            file: file.to_owned(),
            prefix: prefix.to_owned(),
        })
}
