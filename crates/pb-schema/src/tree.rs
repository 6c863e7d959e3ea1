//! Arena-backed namespace tree.
//!
//! Every package, message, enum and service is a [`Node`] stored in a flat
//! arena and addressed by a [`NodeIndex`]. Nodes are never removed, so an
//! index stays valid for the lifetime of its tree. Parents are plain
//! indices; children are kept in insertion order alongside a name lookup.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use pb_core::{FxHashMap, SchemaId, fx_hash_map, fx_hash_set};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::debug;

use crate::ast::{
    Declaration, EnumDecl, EnumValueDecl, FieldDecl, MessageDecl, MethodDecl, OneofDecl, Options,
    ProtoFile, Reserved, ServiceDecl,
};
use crate::error::SchemaError;
use crate::parser::parse;

/// Handle to a node in a [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Returns the arena slot of this node.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a namespace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The unnamed tree root.
    Root,
    /// A package segment or a programmatically added namespace.
    Namespace,
    /// A message type.
    Message,
    /// An enum type.
    Enum,
    /// A service.
    Service,
}

impl NodeKind {
    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Namespace => "namespace",
            Self::Message => "message",
            Self::Enum => "enum",
            Self::Service => "service",
        }
    }

    /// Whether a node of this kind may hold a child of kind `child`.
    #[must_use]
    pub const fn can_contain(self, child: Self) -> bool {
        match self {
            Self::Root | Self::Namespace => !matches!(child, Self::Root),
            Self::Message => matches!(child, Self::Message | Self::Enum),
            Self::Enum | Self::Service => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageBody {
    /// Fields, including oneof members.
    pub fields: Vec<FieldDecl>,
    /// Oneof groups.
    pub oneofs: Vec<OneofDecl>,
    /// Reserved ranges and names.
    pub reserved: Vec<Reserved>,
    /// Extension ranges.
    pub extensions: Vec<(i64, i64)>,
}

/// Enum payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumBody {
    /// Values in declaration order.
    pub values: Vec<EnumValueDecl>,
    /// Reserved ranges and names.
    pub reserved: Vec<Reserved>,
}

/// Service payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceBody {
    /// Methods in declaration order.
    pub methods: Vec<MethodDecl>,
}

/// Kind-specific node data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    /// The root carries nothing.
    Root,
    /// Namespaces only hold children.
    Namespace,
    /// A message.
    Message(MessageBody),
    /// An enum.
    Enum(EnumBody),
    /// A service.
    Service(ServiceBody),
}

impl NodeBody {
    /// Returns the kind this body belongs to.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Root => NodeKind::Root,
            Self::Namespace => NodeKind::Namespace,
            Self::Message(_) => NodeKind::Message,
            Self::Enum(_) => NodeKind::Enum,
            Self::Service(_) => NodeKind::Service,
        }
    }
}

/// A namespace node.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    by_name: FxHashMap<String, NodeIndex>,
    source_file: Option<Utf8PathBuf>,
    assigned_id: Option<SchemaId>,
    options: Options,
    body: NodeBody,
}

impl Node {
    fn new(name: String, parent: Option<NodeIndex>, body: NodeBody) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            by_name: fx_hash_map(),
            source_file: None,
            assigned_id: None,
            options: Options::new(),
            body,
        }
    }

    /// Local name (empty for the root).
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    /// Containing node, `None` for the root.
    #[inline]
    #[must_use]
    pub const fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Children in insertion order.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// File that declared this node, if any.
    #[inline]
    #[must_use]
    pub fn source_file(&self) -> Option<&Utf8Path> {
        self.source_file.as_deref()
    }

    /// Id stamped by the last indexing pass.
    #[inline]
    #[must_use]
    pub const fn assigned_id(&self) -> Option<SchemaId> {
        self.assigned_id
    }

    /// Stamps (or clears) the id of this node.
    #[inline]
    pub fn set_assigned_id(&mut self, id: Option<SchemaId>) {
        self.assigned_id = id;
    }

    /// Declaration options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable declaration options.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Kind-specific payload.
    #[must_use]
    pub fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Mutable kind-specific payload. The kind itself can't change.
    pub fn body_mut(&mut self) -> &mut NodeBody {
        &mut self.body
    }
}

/// Options recognized by the tree constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeOptions {
    /// Keep field names as written instead of converting to lowerCamelCase.
    pub keep_case: bool,
}

impl TreeOptions {
    /// Reads the recognized keys from an opaque option map. Unknown keys and
    /// non-boolean `keepCase` values are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use pb_schema::TreeOptions;
    ///
    /// let map = serde_json::json!({"keepCase": true, "other": 1});
    /// let options = TreeOptions::from_map(map.as_object().unwrap());
    /// assert!(options.keep_case);
    /// ```
    #[must_use]
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            keep_case: map
                .get("keepCase")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

/// The merged namespace tree.
///
/// # Examples
///
/// ```
/// use pb_schema::{MessageDecl, SchemaTree, TreeOptions};
///
/// let mut tree = SchemaTree::new(TreeOptions::default());
/// let app = tree.define(SchemaTree::ROOT, "app.User")?;
/// let profile = tree.add(app, MessageDecl::new("Profile").into())?;
///
/// assert_eq!(tree.full_name(profile), "app.User.Profile");
/// assert_eq!(tree.child(app, "Profile"), Some(profile));
/// # Ok::<(), pb_schema::SchemaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SchemaTree {
    nodes: Vec<Node>,
    options: TreeOptions,
    revision: u64,
}

impl Default for SchemaTree {
    fn default() -> Self {
        Self::new(TreeOptions::default())
    }
}

impl SchemaTree {
    /// Index of the root node.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Creates a tree holding only the root.
    #[must_use]
    pub fn new(options: TreeOptions) -> Self {
        Self {
            nodes: vec![Node::new(String::new(), None, NodeBody::Root)],
            options,
            revision: 0,
        }
    }

    /// Returns the constructor options.
    #[must_use]
    pub const fn options(&self) -> TreeOptions {
        self.options
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        self.node(Self::ROOT)
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if `ix` belongs to a different tree and is out of range.
    #[must_use]
    pub fn node(&self, ix: NodeIndex) -> &Node {
        &self.nodes[ix.index()]
    }

    /// Returns a node mutably. See [`SchemaTree::node`].
    pub fn node_mut(&mut self, ix: NodeIndex) -> &mut Node {
        &mut self.nodes[ix.index()]
    }

    /// Returns a node, or `None` for an out-of-range index.
    #[must_use]
    pub fn get(&self, ix: NodeIndex) -> Option<&Node> {
        self.nodes.get(ix.index())
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counter bumped by every node insertion.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Looks up a direct child by local name.
    #[must_use]
    pub fn child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.node(parent).by_name.get(name).copied()
    }

    /// Children of `ix` in insertion order.
    #[must_use]
    pub fn children(&self, ix: NodeIndex) -> &[NodeIndex] {
        &self.node(ix).children
    }

    /// Children of `ix` ordered by local name.
    #[must_use]
    pub fn sorted_children(&self, ix: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.node(ix).children.clone();
        children.sort_by(|a, b| self.node(*a).name.cmp(&self.node(*b).name));
        children
    }

    /// Dotted name from the root to `ix`; the root itself is `""`.
    #[must_use]
    pub fn full_name(&self, ix: NodeIndex) -> String {
        let mut segments: SmallVec<[&str; 8]> = SmallVec::new();
        let mut current = Some(ix);
        while let Some(at) = current {
            let node = self.node(at);
            if node.parent.is_some() {
                segments.push(&node.name);
            }
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Distinct backing files of the subtree rooted at `ix`, in pre-order.
    #[must_use]
    pub fn source_files(&self, ix: NodeIndex) -> Vec<Utf8PathBuf> {
        let mut seen = fx_hash_set();
        let mut files = Vec::new();
        let mut stack = vec![ix];
        while let Some(at) = stack.pop() {
            let node = self.node(at);
            if let Some(file) = &node.source_file {
                if seen.insert(file.as_path()) {
                    files.push(file.clone());
                }
            }
            stack.extend(node.children.iter().rev().copied());
        }
        files
    }

    /// Gets or creates the namespace chain `dotted` below `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Conflict`] if a segment already exists as a
    /// non-namespace node, and [`SchemaError::InvalidName`] for empty segments.
    pub fn define(&mut self, parent: NodeIndex, dotted: &str) -> Result<NodeIndex, SchemaError> {
        if dotted.is_empty() {
            return Ok(parent);
        }
        self.check_namespace_chain(parent, dotted)?;

        let mut current = parent;
        for segment in dotted.split('.') {
            current = match self.child(current, segment) {
                Some(existing) => existing,
                None => self.push_node(current, segment.to_owned(), NodeBody::Namespace),
            };
        }
        Ok(current)
    }

    /// Inserts a declaration (and everything nested in it) below `parent`.
    ///
    /// Namespaces merge with an existing namespace of the same name; any
    /// other name clash is rejected. The tree is unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Duplicate`], [`SchemaError::InvalidParent`] or
    /// [`SchemaError::InvalidName`].
    pub fn add(&mut self, parent: NodeIndex, decl: Declaration) -> Result<NodeIndex, SchemaError> {
        self.add_with_source(parent, decl, None)
    }

    /// Like [`SchemaTree::add`], recording `source` as the backing file of
    /// every non-namespace node created.
    ///
    /// # Errors
    ///
    /// See [`SchemaTree::add`].
    pub fn add_with_source(
        &mut self,
        parent: NodeIndex,
        decl: Declaration,
        source: Option<&Utf8Path>,
    ) -> Result<NodeIndex, SchemaError> {
        let prefix = self.full_name(parent);
        self.check_declarations(
            Some(parent),
            self.node(parent).kind(),
            &prefix,
            std::slice::from_ref(&decl),
        )?;
        Ok(self.insert(parent, decl, source))
    }

    /// Merges a parsed file: defines its package chain, then inserts its
    /// declarations with `source` as their backing file.
    ///
    /// The whole file is validated before anything is inserted.
    ///
    /// # Errors
    ///
    /// Returns the first conflict found; the tree is unchanged on error.
    pub fn merge_file(
        &mut self,
        file: ProtoFile,
        source: &Utf8Path,
    ) -> Result<Vec<NodeIndex>, SchemaError> {
        let package = file.package.as_deref().unwrap_or_default();
        let (existing, kind) = if package.is_empty() {
            (Some(Self::ROOT), NodeKind::Root)
        } else {
            (self.check_namespace_chain(Self::ROOT, package)?, NodeKind::Namespace)
        };
        self.check_declarations(existing, kind, package, &file.declarations)?;

        let parent = self.define(Self::ROOT, package)?;
        if parent != Self::ROOT {
            self.node_mut(parent).options.extend(file.options);
        }
        let added: Vec<NodeIndex> = file
            .declarations
            .into_iter()
            .map(|decl| self.insert(parent, decl, Some(source)))
            .collect();
        debug!(file = %source, package, count = added.len(), "Merged definition file");
        Ok(added)
    }

    /// Parses `text` and merges it with `path` as the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] or a merge error.
    pub fn merge_source(
        &mut self,
        text: &str,
        path: &Utf8Path,
    ) -> Result<Vec<NodeIndex>, SchemaError> {
        let file = parse(text).map_err(|source| SchemaError::Parse {
            path: path.to_owned(),
            source,
        })?;
        self.merge_file(file, path)
    }

    /// Reads, parses and merges a definition file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Read`], [`SchemaError::Parse`] or a merge error.
    pub fn load_file(&mut self, path: &Utf8Path) -> Result<Vec<NodeIndex>, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_owned(),
            source,
        })?;
        self.merge_source(&text, path)
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Walks `dotted` from `parent`, returning the last node if the whole
    /// chain exists or `None` if part of it would be created.
    fn check_namespace_chain(
        &self,
        parent: NodeIndex,
        dotted: &str,
    ) -> Result<Option<NodeIndex>, SchemaError> {
        if !self.node(parent).kind().can_contain(NodeKind::Namespace) {
            return Err(SchemaError::Conflict {
                name: self.full_name(parent),
                kind: self.node(parent).kind(),
            });
        }
        let mut current = parent;
        for segment in dotted.split('.') {
            if segment.is_empty() {
                return Err(SchemaError::InvalidName(dotted.to_owned()));
            }
            let Some(next) = self.child(current, segment) else {
                return Ok(None);
            };
            let kind = self.node(next).kind();
            if kind != NodeKind::Namespace {
                return Err(SchemaError::Conflict {
                    name: self.full_name(next),
                    kind,
                });
            }
            current = next;
        }
        Ok(Some(current))
    }

    /// Checks that `decls` can be inserted below `parent`. `parent` is `None`
    /// when the parent doesn't exist yet, in which case only the
    /// declarations themselves are checked.
    fn check_declarations(
        &self,
        parent: Option<NodeIndex>,
        parent_kind: NodeKind,
        prefix: &str,
        decls: &[Declaration],
    ) -> Result<(), SchemaError> {
        let mut seen: FxHashMap<&str, NodeKind> = fx_hash_map();
        for decl in decls {
            let name = decl.name();
            let kind = declaration_kind(decl);
            let full = join_name(prefix, name);

            if name.is_empty() || name.contains('.') {
                return Err(SchemaError::InvalidName(full));
            }
            if !parent_kind.can_contain(kind) {
                return Err(SchemaError::InvalidParent {
                    parent: parent_kind,
                    child: kind,
                });
            }
            if let Some(previous) = seen.insert(name, kind) {
                if previous != NodeKind::Namespace || kind != NodeKind::Namespace {
                    return Err(SchemaError::Duplicate { name: full });
                }
            }

            let existing = parent.and_then(|p| self.child(p, name));
            let next = match existing {
                Some(ix)
                    if kind == NodeKind::Namespace
                        && self.node(ix).kind() == NodeKind::Namespace =>
                {
                    Some(ix)
                }
                Some(_) => return Err(SchemaError::Duplicate { name: full }),
                None => None,
            };
            self.check_declarations(next, kind, &full, decl.nested())?;
        }
        Ok(())
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    #[allow(clippy::cast_possible_truncation)]
    fn push_node(&mut self, parent: NodeIndex, name: String, body: NodeBody) -> NodeIndex {
        let ix = NodeIndex(self.nodes.len() as u32);
        let parent_node = &mut self.nodes[parent.index()];
        parent_node.children.push(ix);
        parent_node.by_name.insert(name.clone(), ix);
        self.nodes.push(Node::new(name, Some(parent), body));
        self.revision += 1;
        ix
    }

    /// Inserts an already validated declaration.
    fn insert(&mut self, parent: NodeIndex, decl: Declaration, source: Option<&Utf8Path>) -> NodeIndex {
        let (ix, options, nested) = match decl {
            Declaration::Namespace(ns) => {
                let ix = match self.child(parent, &ns.name) {
                    Some(existing) => existing,
                    None => self.push_node(parent, ns.name, NodeBody::Namespace),
                };
                (ix, ns.options, ns.nested)
            }
            Declaration::Message(message) => {
                let MessageDecl {
                    name,
                    mut fields,
                    mut oneofs,
                    nested,
                    reserved,
                    extensions,
                    options,
                } = message;
                if !self.options.keep_case {
                    camel_case_fields(&mut fields, &mut oneofs);
                }
                let body = NodeBody::Message(MessageBody {
                    fields,
                    oneofs,
                    reserved,
                    extensions,
                });
                let ix = self.push_node(parent, name, body);
                self.set_source(ix, source);
                (ix, options, nested)
            }
            Declaration::Enum(EnumDecl {
                name,
                values,
                reserved,
                options,
            }) => {
                let ix = self.push_node(parent, name, NodeBody::Enum(EnumBody { values, reserved }));
                self.set_source(ix, source);
                (ix, options, Vec::new())
            }
            Declaration::Service(ServiceDecl {
                name,
                methods,
                options,
            }) => {
                let ix = self.push_node(parent, name, NodeBody::Service(ServiceBody { methods }));
                self.set_source(ix, source);
                (ix, options, Vec::new())
            }
        };
        self.node_mut(ix).options.extend(options);
        for child in nested {
            self.insert(ix, child, source);
        }
        ix
    }

    fn set_source(&mut self, ix: NodeIndex, source: Option<&Utf8Path>) {
        self.node_mut(ix).source_file = source.map(Utf8Path::to_path_buf);
    }
}

fn declaration_kind(decl: &Declaration) -> NodeKind {
    match decl {
        Declaration::Message(_) => NodeKind::Message,
        Declaration::Enum(_) => NodeKind::Enum,
        Declaration::Service(_) => NodeKind::Service,
        Declaration::Namespace(_) => NodeKind::Namespace,
    }
}

fn join_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

fn camel_case_fields(fields: &mut [FieldDecl], oneofs: &mut [OneofDecl]) {
    for field in fields {
        field.name = camel_case(&field.name);
    }
    for oneof in oneofs {
        oneof.name = camel_case(&oneof.name);
        for member in &mut oneof.fields {
            *member = camel_case(member);
        }
    }
}

/// Converts `snake_case` to `lowerCamelCase` the way protobuf.js does: an
/// underscore followed by a lowercase ASCII letter is dropped and the letter
/// uppercased. The first character is never touched.
///
/// # Examples
///
/// ```
/// use pb_schema::camel_case;
///
/// assert_eq!(camel_case("first_name"), "firstName");
/// assert_eq!(camel_case("_private"), "_private");
/// assert_eq!(camel_case("value_1"), "value_1");
/// assert_eq!(camel_case("a_b_c"), "aBC");
/// ```
#[must_use]
pub fn camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let converts = i > 0
            && c == '_'
            && chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
        if converts {
            out.push(chars[i + 1].to_ascii_uppercase());
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}
