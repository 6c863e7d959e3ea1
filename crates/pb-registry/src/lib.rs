//! Protocol buffer schema registry with stable id indexing.
//!
//! This crate loads `.proto` definition files into a merged
//! [`SchemaTree`], assigns every namespace node an integer id, and answers
//! lookups by dotted name or id.
//!
//! # Overview
//!
//! The main entry point is [`ProtoRegistry`], which combines:
//!
//! - [`FileWalker`]: recursive discovery of definition files
//! - [`load_folder`]: sorted, failure-tolerant batch loading
//! - [`IdIndexer`]: deterministic id assignment into an [`IdIndex`]
//! - [`ModelCache`]: memoized lookups
//! - [`export`]: JSON export re-stamped with `_id` / `_name`
//! - [`ExtensionRegistry`]: post-load customization of the tree
//! - [`Compiler`]: bridge to an external code generator
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use pb_core::RegistryConfig;
//! use pb_registry::ProtoRegistry;
//!
//! # async fn example() -> Result<(), pb_registry::RegistryError> {
//! let mut registry = ProtoRegistry::new(RegistryConfig::with_root(Utf8Path::new("./my-app")));
//! registry.run().await?;
//!
//! if let Some(profile) = registry.get("app.User.Profile") {
//!     println!("{} has id {:?}", registry.full_name(profile), registry.node(profile).assigned_id());
//! }
//! for (id, name) in registry.ids().iter() {
//!     println!("{id:>4}  {name}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ProtoRegistry
//!     │
//!     ├── load_folder ── FileWalker (ignore crate) ── tokio::fs
//!     │
//!     ├── SchemaTree (pb-schema arena)
//!     │
//!     ├── IdIndexer ── IdIndex (id <-> dotted name)
//!     │
//!     ├── ModelCache (FxHashMap + RwLock)
//!     │
//!     ├── ExtensionRegistry (identifier -> Fn)
//!     │
//!     └── Compiler (tokio::process)
//! ```
//!
//! # Mutation model
//!
//! Every structural mutation made through the registry ([`ProtoRegistry::add`],
//! [`ProtoRegistry::load`] with `assign_ids`, [`ProtoRegistry::add_path`]
//! after startup) is followed by a full re-assignment pass, so ids are
//! always consistent with the tree but are not stable across mutations.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod compiler;
mod error;
mod export;
mod extension;
mod indexer;
mod loader;
mod lookup;
mod walker;

pub use compiler::{Compiler, collect_sources};
pub use error::{CompileError, ExtensionError, IdAssignError, RegistryError};
pub use export::{ID_FIELD, NAME_FIELD, annotate, export, export_node};
pub use extension::{ExtensionFn, ExtensionRegistry, SchemaExtension};
pub use indexer::{AssignReport, IdIndex, IdIndexer};
pub use loader::{LoadReport, load_folder};
pub use lookup::{LookupKey, ModelCache, resolve, resolve_name};
pub use walker::FileWalker;

use camino::{Utf8Path, Utf8PathBuf};
use pb_core::RegistryConfig;
use pb_schema::{Declaration, Node, NodeIndex, SchemaTree, TreeOptions};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// A declaration to insert programmatically, with where to put it.
///
/// # Examples
///
/// ```
/// use pb_registry::NodeDescriptor;
/// use pb_schema::MessageDecl;
///
/// let descriptor = NodeDescriptor::new(MessageDecl::new("Audit")).with_parent("app");
/// assert_eq!(descriptor.parent.as_deref(), Some("app"));
/// ```
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Dotted name of the parent; `None` inserts below the root.
    pub parent: Option<String>,
    /// The declaration to insert.
    pub declaration: Declaration,
    /// Backing file recorded on the inserted nodes.
    pub source_file: Option<Utf8PathBuf>,
}

impl NodeDescriptor {
    /// Creates a descriptor inserting `declaration` below the root.
    #[must_use]
    pub fn new(declaration: impl Into<Declaration>) -> Self {
        Self {
            parent: None,
            declaration: declaration.into(),
            source_file: None,
        }
    }

    /// Sets the dotted parent name.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the backing file.
    #[must_use]
    pub fn with_source(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }
}

/// One schema registry instance.
///
/// Instances are fully independent: each owns its tree, id index, model
/// cache and extensions.
///
/// Structural mutations take `&mut self`; callers sharing a registry across
/// tasks serialize them themselves (for example behind a
/// `tokio::sync::RwLock`).
#[derive(Debug)]
pub struct ProtoRegistry {
    config: RegistryConfig,
    tree: SchemaTree,
    indexer: IdIndexer,
    models: ModelCache,
    extensions: ExtensionRegistry,
    /// Folders queued by `add_path` before startup.
    pending: Vec<Utf8PathBuf>,
    started: bool,
}

impl ProtoRegistry {
    /// Creates a registry. Nothing is loaded until [`ProtoRegistry::run`].
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        let tree = SchemaTree::new(TreeOptions::from_map(&config.options));
        let indexer = IdIndexer::new(config.ids);
        Self {
            config,
            tree,
            indexer,
            models: ModelCache::new(),
            extensions: ExtensionRegistry::new(),
            pending: Vec::new(),
            started: false,
        }
    }

    /// Starts the registry.
    ///
    /// Loads every configured and queued folder, assigns ids once, then runs
    /// the configured extensions (re-assigning if they changed the tree).
    /// Configured folders that don't exist are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyStarted`] on a second call,
    /// [`RegistryError::Extension`] if any extension can't be resolved or
    /// fails, and walker errors for unreadable folders.
    pub async fn run(&mut self) -> Result<(), RegistryError> {
        if self.started {
            return Err(RegistryError::AlreadyStarted);
        }
        self.started = true;

        let mut folders: Vec<Utf8PathBuf> = self
            .config
            .path
            .iter()
            .map(|path| self.config.resolve(path))
            .collect();
        folders.append(&mut self.pending);

        for folder in &folders {
            if !folder.is_dir() {
                warn!(folder = %folder, "Model folder does not exist, skipping");
                continue;
            }
            self.load_resolved(folder, false).await?;
        }
        self.assign_ids();

        let extend: Vec<Utf8PathBuf> = self
            .config
            .extend
            .iter()
            .map(|path| self.config.resolve(path))
            .collect();
        let revision = self.tree.revision();
        self.extensions.run(&mut self.tree, &extend)?;
        if self.tree.revision() != revision {
            debug!("Extensions changed the tree, re-assigning ids");
            self.assign_ids();
        }

        info!(
            nodes = self.tree.len(),
            ids = self.indexer.index().len(),
            "Registry started"
        );
        if self.config.debug {
            for (id, name) in self.indexer.index().iter() {
                info!(id = id.get(), name, "Assigned id");
            }
        }
        Ok(())
    }

    /// Whether [`ProtoRegistry::run`] has been called.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Adds a models folder.
    ///
    /// Before startup the folder is queued for [`ProtoRegistry::run`]; after
    /// startup it is loaded immediately and ids are re-assigned. Returns
    /// `false` for an empty path or a folder that fails to load.
    pub async fn add_path(&mut self, path: &str) -> bool {
        if path.trim().is_empty() {
            return false;
        }
        let folder = self.config.resolve(Utf8Path::new(path));
        if !self.started {
            debug!(folder = %folder, "Queued models folder");
            self.pending.push(folder);
            return true;
        }
        match self.load_resolved(&folder, true).await {
            Ok(_) => true,
            Err(err) => {
                warn!(folder = %folder, error = %err, "Could not add models folder");
                false
            }
        }
    }

    /// Loads every definition file below `folder` (resolved against the
    /// project root), optionally re-assigning ids afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the folder doesn't exist and
    /// walker errors. Per-file failures are in the returned report.
    pub async fn load(
        &mut self,
        folder: &Utf8Path,
        assign_ids: bool,
    ) -> Result<LoadReport, RegistryError> {
        let folder = self.config.resolve(folder);
        self.load_resolved(&folder, assign_ids).await
    }

    async fn load_resolved(
        &mut self,
        folder: &Utf8Path,
        assign_ids: bool,
    ) -> Result<LoadReport, RegistryError> {
        let report = load_folder(
            &mut self.tree,
            folder,
            &self.config.file_extension,
            &self.config.root,
        )
        .await?;
        if assign_ids {
            self.assign_ids();
        }
        Ok(report)
    }

    /// Inserts a declaration and re-assigns ids.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownParent`] if the parent doesn't exist
    /// and [`RegistryError::Schema`] if the declaration clashes with the tree.
    pub fn add(&mut self, descriptor: NodeDescriptor) -> Result<NodeIndex, RegistryError> {
        let parent = match &descriptor.parent {
            None => SchemaTree::ROOT,
            Some(name) => resolve_name(&self.tree, name)
                .ok_or_else(|| RegistryError::UnknownParent(name.clone()))?,
        };
        let ix = self.tree.add_with_source(
            parent,
            descriptor.declaration,
            descriptor.source_file.as_deref(),
        )?;
        self.assign_ids();
        Ok(ix)
    }

    /// Resolves `key` against the current tree and index.
    #[must_use]
    pub fn get(&self, key: impl Into<LookupKey>) -> Option<NodeIndex> {
        resolve(&self.tree, self.indexer.index(), &key.into())
    }

    /// Like [`ProtoRegistry::get`], memoizing hits.
    ///
    /// The cache is never invalidated by the registry; see [`ModelCache`].
    pub fn model(&self, key: impl Into<LookupKey>) -> Option<NodeIndex> {
        let key = key.into();
        self.models
            .get_or_resolve(&key, |key| resolve(&self.tree, self.indexer.index(), key))
    }

    /// Drops every memoized [`ProtoRegistry::model`] lookup.
    pub fn clear_model_cache(&self) {
        self.models.clear();
    }

    /// Exports the subtree named by `key` (the whole tree for `None`),
    /// annotated with ids and dotted names.
    #[must_use]
    pub fn export(&self, key: Option<LookupKey>) -> Option<Value> {
        export(&self.tree, self.indexer.index(), key.as_ref())
    }

    /// Runs the external generator on the backing files of `keys` (the
    /// whole tree when empty) and returns its output.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] of the invocation, after logging it.
    pub async fn compile(
        &self,
        keys: &[LookupKey],
        format: &str,
        flags: &[String],
    ) -> Result<String, CompileError> {
        let files = collect_sources(&self.tree, self.indexer.index(), keys);
        let compiler = Compiler::new(&self.config.compiler, &self.config.compiler_dir());
        compiler.compile(format, flags, &files).await.inspect_err(|err| {
            let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
            error!(program = compiler.program(), ?keys, format, error = %err, "Compilation failed");
        })
    }

    /// Runs a full id re-assignment pass.
    pub fn assign_ids(&mut self) -> AssignReport {
        self.indexer.assign(&mut self.tree)
    }

    /// The id index as of the last pass.
    #[must_use]
    pub const fn ids(&self) -> &IdIndex {
        self.indexer.index()
    }

    /// The live tree.
    #[must_use]
    pub const fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Returns the node at `ix`.
    #[must_use]
    pub fn node(&self, ix: NodeIndex) -> &Node {
        self.tree.node(ix)
    }

    /// Returns the dotted name of `ix`.
    #[must_use]
    pub fn full_name(&self, ix: NodeIndex) -> String {
        self.tree.full_name(ix)
    }

    /// Extensions run by [`ProtoRegistry::run`]. Register before starting.
    pub fn extensions_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.extensions
    }

    /// The configuration this registry was created with.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }
}
