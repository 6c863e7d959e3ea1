//! Post-load extensions.
//!
//! Extensions are functions registered under an identifier before startup.
//! The `extend` setting lists files or directories; each path resolves to
//! identifiers (a file to its stem, a directory to the sorted stems of its
//! files), and the function registered under each identifier is invoked once
//! with the live tree and its root.
//!
//! Any failure here is fatal to startup: a path that doesn't exist, an
//! identifier nothing is registered under, an extension returning `Err`, or
//! an extension panicking.
//!
//! # Examples
//!
//! ```
//! use pb_registry::{ExtensionError, ExtensionRegistry};
//! use pb_schema::{MessageDecl, NamespaceDecl, NodeIndex, SchemaTree};
//!
//! let mut extensions = ExtensionRegistry::new();
//! extensions.register("audit", |tree: &mut SchemaTree, root: NodeIndex| {
//!     let ns = NamespaceDecl::new("audit").with_nested(MessageDecl::new("Entry"));
//!     tree.add(root, ns.into())
//!         .map(|_| ())
//!         .map_err(|err| ExtensionError::failed("audit", err.to_string()))
//! });
//! assert!(extensions.contains("audit"));
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use pb_core::FxHashMap;
use pb_schema::{NodeIndex, SchemaTree};
use tracing::{debug, info};

use crate::error::ExtensionError;

/// A post-load customization of the tree.
///
/// Implemented for every `Fn(&mut SchemaTree, NodeIndex) -> Result<(), ExtensionError>`,
/// so plain closures can be registered directly.
pub trait SchemaExtension: Send + Sync {
    /// Mutates the tree in place. `root` is the tree root.
    fn extend(&self, tree: &mut SchemaTree, root: NodeIndex) -> Result<(), ExtensionError>;
}

impl<F> SchemaExtension for F
where
    F: Fn(&mut SchemaTree, NodeIndex) -> Result<(), ExtensionError> + Send + Sync,
{
    fn extend(&self, tree: &mut SchemaTree, root: NodeIndex) -> Result<(), ExtensionError> {
        self(tree, root)
    }
}

/// Shared handle to a registered extension.
pub type ExtensionFn = Arc<dyn SchemaExtension>;

/// Identifier to extension mapping for one registry.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    extensions: FxHashMap<String, ExtensionFn>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl ExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extension` under `identifier`, replacing any previous one.
    pub fn register<E>(&mut self, identifier: impl Into<String>, extension: E)
    where
        E: SchemaExtension + 'static,
    {
        self.extensions.insert(identifier.into(), Arc::new(extension));
    }

    /// Whether something is registered under `identifier`.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.extensions.contains_key(identifier)
    }

    /// Number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Resolves configured paths to registered extensions, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::MissingPath`], [`ExtensionError::Read`] or
    /// [`ExtensionError::NotRegistered`].
    pub fn resolve(&self, paths: &[Utf8PathBuf]) -> Result<Vec<(String, ExtensionFn)>, ExtensionError> {
        let mut resolved = Vec::new();
        for path in paths {
            for identifier in identifiers_for(path)? {
                let Some(extension) = self.extensions.get(&identifier) else {
                    return Err(ExtensionError::NotRegistered {
                        identifier,
                        path: path.clone(),
                    });
                };
                resolved.push((identifier, Arc::clone(extension)));
            }
        }
        Ok(resolved)
    }

    /// Resolves `paths` and runs every extension against `tree`.
    ///
    /// All paths are resolved before the first extension runs. Returns the
    /// number of extensions invoked.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error, or the first extension failure
    /// (including a panic, reported as [`ExtensionError::Panicked`]).
    pub fn run(&self, tree: &mut SchemaTree, paths: &[Utf8PathBuf]) -> Result<usize, ExtensionError> {
        let resolved = self.resolve(paths)?;
        for (identifier, extension) in &resolved {
            debug!(extension = %identifier, "Running extension");
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                extension.extend(tree, SchemaTree::ROOT)
            }));
            match outcome {
                Ok(result) => result?,
                Err(payload) => {
                    return Err(ExtensionError::Panicked {
                        identifier: identifier.clone(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }
        if !resolved.is_empty() {
            info!(count = resolved.len(), "Extensions applied");
        }
        Ok(resolved.len())
    }
}

/// Identifiers a configured `extend` path stands for.
fn identifiers_for(path: &Utf8Path) -> Result<Vec<String>, ExtensionError> {
    if !path.exists() {
        return Err(ExtensionError::MissingPath(path.to_owned()));
    }
    if !path.is_dir() {
        return Ok(path.file_stem().map(str::to_owned).into_iter().collect());
    }

    let read_err = |source| ExtensionError::Read {
        path: path.to_owned(),
        source,
    };
    let mut stems = Vec::new();
    for entry in path.read_dir_utf8().map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let is_file = entry.file_type().map_err(read_err)?.is_file();
        let name = entry.file_name();
        if !is_file || name.starts_with('.') {
            continue;
        }
        if let Some(stem) = entry.path().file_stem() {
            stems.push(stem.to_owned());
        }
    }
    stems.sort();
    Ok(stems)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
