//! Error types for the pb-registry crate.
//!
//! - [`RegistryError`] - loading, startup and programmatic insertion
//! - [`IdAssignError`] - a single node that couldn't get an id
//! - [`ExtensionError`] - extension resolution and execution
//! - [`CompileError`] - the external code generator

use camino::Utf8PathBuf;
use pb_core::{ConfigError, SchemaId};
use pb_schema::SchemaError;

/// Errors returned by [`ProtoRegistry`](crate::ProtoRegistry) operations.
///
/// # Error Recovery Strategy
///
/// - **Per-file errors** ([`RegistryError::Schema`] with a path): logged and
///   collected in a [`LoadReport`](crate::LoadReport), never returned from a batch load
/// - **Walker errors** ([`RegistryError::Walk`]): fatal for the folder being loaded
/// - **Extension errors** ([`RegistryError::Extension`]): fatal for startup
///
/// # Examples
///
/// ```
/// use pb_registry::RegistryError;
///
/// let err = RegistryError::config("models folder does not exist: app/models");
/// assert!(err.is_fatal());
/// assert!(err.to_string().contains("app/models"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Failed to walk a directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A path argument or setting is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration file or values are invalid.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A file or declaration couldn't be merged into the tree.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The parent named by a node descriptor doesn't exist.
    #[error("namespace [{0}] does not exist")]
    UnknownParent(String),

    /// An extension failed during startup.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// [`run`](crate::ProtoRegistry::run) was called on a started registry.
    #[error("registry already started")]
    AlreadyStarted,
}

impl RegistryError {
    /// Creates a new [`RegistryError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` if this error only affects a single file.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Schema(err) if err.path().is_some())
    }

    /// Returns `true` if this error should stop the current operation.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Schema(err) => err.path(),
            Self::Extension(err) => err.path(),
            Self::Walk(_)
            | Self::Config(_)
            | Self::InvalidConfig(_)
            | Self::NonUtf8Path(_)
            | Self::UnknownParent(_)
            | Self::AlreadyStarted => None,
        }
    }
}

/// A node that was visited but left without an id under the file policy.
///
/// These never abort an indexing pass; they are logged and collected in the
/// [`AssignReport`](crate::AssignReport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdAssignError {
    /// The backing file name has no `{id}-` prefix.
    #[error("{name}: file {file} has no numeric id prefix")]
    MissingPrefix {
        /// Dotted name of the node.
        name: String,
        /// The backing file.
        file: Utf8PathBuf,
    },

    /// The prefix isn't a valid non-negative integer.
    #[error("{name}: invalid id prefix '{prefix}' in file {file}")]
    InvalidPrefix {
        /// Dotted name of the node.
        name: String,
        /// The backing file.
        file: Utf8PathBuf,
        /// The text before the first `-`.
        prefix: String,
    },

    /// Another node already holds this id in the current pass.
    #[error("{name}: id {id} is already assigned to {existing}")]
    DuplicateId {
        /// Dotted name of the node.
        name: String,
        /// The contested id.
        id: SchemaId,
        /// Dotted name of the node that kept the id.
        existing: String,
    },
}

impl IdAssignError {
    /// Returns the dotted name of the node that was skipped.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::MissingPrefix { name, .. }
            | Self::InvalidPrefix { name, .. }
            | Self::DuplicateId { name, .. } => name,
        }
    }
}

/// Errors raised while resolving or running extensions.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    /// A configured `extend` path doesn't exist.
    #[error("extension path does not exist: {0}")]
    MissingPath(Utf8PathBuf),

    /// An extension directory couldn't be listed.
    #[error("failed to read extension directory {path}: {source}")]
    Read {
        /// The directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path resolved to an identifier nothing was registered under.
    #[error("no extension registered as '{identifier}' (from {path})")]
    NotRegistered {
        /// The identifier derived from the path.
        identifier: String,
        /// The configured path it came from.
        path: Utf8PathBuf,
    },

    /// An extension returned an error.
    #[error("extension '{identifier}' failed: {message}")]
    Failed {
        /// The extension identifier.
        identifier: String,
        /// What went wrong.
        message: String,
    },

    /// An extension panicked.
    #[error("extension '{identifier}' panicked: {message}")]
    Panicked {
        /// The extension identifier.
        identifier: String,
        /// The panic payload, if it was a string.
        message: String,
    },
}

impl ExtensionError {
    /// Creates a new [`ExtensionError::Failed`] error. Intended for use
    /// inside extension functions.
    #[inline]
    pub fn failed(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::MissingPath(path) | Self::Read { path, .. } | Self::NotRegistered { path, .. } => {
                Some(path)
            }
            Self::Failed { .. } | Self::Panicked { .. } => None,
        }
    }
}

/// Errors from the external code generator.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// None of the requested namespaces has a backing file.
    #[error("no source files to compile")]
    NoSources,

    /// The generator couldn't be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The generator exited unsuccessfully.
    #[error("{program} exited with {}: {stderr}", exit_label(.status))]
    Failed {
        /// The program that was invoked.
        program: String,
        /// Exit code, `None` if terminated by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
}

fn exit_label(status: &Option<i32>) -> String {
    status.map_or_else(|| "signal".to_owned(), |code| format!("status {code}"))
}
