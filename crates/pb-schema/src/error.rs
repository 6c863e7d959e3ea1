//! Error types for the pb-schema crate.
//!
//! - [`ParseError`] - the source text is not a valid definition file
//! - [`SchemaError`] - a file or declaration can't be merged into the tree

use camino::Utf8PathBuf;

use crate::tree::NodeKind;

/// Errors that can occur while lexing or parsing a definition file.
///
/// Positions are 1-based.
///
/// # Examples
///
/// ```
/// use pb_schema::parse;
///
/// let err = parse("message {").unwrap_err();
/// assert!(err.to_string().contains("line 1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The lexer found text that isn't a valid token.
    #[error("invalid token at line {line}, column {column}")]
    InvalidToken {
        /// Line of the offending text.
        line: usize,
        /// Column of the offending text.
        column: usize,
    },

    /// A token other than the expected one was found.
    #[error("unexpected {found} at line {line}, column {column}: expected {expected}")]
    Unexpected {
        /// Description of the token found.
        found: String,
        /// Description of what the grammar expected.
        expected: String,
        /// Line of the token.
        line: usize,
        /// Column of the token.
        column: usize,
    },

    /// The input ended in the middle of a construct.
    #[error("unexpected end of input: expected {expected}")]
    UnexpectedEof {
        /// Description of what the grammar expected.
        expected: String,
    },

    /// A construct that is recognized but not supported.
    #[error("unsupported construct '{construct}' at line {line}, column {column}")]
    Unsupported {
        /// The keyword that introduced the construct.
        construct: String,
        /// Line of the keyword.
        line: usize,
        /// Column of the keyword.
        column: usize,
    },

    /// A number is outside the range allowed in its position.
    #[error("number out of range at line {line}, column {column}: {reason}")]
    OutOfRange {
        /// Why the number was rejected.
        reason: String,
        /// Line of the number.
        line: usize,
        /// Column of the number.
        column: usize,
    },

    /// A statement that may only appear once appeared again.
    #[error("duplicate {statement} statement at line {line}")]
    DuplicateStatement {
        /// The statement keyword.
        statement: &'static str,
        /// Line of the second occurrence.
        line: usize,
    },
}

/// Errors that can occur while loading a file into a [`SchemaTree`](crate::SchemaTree)
/// or inserting a declaration.
///
/// None of these leave the tree partially modified: merges are validated
/// in full before the first node is created.
///
/// # Error Recovery Strategy
///
/// All variants are scoped to one file or one declaration, so callers that
/// load batches log them and continue with the next file.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The definition file couldn't be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The definition file couldn't be parsed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The file that couldn't be parsed.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: ParseError,
    },

    /// A declaration reuses a name that already exists at the same level.
    #[error("duplicate name '{name}'")]
    Duplicate {
        /// Full dotted name of the clash.
        name: String,
    },

    /// A namespace path runs through a node that can't contain namespaces.
    #[error("'{name}' is a {kind} and cannot contain nested definitions")]
    Conflict {
        /// Full dotted name of the blocking node.
        name: String,
        /// Kind of the blocking node.
        kind: NodeKind,
    },

    /// A declaration kind that may not appear under the given parent.
    #[error("a {child} cannot be nested in a {parent}")]
    InvalidParent {
        /// Kind of the parent node.
        parent: NodeKind,
        /// Kind of the rejected declaration.
        child: NodeKind,
    },

    /// A local name is empty or contains a `.`.
    #[error("invalid name '{0}'")]
    InvalidName(String),
}

impl SchemaError {
    /// Returns the file associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::Duplicate { .. }
            | Self::Conflict { .. }
            | Self::InvalidParent { .. }
            | Self::InvalidName(_) => None,
        }
    }
}
