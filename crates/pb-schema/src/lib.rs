//! Protocol buffer definition parser and namespace tree.
//!
//! This crate turns `.proto` source text into a merged, arena-backed tree
//! of packages, messages, enums and services:
//!
//! - [`parse`] - logos lexer plus recursive descent parser producing a [`ProtoFile`]
//! - [`SchemaTree`] - the merged namespace tree, addressed by [`NodeIndex`]
//! - [`SchemaTree::to_serializable`] - protobuf.js-style JSON projection
//!
//! # Overview
//!
//! ```
//! use camino::Utf8Path;
//! use pb_schema::{NodeKind, SchemaTree};
//!
//! let mut tree = SchemaTree::default();
//! tree.merge_source(
//!     r#"syntax = "proto3"; package app.User; message Profile { string name = 1; }"#,
//!     Utf8Path::new("user.proto"),
//! )?;
//!
//! let app = tree.child(SchemaTree::ROOT, "app").unwrap();
//! let user = tree.child(app, "User").unwrap();
//! let profile = tree.child(user, "Profile").unwrap();
//! assert_eq!(tree.node(profile).kind(), NodeKind::Message);
//! assert_eq!(tree.full_name(profile), "app.User.Profile");
//! # Ok::<(), pb_schema::SchemaError>(())
//! ```
//!
//! # Merge Semantics
//!
//! | Declaration | Existing node | Result |
//! |-------------|---------------|--------|
//! | package segment | namespace | reused |
//! | package segment | message/enum/service | [`SchemaError::Conflict`] |
//! | namespace | namespace | merged |
//! | anything else | any | [`SchemaError::Duplicate`] |
//!
//! A file is validated in full before it touches the tree, so a rejected
//! file leaves no trace.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
mod serialize;
pub mod tree;

pub use ast::{
    Declaration, EnumDecl, EnumValueDecl, FieldDecl, FieldRule, Import, MethodDecl, MessageDecl,
    NamespaceDecl, OneofDecl, OptionValue, Options, ProtoFile, Reserved, ServiceDecl,
};
pub use error::{ParseError, SchemaError};
pub use parser::parse;
pub use tree::{
    EnumBody, MessageBody, Node, NodeBody, NodeIndex, NodeKind, SchemaTree, ServiceBody,
    TreeOptions, camel_case,
};
