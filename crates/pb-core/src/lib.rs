//! Core types, configuration, and errors for the protobuf schema registry.
//!
//! This crate provides the foundational types shared across the workspace:
//!
//! - [`RegistryConfig`] and its nested settings, loadable from JSON
//! - [`ConfigError`] for configuration failures
//! - [`SchemaId`] and [`IdPolicy`], the identifier vocabulary of the registry
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
mod id;

pub use config::{CompilerConfig, IdPolicy, RegistryConfig};
pub use error::ConfigError;
pub use hash::{FxBuildHasher, FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use id::SchemaId;
