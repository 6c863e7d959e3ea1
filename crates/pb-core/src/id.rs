//! Numeric identifiers assigned to namespace nodes.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The integer identifier the registry assigns to a namespace node.
///
/// Uses a newtype so a raw arena index or field number can't be passed where
/// a registry id is expected. Under the `auto` policy ids are dense
/// (`0..N`); under the `file` policy they come from source filename prefixes.
///
/// # Examples
///
/// ```
/// use pb_core::SchemaId;
///
/// let id = SchemaId::new(7);
/// assert_eq!(id.get(), 7);
/// assert_eq!(id.to_string(), "7");
/// assert_eq!("7".parse::<SchemaId>().ok(), Some(id));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SchemaId(u32);

impl SchemaId {
    /// Creates a new id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for SchemaId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<SchemaId> for u32 {
    #[inline]
    fn from(id: SchemaId) -> Self {
        id.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchemaId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_id_ordering() {
        let mut ids = vec![SchemaId::new(3), SchemaId::new(0), SchemaId::new(12)];
        ids.sort();
        assert_eq!(ids, vec![SchemaId::new(0), SchemaId::new(3), SchemaId::new(12)]);
    }

    #[test]
    fn test_schema_id_rejects_negative() {
        assert!("-1".parse::<SchemaId>().is_err());
        assert!("abc".parse::<SchemaId>().is_err());
    }

    #[test]
    fn test_schema_id_serializes_as_number() {
        let json = serde_json::to_string(&SchemaId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
