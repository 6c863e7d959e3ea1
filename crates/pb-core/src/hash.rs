//! Fast hash map and hash set type aliases.
//!
//! The registry keys nearly everything by dotted name or by small integer id,
//! so the Fx hash from `rustc-hash` is used instead of std's SipHash. None of
//! these maps are exposed to untrusted keys, so denial-of-service resistance
//! isn't needed.
//!
//! # Examples
//!
//! ```
//! use pb_core::{FxHashMap, fx_hash_map};
//!
//! let mut name_to_id: FxHashMap<String, u32> = fx_hash_map();
//! name_to_id.insert("app.User".to_owned(), 2);
//! assert_eq!(name_to_id.get("app.User"), Some(&2));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// The hasher used by [`FxHashMap`] and [`FxHashSet`].
pub type FxBuildHasher = rustc_hash::FxBuildHasher;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_set_dedup() {
        let mut set: FxHashSet<&str> = fx_hash_set();
        assert!(set.insert("user.proto"));
        assert!(!set.insert("user.proto"));
        assert_eq!(set.len(), 1);
    }
}
