//! Map alias used by the comparator's in-memory indexes.
//!
//! With the `gxhash` feature the fast gxhash hasher is used; without it the
//! crate falls back to std, which builds on CPUs lacking AES-NI/SSE2.

#[cfg(feature = "gxhash")]
pub use gxhash::{HashMap as GxHashMap, HashMapExt};

#[cfg(not(feature = "gxhash"))]
use std::collections::HashMap as StdHashMap;

/// HashMap that uses gxhash when available, std otherwise
#[cfg(feature = "gxhash")]
pub type HashMap<K, V> = GxHashMap<K, V>;

/// HashMap that uses gxhash when available, std otherwise
#[cfg(not(feature = "gxhash"))]
pub type HashMap<K, V> = StdHashMap<K, V>;

/// Constructors shared by both map flavours
#[cfg(not(feature = "gxhash"))]
pub trait HashMapExt {
    /// Creates a new HashMap with default capacity
    fn new() -> Self;

    /// Creates a new HashMap with specified capacity
    fn with_capacity(capacity: usize) -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<K, V> HashMapExt for StdHashMap<K, V> {
    fn new() -> Self {
        StdHashMap::new()
    }

    fn with_capacity(capacity: usize) -> Self {
        StdHashMap::with_capacity(capacity)
    }
}
