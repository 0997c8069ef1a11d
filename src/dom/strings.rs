//! String Interning Pool
//!
//! Deduplicated storage for element names, attribute names and values,
//! namespace URIs and text content. Every string lives in one contiguous
//! buffer and is addressed by a `u32` id; id 0 is the empty string.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Location of an interned string inside the pool buffer
#[derive(Debug, Clone, Copy)]
struct StringEntry {
    offset: u32,
    len: u32,
}

/// String interning pool
///
/// Memory layout:
/// - `entries`: (offset, len) for each interned string ID
/// - `data`: buffer holding the string bytes back to back
/// - `hash_index`: hash -> list of IDs (handles rare collisions)
#[derive(Debug)]
pub struct StringPool {
    entries: Vec<StringEntry>,
    data: String,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    /// Create a new empty string pool
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Create a pool sized for roughly `bytes` of string data
    pub fn with_capacity(bytes: usize) -> Self {
        let mut pool = StringPool {
            entries: Vec::with_capacity(256),
            data: String::with_capacity(bytes),
            hash_index: HashMap::new(),
        };
        // Entry 0 is reserved for the empty string
        pool.entries.push(StringEntry { offset: 0, len: 0 });
        pool
    }

    #[inline]
    fn compute_hash(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a string, returning the id of an existing copy when present
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = Self::compute_hash(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let offset = self.data.len() as u32;
        self.data.push_str(s);

        let id = self.entries.len() as u32;
        self.entries.push(StringEntry {
            offset,
            len: s.len() as u32,
        });
        self.hash_index.entry(hash).or_default().push(id);

        id
    }

    /// Id of an already interned string, without inserting it
    pub fn lookup(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        let ids = self.hash_index.get(&Self::compute_hash(s))?;
        ids.iter().copied().find(|&id| self.get(id) == s)
    }

    /// Get a string by ID. Unknown ids resolve to the empty string.
    #[inline]
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(entry) => {
                let start = entry.offset as usize;
                self.data.get(start..start + entry.len as usize).unwrap_or("")
            }
            None => "",
        }
    }

    /// Get a non-empty string by ID
    #[inline]
    pub fn get_opt(&self, id: u32) -> Option<&str> {
        if id == 0 {
            None
        } else {
            Some(self.get(id))
        }
    }

    /// Get the number of unique strings stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Get total bytes used for string storage
    pub fn bytes_used(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_get() {
        let mut pool = StringPool::new();
        let id = pool.intern("hello");
        assert!(id > 0);
        assert_eq!(pool.get(id), "hello");
        assert_eq!(pool.get_opt(id), Some("hello"));
    }

    #[test]
    fn test_intern_duplicate() {
        let mut pool = StringPool::new();
        let id1 = pool.intern("hello");
        let id2 = pool.intern("world");
        assert_ne!(id1, id2);
        assert_eq!(pool.intern("hello"), id1);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_string() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), "");
        assert_eq!(pool.get_opt(0), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_lookup() {
        let mut pool = StringPool::new();
        let id = pool.intern("café");
        assert_eq!(pool.lookup("café"), Some(id));
        assert_eq!(pool.lookup("tea"), None);
        assert_eq!(pool.bytes_used(), "café".len());
    }
}
