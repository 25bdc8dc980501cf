//! Sharded string interner for identifier storage.
//!
//! Provides O(1) interning and lookup with per-shard locking. One interner
//! is created per analysis session and dropped with it; interned names have
//! no observable identity beyond handle equality.
//!
//! Identifiers are bounded: anything longer than [`MAX_IDENT_LEN`] bytes is
//! truncated at a char boundary, and the caller is told so it can report a
//! diagnostic and keep going with the truncated name.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Name;

/// Maximum identifier length in bytes. Longer identifiers are truncated.
pub const MAX_IDENT_LEN: usize = 1023;

/// Error when interning an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternError {
    /// Identifier exceeded [`MAX_IDENT_LEN`]; carries the truncated name so
    /// analysis can continue with it after reporting.
    #[error("identifier of {len} bytes exceeds maximum length {max}", max = MAX_IDENT_LEN)]
    IdentTooLong { len: usize, truncated: Name },

    /// Shard exceeded capacity (over 268 million strings per shard).
    #[error("interner shard {shard_idx} exceeded capacity: {count} strings")]
    ShardOverflow { shard_idx: usize, count: usize },
}

/// Per-shard storage for interned strings.
struct InternShard {
    /// Map from string content to local index.
    map: FxHashMap<Box<str>, u32>,
    /// Storage for string contents, indexed by local index.
    strings: Vec<Box<str>>,
}

impl InternShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        }
    }

    fn with_empty() -> Self {
        let mut shard = Self::new();
        // Pre-intern empty string at index 0
        shard.map.insert("".into(), 0);
        shard.strings.push("".into());
        shard
    }
}

/// Sharded string interner.
///
/// Provides O(1) lookup and equality comparison for interned strings.
/// Uses `RwLock` per shard so concurrent readers never contend.
pub struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
    /// Total count of interned strings across all shards (O(1) `len()`).
    total_count: AtomicUsize,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(InternShard::with_empty())
            } else {
                RwLock::new(InternShard::new())
            }
        });

        // Start with 1 for the empty string pre-interned in shard 0
        Self {
            shards,
            total_count: AtomicUsize::new(1),
        }
    }

    /// Compute shard for a string based on its hash.
    #[inline]
    fn shard_for(s: &str) -> usize {
        if s.is_empty() {
            return 0;
        }
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    /// Intern a string, truncating over-long identifiers silently.
    ///
    /// Use [`StringInterner::intern_checked`] when the caller needs to
    /// report truncation.
    pub fn intern(&self, s: &str) -> Name {
        match self.intern_checked(s) {
            Ok(name) | Err(InternError::IdentTooLong { truncated: name, .. }) => name,
            // A shard overflowing 2^28 identifiers means the input is
            // adversarial; map everything past that point to EMPTY.
            Err(InternError::ShardOverflow { .. }) => Name::EMPTY,
        }
    }

    /// Intern a string, reporting truncation of over-long identifiers.
    pub fn intern_checked(&self, s: &str) -> Result<Name, InternError> {
        if s.len() > MAX_IDENT_LEN {
            let mut cut = MAX_IDENT_LEN;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            let truncated = self.intern_in_shard(&s[..cut])?;
            return Err(InternError::IdentTooLong {
                len: s.len(),
                truncated,
            });
        }
        self.intern_in_shard(s)
    }

    fn intern_in_shard(&self, s: &str) -> Result<Name, InternError> {
        let shard_idx = Self::shard_for(s);

        // Fast path: already interned.
        {
            let shard = self.shards[shard_idx].read();
            if let Some(&local) = shard.map.get(s) {
                #[allow(clippy::cast_possible_truncation)]
                return Ok(Name::new(shard_idx as u32, local));
            }
        }

        let mut shard = self.shards[shard_idx].write();
        // Re-check: another writer may have raced us between the locks.
        if let Some(&local) = shard.map.get(s) {
            #[allow(clippy::cast_possible_truncation)]
            return Ok(Name::new(shard_idx as u32, local));
        }

        let count = shard.strings.len();
        if count > Name::MAX_LOCAL as usize {
            return Err(InternError::ShardOverflow {
                shard_idx,
                count,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let local = count as u32;
        shard.map.insert(s.into(), local);
        shard.strings.push(s.into());
        self.total_count.fetch_add(1, Ordering::Relaxed);

        #[allow(clippy::cast_possible_truncation)]
        Ok(Name::new(shard_idx as u32, local))
    }

    /// Resolve a name back to its string content.
    ///
    /// Returns `None` for names not produced by this interner.
    pub fn resolve(&self, name: Name) -> Option<String> {
        let shard = self.shards[name.shard()].read();
        shard.strings.get(name.local()).map(|s| s.to_string())
    }

    /// Total number of interned strings.
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Whether only the pre-interned empty string exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a).as_deref(), Some("foo"));
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn over_long_identifier_truncates_and_reports() {
        let interner = StringInterner::new();
        let long = "x".repeat(MAX_IDENT_LEN + 50);
        let err = interner.intern_checked(&long).unwrap_err();
        match err {
            InternError::IdentTooLong { len, truncated } => {
                assert_eq!(len, MAX_IDENT_LEN + 50);
                assert_eq!(
                    interner.resolve(truncated).map(|s| s.len()),
                    Some(MAX_IDENT_LEN)
                );
            }
            InternError::ShardOverflow { .. } => panic!("expected IdentTooLong"),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let interner = StringInterner::new();
        // Multi-byte char straddling the cut point must not split.
        let mut long = "a".repeat(MAX_IDENT_LEN - 1);
        long.push('é'); // 2 bytes, straddles the boundary
        long.push_str("tail");
        let err = interner.intern_checked(&long).unwrap_err();
        match err {
            InternError::IdentTooLong { truncated, .. } => {
                let resolved = interner.resolve(truncated).expect("resolvable");
                assert!(resolved.len() <= MAX_IDENT_LEN);
                assert!(resolved.chars().all(|c| c == 'a'));
            }
            InternError::ShardOverflow { .. } => panic!("expected IdentTooLong"),
        }
    }
}
