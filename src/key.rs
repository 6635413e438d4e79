//! Key model for admission tracking.
//!
//! ## Key Components
//!
//! - [`DbId`]: process-unique database-instance identity, explicitly issued
//!   from a monotonic counter. Replaces raw-pointer identity, which is
//!   ambiguous once an allocation address is reused by a later instance.
//! - [`KeyCtx`]: the borrowed (database, namespace, user key) triple supplied
//!   by the row cache on every hook call. Never stored.
//! - [`OwnedKey`]: the owned copy of a triple used as the statistics map key.
//!   The table never aliases caller memory.
//! - [`NsKey`]: the (database, namespace) pair keying the threshold table.
//!
//! `KeyCtx` and `OwnedKey` hash identically, so either form selects the same
//! shard for a given triple.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier for a database instance.
///
/// Issued from a monotonic counter; an id is never handed out twice within a
/// process, so statistics recorded against a destroyed instance can never be
/// misattributed to a new one.
///
/// # Example
///
/// ```
/// use admitkit::key::DbId;
///
/// let a = DbId::issue();
/// let b = DbId::issue();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbId(u64);

impl DbId {
    /// Issues the next process-unique id.
    pub fn issue() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an externally managed id.
    ///
    /// For embedders that already issue unique instance ids; mixing raw ids
    /// with [`DbId::issue`] ids in one process forfeits the uniqueness
    /// guarantee.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Borrowed key triple supplied by the row cache on each hook call.
///
/// Ephemeral: the tables copy it into an [`OwnedKey`] before storing
/// anything, so the caller's key bytes may be freed as soon as the call
/// returns.
#[derive(Debug, Clone, Copy)]
pub struct KeyCtx<'a> {
    /// Owning database instance.
    pub db: DbId,
    /// Namespace (column family) id within the instance.
    pub namespace: u32,
    /// Encoded user key bytes.
    pub user_key: &'a [u8],
}

impl<'a> KeyCtx<'a> {
    /// Creates a key context for one row-cache key.
    pub fn new(db: DbId, namespace: u32, user_key: &'a [u8]) -> Self {
        Self {
            db,
            namespace,
            user_key,
        }
    }

    /// Copies the triple into an independently owned key.
    pub fn to_owned_key(&self) -> OwnedKey {
        OwnedKey {
            db: self.db,
            namespace: self.namespace,
            user_key: self.user_key.into(),
        }
    }

    /// The (database, namespace) pair of this triple.
    pub fn ns_key(&self) -> NsKey {
        NsKey {
            db: self.db,
            namespace: self.namespace,
        }
    }
}

impl Hash for KeyCtx<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.db.hash(state);
        self.namespace.hash(state);
        self.user_key.hash(state);
    }
}

/// Owned copy of a key triple, used as the statistics map key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedKey {
    db: DbId,
    namespace: u32,
    user_key: Box<[u8]>,
}

impl OwnedKey {
    /// Owning database instance.
    pub fn db(&self) -> DbId {
        self.db
    }

    /// Namespace (column family) id.
    pub fn namespace(&self) -> u32 {
        self.namespace
    }

    /// Encoded user key bytes.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }
}

// Must match KeyCtx::hash field for field: a borrowed triple and its owned
// copy select the same shard.
impl Hash for OwnedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.db.hash(state);
        self.namespace.hash(state);
        self.user_key.hash(state);
    }
}

/// (database, namespace) pair keying the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsKey {
    /// Owning database instance.
    pub db: DbId,
    /// Namespace (column family) id.
    pub namespace: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ds::ShardSelector;

    #[test]
    fn issued_ids_are_unique_and_increasing() {
        let a = DbId::issue();
        let b = DbId::issue();
        let c = DbId::issue();
        assert!(a < b && b < c);
    }

    #[test]
    fn owned_key_copies_caller_bytes() {
        let bytes = vec![1_u8, 2, 3];
        let ctx = KeyCtx::new(DbId::from_raw(7), 2, &bytes);
        let owned = ctx.to_owned_key();
        drop(bytes);

        assert_eq!(owned.user_key(), &[1, 2, 3]);
        assert_eq!(owned.db(), DbId::from_raw(7));
        assert_eq!(owned.namespace(), 2);
    }

    #[test]
    fn ctx_and_owned_key_select_same_shard() {
        let selector = ShardSelector::new(64, 9);
        for i in 0..64_u32 {
            let key = format!("row-{i}");
            let ctx = KeyCtx::new(DbId::from_raw(u64::from(i)), i % 4, key.as_bytes());
            assert_eq!(
                selector.shard_for_key(&ctx),
                selector.shard_for_key(&ctx.to_owned_key()),
            );
        }
    }

    #[test]
    fn triples_differing_in_any_field_are_distinct() {
        let base = KeyCtx::new(DbId::from_raw(1), 0, b"k").to_owned_key();
        let other_db = KeyCtx::new(DbId::from_raw(2), 0, b"k").to_owned_key();
        let other_ns = KeyCtx::new(DbId::from_raw(1), 1, b"k").to_owned_key();
        let other_key = KeyCtx::new(DbId::from_raw(1), 0, b"q").to_owned_key();

        assert_ne!(base, other_db);
        assert_ne!(base, other_ns);
        assert_ne!(base, other_key);
    }
}
