//! chained-hashtable: a single-threaded hash table over byte-string keys,
//! with separate chaining, item handles for O(1) follow-up mutation, and
//! a tunable growth policy.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the table's structural invariants local to one layer so
//!   the public API can be reasoned about in terms of keys and handles.
//! - Layers:
//!   - BucketChains<K, V>: power-of-two bucket array of chain heads over
//!     a generational item arena; owns all link surgery and the
//!     grow-and-rehash step. Never calls user code.
//!   - ChainedHashTable<K, V, H>: public API. Hashes keys with the
//!     injected `HashFunction`, dispatches lookups to the right chain,
//!     and applies the `GrowthPolicy` ahead of each insert.
//!
//! Constraints
//! - Keys are compared by bytes (`K: AsRef<[u8]>`); the table owns keys
//!   and values and never interprets them beyond hashing and comparing.
//! - Unique keys: `set` on an existing key fails with `Duplicate`;
//!   changing a value goes through `update`.
//! - Each item caches its 32-bit hash at insertion; lookups compare hash,
//!   then bytes, and resizes never call the hash function again.
//! - Handles are generational arena keys: O(1) update and removal without
//!   a second chain walk, and a removed item's handle never resolves to a
//!   later item.
//! - Not synchronized. Callers sharing a table across threads wrap the
//!   whole table in one lock; a resize touches arbitrary buckets.
//!
//! Growth
//! - Buckets number `2^size_exponent`. Growth fires when the item count
//!   reaches `2^(size_exponent - extend_trigger)` and adds `extend_step`
//!   exponent levels, up to `maximum_exponent`.
//! - Only buckets that existed before the resize are walked; an item
//!   whose bucket changes is unlinked and appended to its new chain.
//! - A new bucket array is allocated fallibly and swapped in, so running
//!   out of memory leaves the table at its old size. An insert that
//!   triggered such a failed growth still succeeds and reports
//!   `Insertion::CapacityUnchanged`.
//! - At the ceiling, `CapacityMode::Degrade` accepts inserts into longer
//!   chains and `CapacityMode::Reject` refuses them with
//!   `CapacityExceeded`.
//! - Removal never shrinks the bucket array; `clear` resets it to the
//!   initial size.
//!
//! Reentrancy
//! - Each public entry point opens a debug-only guard; user code run
//!   during the call (hash function, `AsRef<[u8]>`, value constructors)
//!   that calls back into the same table panics in debug builds.

mod chained_hash_table;
mod chained_hash_table_proptest;
mod chains;
mod error;
pub mod hash;
pub mod policy;
mod reentrancy;

// Public surface
pub use chained_hash_table::{ChainedHashTable, Chain, Handle, Insertion, Iter, IterMut};
pub use error::{ConfigError, Error};
pub use hash::{DefaultHashFunction, FromBuildHasher, HashFunction};
pub use policy::{CapacityMode, GrowthPolicy};
