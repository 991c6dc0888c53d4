//! ChainedHashTable: public table with item handles and policy-driven growth.

use crate::chains::{BucketChains, Item, Link};
use crate::error::Error;
use crate::hash::{DefaultHashFunction, HashFunction};
use crate::policy::{CapacityMode, GrowthPolicy};
use crate::reentrancy::DebugReentrancy;
use core::fmt;
use slotmap::DefaultKey;
use tracing::{debug, trace, warn};

/// Non-owning reference to a stored item, valid until that item is
/// removed. A handle to a removed item never resolves to a later one.
///
/// Handles are only meaningful for the table that issued them. Passing
/// one to a different table is not detected and may resolve to an
/// unrelated item there.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V, H>(&self, table: &'a ChainedHashTable<K, V, H>) -> Option<&'a K>
    where
        K: AsRef<[u8]>,
        H: HashFunction,
    {
        table.handle_key(*self)
    }

    pub fn value<'a, K, V, H>(&self, table: &'a ChainedHashTable<K, V, H>) -> Option<&'a V>
    where
        K: AsRef<[u8]>,
        H: HashFunction,
    {
        table.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, H>(
        &self,
        table: &'a mut ChainedHashTable<K, V, H>,
    ) -> Option<&'a mut V>
    where
        K: AsRef<[u8]>,
        H: HashFunction,
    {
        table.handle_value_mut(*self)
    }
}

/// Successful outcome of `set`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Insertion {
    /// Stored, and any growth the policy called for was carried out.
    Complete(Handle),
    /// Stored, but the bucket array could not be grown for lack of
    /// memory. The table stays consistent at its previous size.
    CapacityUnchanged(Handle),
}

impl Insertion {
    pub fn handle(&self) -> Handle {
        match *self {
            Insertion::Complete(h) | Insertion::CapacityUnchanged(h) => h,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Insertion::Complete(_))
    }
}

pub struct ChainedHashTable<K, V, H = DefaultHashFunction> {
    hash_fn: H,
    policy: GrowthPolicy,
    pub(crate) chains: BucketChains<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainedHashTable<K, V>
where
    K: AsRef<[u8]>,
{
    /// Table with the default policy and hash function.
    pub fn new() -> Self {
        Self::with_hash_function(DefaultHashFunction::default())
    }

    pub fn with_policy(policy: GrowthPolicy) -> Result<Self, Error> {
        Self::with_policy_and_hash_function(policy, DefaultHashFunction::default())
    }
}

impl<K, V> Default for ChainedHashTable<K, V>
where
    K: AsRef<[u8]>,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over all items, in no particular order.
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Item<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, it)| (Handle::new(k), &it.key, &it.value))
    }
}

/// Iterator over all items with mutable values.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Item<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, it)| (Handle::new(k), &it.key, &mut it.value))
    }
}

/// Walks one bucket's chain from head to tail.
pub struct Chain<'a, K, V> {
    chains: &'a BucketChains<K, V>,
    cursor: Link,
}

impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cursor?;
        let it = self.chains.item(k)?;
        self.cursor = self.chains.next(k);
        Some((Handle::new(k), &it.key, &it.value))
    }
}

impl<K, V, H> ChainedHashTable<K, V, H>
where
    K: AsRef<[u8]>,
    H: HashFunction,
{
    /// Table with the default policy and the given hash function.
    pub fn with_hash_function(hash_fn: H) -> Self {
        let policy = GrowthPolicy::DEFAULT;
        Self {
            chains: BucketChains::new(policy.initial_exponent),
            hash_fn,
            policy,
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_policy_and_hash_function(policy: GrowthPolicy, hash_fn: H) -> Result<Self, Error> {
        policy.validate()?;
        Ok(Self {
            chains: BucketChains::with_exponent(policy.initial_exponent)?,
            hash_fn,
            policy,
            reentrancy: DebugReentrancy::new(),
        })
    }

    fn locate(&self, key: &[u8]) -> Option<DefaultKey> {
        let hash = self.hash_fn.hash(key);
        self.chains.locate(hash, |it| it.key.as_ref() == key)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chains.len() == 0
    }

    pub fn size_exponent(&self) -> u8 {
        self.chains.size_exponent()
    }

    pub fn bucket_count(&self) -> usize {
        self.chains.bucket_count()
    }

    pub fn policy(&self) -> &GrowthPolicy {
        &self.policy
    }

    pub fn hash_function(&self) -> &H {
        &self.hash_fn
    }

    pub fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        self.locate(key.as_ref()).map(Handle::new)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        self.locate(key.as_ref()).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        let k = self.locate(key.as_ref())?;
        self.chains.item(k).map(|it| &it.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        let k = self.locate(key.as_ref())?;
        self.chains.item_mut(k).map(|it| &mut it.value)
    }

    /// Insert a new key. An existing key is never overwritten: use
    /// `update` for that.
    pub fn set(&mut self, key: K, value: V) -> Result<Insertion, Error> {
        self.set_with(key, || value)
    }

    /// Like `set`, but only builds the value once the insert is certain.
    pub fn set_with<F>(&mut self, key: K, value: F) -> Result<Insertion, Error>
    where
        F: FnOnce() -> V,
    {
        let _g = self.reentrancy.enter();
        let hash = self.hash_fn.hash(key.as_ref());
        if self
            .chains
            .locate(hash, |it| it.key.as_ref() == key.as_ref())
            .is_some()
        {
            return Err(Error::Duplicate);
        }

        let grown = make_room(&mut self.chains, &self.policy)?;
        let k = self.chains.insert(Item::new(key, value(), hash));
        let handle = Handle::new(k);
        Ok(if grown {
            Insertion::Complete(handle)
        } else {
            Insertion::CapacityUnchanged(handle)
        })
    }

    /// Replace the value stored under `key`, returning the old one.
    pub fn update<Q>(&mut self, key: &Q, value: V) -> Result<V, Error>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        let k = self.locate(key.as_ref()).ok_or(Error::KeyNotFound)?;
        let it = self.chains.item_mut(k).ok_or(Error::KeyNotFound)?;
        Ok(core::mem::replace(&mut it.value, value))
    }

    /// Replace the value behind `handle` without searching its chain.
    pub fn update_by_handle(&mut self, handle: Handle, value: V) -> Result<V, Error> {
        let _g = self.reentrancy.enter();
        let it = self
            .chains
            .item_mut(handle.raw_handle())
            .ok_or(Error::StaleHandle)?;
        Ok(core::mem::replace(&mut it.value, value))
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Result<(K, V), Error>
    where
        Q: ?Sized + AsRef<[u8]>,
    {
        let _g = self.reentrancy.enter();
        let k = self.locate(key.as_ref()).ok_or(Error::KeyNotFound)?;
        self.chains.remove(k).ok_or(Error::KeyNotFound)
    }

    /// Unlink the item behind `handle` without searching its chain. The
    /// bucket array never shrinks.
    pub fn remove_by_handle(&mut self, handle: Handle) -> Result<(K, V), Error> {
        let _g = self.reentrancy.enter();
        self.chains
            .remove(handle.raw_handle())
            .ok_or(Error::StaleHandle)
    }

    /// Drop every item and return to the policy's initial size.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.chains.reset(self.policy.initial_exponent);
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        let _g = self.reentrancy.enter();
        self.chains.item(h.raw_handle()).map(|it| &it.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        let _g = self.reentrancy.enter();
        self.chains.item(h.raw_handle()).map(|it| &it.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        self.chains.item_mut(h.raw_handle()).map(|it| &mut it.value)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.chains.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.chains.iter_mut(),
        }
    }

    /// Items of bucket `bucket`, head first. Empty for out-of-range buckets.
    pub fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            chains: &self.chains,
            cursor: self.chains.head(bucket),
        }
    }
}

/// Apply the growth policy ahead of one insert.
///
/// `Ok(false)` means growth was due but its allocation failed; the insert
/// may still proceed at the current size, and growth is attempted again
/// on the next insert since the count stays at or above the threshold.
fn make_room<K, V>(chains: &mut BucketChains<K, V>, policy: &GrowthPolicy) -> Result<bool, Error> {
    let exponent = chains.size_exponent();
    if chains.len() < policy.growth_threshold(exponent) {
        return Ok(true);
    }

    let Some(next) = policy.next_exponent(exponent) else {
        return match policy.on_capacity {
            CapacityMode::Degrade => {
                trace!(exponent, items = chains.len(), "growth skipped at maximum exponent");
                Ok(true)
            }
            CapacityMode::Reject => Err(Error::CapacityExceeded),
        };
    };

    match chains.grow(next) {
        Ok(moved) => {
            debug!(from = exponent, to = next, moved, "grew bucket array");
            Ok(true)
        }
        Err(error) => {
            warn!(from = exponent, to = next, %error, "bucket array growth failed");
            Ok(false)
        }
    }
}

impl<K, V, H> fmt::Debug for ChainedHashTable<K, V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedHashTable")
            .field("len", &self.chains.len())
            .field("size_exponent", &self.chains.size_exponent())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
