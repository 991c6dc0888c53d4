//! Bucket array and item arena: chain surgery plus grow-and-rehash.
//!
//! Items live in a generational arena and are linked into per-bucket
//! doubly-linked chains by arena key. The bucket array holds chain heads.
//! Nothing here calls into user code, so every method leaves the
//! structure consistent when it returns.

use crate::error::Error;
use slotmap::{DefaultKey, SlotMap};

pub(crate) type Link = Option<DefaultKey>;

#[derive(Debug)]
pub(crate) struct Item<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u32,
    prev: Link,
    next: Link,
}

impl<K, V> Item<K, V> {
    pub(crate) fn new(key: K, value: V, hash: u32) -> Self {
        Self {
            key,
            value,
            hash,
            prev: None,
            next: None,
        }
    }
}

pub(crate) struct BucketChains<K, V> {
    buckets: Vec<Link>,
    size_exponent: u8,
    mask: u32,
    items: SlotMap<DefaultKey, Item<K, V>>,
    /// Number of upcoming `grow` calls that fail as if out of memory.
    #[cfg(test)]
    pub(crate) failing_grows: usize,
}

/// Empty vector able to hold `len` links, or `OutOfMemory`.
fn reserve_links(len: usize) -> Result<Vec<Link>, Error> {
    let mut links = Vec::new();
    links
        .try_reserve_exact(len)
        .map_err(|_| Error::OutOfMemory)?;
    Ok(links)
}

impl<K, V> BucketChains<K, V> {
    pub(crate) fn new(size_exponent: u8) -> Self {
        let len = 1usize << size_exponent;
        Self::from_buckets(vec![None; len], size_exponent)
    }

    pub(crate) fn with_exponent(size_exponent: u8) -> Result<Self, Error> {
        let len = 1usize << size_exponent;
        let mut buckets = reserve_links(len)?;
        buckets.resize(len, None);
        Ok(Self::from_buckets(buckets, size_exponent))
    }

    fn from_buckets(buckets: Vec<Link>, size_exponent: u8) -> Self {
        Self {
            mask: (buckets.len() - 1) as u32,
            buckets,
            size_exponent,
            items: SlotMap::with_key(),
            #[cfg(test)]
            failing_grows: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn size_exponent(&self) -> u8 {
        self.size_exponent
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(crate) fn bucket_of(&self, hash: u32) -> usize {
        (hash & self.mask) as usize
    }

    pub(crate) fn head(&self, bucket: usize) -> Link {
        self.buckets.get(bucket).copied().flatten()
    }

    pub(crate) fn item(&self, k: DefaultKey) -> Option<&Item<K, V>> {
        self.items.get(k)
    }

    pub(crate) fn item_mut(&mut self, k: DefaultKey) -> Option<&mut Item<K, V>> {
        self.items.get_mut(k)
    }

    /// Successor of `k` in its chain.
    pub(crate) fn next(&self, k: DefaultKey) -> Link {
        self.items.get(k).and_then(|it| it.next)
    }

    /// First item in `hash`'s chain accepted by `matches`.
    pub(crate) fn locate<F>(&self, hash: u32, mut matches: F) -> Link
    where
        F: FnMut(&Item<K, V>) -> bool,
    {
        let mut cursor = self.head(self.bucket_of(hash));
        while let Some(k) = cursor {
            let it = &self.items[k];
            if it.hash == hash && matches(it) {
                return Some(k);
            }
            cursor = it.next;
        }
        None
    }

    /// Store `item` at the tail of its bucket's chain.
    pub(crate) fn insert(&mut self, item: Item<K, V>) -> DefaultKey {
        let k = self.items.insert(item);
        self.append(k);
        k
    }

    /// Unlink and release the item behind `k`.
    pub(crate) fn remove(&mut self, k: DefaultKey) -> Option<(K, V)> {
        let hash = self.items.get(k)?.hash;
        self.unlink(k, self.bucket_of(hash));
        self.items.remove(k).map(|it| (it.key, it.value))
    }

    /// Drop every item and shrink back to `2^size_exponent` empty buckets.
    pub(crate) fn reset(&mut self, size_exponent: u8) {
        let len = 1usize << size_exponent;
        self.items.clear();
        self.buckets.truncate(len);
        self.buckets.shrink_to_fit();
        self.buckets.fill(None);
        self.buckets.resize(len, None);
        self.size_exponent = size_exponent;
        self.mask = (len - 1) as u32;
    }

    /// Grow to `2^new_exponent` buckets and re-home only the items whose
    /// bucket changes. Returns how many items moved. On allocation
    /// failure nothing has been touched.
    pub(crate) fn grow(&mut self, new_exponent: u8) -> Result<usize, Error> {
        debug_assert!(new_exponent > self.size_exponent);
        let old_len = self.buckets.len();
        let new_len = 1usize << new_exponent;

        #[cfg(test)]
        if self.failing_grows > 0 {
            self.failing_grows -= 1;
            return Err(Error::OutOfMemory);
        }

        let mut grown = reserve_links(new_len)?;
        grown.extend_from_slice(&self.buckets);
        grown.resize(new_len, None);
        self.buckets = grown;
        self.size_exponent = new_exponent;
        self.mask = (new_len - 1) as u32;

        // Any item that moves lands at `slot + j * old_len` for some j >= 1,
        // beyond the range still being walked.
        let mut moved = 0;
        for slot in 0..old_len {
            let mut cursor = self.buckets[slot];
            while let Some(k) = cursor {
                let (hash, next) = {
                    let it = &self.items[k];
                    (it.hash, it.next)
                };
                if self.bucket_of(hash) != slot {
                    self.unlink(k, slot);
                    self.append(k);
                    moved += 1;
                }
                cursor = next;
            }
        }
        Ok(moved)
    }

    fn append(&mut self, k: DefaultKey) {
        let slot = self.bucket_of(self.items[k].hash);
        let prev = match self.buckets[slot] {
            None => {
                self.buckets[slot] = Some(k);
                None
            }
            Some(mut tail) => {
                while let Some(n) = self.items[tail].next {
                    tail = n;
                }
                self.items[tail].next = Some(k);
                Some(tail)
            }
        };
        let it = &mut self.items[k];
        it.prev = prev;
        it.next = None;
    }

    /// Detach `k` from the chain rooted at `bucket`.
    fn unlink(&mut self, k: DefaultKey, bucket: usize) {
        let (prev, next) = {
            let it = &self.items[k];
            (it.prev, it.next)
        };
        match prev {
            None => self.buckets[bucket] = next,
            Some(p) => self.items[p].next = next,
        }
        if let Some(n) = next {
            self.items[n].prev = prev;
        }
        let it = &mut self.items[k];
        it.prev = None;
        it.next = None;
    }

    pub(crate) fn iter(&self) -> slotmap::basic::Iter<'_, DefaultKey, Item<K, V>> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> slotmap::basic::IterMut<'_, DefaultKey, Item<K, V>> {
        self.items.iter_mut()
    }

    /// Panics unless every structural invariant holds.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert!(self.buckets.len().is_power_of_two());
        assert_eq!(self.buckets.len(), 1usize << self.size_exponent);
        assert_eq!(self.mask as usize, self.buckets.len() - 1);

        let mut reachable = 0;
        for (slot, head) in self.buckets.iter().enumerate() {
            let mut prev: Link = None;
            let mut cursor = *head;
            while let Some(k) = cursor {
                let it = self.items.get(k).expect("chain link points at live item");
                assert_eq!(self.bucket_of(it.hash), slot, "item in wrong bucket");
                assert_eq!(it.prev, prev, "broken back link");
                reachable += 1;
                prev = cursor;
                cursor = it.next;
            }
        }
        assert_eq!(reachable, self.items.len(), "count differs from chains");
    }
}
