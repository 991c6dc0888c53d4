//! Hash strategy injected into a table at creation.

use core::hash::{BuildHasher, Hasher};

/// Maps key bytes to a 32-bit hash. Must be pure: the same bytes always
/// yield the same value for the lifetime of a table.
pub trait HashFunction {
    fn hash(&self, key: &[u8]) -> u32;
}

impl<F> HashFunction for F
where
    F: Fn(&[u8]) -> u32,
{
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        self(key)
    }
}

/// Adapts any `BuildHasher` by folding its 64-bit output to 32 bits.
#[derive(Clone, Debug, Default)]
pub struct FromBuildHasher<S>(pub S);

impl<S: BuildHasher> HashFunction for FromBuildHasher<S> {
    #[inline]
    fn hash(&self, key: &[u8]) -> u32 {
        let mut h = self.0.build_hasher();
        h.write(key);
        let full = h.finish();
        (full ^ (full >> 32)) as u32
    }
}

pub type DefaultHashFunction = FromBuildHasher<hashbrown::hash_map::DefaultHashBuilder>;
