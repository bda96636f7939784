//! Component type indices and signature bitsets.
//!
//! A [`Signature`] records which component types an entity currently owns,
//! one bit per registered [`ComponentType`]. Systems declare a required
//! signature and match every entity whose signature is a superset of it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on the number of distinct component types per coordinator.
pub const MAX_COMPONENT_TYPE: usize = 64;

/// Number of `u64` words backing a [`Signature`].
pub const SIGNATURE_WORDS: usize = MAX_COMPONENT_TYPE.div_ceil(64);

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

/// Small integer assigned to a component type at registration.
///
/// Indices are handed out in registration order starting at 0 and are never
/// reused within a coordinator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentType(pub(crate) u8);

impl ComponentType {
    /// The bit index of this component type inside a [`Signature`].
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Build a component type from a raw index, if it fits the signature width.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < MAX_COMPONENT_TYPE {
            Some(Self(index as u8))
        } else {
            None
        }
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.0)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Fixed-width bitset with one bit per [`ComponentType`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Signature {
    words: [u64; SIGNATURE_WORDS],
}

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature {
        words: [0; SIGNATURE_WORDS],
    };

    /// Create an empty signature.
    #[inline]
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Build a signature with the given component types set.
    pub fn from_types(types: &[ComponentType]) -> Self {
        let mut sig = Self::new();
        for &ty in types {
            sig.set(ty);
        }
        sig
    }

    #[inline]
    fn locate(ty: ComponentType) -> (usize, u64) {
        let idx = ty.index();
        (idx / 64, 1u64 << (idx % 64))
    }

    /// Set the bit for `ty`.
    #[inline]
    pub fn set(&mut self, ty: ComponentType) {
        let (word, mask) = Self::locate(ty);
        self.words[word] |= mask;
    }

    /// Clear the bit for `ty`.
    #[inline]
    pub fn reset(&mut self, ty: ComponentType) {
        let (word, mask) = Self::locate(ty);
        self.words[word] &= !mask;
    }

    /// Clear every bit.
    #[inline]
    pub fn clear(&mut self) {
        self.words = [0; SIGNATURE_WORDS];
    }

    /// Whether the bit for `ty` is set.
    #[inline]
    pub fn test(&self, ty: ComponentType) -> bool {
        let (word, mask) = Self::locate(ty);
        self.words[word] & mask != 0
    }

    /// Returns a copy of `self` with `ty` set.
    #[inline]
    pub fn with(mut self, ty: ComponentType) -> Self {
        self.set(ty);
        self
    }

    /// Returns a copy of `self` with `ty` cleared.
    #[inline]
    pub fn without(mut self, ty: ComponentType) -> Self {
        self.reset(ty);
        self
    }

    /// `true` when every bit of `required` is also set in `self`.
    ///
    /// This is the `(self & required) == required` test used for system
    /// membership.
    #[inline]
    pub fn contains(&self, required: &Signature) -> bool {
        self.words
            .iter()
            .zip(required.words.iter())
            .all(|(have, want)| have & want == *want)
    }

    /// `true` when `self` and `other` share at least one bit.
    #[inline]
    pub fn intersects(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Bitwise AND.
    pub fn intersection(&self, other: &Signature) -> Signature {
        let mut out = *self;
        for (o, b) in out.words.iter_mut().zip(other.words.iter()) {
            *o &= b;
        }
        out
    }

    /// Bitwise OR.
    pub fn union(&self, other: &Signature) -> Signature {
        let mut out = *self;
        for (o, b) in out.words.iter_mut().zip(other.words.iter()) {
            *o |= b;
        }
        out
    }

    /// `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate the set component types in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(ComponentType((word_idx * 64 + bit) as u8))
            })
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|t| t.0)).finish()
    }
}

impl std::ops::BitAnd for Signature {
    type Output = Signature;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(&rhs)
    }
}

impl std::ops::BitOr for Signature {
    type Output = Signature;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(&rhs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
