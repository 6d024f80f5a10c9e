use std::fmt;

use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secret node key. Zeroized on drop, compared in constant time, and
/// never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn zero(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Swaps `a` and `b` when `choice` is set, without branching on it.
    /// Both keys must have the same length.
    pub(crate) fn conditional_swap(a: &mut Key, b: &mut Key, choice: Choice) {
        debug_assert_eq!(a.len(), b.len());
        for (x, y) in a.0.iter_mut().zip(b.0.iter_mut()) {
            u8::conditional_swap(x, y, choice);
        }
    }
}

impl ConstantTimeEq for Key {
    fn ct_eq(&self, other: &Self) -> Choice {
        // Lengths are public, only the contents are secret.
        if self.0.len() != other.0.len() {
            return Choice::from(0);
        }
        self.0.as_slice().ct_eq(other.0.as_slice())
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key([REDACTED; {}])", self.0.len())
    }
}
