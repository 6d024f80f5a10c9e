//! This crate defines a puncturable pseudorandom function (PPRF) built
//! from the classic GGM binary tree construction, intended as the key
//! schedule of a puncturable key-wrapping scheme.
//!
//! Every leaf of a binary tree of depth `D` carries a wrapping key. The
//! key of a child node is derived from the key of its parent with
//! HKDF-SHA256, using a one byte direction tag as the only context.
//! Puncturing a leaf replaces the subtree root covering it with the keys
//! of its co-path, so that every other leaf stays derivable while the
//! punctured leaf is irrecoverably lost. This gives forward-security
//! guarantees for anything wrapped under that leaf's key.
//!
//! The punctured key (the "frontier" of subtree roots) can be encoded
//! and decoded with the functions in [`store`], and shared between
//! threads with [`shared::SharedPprf`].
//!
//! ```
//! # use ggm_pprf::*;
//! let params = Params::new(8, 16).unwrap();
//! let mut pprf = GGM::setup(params).unwrap();
//! let path = Path::from_index(10, 8).unwrap();
//! let wrapping_key = pprf.eval(&path).unwrap();
//! assert_eq!(wrapping_key.len(), 16);
//!
//! pprf.puncture(&path).unwrap();
//! assert!(pprf.eval(&path).is_err());
//! ```

pub mod derive;
pub mod ggm;
pub mod key;
pub mod path;
pub mod shared;
pub mod store;

pub use crate::ggm::{Node, Params, GGM};
pub use crate::key::Key;
pub use crate::path::{Direction, Path};

use derive_more::{Display, Error};

/// Largest supported tree depth, so that leaf indices fit in a `u64`.
pub const MAX_TREE_DEPTH: u8 = 64;
/// Largest supported key size in bytes.
pub const MAX_KEY_SIZE: usize = 255;

#[derive(Debug, Error, Display, PartialEq, Eq)]
pub enum PPRFError {
    #[display(fmt = "Path {} is punctured, no frontier entry covers it", path)]
    Punctured { path: Path },
    #[display(fmt = "Path {} has already been punctured", path)]
    AlreadyPunctured { path: Path },
    #[display(
        fmt = "Path length ({}) does not match tree depth ({})",
        actual,
        expected
    )]
    BadPathLength { actual: usize, expected: usize },
    #[display(fmt = "Invalid parameters: {}", reason)]
    BadParams { reason: String },
    #[display(fmt = "Malformed store: {}", reason)]
    MalformedStore { reason: String },
    #[display(
        fmt = "Invalid coverage: expected {} punctured leaves, frontier leaves {} uncovered",
        expected,
        found
    )]
    InvalidCoverage { expected: u128, found: u128 },
    #[display(fmt = "Key derivation failed")]
    Kdf,
    #[display(fmt = "Lock poisoned by a panicking writer")]
    LockPoisoned,
}

pub trait PPRF: Sized {
    fn setup(params: Params) -> Result<Self, PPRFError>;
    fn eval(&self, path: &Path) -> Result<Key, PPRFError>;
    fn puncture(&mut self, path: &Path) -> Result<(), PPRFError>;
}
