//! Node key derivation: the one-way step from a parent key to a child
//! key in the GGM tree.
//!
//! A child key is `HKDF-SHA256(ikm = parent, salt = none, info = tag)`
//! truncated to the parent's length, where `tag` is the single byte
//! [`Direction::tag`]. Keys along a path are obtained by folding this
//! step over the directions, root first.

use ring::hkdf;

use crate::key::Key;
use crate::path::Direction;
use crate::PPRFError;

struct OutputLen(usize);

impl hkdf::KeyType for OutputLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Derives the key of the `direction` child of the node keyed by `parent`.
pub fn derive_child(parent: &Key, direction: Direction) -> Result<Key, PPRFError> {
    let mut child = Key::zero(parent.len());
    hkdf_expand(parent, direction.tag(), child.as_mut_bytes())?;
    Ok(child)
}

/// Derives both children of `parent`, left first. The same two KDF
/// invocations happen whatever branch the caller goes on to follow.
pub fn derive_children(parent: &Key) -> Result<(Key, Key), PPRFError> {
    Ok((
        derive_child(parent, Direction::Left)?,
        derive_child(parent, Direction::Right)?,
    ))
}

/// Walks `directions` down from `start`, applying [`derive_child`] once per
/// direction in order.
pub fn derive_path(start: &Key, directions: &[Direction]) -> Result<Key, PPRFError> {
    directions
        .iter()
        .try_fold(start.clone(), |key, &d| derive_child(&key, d))
}

fn hkdf_expand(ikm: &Key, info: u8, out: &mut [u8]) -> Result<(), PPRFError> {
    // An empty salt is the RFC 5869 "not provided" case: HMAC pads it to
    // HashLen zero bytes.
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, &[]);
    let prk = salt.extract(ikm.as_bytes());
    let info = [info];
    let info_slices = [&info[..]];
    prk.expand(&info_slices, OutputLen(out.len()))
        .and_then(|okm| okm.fill(out))
        .map_err(|_| PPRFError::Kdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    // Root of 16 zero bytes, directions [R, L, L, R, L, L].
    const REFERENCE_OUTPUT: &str = "d436ae44ce57f972a5b10b702e802389";

    #[test]
    fn reference_vector() {
        let root = Key::zero(16);
        let out = derive_path(&root, &[Right, Left, Left, Right, Left, Left]).unwrap();
        assert_eq!(hex::encode(out.as_bytes()), REFERENCE_OUTPUT);
    }

    #[test]
    fn fold_matches_explicit_chain() {
        let root = Key::from_bytes(&[7u8; 16]);
        let mut running = root.clone();
        for d in [Left, Right, Right] {
            running = derive_child(&running, d).unwrap();
        }
        assert_eq!(derive_path(&root, &[Left, Right, Right]).unwrap(), running);
        assert_eq!(derive_path(&root, &[]).unwrap(), root);
    }

    #[test]
    fn children_are_distinct_and_deterministic() {
        let parent = Key::from_bytes(&[3u8; 32]);
        let (left, right) = derive_children(&parent).unwrap();
        assert_ne!(left, right);
        assert_eq!(left.len(), 32);
        assert_eq!(left, derive_child(&parent, Left).unwrap());
        assert_eq!(right, derive_child(&parent, Right).unwrap());
    }
}
