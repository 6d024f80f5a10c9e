//! Positions in the GGM tree, expressed as the sequence of directions
//! taken from the root.

use std::fmt;

use crate::{PPRFError, MAX_TREE_DEPTH};

/// The branch taken at a node. `Left` sorts before `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// HKDF info byte for each branch. Changing these breaks every
    /// key derived or stored under the previous values.
    pub const LEFT_TAG: u8 = b'l';
    pub const RIGHT_TAG: u8 = b'r';

    pub fn tag(self) -> u8 {
        match self {
            Direction::Left => Self::LEFT_TAG,
            Direction::Right => Self::RIGHT_TAG,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    pub fn is_right(self) -> bool {
        self == Direction::Right
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// A node position: the root has the empty path, leaves have a path of
/// length equal to the tree depth.
///
/// Paths are ordered lexicographically, with a proper prefix sorting
/// before any of its extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Direction>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(directions: Vec<Direction>) -> Self {
        Self(directions)
    }

    /// Maps a leaf index to its path in a tree of `depth` levels. The most
    /// significant bit of `index` is the direction taken at the root.
    pub fn from_index(index: u64, depth: u8) -> Result<Self, PPRFError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(PPRFError::BadParams {
                reason: format!("tree depth {} is not in [1..={}]", depth, MAX_TREE_DEPTH),
            });
        }
        if depth < 64 && index >> depth != 0 {
            return Err(PPRFError::BadParams {
                reason: format!("leaf index {} does not fit in depth {}", index, depth),
            });
        }
        let directions = (0..depth)
            .rev()
            .map(|i| Direction::from_bit((index >> i) & 1 == 1))
            .collect();
        Ok(Self(directions))
    }

    /// Inverse of [`Path::from_index`]; `None` for paths longer than 64.
    pub fn to_index(&self) -> Option<u64> {
        if self.0.len() > 64 {
            return None;
        }
        Some(
            self.0
                .iter()
                .fold(0u64, |acc, d| (acc << 1) | u64::from(d.is_right())),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn directions(&self) -> &[Direction] {
        &self.0
    }

    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn child(&self, direction: Direction) -> Path {
        let mut directions = Vec::with_capacity(self.0.len() + 1);
        directions.extend_from_slice(&self.0);
        directions.push(direction);
        Path(directions)
    }

    pub(crate) fn push(&mut self, direction: Direction) {
        self.0.push(direction);
    }
}

// Renders as a bit string, `0` for left and `1` for right. The root
// renders as `ε`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "ε");
        }
        for d in &self.0 {
            write!(f, "{}", if d.is_right() { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    #[test]
    fn index_is_msb_first() {
        let path = Path::from_index(0b100100, 6).unwrap();
        assert_eq!(path.directions(), &[Right, Left, Left, Right, Left, Left]);
        assert_eq!(path.to_string(), "100100");
        assert_eq!(path.to_index(), Some(0b100100));
    }

    #[test]
    fn index_round_trips_at_full_width() {
        let path = Path::from_index(u64::MAX, 64).unwrap();
        assert!(path.directions().iter().all(|d| d.is_right()));
        assert_eq!(path.to_index(), Some(u64::MAX));
    }

    #[test]
    fn index_out_of_range() {
        assert!(Path::from_index(16, 4).is_err());
        assert!(Path::from_index(0, 0).is_err());
        assert!(Path::from_index(0, 65).is_err());
    }

    #[test]
    fn prefix_ordering() {
        let root = Path::root();
        let left = root.child(Left);
        let left_right = left.child(Right);
        let right = root.child(Right);
        assert!(root.is_prefix_of(&left_right));
        assert!(left.is_prefix_of(&left_right));
        assert!(!right.is_prefix_of(&left_right));
        assert!(root < left && left < left_right && left_right < right);
        assert_eq!(root.to_string(), "ε");
    }

    #[test]
    fn tags_are_fixed() {
        assert_eq!(Left.tag(), b'l');
        assert_eq!(Right.tag(), b'r');
        assert_eq!(Left.opposite(), Right);
    }
}
