//! The GGM puncturable PRF.
//!
//! The punctured key is a list of [`Node`]s, each pairing a subtree root
//! position with its key. The list is kept sorted by path and is
//! prefix-free, so the subtrees are disjoint and the entry covering a
//! leaf (if any) is found by binary search. A fresh key holds a single
//! entry for the root.
//!
//! Only key bytes are secret. Paths, frontier shape and puncture counts
//! are public and may drive branches and lookups; key material is only
//! ever selected with `subtle` swaps.

use log::{debug, trace};
use rand_core::{OsRng, RngCore};
use subtle::Choice;

use crate::derive::{derive_children, derive_path};
use crate::key::Key;
use crate::path::{Direction, Path};
use crate::{PPRFError, MAX_KEY_SIZE, MAX_TREE_DEPTH, PPRF};

pub const DEFAULT_TREE_DEPTH: u8 = 32;
pub const DEFAULT_KEY_SIZE: usize = 16;

/// Tree shape, fixed for the lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    tree_depth: u8,
    key_size: usize,
}

impl Params {
    pub fn new(tree_depth: u8, key_size: usize) -> Result<Self, PPRFError> {
        if tree_depth == 0 || tree_depth > MAX_TREE_DEPTH {
            return Err(PPRFError::BadParams {
                reason: format!(
                    "tree depth {} is not in [1..={}]",
                    tree_depth, MAX_TREE_DEPTH
                ),
            });
        }
        if key_size == 0 || key_size > MAX_KEY_SIZE {
            return Err(PPRFError::BadParams {
                reason: format!("key size {} is not in [1..={}]", key_size, MAX_KEY_SIZE),
            });
        }
        Ok(Self {
            tree_depth,
            key_size,
        })
    }

    pub fn tree_depth(&self) -> u8 {
        self.tree_depth
    }

    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Number of leaves, `2^tree_depth`.
    pub fn num_leaves(&self) -> u128 {
        1u128 << self.tree_depth
    }

    fn check_leaf(&self, path: &Path) -> Result<(), PPRFError> {
        if path.len() != usize::from(self.tree_depth) {
            return Err(PPRFError::BadPathLength {
                actual: path.len(),
                expected: usize::from(self.tree_depth),
            });
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            key_size: DEFAULT_KEY_SIZE,
        }
    }
}

/// A frontier entry: the key of the subtree rooted at `prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub prefix: Path,
    pub key: Key,
}

impl Node {
    pub fn new(prefix: Path, key: Key) -> Self {
        Self { prefix, key }
    }

    /// Leaves under this node in a tree of `depth` levels.
    fn leaves(&self, depth: u8) -> u128 {
        1u128 << (usize::from(depth) - self.prefix.len())
    }
}

#[derive(Clone)]
struct GGMPuncturableKey {
    frontier: Vec<Node>,
    punctures: u64,
}

#[derive(Clone)]
pub struct GGM {
    params: Params,
    key: GGMPuncturableKey,
}

impl GGM {
    /// Starts from an externally generated root key.
    pub fn from_root(params: Params, root: Key) -> Result<Self, PPRFError> {
        if root.len() != params.key_size {
            return Err(PPRFError::BadParams {
                reason: format!(
                    "root key is {} bytes, expected {}",
                    root.len(),
                    params.key_size
                ),
            });
        }
        debug!(
            "GGM setup with depth {} and key size {}",
            params.tree_depth, params.key_size
        );
        Ok(Self {
            params,
            key: GGMPuncturableKey {
                frontier: vec![Node::new(Path::root(), root)],
                punctures: 0,
            },
        })
    }

    /// Rebuilds a punctured key from its frontier, in any order. The
    /// frontier must be prefix-free, hold keys of the configured size, and
    /// leave exactly `punctures` leaves uncovered.
    pub fn from_frontier(
        params: Params,
        mut frontier: Vec<Node>,
        punctures: u64,
    ) -> Result<Self, PPRFError> {
        let depth = usize::from(params.tree_depth);
        for node in &frontier {
            if node.prefix.len() > depth {
                return Err(PPRFError::MalformedStore {
                    reason: format!(
                        "path length {} exceeds tree depth {}",
                        node.prefix.len(),
                        depth
                    ),
                });
            }
            if node.key.len() != params.key_size {
                return Err(PPRFError::MalformedStore {
                    reason: format!(
                        "key for {} is {} bytes, expected {}",
                        node.prefix,
                        node.key.len(),
                        params.key_size
                    ),
                });
            }
        }

        frontier.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        // Sorted order puts a prefix right before its first extension, so
        // checking neighbours finds every duplicate and overlap.
        for pair in frontier.windows(2) {
            if pair[0].prefix.is_prefix_of(&pair[1].prefix) {
                return Err(PPRFError::MalformedStore {
                    reason: format!(
                        "entries {} and {} overlap",
                        pair[0].prefix, pair[1].prefix
                    ),
                });
            }
        }

        let covered: u128 = frontier.iter().map(|n| n.leaves(params.tree_depth)).sum();
        let uncovered = params.num_leaves() - covered;
        if uncovered != u128::from(punctures) {
            return Err(PPRFError::InvalidCoverage {
                expected: u128::from(punctures),
                found: uncovered,
            });
        }

        debug!(
            "GGM restored with {} frontier entries and {} punctures",
            frontier.len(),
            punctures
        );
        Ok(Self {
            params,
            key: GGMPuncturableKey {
                frontier,
                punctures,
            },
        })
    }

    pub fn params(&self) -> Params {
        self.params
    }

    /// Frontier entries in path order.
    pub fn frontier(&self) -> &[Node] {
        &self.key.frontier
    }

    pub fn num_punctures(&self) -> u64 {
        self.key.punctures
    }

    /// Number of leaves that can still be evaluated.
    pub fn covered_leaves(&self) -> u128 {
        self.params.num_leaves() - u128::from(self.key.punctures)
    }

    pub fn is_punctured(&self, path: &Path) -> Result<bool, PPRFError> {
        self.params.check_leaf(path)?;
        Ok(self.find_covering(path).is_none())
    }

    // The only candidate is the greatest entry not above `path`: any entry
    // sorting between a covering prefix and `path` would have to extend
    // that prefix, which the frontier forbids.
    fn find_covering(&self, path: &Path) -> Option<usize> {
        let frontier = &self.key.frontier;
        let idx = frontier.partition_point(|n| n.prefix <= *path);
        idx.checked_sub(1)
            .filter(|&i| frontier[i].prefix.is_prefix_of(path))
    }

    /// Returns the key of `path` together with the co-path of the walk
    /// from `node` down to it. Siblings left of the walk come out
    /// shallowest first and siblings right of it deepest first, so
    /// splicing them in place of `node` keeps the frontier sorted.
    fn eval_and_get_co_path(
        &self,
        node: &Node,
        path: &Path,
    ) -> Result<(Key, Vec<Node>), PPRFError> {
        let remaining = &path.directions()[node.prefix.len()..];
        let mut left_siblings = Vec::with_capacity(remaining.len());
        let mut right_siblings = Vec::with_capacity(remaining.len());
        let mut current = node.key.clone();
        let mut prefix = node.prefix.clone();
        for &direction in remaining {
            let (mut next, mut sibling) = derive_children(&current)?;
            // next/sibling hold (left, right); swap them when going right.
            let go_right = Choice::from(u8::from(direction.is_right()));
            Key::conditional_swap(&mut next, &mut sibling, go_right);
            let sibling_node = Node::new(prefix.child(direction.opposite()), sibling);
            match direction {
                Direction::Right => left_siblings.push(sibling_node),
                Direction::Left => right_siblings.push(sibling_node),
            }
            prefix.push(direction);
            current = next;
        }
        right_siblings.reverse();
        left_siblings.extend(right_siblings);
        Ok((current, left_siblings))
    }
}

impl PPRF for GGM {
    fn setup(params: Params) -> Result<Self, PPRFError> {
        let mut root = Key::zero(params.key_size);
        OsRng.fill_bytes(root.as_mut_bytes());
        Self::from_root(params, root)
    }

    fn eval(&self, path: &Path) -> Result<Key, PPRFError> {
        self.params.check_leaf(path)?;
        let idx = self
            .find_covering(path)
            .ok_or_else(|| PPRFError::Punctured { path: path.clone() })?;
        let node = &self.key.frontier[idx];
        derive_path(&node.key, &path.directions()[node.prefix.len()..])
    }

    fn puncture(&mut self, path: &Path) -> Result<(), PPRFError> {
        self.params.check_leaf(path)?;
        let idx = self
            .find_covering(path)
            .ok_or_else(|| PPRFError::AlreadyPunctured { path: path.clone() })?;
        let (leaf_key, co_path) = self.eval_and_get_co_path(&self.key.frontier[idx], path)?;
        drop(leaf_key);
        let added = co_path.len();
        self.key.frontier.splice(idx..=idx, co_path);
        self.key.punctures += 1;
        trace!("Punctured {}", path);
        debug!(
            "Puncture replaced 1 frontier entry with {}, frontier size {}, punctures {}",
            added,
            self.key.frontier.len(),
            self.key.punctures
        );
        Ok(())
    }
}
