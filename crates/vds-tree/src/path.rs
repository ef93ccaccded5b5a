//! Bit-packed node identities.
//!
//! A [`NodeId`] records the branch taken at every level on the way from the
//! root to a node. With `bits` bits per level, the least significant `bits`
//! hold the branch from the root to its level-1 child, the next `bits` the
//! branch below that, and so on. Unused bits are always zero, so two ids
//! can be compared and intersected with plain integer arithmetic, without
//! touching the tree.

/// Path from the root of a vertex tree to one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NodeId {
    path: u64,
    depth: u8,
}

#[inline]
fn level_mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

impl NodeId {
    /// The identity of the root node.
    pub const ROOT: NodeId = NodeId { path: 0, depth: 0 };

    /// Creates an id from a raw path and depth.
    ///
    /// Bits of `path` beyond `depth` levels must be zero.
    #[inline]
    pub fn new(path: u64, depth: u8) -> Self {
        Self { path, depth }
    }

    #[inline]
    pub fn path(&self) -> u64 {
        self.path
    }

    #[inline]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Returns which child of the ancestor at `depth` leads towards this node.
    ///
    /// `depth` must be smaller than `self.depth()`.
    #[inline]
    pub fn branch(&self, depth: u8, bits: u32) -> usize {
        debug_assert!(depth < self.depth);
        ((self.path >> (u32::from(depth) * bits)) & level_mask(bits)) as usize
    }

    /// Returns the id of this node's `branch`-th child.
    #[inline]
    pub fn child(&self, branch: usize, bits: u32) -> Self {
        debug_assert!((branch as u64) <= level_mask(bits));
        Self {
            path: self.path | ((branch as u64) << (u32::from(self.depth) * bits)),
            depth: self.depth + 1,
        }
    }

    /// Returns the id of the ancestor at `depth` (or `self` if already shallower).
    pub fn ancestor(&self, depth: u8, bits: u32) -> Self {
        if depth >= self.depth {
            return *self;
        }
        let used = u32::from(depth) * bits;
        let path = if used >= u64::BITS {
            self.path
        } else {
            self.path & ((1u64 << used) - 1)
        };
        Self { path, depth }
    }

    /// Finds the deepest common ancestor of two ids.
    ///
    /// If the ids share an ancestor deeper than `max_depth`, the common
    /// ancestor at `max_depth` is returned instead.
    pub fn common_ancestor(&self, other: &NodeId, max_depth: u8, bits: u32) -> NodeId {
        let limit = self.depth.min(other.depth).min(max_depth);
        let mask = level_mask(bits);
        let diff = self.path ^ other.path;

        let mut depth = 0;
        while depth < limit && (diff >> (u32::from(depth) * bits)) & mask == 0 {
            depth += 1;
        }
        self.ancestor(depth, bits)
    }

    /// Returns `true` if `self` lies on the path from the root to `other`
    /// (a node is its own ancestor).
    pub fn is_ancestor_of(&self, other: &NodeId, bits: u32) -> bool {
        self.depth <= other.depth && other.ancestor(self.depth, bits) == *self
    }
}
