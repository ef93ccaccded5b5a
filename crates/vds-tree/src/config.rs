//! Structural parameters of a vertex tree.

/// Width of a node path in bits.
pub const PATH_BITS: u32 = u64::BITS;

/// Default number of path bits per tree level (8-way branching).
pub const DEFAULT_BRANCH_BITS: u32 = 3;

/// Default depth below which triangles share their ancestor's container.
pub const DEFAULT_CULL_DEPTH: u8 = 4;

/// Shape limits of a vertex tree.
///
/// `branch_bits` fixes both the maximum number of children per node
/// (`2^branch_bits`) and the maximum tree depth, since every level consumes
/// `branch_bits` of the 64-bit node path. `cull_depth` bounds how deep the
/// render traversal keeps separate visible-triangle lists for culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VdsConfig {
    branch_bits: u32,
    cull_depth: u8,
}

impl Default for VdsConfig {
    fn default() -> Self {
        Self {
            branch_bits: DEFAULT_BRANCH_BITS,
            cull_depth: DEFAULT_CULL_DEPTH,
        }
    }
}

impl VdsConfig {
    /// Creates the default configuration (8-way, cull depth 4).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of path bits per level.
    ///
    /// # Panics
    /// Panics if `bits` is zero or larger than 8.
    pub fn with_branch_bits(mut self, bits: u32) -> Self {
        assert!((1..=8).contains(&bits), "branch bits must be in 1..=8");
        self.branch_bits = bits;
        self
    }

    /// Sets the cull depth.
    pub fn with_cull_depth(mut self, depth: u8) -> Self {
        self.cull_depth = depth;
        self
    }

    #[inline]
    pub fn branch_bits(&self) -> u32 {
        self.branch_bits
    }

    #[inline]
    pub fn cull_depth(&self) -> u8 {
        self.cull_depth
    }

    /// Maximum number of children a node may have.
    #[inline]
    pub fn max_degree(&self) -> usize {
        1 << self.branch_bits
    }

    /// Deepest level a node may occupy (the root is level 0).
    #[inline]
    pub fn max_depth(&self) -> u8 {
        (PATH_BITS / self.branch_bits) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_octal() {
        let config = VdsConfig::default();
        assert_eq!(config.max_degree(), 8);
        assert_eq!(config.max_depth(), 21);
        assert_eq!(config.cull_depth(), 4);
    }

    #[test]
    fn binary_tree_is_deeper() {
        let config = VdsConfig::new().with_branch_bits(1).with_cull_depth(2);
        assert_eq!(config.max_degree(), 2);
        assert_eq!(config.max_depth(), 64);
        assert_eq!(config.cull_depth(), 2);
    }

    #[test]
    #[should_panic]
    fn zero_branch_bits_rejected() {
        let _ = VdsConfig::new().with_branch_bits(0);
    }
}
