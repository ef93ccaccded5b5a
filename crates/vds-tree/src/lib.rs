//! VDS (View-Dependent Simplification) vertex tree implementation.

mod bound;
mod cluster;
mod config;
mod error;
mod path;
mod triangle;
pub mod vds;
mod view;

pub use bound::{Aabb, BoundingSphere};
pub use cluster::cluster_octree;
pub use config::{VdsConfig, DEFAULT_BRANCH_BITS, DEFAULT_CULL_DEPTH, PATH_BITS};
pub use error::{Result, VdsError};
pub use path::NodeId;
pub use triangle::{Rgb, Tri, TriIndex};
pub use vds::{
    AdjustStats, FoldCriterion, MaxDepth, Node, NodeIndex, NodeStatus, RadiusThreshold, RenderVisitor,
    ResolvedTri, TreeBuilder, VertexTree, Visibility, VisibilityTest,
};
pub use view::{ViewState, DEFAULT_THRESHOLD};
