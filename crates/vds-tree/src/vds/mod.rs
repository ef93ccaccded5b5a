//! Vertex trees for view-dependent simplification.
//!
//! A vertex tree clusters the vertices of a triangle mesh hierarchically.
//! Leaves are the original vertices; every internal node merges the vertices
//! below it into a single proxy vertex. Any cut through the tree, the active
//! boundary, selects one simplification of the mesh, and moving the cut at
//! run time adapts the level of detail to the viewer:
//!
//! - Triangles with two corners merged into one proxy degenerate and are
//!   dropped; they are stored with the node whose unfolding brings them back.
//! - The remaining triangles follow the proxies of their corners.
//!
//! # Example
//!
//! ```ignore
//! use vds_tree::{cluster_octree, TreeBuilder, ViewState};
//! use vds_tree::vds::CollectingVisitor;
//!
//! let mut builder = TreeBuilder::default();
//! builder.begin_geometry()?;
//! /* add vertices and triangles */
//! let leaves = builder.end_geometry()?;
//! cluster_octree(&mut builder, &leaves)?;
//! let mut tree = builder.end_tree()?;
//!
//! // Every frame: move the boundary, then draw.
//! let view = ViewState::look_at(eye, target, fov);
//! tree.adjust_boundary(&view);
//! let mut visitor = CollectingVisitor::new();
//! tree.render_tree_culled(tree.root(), &mut visitor, &view);
//! ```
//!
//! # Architecture
//!
//! - [`TreeBuilder`]: ingests geometry and clustering, then finalizes
//! - [`VertexTree`]: arena of nodes and triangles with the fold state
//! - [`FoldCriterion`] / [`VisibilityTest`]: strategies deciding where the
//!   boundary lies and what can be culled
//! - [`RenderVisitor`]: visitor trait receiving resolved triangles
//! - [`write_tree`] / [`read_tree`]: persistence

mod builder;
mod criterion;
mod dynamic;
mod io;
mod node;
mod render;
#[cfg(test)]
pub(crate) mod testing;
mod tree;
mod visitor;

// Re-export main types
pub use builder::TreeBuilder;
pub use criterion::{FoldCriterion, MaxDepth, RadiusThreshold, Visibility, VisibilityTest};
pub use dynamic::AdjustStats;
pub use io::{load_tree, read_tree, save_tree, write_tree, NodeDataCodec, RawNodeData, FORMAT_NAME, FORMAT_VERSION};
pub use node::{Children, Node, NodeIndex, NodeStatus};
pub use tree::{BoundaryIter, TreeStats, VertexTree, VisibleTris};
pub use visitor::{CollectingVisitor, FnVisitor, RenderVisitor, ResolvedTri};
