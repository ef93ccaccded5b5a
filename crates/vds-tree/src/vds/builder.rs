//! Vertex tree construction.
//!
//! Building happens in two stages. First the geometry of the original mesh
//! is ingested: every vertex becomes a leaf node and every triangle refers to
//! three of those vertices by index. Then nodes are clustered, a few at a
//! time, under new parent nodes until a single root remains:
//!
//! ```ignore
//! let mut builder = TreeBuilder::new(VdsConfig::default());
//! builder.begin_geometry()?;
//! let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = builder.add_vertex(Point3::new(0.0, 1.0, 0.0));
//! builder.add_triangle([0, 1, 2], [Vector3::z(); 3], [[255; 3]; 3]);
//! builder.end_geometry()?;
//! let ab = builder.cluster_nodes(&[a, b], Point3::new(0.5, 0.0, 0.0))?;
//! builder.cluster_nodes(&[ab, c], Point3::new(0.3, 0.3, 0.0))?;
//! let tree = builder.end_tree()?;
//! ```

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::{Result, Rgb, TriIndex, VdsConfig, VdsError};

use super::node::{Node, NodeIndex};
use super::tree::{assign_ids, verify_rooted_tree, PendingTri, VertexTree};

/// Initial capacity of the vertex and triangle arrays.
const INITIAL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Tree begun, no geometry yet.
    Open,
    /// Accepting vertices and triangles.
    Geometry,
    /// Accepting cluster operations.
    Clustering,
}

/// A triangle as specified by the application, by vertex index.
#[derive(Debug, Clone)]
struct IndexedTri {
    vertices: [usize; 3],
    normals: [Vector3<f32>; 3],
    colors: [Rgb; 3],
}

/// Incremental builder for a [`VertexTree`].
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    config: VdsConfig,
    phase: Phase,
    nodes: Vec<Node>,
    tris: Vec<IndexedTri>,
    leaf_count: usize,
    offset: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(VdsConfig::default())
    }
}

impl TreeBuilder {
    /// Begins a new vertex tree.
    pub fn new(config: VdsConfig) -> Self {
        Self {
            config,
            phase: Phase::Open,
            nodes: Vec::new(),
            tris: Vec::new(),
            leaf_count: 0,
            offset: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &VdsConfig {
        &self.config
    }

    /// Opens the geometry session. Must precede any vertex or triangle.
    pub fn begin_geometry(&mut self) -> Result<()> {
        if self.phase != Phase::Open {
            return Err(VdsError::SessionOpen);
        }
        self.nodes = Vec::with_capacity(INITIAL_CAPACITY);
        self.tris = Vec::with_capacity(INITIAL_CAPACITY);
        self.offset = 0;
        self.phase = Phase::Geometry;
        Ok(())
    }

    /// Adds a vertex of the original mesh as a leaf node.
    ///
    /// # Panics
    /// Panics if called outside the geometry session, or if the node count
    /// would exceed `u32::MAX`.
    pub fn add_vertex(&mut self, point: Point3<f32>) -> NodeIndex {
        assert!(
            self.phase == Phase::Geometry,
            "add_vertex called outside begin_geometry/end_geometry"
        );
        self.nodes.push(Node::new(point));
        NodeIndex::new(self.nodes.len() - 1)
    }

    /// Adds a triangle whose corners are indices of previously added
    /// vertices, relative to the current object (see [`new_object`](Self::new_object)).
    ///
    /// # Panics
    /// Panics if called outside the geometry session, if a corner index
    /// names a vertex that has not been added, or if the triangle count
    /// would exceed `u32::MAX`.
    pub fn add_triangle(
        &mut self,
        vertices: [usize; 3],
        normals: [Vector3<f32>; 3],
        colors: [Rgb; 3],
    ) -> TriIndex {
        assert!(
            self.phase == Phase::Geometry,
            "add_triangle called outside begin_geometry/end_geometry"
        );
        let vertices = vertices.map(|v| v + self.offset);
        for v in vertices {
            assert!(
                v < self.nodes.len(),
                "triangle corner {v} refers to a vertex that was not added"
            );
        }
        self.tris.push(IndexedTri {
            vertices,
            normals,
            colors,
        });
        TriIndex::new(self.tris.len() - 1)
    }

    /// Starts a new object: subsequent triangle indices count from the next
    /// vertex added, so independently indexed meshes can be ingested as-is.
    pub fn new_object(&mut self) {
        self.offset = self.nodes.len();
    }

    /// Closes the geometry session and returns the leaf nodes in the order
    /// they were added.
    pub fn end_geometry(&mut self) -> Result<Vec<NodeIndex>> {
        if self.phase != Phase::Geometry {
            return Err(VdsError::WrongPhase("end_geometry requires begin_geometry"));
        }
        self.nodes.shrink_to_fit();
        self.tris.shrink_to_fit();
        self.leaf_count = self.nodes.len();
        self.phase = Phase::Clustering;
        debug!(vertices = self.leaf_count, tris = self.tris.len(), "geometry complete");
        Ok((0..self.leaf_count).map(NodeIndex::new).collect())
    }

    /// Returns a node created so far.
    ///
    /// # Panics
    /// Panics if `index` was not returned by this builder.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.index()]
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Attaches application bytes to a node.
    pub fn set_node_data(&mut self, node: NodeIndex, data: Vec<u8>) {
        self.nodes[node.index()].data = data;
    }

    /// Clusters `children` under a new parent node at `coord`.
    ///
    /// Children keep the order given here; it defines their branch numbers.
    /// Fails if fewer than two or more than `max_degree` nodes are given, if
    /// a node is unknown, repeated, or already has a parent, or if geometry
    /// has not been closed with [`end_geometry`](Self::end_geometry).
    ///
    /// # Panics
    /// Panics if the node count would exceed `u32::MAX`.
    pub fn cluster_nodes(&mut self, children: &[NodeIndex], coord: Point3<f32>) -> Result<NodeIndex> {
        if self.phase != Phase::Clustering {
            return Err(VdsError::WrongPhase("cluster_nodes requires end_geometry"));
        }
        let max = self.config.max_degree();
        if children.len() < 2 || children.len() > max {
            return Err(VdsError::InvalidClusterSize {
                count: children.len(),
                max,
            });
        }
        for (i, &c) in children.iter().enumerate() {
            let node = self.nodes.get(c.index()).ok_or(VdsError::UnknownNode(c))?;
            if node.parent.is_some() {
                return Err(VdsError::AlreadyParented(c));
            }
            if children[..i].contains(&c) {
                return Err(VdsError::DuplicateNode(c));
            }
        }

        let parent = NodeIndex::new(self.nodes.len());
        let mut node = Node::new(coord);
        node.first_child = Some(children[0]);
        self.nodes.push(node);

        for (i, &c) in children.iter().enumerate() {
            let child = &mut self.nodes[c.index()];
            child.parent = Some(parent);
            child.sibling = children.get(i + 1).copied();
        }
        Ok(parent)
    }

    /// Finalizes the vertex tree.
    ///
    /// In order: assigns node identities depth-first, verifies that all
    /// nodes form one rooted tree, converts triangle corners to leaf
    /// identities, assigns each triangle to the deepest node clustering two
    /// of its corners, stores each node's subtriangles contiguously, picks
    /// each triangle's container node for culling, computes bounds, and
    /// labels the root `Boundary`.
    #[tracing::instrument(skip_all, fields(nodes = self.nodes.len(), tris = self.tris.len()))]
    pub fn end_tree(mut self) -> Result<VertexTree> {
        if self.phase != Phase::Clustering {
            return Err(VdsError::WrongPhase("end_tree requires end_geometry"));
        }
        if self.nodes.is_empty() {
            return Err(VdsError::EmptyTree);
        }

        let mut root = NodeIndex::new(0);
        while let Some(parent) = self.nodes[root.index()].parent {
            root = parent;
        }

        debug!("assigning node ids");
        let max_depth = assign_ids(&mut self.nodes, root, &self.config)?;
        debug!("verifying that all nodes form a single rooted tree");
        verify_rooted_tree(&self.nodes, root)?;

        debug!("converting triangles to reference nodes by id");
        let pending = self
            .tris
            .iter()
            .map(|t| PendingTri {
                corners: t.vertices.map(|v| self.nodes[v].id),
                normals: t.normals,
                colors: t.colors,
            })
            .collect();
        self.tris = Vec::new();

        let mut tree = VertexTree::assemble(self.config, self.nodes, root, pending)?;
        debug!("assigning node bounds");
        tree.compute_bounds();

        debug!(max_depth, "vertex tree complete");
        Ok(tree)
    }
}
