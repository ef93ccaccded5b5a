//! Octree clustering of builder nodes.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::{Aabb, NodeIndex, Result, TreeBuilder, VdsError};

/// Number of octants a node set is split into.
const OCTANTS: usize = 8;

/// Clusters `nodes` into a single subtree by recursive octree subdivision
/// and returns its root.
///
/// The bounding box of the nodes' coordinates is split at its three
/// midplanes; each octant holding more than one node is clustered
/// recursively, and the octants' representatives are clustered under a new
/// node at the mean of all input coordinates. Nodes at identical
/// coordinates are dealt round robin instead, so clustering always makes
/// progress.
///
/// Uses only [`TreeBuilder::cluster_nodes`], so it can be combined with
/// manual clustering. A single node is returned as is.
#[tracing::instrument(skip_all, fields(nodes = nodes.len()))]
pub fn cluster_octree(builder: &mut TreeBuilder, nodes: &[NodeIndex]) -> Result<NodeIndex> {
    let root = match nodes {
        [] => return Err(VdsError::EmptyTree),
        [single] => *single,
        _ => cluster_level(builder, nodes)?,
    };
    debug!(nodes = builder.node_count(), "octree clustering complete");
    Ok(root)
}

fn cluster_level(builder: &mut TreeBuilder, nodes: &[NodeIndex]) -> Result<NodeIndex> {
    let coords: Vec<Point3<f32>> = nodes.iter().map(|&n| builder.node(n).coord()).collect();
    let center = mean(&coords);

    let mut buckets = octants(&coords);
    if buckets.iter().filter(|b| !b.is_empty()).count() < 2 {
        buckets = round_robin(coords.len(), builder.config().max_degree());
    }

    let mut representatives = Vec::with_capacity(OCTANTS);
    for bucket in buckets.iter().filter(|b| !b.is_empty()) {
        let members: Vec<NodeIndex> = bucket.iter().map(|&i| nodes[i]).collect();
        let representative = match members.as_slice() {
            [single] => *single,
            _ => cluster_level(builder, &members)?,
        };
        representatives.push(representative);
    }

    // Narrow trees cannot take all eight octants at once.
    let max_degree = builder.config().max_degree();
    while representatives.len() > max_degree {
        let mut merged = Vec::with_capacity(representatives.len().div_ceil(max_degree));
        for group in representatives.chunks(max_degree) {
            match group {
                [single] => merged.push(*single),
                _ => {
                    let coords: Vec<Point3<f32>> = group.iter().map(|&n| builder.node(n).coord()).collect();
                    merged.push(builder.cluster_nodes(group, mean(&coords))?);
                }
            }
        }
        representatives = merged;
    }

    builder.cluster_nodes(&representatives, center)
}

/// Splits point indices by the midplanes of their bounding box.
fn octants(coords: &[Point3<f32>]) -> Vec<Vec<usize>> {
    let mut buckets = vec![Vec::new(); OCTANTS];
    let Some(aabb) = Aabb::from_points(coords) else {
        return buckets;
    };
    if aabb.is_degenerate(0.0) {
        return buckets;
    }

    let center = aabb.center();
    for (i, p) in coords.iter().enumerate() {
        let mut octant = 0;
        for axis in 0..3 {
            if p[axis] > center[axis] {
                octant |= 1 << axis;
            }
        }
        buckets[octant].push(i);
    }
    buckets
}

/// Deals `count` indices over `buckets` buckets in turn.
fn round_robin(count: usize, buckets: usize) -> Vec<Vec<usize>> {
    let mut result = vec![Vec::new(); buckets];
    for i in 0..count {
        result[i % buckets].push(i);
    }
    result
}

fn mean(coords: &[Point3<f32>]) -> Point3<f32> {
    let sum = coords.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / coords.len().max(1) as f32)
}
