//! Reading and writing vertex trees.
//!
//! The format starts with a text header:
//!
//! ```text
//! VDS Vertex Tree file format version 1.1
//! <number of nodes>
//! <number of vertices>
//! <number of triangles>
//! ```
//!
//! followed by little-endian binary node records. The root comes first;
//! after any node's record come the records of all its children, and then,
//! child by child, everything below them. Each record holds the bounding
//! sphere, the proxy coordinate, the child count, a flag telling whether a
//! sibling follows, the subtriangles and finally the node data.
//!
//! Node identities, triangle owners and containers are not stored; they are
//! recomputed on load, so a tree must be read back with the same
//! [`VdsConfig`] it was written with.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::{BoundingSphere, NodeId, Result, VdsConfig, VdsError};

use super::node::{Children, Node, NodeIndex};
use super::tree::{assign_ids, PendingTri, VertexTree};

/// First words of the header line.
pub const FORMAT_NAME: &str = "VDS Vertex Tree file format version";
/// Version written, and the only version read.
pub const FORMAT_VERSION: &str = "1.1";

/// Encodes and decodes the application data attached to nodes.
pub trait NodeDataCodec {
    /// Writes the data of `node`.
    fn write_data(&self, writer: &mut dyn Write, node: &Node) -> io::Result<()>;

    /// Reads back what [`write_data`](Self::write_data) wrote; the result
    /// becomes the node's data bytes.
    fn read_data(&self, reader: &mut dyn Read) -> io::Result<Vec<u8>>;
}

/// Stores node data as a length-prefixed byte string.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawNodeData;

impl NodeDataCodec for RawNodeData {
    fn write_data(&self, writer: &mut dyn Write, node: &Node) -> io::Result<()> {
        let len = u32::try_from(node.data().len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "node data exceeds 4 GiB"))?;
        writer.write_u32::<LittleEndian>(len)?;
        writer.write_all(node.data())
    }

    fn read_data(&self, reader: &mut dyn Read) -> io::Result<Vec<u8>> {
        let len = u64::from(reader.read_u32::<LittleEndian>()?);
        let mut data = Vec::new();
        reader.take(len).read_to_end(&mut data)?;
        if data.len() as u64 != len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated node data"));
        }
        Ok(data)
    }
}

/// Saves a tree to a file, storing node data as raw bytes.
pub fn save_tree<P: AsRef<Path>>(path: P, tree: &VertexTree) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_tree(&mut writer, tree, &RawNodeData)?;
    writer.flush()?;
    Ok(())
}

/// Loads a tree saved with [`save_tree`].
pub fn load_tree<P: AsRef<Path>>(path: P, config: VdsConfig) -> Result<VertexTree> {
    let mut reader = BufReader::new(File::open(path)?);
    read_tree(&mut reader, config, &RawNodeData)
}

/// Writes a tree, encoding node data with `codec`.
#[tracing::instrument(skip_all, fields(nodes = tree.node_count(), tris = tree.tri_count()))]
pub fn write_tree<W, C>(writer: &mut W, tree: &VertexTree, codec: &C) -> Result<()>
where
    W: Write,
    C: NodeDataCodec + ?Sized,
{
    let stats = tree.stats();
    writeln!(writer, "{FORMAT_NAME} {FORMAT_VERSION}")?;
    writeln!(writer, "{}", stats.nodes)?;
    writeln!(writer, "{}", stats.leaves)?;
    writeln!(writer, "{}", stats.tris)?;

    let root = tree.root();
    write_node(writer, tree, root, false, codec)?;
    write_children(writer, tree, root, codec)?;
    debug!("vertex tree written");
    Ok(())
}

/// Reads a tree written by [`write_tree`] with an equivalent `codec`.
///
/// Rebuilds parent links, depths and identities, then triangle ownership
/// and containers. Stored bounds are kept as they are.
#[tracing::instrument(skip_all)]
pub fn read_tree<R, C>(reader: &mut R, config: VdsConfig, codec: &C) -> Result<VertexTree>
where
    R: BufRead,
    C: NodeDataCodec + ?Sized,
{
    let header = read_line(reader)?;
    let version = header
        .strip_prefix(FORMAT_NAME)
        .map(str::trim)
        .ok_or_else(|| VdsError::InvalidHeader(header.clone()))?;
    if version != FORMAT_VERSION {
        return Err(VdsError::VersionMismatch {
            found: version.to_string(),
            expected: FORMAT_VERSION.to_string(),
        });
    }
    let node_count = read_count(reader, "node")?;
    let vertex_count = read_count(reader, "vertex")?;
    let tri_count = read_count(reader, "triangle")?;
    debug!(node_count, vertex_count, tri_count, "header read");

    let mut state = ReadState {
        config: &config,
        expected_nodes: node_count,
        nodes: Vec::new(),
        tris: Vec::new(),
    };
    let (root, child_count, has_sibling) = state.read_node(reader, codec)?;
    if has_sibling {
        return Err(VdsError::Parse("root node claims a sibling".into()));
    }
    state.read_children(reader, root, 0, child_count, codec)?;

    let ReadState { mut nodes, tris, .. } = state;
    let leaves = nodes.iter().filter(|n| n.is_leaf()).count();
    if nodes.len() != node_count || leaves != vertex_count || tris.len() != tri_count {
        return Err(VdsError::Parse(format!(
            "read {} nodes, {leaves} vertices, {} triangles; header says {node_count}, {vertex_count}, {tri_count}",
            nodes.len(),
            tris.len()
        )));
    }

    assign_ids(&mut nodes, root, &config)?;
    let tree = VertexTree::assemble(config, nodes, root, tris)?;
    debug!("vertex tree read");
    Ok(tree)
}

fn write_children<W, C>(writer: &mut W, tree: &VertexTree, node: NodeIndex, codec: &C) -> Result<()>
where
    W: Write,
    C: NodeDataCodec + ?Sized,
{
    for child in tree.children(node) {
        let has_sibling = tree.node(child).sibling().is_some();
        write_node(writer, tree, child, has_sibling, codec)?;
    }
    for child in tree.children(node) {
        write_children(writer, tree, child, codec)?;
    }
    Ok(())
}

fn write_node<W, C>(writer: &mut W, tree: &VertexTree, index: NodeIndex, has_sibling: bool, codec: &C) -> Result<()>
where
    W: Write,
    C: NodeDataCodec + ?Sized,
{
    let node = tree.node(index);
    write_point(writer, &node.bound().center())?;
    writer.write_f32::<LittleEndian>(node.bound().radius())?;
    write_point(writer, &node.coord())?;

    let child_count = u16::try_from(tree.children(index).count())
        .map_err(|_| VdsError::Invariant(format!("{index:?} has too many children to store")))?;
    writer.write_u16::<LittleEndian>(child_count)?;
    writer.write_u8(u8::from(has_sibling))?;

    writer.write_u32::<LittleEndian>(node.subtri_count() as u32)?;
    for t in tree.subtris(index) {
        let tri = tree.tri(t);
        for corner in tri.corners() {
            writer.write_u64::<LittleEndian>(corner.path())?;
            writer.write_u8(corner.depth())?;
        }
        for normal in tri.normals() {
            for c in normal.iter() {
                writer.write_f32::<LittleEndian>(*c)?;
            }
        }
        for color in tri.colors() {
            writer.write_all(color)?;
        }
    }

    codec.write_data(writer, node)?;
    Ok(())
}

fn write_point<W: Write>(writer: &mut W, point: &Point3<f32>) -> io::Result<()> {
    for c in point.iter() {
        writer.write_f32::<LittleEndian>(*c)?;
    }
    Ok(())
}

fn read_point<R: Read>(reader: &mut R) -> io::Result<Point3<f32>> {
    Ok(Point3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn read_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(VdsError::InvalidHeader("unexpected end of file".into()));
    }
    Ok(line.trim().to_string())
}

fn read_count<R: BufRead>(reader: &mut R, what: &str) -> Result<usize> {
    let line = read_line(reader)?;
    line.parse()
        .map_err(|_| VdsError::InvalidHeader(format!("expected {what} count, found {line:?}")))
}

/// Nodes and triangles read so far.
struct ReadState<'a> {
    config: &'a VdsConfig,
    expected_nodes: usize,
    nodes: Vec<Node>,
    tris: Vec<PendingTri>,
}

impl ReadState<'_> {
    /// Reads one node record. Returns the new node, its child count and
    /// whether a sibling follows it.
    fn read_node<R, C>(&mut self, reader: &mut R, codec: &C) -> Result<(NodeIndex, usize, bool)>
    where
        R: Read,
        C: NodeDataCodec + ?Sized,
    {
        if self.nodes.len() >= self.expected_nodes {
            return Err(VdsError::Parse(format!(
                "more node records than the {} in the header",
                self.expected_nodes
            )));
        }

        let center = read_point(reader)?;
        let radius = reader.read_f32::<LittleEndian>()?;
        if !(radius >= 0.0) {
            return Err(VdsError::Parse(format!("invalid bound radius {radius}")));
        }
        let coord = read_point(reader)?;
        let child_count = usize::from(reader.read_u16::<LittleEndian>()?);
        if child_count == 1 || child_count > self.config.max_degree() {
            return Err(VdsError::Parse(format!(
                "node with {child_count} children, expected 0 or 2..={}",
                self.config.max_degree()
            )));
        }
        let has_sibling = match reader.read_u8()? {
            0 => false,
            1 => true,
            flag => return Err(VdsError::Parse(format!("invalid sibling flag {flag}"))),
        };

        let subtri_count = reader.read_u32::<LittleEndian>()?;
        for _ in 0..subtri_count {
            let mut corners = [NodeId::ROOT; 3];
            for corner in &mut corners {
                let path = reader.read_u64::<LittleEndian>()?;
                let depth = reader.read_u8()?;
                *corner = NodeId::new(path, depth);
            }
            let mut normals = [Vector3::zeros(); 3];
            for normal in &mut normals {
                *normal = read_point(reader)?.coords;
            }
            let mut colors = [[0u8; 3]; 3];
            for color in &mut colors {
                reader.read_exact(color)?;
            }
            self.tris.push(PendingTri {
                corners,
                normals,
                colors,
            });
        }

        let mut node = Node::new(coord);
        node.bound = BoundingSphere::new(center, radius);
        node.data = codec.read_data(reader)?;
        self.nodes.push(node);
        Ok((NodeIndex::new(self.nodes.len() - 1), child_count, has_sibling))
    }

    /// Reads the records of `parent`'s children, then everything below them.
    ///
    /// Fails as soon as a child would lie deeper than the configured
    /// maximum, which also bounds the recursion.
    fn read_children<R, C>(
        &mut self,
        reader: &mut R,
        parent: NodeIndex,
        depth: u8,
        count: usize,
        codec: &C,
    ) -> Result<()>
    where
        R: Read,
        C: NodeDataCodec + ?Sized,
    {
        if count == 0 {
            return Ok(());
        }
        let max = self.config.max_depth();
        if depth >= max {
            return Err(VdsError::DepthExceeded {
                depth: usize::from(depth) + 1,
                max,
            });
        }

        let mut children = Vec::with_capacity(count);
        for i in 0..count {
            let (child, child_count, has_sibling) = self.read_node(reader, codec)?;
            if has_sibling != (i + 1 < count) {
                return Err(VdsError::Parse(format!(
                    "sibling flag of child {i} of {parent:?} disagrees with its child count {count}"
                )));
            }
            children.push((child, child_count));
        }

        self.nodes[parent.index()].first_child = Some(children[0].0);
        for (i, &(child, _)) in children.iter().enumerate() {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.sibling = children.get(i + 1).map(|&(c, _)| c);
        }
        debug_assert_eq!(Children::new(&self.nodes, parent).count(), count);

        for (child, child_count) in children {
            self.read_children(reader, child, depth + 1, child_count, codec)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vds::testing::{make_strip_tree, n};
    use std::io::Cursor;

    fn write_to_vec(tree: &VertexTree) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_tree(&mut bytes, tree, &RawNodeData).unwrap();
        bytes
    }

    /// Triangles as sorted corner id triples, per node in depth-first order.
    fn shape(tree: &VertexTree) -> Vec<(Point3<f32>, BoundingSphere, usize, Vec<[NodeId; 3]>, Vec<u8>)> {
        tree.nodes_depth_first()
            .into_iter()
            .map(|i| {
                let node = tree.node(i);
                let mut tris: Vec<[NodeId; 3]> = tree.subtris(i).map(|t| *tree.tri(t).corners()).collect();
                tris.sort_by_key(|c| c.map(|id| (id.depth(), id.path())));
                (node.coord(), *node.bound(), tree.children(i).count(), tris, node.data().to_vec())
            })
            .collect()
    }

    #[test]
    fn header_is_text() {
        let tree = make_strip_tree();
        let bytes = write_to_vec(&tree);
        let text = String::from_utf8_lossy(&bytes[..60]);
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("VDS Vertex Tree file format version 1.1"));
        assert_eq!(lines.next(), Some("15"));
        assert_eq!(lines.next(), Some("8"));
        assert_eq!(lines.next(), Some("8"));
    }

    #[test]
    fn read_back_is_isomorphic() {
        let mut tree = make_strip_tree();
        tree.set_node_data(n(9), b"nine".to_vec());
        let bytes = write_to_vec(&tree);

        let loaded = read_tree(&mut Cursor::new(bytes), VdsConfig::default(), &RawNodeData).unwrap();
        assert_eq!(loaded.stats(), tree.stats());
        assert_eq!(shape(&loaded), shape(&tree));
        loaded.validate().unwrap();
    }

    #[test]
    fn wrong_version_is_rejected() {
        let tree = make_strip_tree();
        let mut bytes = write_to_vec(&tree);
        let pos = FORMAT_NAME.len() + 1;
        bytes[pos..pos + 3].copy_from_slice(b"2.0");

        let err = read_tree(&mut Cursor::new(bytes), VdsConfig::default(), &RawNodeData).unwrap_err();
        assert!(matches!(err, VdsError::VersionMismatch { found, .. } if found == "2.0"));
    }

    #[test]
    fn foreign_header_is_rejected() {
        let err = read_tree(&mut Cursor::new(b"ply\nformat ascii 1.0\n".to_vec()), VdsConfig::default(), &RawNodeData)
            .unwrap_err();
        assert!(matches!(err, VdsError::InvalidHeader(_)));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let tree = make_strip_tree();
        let mut bytes = write_to_vec(&tree);
        bytes.truncate(bytes.len() - 10);
        let result = read_tree(&mut Cursor::new(bytes), VdsConfig::default(), &RawNodeData);
        assert!(matches!(result, Err(VdsError::Io(_))));
    }

    #[test]
    fn header_counts_must_match() {
        let tree = make_strip_tree();
        let bytes = write_to_vec(&tree);
        let body_start = bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(3)
            .map(|(i, _)| i + 1)
            .unwrap();

        // Claim one more triangle than the body holds.
        let mut tampered = format!("{FORMAT_NAME} {FORMAT_VERSION}\n15\n8\n9\n").into_bytes();
        tampered.extend_from_slice(&bytes[body_start..]);
        let err = read_tree(&mut Cursor::new(tampered), VdsConfig::default(), &RawNodeData).unwrap_err();
        assert!(matches!(err, VdsError::Parse(_)));
    }

    /// A header followed by a chain of nodes, each the second of two
    /// children, `levels` deep.
    fn chain_file(levels: usize) -> Vec<u8> {
        fn record(bytes: &mut Vec<u8>, child_count: u16, has_sibling: bool) {
            for _ in 0..7 {
                bytes.write_f32::<LittleEndian>(0.0).unwrap();
            }
            bytes.write_u16::<LittleEndian>(child_count).unwrap();
            bytes.write_u8(u8::from(has_sibling)).unwrap();
            bytes.write_u32::<LittleEndian>(0).unwrap();
            bytes.write_u32::<LittleEndian>(0).unwrap();
        }

        let nodes = 2 * levels + 1;
        let mut bytes = format!("{FORMAT_NAME} {FORMAT_VERSION}\n{nodes}\n{}\n0\n", levels + 1).into_bytes();
        record(&mut bytes, 2, false);
        for level in 0..levels {
            let last = level + 1 == levels;
            record(&mut bytes, 0, true);
            record(&mut bytes, if last { 0 } else { 2 }, false);
        }
        bytes
    }

    #[test]
    fn shallow_chain_is_read() {
        let tree = read_tree(&mut Cursor::new(chain_file(3)), VdsConfig::default(), &RawNodeData).unwrap();
        assert_eq!(tree.depth(), 3);
        tree.validate().unwrap();
    }

    #[test]
    fn overly_deep_chain_is_an_error() {
        let config = VdsConfig::default();
        let max = config.max_depth();
        let result = read_tree(&mut Cursor::new(chain_file(200_000)), config, &RawNodeData);
        assert!(matches!(result, Err(VdsError::DepthExceeded { depth, max: m }) if depth == usize::from(max) + 1 && m == max));
    }

    struct CoordCodec;

    impl NodeDataCodec for CoordCodec {
        fn write_data(&self, writer: &mut dyn Write, node: &Node) -> io::Result<()> {
            writer.write_f32::<LittleEndian>(node.coord().x)
        }

        fn read_data(&self, reader: &mut dyn Read) -> io::Result<Vec<u8>> {
            Ok(reader.read_f32::<LittleEndian>()?.to_le_bytes().to_vec())
        }
    }

    #[test]
    fn custom_codec_round_trip() {
        let tree = make_strip_tree();
        let mut bytes = Vec::new();
        write_tree(&mut bytes, &tree, &CoordCodec).unwrap();
        let loaded = read_tree(&mut Cursor::new(bytes), VdsConfig::default(), &CoordCodec).unwrap();
        let root = loaded.node(loaded.root());
        assert_eq!(root.data(), &3.5f32.to_le_bytes());
    }

    #[test]
    fn save_and_load_file() {
        let tree = make_strip_tree();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strip.vds");
        save_tree(&path, &tree).unwrap();
        let loaded = load_tree(&path, VdsConfig::default()).unwrap();
        assert_eq!(shape(&loaded), shape(&tree));
    }
}
