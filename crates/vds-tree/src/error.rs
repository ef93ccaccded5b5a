//! Error types for vertex tree construction and persistence.

use thiserror::Error;

use crate::NodeIndex;

/// Errors reported while building, saving or loading a vertex tree.
///
/// Runtime contract violations (folding a node in the wrong state, a
/// triangle naming an unknown vertex) are not represented here; those
/// panic, since no caller can recover from them.
#[derive(Error, Debug)]
pub enum VdsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("geometry session is already open")]
    SessionOpen,

    #[error("operation not allowed in the current build phase: {0}")]
    WrongPhase(&'static str),

    #[error("node {0:?} already has a parent")]
    AlreadyParented(NodeIndex),

    #[error("node {0:?} listed more than once in a cluster")]
    DuplicateNode(NodeIndex),

    #[error("node {0:?} does not exist")]
    UnknownNode(NodeIndex),

    #[error("cannot cluster {count} nodes, expected 2..={max}")]
    InvalidClusterSize { count: usize, max: usize },

    #[error("vertex tree has no nodes")]
    EmptyTree,

    #[error("leaf node {0:?} is not part of the same rooted tree as node 0")]
    Forest(NodeIndex),

    #[error("node depth {depth} exceeds the maximum of {max}")]
    DepthExceeded { depth: usize, max: u8 },

    #[error("vertex tree invariant violated: {0}")]
    Invariant(String),

    #[error("invalid vertex tree header: {0}")]
    InvalidHeader(String),

    #[error("unsupported vertex tree file version {found}, expected {expected}")]
    VersionMismatch { found: String, expected: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type alias for vertex tree operations.
pub type Result<T> = std::result::Result<T, VdsError>;
