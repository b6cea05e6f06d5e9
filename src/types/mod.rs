mod node;
mod path;

pub use {
    node::{Node, NodeKind},
    path::PathIndex,
};

/// Identifier of a tenant tree. Tenants are fully independent.
pub type TreeId = u64;

/// Identifier of a segment within a tree. Unique per tree only.
pub type SegmentId = u64;

/// Identifier of a node within a segment. Unique per segment only; the same
/// id may exist in two different segments of the same tree.
pub type NodeId = u64;
