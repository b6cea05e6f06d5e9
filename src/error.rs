use crate::types::{NodeId, SegmentId, TreeId};

/// Failure outcomes of store operations. The store itself never maps these
/// to HTTP statuses; that is the adapter's job.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("tree {tree_id} does not exist")]
    TreeNotFound { tree_id: TreeId },

    #[error("tree {tree_id} already exists")]
    TreeExists { tree_id: TreeId },

    #[error("segment {segment_id} does not exist")]
    SegmentNotFound { segment_id: SegmentId },

    #[error("segment {segment_id} already exists for tree {tree_id}")]
    SegmentExists {
        tree_id: TreeId,
        segment_id: SegmentId,
    },

    #[error("node {node_id} does not exist")]
    NodeNotFound { node_id: NodeId },

    #[error("an item with node id {node_id} already exists")]
    NodeExists { node_id: NodeId },

    #[error("node {node_id} is neither a directory nor a root, it cannot take children")]
    NotAContainer { node_id: NodeId },

    #[error("root nodes are created with their segment, not individually")]
    ExplicitRoot,

    #[error("the root of a segment cannot be removed")]
    RootRemoval,

    #[error("segment {segment_id} is corrupted: it has no root node")]
    RootMissing { segment_id: SegmentId },
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
