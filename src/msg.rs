//! Wire types of the HTTP surface: request bodies, path parameters, response
//! payloads, and the `{meta, response}` envelope every endpoint answers with.

use {
    crate::types::{NodeId, SegmentId, TreeId},
    gotham::prelude::*,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Response envelope. The HTTP status is repeated in `meta.code` so clients
/// that only look at the body still see the outcome.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub meta: Meta,
    pub response: Value,
}

#[derive(Debug, Serialize)]
pub struct Meta {
    pub code: u16,
    pub message: String,
}

impl Envelope {
    pub fn success<T: Serialize>(payload: T) -> Self {
        Self {
            meta: Meta {
                code: 200,
                message: "OK".to_owned(),
            },
            response: serde_json::to_value(payload)
                .expect("response payloads always convert to JSON"),
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            meta: Meta {
                code,
                message: message.into(),
            },
            response: Value::Null,
        }
    }
}

// -------------------------------- bodies ---------------------------------

#[derive(Debug, Deserialize)]
pub struct TreeRequest {
    pub tree_id: TreeId,
}

#[derive(Debug, Deserialize)]
pub struct SegmentCreateRequest {
    pub segment_id: SegmentId,
    pub root_node_id: NodeId,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryCreateRequest {
    pub parent_node_id: NodeId,
    pub node_id: NodeId,
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NodeCreateRequest {
    pub parent_node_id: NodeId,
    pub node_id: NodeId,
    pub position: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct PersistRequest {
    pub filename: Option<String>,
}

// ----------------------------- path params -------------------------------

#[derive(Debug, Deserialize, StateData, StaticResponseExtender)]
pub struct TreePath {
    pub tree_id: TreeId,
}

#[derive(Debug, Deserialize, StateData, StaticResponseExtender)]
pub struct SegmentPath {
    pub tree_id: TreeId,
    pub segment_id: SegmentId,
}

#[derive(Debug, Deserialize, StateData, StaticResponseExtender)]
pub struct LevelPath {
    pub tree_id: TreeId,
    pub segment_id: SegmentId,
    pub parent_node_id: NodeId,
}

#[derive(Debug, Deserialize, StateData, StaticResponseExtender)]
pub struct NodePath {
    pub tree_id: TreeId,
    pub segment_id: SegmentId,
    pub node_id: NodeId,
}

// ------------------------------ responses --------------------------------

/// One child entry of a level listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelEntry {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<Value>,
    pub sort: i64,
}

/// One vertex of a sorted depth-first dump of a segment. Children are
/// ordered by rank, so serializing a `TreeNode` is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Option<Value>,
    pub sort: i64,
    pub children: Vec<TreeNode>,
}
