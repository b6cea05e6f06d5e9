use {
    crate::types::NodeId,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    std::fmt,
};

const ROOT_KIND: &str = "root";
const DIR_KIND:  &str = "dir";

/// Classification of a node.
///
/// The engine only distinguishes the two container kinds from everything
/// else. Leaf kinds are opaque strings chosen by the caller (`file`,
/// `smartview`, `asset`, ...) and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Root,
    Dir,
    Leaf(String),
}

impl NodeKind {
    /// Whether nodes of this kind may own children.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Dir)
    }
}

impl From<String> for NodeKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            ROOT_KIND => NodeKind::Root,
            DIR_KIND => NodeKind::Dir,
            _ => NodeKind::Leaf(raw),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(raw: &str) -> Self {
        raw.to_owned().into()
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Root => f.write_str(ROOT_KIND),
            NodeKind::Dir => f.write_str(DIR_KIND),
            NodeKind::Leaf(kind) => f.write_str(kind),
        }
    }
}

/// One vertex of a segment tree.
///
/// A node records both directions of the hierarchy: it knows its parent, and
/// a container keeps the ordered list of its children. Every mutation must
/// leave the two in agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// `None` iff this node is the root of its segment.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    /// Opaque value attached by the caller; never interpreted by the engine.
    pub payload: Option<Value>,
    /// Rank among siblings. Contiguous `1..=k` after normalization.
    pub sort: i64,
    /// Ordered child ids. Always empty for non-container nodes.
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(
        parent: NodeId,
        kind: NodeKind,
        payload: Option<Value>,
        sort: i64,
        children: Vec<NodeId>,
    ) -> Self {
        Self {
            parent: Some(parent),
            kind,
            payload,
            sort,
            children,
        }
    }

    /// The single node every new segment starts with.
    pub fn root() -> Self {
        Self {
            parent: None,
            kind: NodeKind::Root,
            payload: None,
            sort: 1,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(NodeKind::from("root"), NodeKind::Root);
        assert_eq!(NodeKind::from("dir"), NodeKind::Dir);
        assert_eq!(NodeKind::from("file"), NodeKind::Leaf("file".to_owned()));
        assert_eq!(String::from(NodeKind::Leaf("asset".to_owned())), "asset");
        assert_eq!(String::from(NodeKind::Root), "root");
    }

    #[test]
    fn only_root_and_dir_are_containers() {
        assert!(NodeKind::Root.is_container());
        assert!(NodeKind::Dir.is_container());
        assert!(!NodeKind::from("smartview").is_container());
    }
}
