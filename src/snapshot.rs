//! Snapshot codec.
//!
//! The wire format is the bincode encoding of the forest table
//! (`tree -> segment -> node id -> node record`), with each node flattened
//! to a record whose payload is carried as its JSON text. bincode is not
//! self-describing, so arbitrary JSON payloads are stringified on the way
//! out and parsed back on the way in. The path index and garbage queue are
//! derivable state and are not persisted; the index is rebuilt on load.

use {
    crate::{
        forest::Forest,
        types::{Node, NodeId, SegmentId, TreeId},
    },
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, fs, io, path::{Path, PathBuf}},
};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("data file {} does not exist (new setup? create an empty file with that name)", path.display())]
    MissingDataFile { path: PathBuf },

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("snapshot decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    #[error("snapshot carries a payload that is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeWire {
    parent: Option<NodeId>,
    kind: String,
    payload: Option<String>,
    sort: i64,
    children: Vec<NodeId>,
}

type TableWire = BTreeMap<TreeId, BTreeMap<SegmentId, BTreeMap<NodeId, NodeWire>>>;

impl From<&Node> for NodeWire {
    fn from(node: &Node) -> Self {
        Self {
            parent: node.parent,
            kind: node.kind.to_string(),
            payload: node.payload.as_ref().map(|value| value.to_string()),
            sort: node.sort,
            children: node.children.clone(),
        }
    }
}

impl TryFrom<NodeWire> for Node {
    type Error = serde_json::Error;

    fn try_from(wire: NodeWire) -> Result<Self, Self::Error> {
        Ok(Self {
            parent: wire.parent,
            kind: wire.kind.into(),
            payload: wire
                .payload
                .map(|raw| serde_json::from_str(&raw))
                .transpose()?,
            sort: wire.sort,
            children: wire.children,
        })
    }
}

/// Encode the forest table and write it to `path`, replacing the file.
pub fn save(forest: &Forest, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    let wire: TableWire = forest
        .table()
        .iter()
        .map(|(tree_id, tree)| {
            let tree = tree
                .iter()
                .map(|(segment_id, segment)| {
                    let segment = segment
                        .iter()
                        .map(|(node_id, node)| (*node_id, NodeWire::from(node)))
                        .collect();
                    (*segment_id, segment)
                })
                .collect();
            (*tree_id, tree)
        })
        .collect();

    let bytes = bincode::serialize(&wire).map_err(SnapshotError::Encode)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read and decode a snapshot into a fresh store. The path index is rebuilt
/// from the decoded table.
pub fn load(path: impl AsRef<Path>) -> Result<Forest, SnapshotError> {
    let bytes = fs::read(path)?;
    let wire: TableWire = bincode::deserialize(&bytes).map_err(SnapshotError::Decode)?;

    let mut table = BTreeMap::new();
    for (tree_id, tree_wire) in wire {
        let mut tree = BTreeMap::new();
        for (segment_id, segment_wire) in tree_wire {
            let mut segment = BTreeMap::new();
            for (node_id, node_wire) in segment_wire {
                segment.insert(node_id, Node::try_from(node_wire)?);
            }
            tree.insert(segment_id, segment);
        }
        table.insert(tree_id, tree);
    }

    Ok(Forest::from_table(table))
}

/// Startup contract for the configured data file: a missing file is an
/// operator error, an empty file is initialized with an empty forest, and
/// anything else must decode.
pub fn bootstrap(path: impl AsRef<Path>) -> Result<Forest, SnapshotError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SnapshotError::MissingDataFile { path: path.to_owned() });
    }
    if fs::metadata(path)?.len() == 0 {
        log::info!("data file {} is empty, initialising it with an empty forest", path.display());
        let forest = Forest::new();
        save(&forest, path)?;
        return Ok(forest);
    }
    load(path)
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    /// A populated store exercising every field a snapshot must carry:
    /// nested directories, leaf payloads of several JSON shapes, and more
    /// than one tree and segment.
    fn fixture() -> Forest {
        let mut forest = Forest::new();
        forest.add_tree(154).unwrap();
        forest.add_segment(154, 12, 0).unwrap();
        forest.add_directory(154, 12, 0, 241, None).unwrap();
        forest
            .add_node(154, 12, 0, 1251, None, Vec::new(), "file".into(), Some(json!(1512)))
            .unwrap();
        forest.add_directory(154, 12, 0, 4612, None).unwrap();
        forest
            .add_node(154, 12, 241, 351, None, Vec::new(), "file".into(), Some(json!("blob")))
            .unwrap();
        forest
            .add_node(154, 12, 4612, 516, None, Vec::new(), "smartview".into(), Some(json!({"q": [1, 2]})))
            .unwrap();
        forest.add_segment(154, 15, 0).unwrap();
        forest.add_tree(165).unwrap();
        forest
    }

    #[test]
    fn round_trip_preserves_observable_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.data");

        let forest = fixture();
        save(&forest, &path).unwrap();
        let reloaded = load(&path).unwrap();

        assert_eq!(reloaded.trees(), forest.trees());
        assert_eq!(reloaded.segments(154).unwrap(), forest.segments(154).unwrap());
        assert_eq!(
            reloaded.level(154, 12, 0).unwrap(),
            forest.level(154, 12, 0).unwrap()
        );
        assert_eq!(
            reloaded.breadcrumbs(154, 12, 516).unwrap(),
            forest.breadcrumbs(154, 12, 516).unwrap()
        );
        assert_eq!(reloaded.everything().unwrap(), forest.everything().unwrap());
    }

    #[test]
    fn empty_forest_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.data");
        save(&Forest::new(), &path).unwrap();
        let reloaded = load(&path).unwrap();
        assert!(reloaded.trees().is_empty());
    }

    #[test]
    fn bootstrap_rejects_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.data");
        assert!(matches!(
            bootstrap(&path),
            Err(SnapshotError::MissingDataFile { .. })
        ));
    }

    #[test]
    fn bootstrap_initialises_an_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.data");
        fs::write(&path, b"").unwrap();

        let forest = bootstrap(&path).unwrap();
        assert!(forest.trees().is_empty());
        // the file now holds a serialized empty forest, not zero bytes
        assert!(fs::metadata(&path).unwrap().len() > 0);
        let reloaded = bootstrap(&path).unwrap();
        assert!(reloaded.trees().is_empty());
    }
}
