//! Sort maintenance for a single sibling set (the children of one parent).
//!
//! Insertion only makes room at the requested rank; removal re-normalizes the
//! whole level. The asymmetry is deliberate: removals repair any incidental
//! disorder (duplicates, gaps, ranks below 1) that earlier mutations left
//! behind.

use {
    crate::types::{Node, NodeId},
    std::collections::BTreeMap,
};

/// Increment the rank of every sibling at or past `threshold`, except
/// `exclude`, opening a slot for an insertion at `threshold`. Levels of one
/// node or fewer are left alone.
pub(crate) fn shift_from(
    nodes: &mut BTreeMap<NodeId, Node>,
    level: &[NodeId],
    threshold: i64,
    exclude: NodeId,
) {
    if level.len() <= 1 {
        return;
    }
    for node_id in level {
        if *node_id == exclude {
            continue;
        }
        if let Some(node) = nodes.get_mut(node_id) {
            if node.sort >= threshold {
                node.sort += 1;
            }
        }
    }
}

/// Force a sibling set back to the contiguous ranks `1..=k`.
///
/// Three repairs run in order: clamp the minimum rank to exactly 1, move
/// duplicate ranks apart, then close any remaining gaps. Applying this to an
/// already-normalized level changes nothing.
pub(crate) fn normalize(nodes: &mut BTreeMap<NodeId, Node>, level: &[NodeId]) {
    if level.is_empty() {
        return;
    }
    if level.len() == 1 {
        if let Some(node) = nodes.get_mut(&level[0]) {
            node.sort = 1;
        }
        return;
    }

    // Walk order for the repairs below: ascending by rank, ties kept in
    // level (insertion) order, fixed before anything moves.
    let mut ordered = level.to_vec();
    ordered.sort_by_key(|id| nodes[id].sort);

    let min_sort = nodes[&ordered[0]].sort;
    if min_sort > 1 {
        for id in &ordered {
            if let Some(node) = nodes.get_mut(id) {
                node.sort -= min_sort - 1;
            }
        }
    } else if min_sort < 1 {
        for id in &ordered {
            if let Some(node) = nodes.get_mut(id) {
                node.sort += min_sort.abs() + 1;
            }
        }
    }

    // Duplicates are detected against the pre-repair snapshot, then each one
    // shifts the rest of the level at its current rank. The duplicate keeps
    // its slot; whoever held the rank before moves right.
    let mut seen = Vec::with_capacity(ordered.len());
    let mut duplicates = Vec::new();
    for id in &ordered {
        let sort = nodes[id].sort;
        if seen.contains(&sort) {
            duplicates.push(*id);
        }
        seen.push(sort);
    }
    for id in duplicates {
        let sort = nodes[&id].sort;
        shift_from(nodes, level, sort, id);
    }

    // Close gaps: each sibling may sit at most one past its (already
    // repaired) predecessor.
    let mut by_rank = level.to_vec();
    by_rank.sort_by_key(|id| nodes[id].sort);
    let mut prev_sort = nodes[&by_rank[0]].sort;
    for id in by_rank.iter().skip(1) {
        if nodes[id].sort > prev_sort + 1 {
            if let Some(node) = nodes.get_mut(id) {
                node.sort = prev_sort + 1;
            }
        }
        prev_sort = nodes[id].sort;
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::NodeKind,
        std::collections::BTreeMap,
        test_case::test_case,
    };

    /// Build a level of leaf nodes with ids 1..=n carrying the given ranks.
    fn level_with_sorts(sorts: &[i64]) -> (BTreeMap<NodeId, Node>, Vec<NodeId>) {
        let mut nodes = BTreeMap::new();
        let mut level = Vec::new();
        for (i, sort) in sorts.iter().enumerate() {
            let id = (i + 1) as NodeId;
            nodes.insert(id, Node::new(0, NodeKind::from("file"), None, *sort, Vec::new()));
            level.push(id);
        }
        (nodes, level)
    }

    fn sorts_of(nodes: &BTreeMap<NodeId, Node>, level: &[NodeId]) -> Vec<i64> {
        level.iter().map(|id| nodes[id].sort).collect()
    }

    #[test]
    fn shift_opens_a_slot_in_the_middle() {
        let (mut nodes, level) = level_with_sorts(&[1, 2, 3]);
        shift_from(&mut nodes, &level, 2, 0);
        assert_eq!(sorts_of(&nodes, &level), vec![1, 3, 4]);
    }

    #[test]
    fn shift_skips_the_excluded_node() {
        let (mut nodes, level) = level_with_sorts(&[1, 2, 3]);
        shift_from(&mut nodes, &level, 2, 2);
        assert_eq!(sorts_of(&nodes, &level), vec![1, 2, 4]);
    }

    #[test]
    fn shift_leaves_single_node_levels_alone() {
        let (mut nodes, level) = level_with_sorts(&[5]);
        shift_from(&mut nodes, &level, 1, 0);
        assert_eq!(sorts_of(&nodes, &level), vec![5]);
    }

    #[test]
    fn normalize_resets_a_lone_node_to_one() {
        let (mut nodes, level) = level_with_sorts(&[7]);
        normalize(&mut nodes, &level);
        assert_eq!(sorts_of(&nodes, &level), vec![1]);
    }

    #[test_case(&[1, 2, 3], &[1, 2, 3] ; "already normalized is untouched")]
    #[test_case(&[1, 3],    &[1, 2]    ; "gap after a removal is closed")]
    #[test_case(&[5, 6, 9], &[1, 2, 3] ; "level starting past one is pulled back")]
    #[test_case(&[-3, -1],  &[1, 2]    ; "negative ranks are pushed up")]
    #[test_case(&[0, 2, 5], &[1, 2, 3] ; "zero minimum counts as below one")]
    fn normalize_repairs(sorts: &[i64], expected: &[i64]) {
        let (mut nodes, level) = level_with_sorts(sorts);
        normalize(&mut nodes, &level);
        assert_eq!(sorts_of(&nodes, &level), expected);
    }

    #[test]
    fn normalize_moves_duplicates_apart() {
        let (mut nodes, level) = level_with_sorts(&[1, 1, 2]);
        normalize(&mut nodes, &level);
        // the later-seen duplicate keeps rank 1, the first holder moves right
        assert_eq!(sorts_of(&nodes, &level), vec![2, 1, 3]);
    }

    #[test]
    fn normalize_untangles_an_all_equal_level() {
        let (mut nodes, level) = level_with_sorts(&[2, 2, 2]);
        normalize(&mut nodes, &level);
        let mut sorts = sorts_of(&nodes, &level);
        sorts.sort_unstable();
        assert_eq!(sorts, vec![1, 2, 3]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let (mut nodes, level) = level_with_sorts(&[4, 4, -1, 9]);
        normalize(&mut nodes, &level);
        let after_once = sorts_of(&nodes, &level);
        let mut expected = after_once.clone();
        expected.sort_unstable();
        assert_eq!(expected, vec![1, 2, 3, 4]);
        normalize(&mut nodes, &level);
        assert_eq!(sorts_of(&nodes, &level), after_once);
    }
}
