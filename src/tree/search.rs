use crate::tree::types::FileNode;

/// Queries shorter than this leave the tree unfiltered
pub const MIN_QUERY_LEN: usize = 3;

pub fn is_search_active(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_LEN
}

/// Filter a copy of `nodes` down to matches and their ancestors.
///
/// A node survives when its name contains the query (case-insensitive) or,
/// for a directory, when at least one child survives. Surviving directories
/// carry only their surviving children. `nodes` itself is never modified.
pub fn filter_tree(nodes: &[FileNode], query: &str) -> Vec<FileNode> {
    if !is_search_active(query) {
        return nodes.to_vec();
    }
    filter_nodes(nodes, &query.to_lowercase())
}

fn filter_nodes(nodes: &[FileNode], needle: &str) -> Vec<FileNode> {
    nodes
        .iter()
        .filter_map(|node| filter_node(node, needle))
        .collect()
}

fn filter_node(node: &FileNode, needle: &str) -> Option<FileNode> {
    let name_matches = node.name.to_lowercase().contains(needle);

    if !node.is_directory() {
        return name_matches.then(|| node.clone());
    }

    let children = filter_nodes(node.children(), needle);
    if !name_matches && children.is_empty() {
        return None;
    }

    Some(FileNode {
        name: node.name.clone(),
        kind: node.kind,
        size: node.size.clone(),
        children: Some(children),
    })
}

/// Number of file nodes reachable from `nodes`
pub fn count_files(nodes: &[FileNode]) -> usize {
    nodes
        .iter()
        .map(|node| {
            if node.is_file() {
                1
            } else {
                count_files(node.children())
            }
        })
        .sum()
}
