use crate::tree::types::{child_path, FileNode};
use std::collections::HashMap;

/// Expanded/collapsed flag per directory path. Absent means closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenSet {
    entries: HashMap<String, bool>,
}

impl OpenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh open-set with every directory of `nodes` set to `open`
    pub fn all(nodes: &[FileNode], open: bool) -> Self {
        let mut entries = HashMap::new();
        walk_directories(nodes, "", &mut |path| {
            entries.insert(path.to_string(), open);
        });
        Self { entries }
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.entries.get(path).copied().unwrap_or(false)
    }

    pub fn get(&self, path: &str) -> Option<bool> {
        self.entries.get(path).copied()
    }

    /// Flip a single path. Descendants keep their recorded state.
    pub fn toggle(&mut self, path: &str) -> bool {
        let entry = self.entries.entry(path.to_string()).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn open_all(&mut self, nodes: &[FileNode]) {
        *self = Self::all(nodes, true);
    }

    pub fn close_all(&mut self, nodes: &[FileNode]) {
        *self = Self::all(nodes, false);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn walk_directories(nodes: &[FileNode], parent: &str, visit: &mut dyn FnMut(&str)) {
    for node in nodes.iter().filter(|n| n.is_directory()) {
        let path = child_path(parent, &node.name);
        visit(&path);
        walk_directories(node.children(), &path, visit);
    }
}

/// A node as it appears on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow<'a> {
    pub path: String,
    pub depth: usize,
    pub node: &'a FileNode,
    pub is_open: bool,
}

/// Flatten the tree in display order, descending only into open directories
pub fn visible_rows<'a>(nodes: &'a [FileNode], open: &OpenSet) -> Vec<TreeRow<'a>> {
    let mut rows = Vec::new();
    collect_rows(nodes, "", 0, open, &mut rows);
    rows
}

fn collect_rows<'a>(
    nodes: &'a [FileNode],
    parent: &str,
    depth: usize,
    open: &OpenSet,
    rows: &mut Vec<TreeRow<'a>>,
) {
    for node in nodes {
        let path = child_path(parent, &node.name);
        let is_open = node.is_directory() && open.is_open(&path);
        rows.push(TreeRow {
            path: path.clone(),
            depth,
            node,
            is_open,
        });
        if is_open {
            collect_rows(node.children(), &path, depth + 1, open, rows);
        }
    }
}
