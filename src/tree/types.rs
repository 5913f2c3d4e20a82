use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One entry of a remote listing. Nodes carry no path; paths are rebuilt
/// from ancestor names on every traversal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileNode>>,
}

impl FileNode {
    pub fn file(name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            size: Some(size.into()),
            children: None,
        }
    }

    pub fn directory(name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory,
            size: None,
            children: Some(children),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn children(&self) -> &[FileNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// Path key of `name` under `parent`; top-level nodes are keyed by name alone
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Server-side totals for a transfer, unaffected by client filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingSummary {
    pub total_size: String,
    pub number_of_files: String,
}

impl Default for ListingSummary {
    fn default() -> Self {
        Self {
            total_size: "0".to_string(),
            number_of_files: "0".to_string(),
        }
    }
}
