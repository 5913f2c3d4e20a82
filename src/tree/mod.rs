//! Hierarchical view of a stored transfer
//!
//! The listing fetched from the server is kept untouched; expansion state
//! and search results live in side structures keyed by path.

pub mod browser;
pub mod index;
pub mod search;
pub mod types;

pub use browser::TreeBrowser;
pub use index::{visible_rows, OpenSet, TreeRow};
pub use search::{count_files, filter_tree, is_search_active, MIN_QUERY_LEN};
pub use types::{child_path, FileNode, ListingSummary, NodeKind};
