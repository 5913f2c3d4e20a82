use crate::transport::ListingResponse;
use crate::tree::index::{visible_rows, OpenSet, TreeRow};
use crate::tree::search::{count_files, filter_tree, is_search_active};
use crate::tree::types::{FileNode, ListingSummary};

/// State of one listing view: the fetched tree, its totals, which
/// directories are expanded and the current search.
#[derive(Debug, Clone)]
pub struct TreeBrowser {
    transfer_id: String,
    source: Vec<FileNode>,
    summary: ListingSummary,
    open: OpenSet,
    query: String,
    filtered: Option<Vec<FileNode>>,
}

impl TreeBrowser {
    pub fn new(transfer_id: impl Into<String>, listing: ListingResponse) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            source: listing.files,
            summary: ListingSummary {
                total_size: listing.total_size,
                number_of_files: listing.number_of_files,
            },
            open: OpenSet::new(),
            query: String::new(),
            filtered: None,
        }
    }

    pub fn transfer_id(&self) -> &str {
        &self.transfer_id
    }

    pub fn summary(&self) -> &ListingSummary {
        &self.summary
    }

    /// The tree as fetched, regardless of search
    pub fn source(&self) -> &[FileNode] {
        &self.source
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Replace the search query. The filtered copy is rebuilt from the source.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.filtered = if is_search_active(&self.query) {
            Some(filter_tree(&self.source, &self.query))
        } else {
            None
        };
        tracing::debug!(
            query = %self.query,
            displayed = self.displayed_file_count(),
            "Search updated"
        );
    }

    pub fn clear_query(&mut self) {
        self.set_query(String::new());
    }

    /// Tree currently on screen: the filtered copy while searching, else the source
    pub fn displayed_tree(&self) -> &[FileNode] {
        self.filtered.as_deref().unwrap_or(&self.source)
    }

    pub fn displayed_file_count(&self) -> usize {
        count_files(self.displayed_tree())
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.open.is_open(path)
    }

    pub fn open_set(&self) -> &OpenSet {
        &self.open
    }

    pub fn toggle(&mut self, path: &str) -> bool {
        self.open.toggle(path)
    }

    pub fn open_all(&mut self) {
        self.open.open_all(&self.source);
    }

    pub fn close_all(&mut self) {
        self.open.close_all(&self.source);
    }

    pub fn visible_rows(&self) -> Vec<TreeRow<'_>> {
        visible_rows(self.displayed_tree(), &self.open)
    }
}
