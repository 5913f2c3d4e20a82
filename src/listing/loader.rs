use crate::transport::ListingService;
use crate::tree::TreeBrowser;

/// Shown when the listing request fails without a message from the server
pub const DEFAULT_LISTING_ERROR: &str = "Unable to load this transfer";

#[derive(Debug, Clone)]
pub enum ListingView {
    /// Tree ready to browse
    Ready(TreeBrowser),
    /// Transfer exists but holds nothing; render the "no data" placeholder
    Empty,
    /// Listing failed; navigate to this location instead
    Redirect(String),
}

/// Error page location carrying the message and the transfer id
pub fn redirect_url(message: &str, transfer_id: &str) -> String {
    format!(
        "/files?message={}&uid={}",
        urlencoding::encode(message),
        urlencoding::encode(transfer_id)
    )
}

/// Fetch the listing of `transfer_id` and turn it into a view
pub async fn load<L: ListingService>(service: &L, transfer_id: &str) -> ListingView {
    match service.get_listing(transfer_id).await {
        Ok(listing) if listing.files.is_empty() => {
            tracing::info!(transfer_id, "Listing is empty");
            ListingView::Empty
        }
        Ok(listing) => {
            tracing::debug!(transfer_id, nodes = listing.files.len(), "Listing loaded");
            ListingView::Ready(TreeBrowser::new(transfer_id, listing))
        }
        Err(e) => {
            tracing::warn!(transfer_id, "Failed to load listing: {}", e);
            let message = e.server_message().unwrap_or(DEFAULT_LISTING_ERROR);
            ListingView::Redirect(redirect_url(message, transfer_id))
        }
    }
}
