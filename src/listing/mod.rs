//! Fetches a transfer's listing and decides what the listing view shows

mod loader;

pub use loader::{load, redirect_url, ListingView, DEFAULT_LISTING_ERROR};
