pub mod batch;
pub mod config;
pub mod download;
pub mod listing;
pub mod logging;
pub mod metrics;
pub mod transport;
pub mod tree;
pub mod upload;
