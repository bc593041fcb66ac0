//! Catalog API: categories → subcategories → equipment listings.
//!
//! Browsing is public. Creating, updating, and deleting entries is limited to
//! administrators and goes through the session manager's authenticated path.

pub mod client;

pub use client::CatalogClient;
