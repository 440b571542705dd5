//! Remote document-tree service access.
//!
//! - [`NotionClient`] - HTTP client for page downloads and HTML exports
//! - [`Page`] - a downloaded page and its sub-page discovery
//! - [`PageSource`] - the seam the checker drives, so runs can be faked in tests

pub mod api_types;
pub mod client;
pub mod page;

pub use api_types::ExportFormat;
pub use client::{NotionAuth, NotionClient};
pub use page::Page;

use async_trait::async_trait;

use crate::error::Result;
use crate::page_id::PageId;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Packaged export of the tree rooted at `root`, as raw archive bytes.
    async fn fetch_export(&self, root: &PageId, format: ExportFormat) -> Result<Vec<u8>>;

    async fn fetch_page(&self, id: &PageId) -> Result<Page>;
}
