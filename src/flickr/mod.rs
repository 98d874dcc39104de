//! Flickr photo search and image download.
//!
//! Two collaborators sit behind traits so the album protocol can be driven
//! by the real HTTP client or by an in-memory mock:
//!
//! - [`PhotoSearch`] returns one page of photo references for a location
//! - [`ImageFetcher`] downloads the bytes behind a reference
//!
//! [`FlickrClient`] implements both over reqwest.

mod client;
mod mock;
pub mod query;
pub mod response;

pub use client::FlickrClient;
pub use mock::MockFlickr;
pub use query::{BoundingBox, SearchQuery, PHOTOS_PER_PAGE};

use async_trait::async_trait;

use crate::error::Result;

/// Remote image reference returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    /// Small-size image URL (`url_s`)
    pub url: String,
    pub title: Option<String>,
}

impl PhotoRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub photos: Vec<PhotoRef>,
    /// Page that was requested
    pub page: u32,
    /// Total pages available, when reported
    pub pages: Option<u64>,
    /// Total matching photos, when reported
    pub total: Option<u64>,
}

/// Searches for photos around a coordinate.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    /// Fetch one page of photo references.
    ///
    /// Transport, status, decode and API errors are returned, never panicked on.
    async fn search_photos(&self, query: &SearchQuery) -> Result<SearchPage>;
}

/// Downloads image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the raw bytes at `url`
    async fn download_photo(&self, url: &str) -> Result<Vec<u8>>;
}
