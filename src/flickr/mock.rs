//! In-memory Flickr stand-in for tests and offline runs.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

use super::{ImageFetcher, PhotoRef, PhotoSearch, SearchPage, SearchQuery};
use crate::error::{Result, TouristError};

/// Mock search/download backend.
///
/// Pages and image bytes are registered up front; every call is recorded so
/// tests can assert on what went over the "network".
#[derive(Default)]
pub struct MockFlickr {
    pages: Mutex<HashMap<u32, Vec<PhotoRef>>>,
    images: Mutex<HashMap<String, Vec<u8>>>,
    searches: Mutex<Vec<SearchQuery>>,
    downloads: AtomicUsize,
    fail_searches: AtomicBool,
    download_gate: Option<Arc<Semaphore>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockFlickr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Downloads wait for a permit on `gate` before completing
    pub fn with_download_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            download_gate: Some(gate),
            ..Self::default()
        }
    }

    /// Register the references returned for `page`; unregistered pages are empty
    pub fn set_page<I, S>(&self, page: u32, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let refs = urls.into_iter().map(PhotoRef::new).collect();
        lock(&self.pages).insert(page, refs);
    }

    /// Register the bytes served for `url`; unregistered URLs answer 404
    pub fn set_image(&self, url: impl Into<String>, bytes: Vec<u8>) {
        lock(&self.images).insert(url.into(), bytes);
    }

    /// Make every search fail with an API error
    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    /// Searches issued so far, in order
    pub fn searches(&self) -> Vec<SearchQuery> {
        lock(&self.searches).clone()
    }

    /// Number of downloads started so far
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSearch for MockFlickr {
    async fn search_photos(&self, query: &SearchQuery) -> Result<SearchPage> {
        lock(&self.searches).push(query.clone());

        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(TouristError::Api("Service currently unavailable (code 105)".into()));
        }

        let photos = lock(&self.pages).get(&query.page).cloned().unwrap_or_default();
        Ok(SearchPage {
            total: Some(photos.len() as u64),
            pages: Some(1),
            page: query.page,
            photos,
        })
    }
}

#[async_trait]
impl ImageFetcher for MockFlickr {
    async fn download_photo(&self, url: &str) -> Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.download_gate {
            gate.acquire()
                .await
                .map_err(|_| TouristError::Api("download gate closed".into()))?
                .forget();
        }

        lock(&self.images)
            .get(url)
            .cloned()
            .ok_or(TouristError::HttpStatus(StatusCode::NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_searches() {
        let mock = MockFlickr::new();
        mock.set_page(1, ["https://x/1.jpg", "https://x/2.jpg"]);

        let page = mock.search_photos(&SearchQuery::new(1.0, 2.0, 1)).await.unwrap();
        assert_eq!(page.photos.len(), 2);

        let empty = mock.search_photos(&SearchQuery::new(1.0, 2.0, 2)).await.unwrap();
        assert!(empty.photos.is_empty());

        let pages: Vec<u32> = mock.searches().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_mock_downloads() {
        let mock = MockFlickr::new();
        mock.set_image("https://x/1.jpg", vec![1, 2, 3]);

        assert_eq!(mock.download_photo("https://x/1.jpg").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            mock.download_photo("https://x/404.jpg").await,
            Err(TouristError::HttpStatus(StatusCode::NOT_FOUND))
        ));
        assert_eq!(mock.download_count(), 2);
    }
}
