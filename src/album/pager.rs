//! Page fetch and next-page replacement for a pin.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::flickr::{PhotoSearch, SearchQuery};
use crate::state::data::{PhotoId, PinId};
use crate::state::store::Store;

/// Result of fetching one page for a pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The search came back empty; nothing was stored
    Empty,
    /// Placeholder photos stored for every reference, in result order
    Loaded(Vec<PhotoId>),
}

/// Turns (pin, page) into persisted placeholder photos
#[derive(Clone)]
pub struct PhotoPager {
    store: Store,
    search: Arc<dyn PhotoSearch>,
}

impl PhotoPager {
    pub fn new(store: Store, search: Arc<dyn PhotoSearch>) -> Self {
        Self { store, search }
    }

    /// Fetch the pin's current page and store it.
    ///
    /// The whole page lands in one transaction, so a reader sees all of it
    /// or none of it.
    #[instrument(level = "debug", skip(self), fields(pin = %pin_id))]
    pub async fn fetch_page(&self, pin_id: PinId) -> Result<PageOutcome> {
        let pin = self.store.perform(move |lib| lib.pin(pin_id)).await?;
        let query = SearchQuery::new(pin.latitude, pin.longitude, pin.page);

        let page = self.search.search_photos(&query).await?;
        if page.photos.is_empty() {
            info!(pin = %pin_id, page = pin.page, "No photos for this pin");
            return Ok(PageOutcome::Empty);
        }

        let urls: Vec<String> = page.photos.into_iter().map(|p| p.url).collect();
        let ids = self
            .store
            .perform(move |lib| lib.insert_page(pin_id, &urls))
            .await?;

        info!(pin = %pin_id, page = pin.page, photos = ids.len(), "Page stored");
        Ok(PageOutcome::Loaded(ids))
    }

    /// Fetch the current page only if the pin has no photos yet.
    /// Returns `None` when photos were already cached.
    pub async fn ensure_loaded(&self, pin_id: PinId) -> Result<Option<PageOutcome>> {
        let count = self.store.perform(move |lib| lib.photo_count(pin_id)).await?;
        if count > 0 {
            return Ok(None);
        }
        self.fetch_page(pin_id).await.map(Some)
    }

    /// Replace the pin's photos with the next page.
    ///
    /// Deleting the old photos and bumping the page counter commit together
    /// before the new page is requested.
    pub async fn next_page(&self, pin_id: PinId) -> Result<PageOutcome> {
        let page = self
            .store
            .perform(move |lib| lib.replace_collection(pin_id))
            .await?;
        info!(pin = %pin_id, page, "Loading new collection");
        self.fetch_page(pin_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TouristError;
    use crate::flickr::MockFlickr;
    use crate::imaging::placeholder::placeholder_bytes;

    async fn setup() -> (Store, Arc<MockFlickr>, PhotoPager, PinId) {
        let store = Store::in_memory().unwrap();
        let mock = Arc::new(MockFlickr::new());
        let pager = PhotoPager::new(store.clone(), mock.clone());
        let pin = store.perform(|lib| lib.create_pin(35.6762, 139.6503)).await.unwrap();
        (store, mock, pager, pin.id)
    }

    #[tokio::test]
    async fn test_empty_result_creates_nothing() {
        let (store, mock, pager, pin_id) = setup().await;

        assert_eq!(pager.fetch_page(pin_id).await.unwrap(), PageOutcome::Empty);
        assert_eq!(store.perform(move |lib| lib.photo_count(pin_id)).await.unwrap(), 0);
        assert_eq!(mock.searches().len(), 1);
    }

    #[tokio::test]
    async fn test_page_creates_one_placeholder_per_reference() {
        let (store, mock, pager, pin_id) = setup().await;
        let urls: Vec<String> = (0..21).map(|i| format!("https://x/{i}_s.jpg")).collect();
        mock.set_page(1, urls.clone());

        let PageOutcome::Loaded(ids) = pager.fetch_page(pin_id).await.unwrap() else {
            panic!("expected a loaded page");
        };
        assert_eq!(ids.len(), 21);

        let photos = store.perform(move |lib| lib.photos_for_pin(pin_id)).await.unwrap();
        assert_eq!(photos.len(), 21);
        for (photo, url) in photos.iter().zip(&urls) {
            assert_eq!(photo.pin_id, pin_id);
            assert_eq!(&photo.url, url);
            assert_eq!(photo.image, placeholder_bytes());
        }

        let query = &mock.searches()[0];
        assert_eq!(query.page, 1);
        assert_eq!(query.latitude, 35.6762);
        assert_eq!(query.longitude, 139.6503);
    }

    #[tokio::test]
    async fn test_ensure_loaded_skips_cached_pins() {
        let (_store, mock, pager, pin_id) = setup().await;
        mock.set_page(1, ["https://x/1.jpg"]);

        assert!(pager.ensure_loaded(pin_id).await.unwrap().is_some());
        assert!(pager.ensure_loaded(pin_id).await.unwrap().is_none());
        assert_eq!(mock.searches().len(), 1);
    }

    #[tokio::test]
    async fn test_next_page_replaces_everything() {
        let (store, mock, pager, pin_id) = setup().await;
        mock.set_page(1, ["https://x/a.jpg", "https://x/b.jpg", "https://x/c.jpg"]);
        mock.set_page(2, ["https://x/d.jpg", "https://x/e.jpg"]);

        let PageOutcome::Loaded(old_ids) = pager.fetch_page(pin_id).await.unwrap() else {
            panic!("expected a loaded page");
        };
        let PageOutcome::Loaded(new_ids) = pager.next_page(pin_id).await.unwrap() else {
            panic!("expected a loaded page");
        };

        let photos = store.perform(move |lib| lib.photos_for_pin(pin_id)).await.unwrap();
        assert!(photos.iter().all(|p| !old_ids.contains(&p.id)));
        assert_eq!(photos.iter().map(|p| p.id).collect::<Vec<_>>(), new_ids);
        assert_eq!(photos[0].url, "https://x/d.jpg");

        let pin = store.perform(move |lib| lib.pin(pin_id)).await.unwrap();
        assert_eq!(pin.page, 2);

        let pages: Vec<u32> = mock.searches().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_search_failure_stores_nothing() {
        let (store, mock, pager, pin_id) = setup().await;
        mock.set_page(1, ["https://x/1.jpg"]);
        mock.fail_searches(true);

        assert!(matches!(pager.fetch_page(pin_id).await, Err(TouristError::Api(_))));
        assert_eq!(store.perform(move |lib| lib.photo_count(pin_id)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_pin() {
        let (_store, mock, pager, _pin_id) = setup().await;
        assert!(matches!(
            pager.fetch_page(PinId(99)).await,
            Err(TouristError::PinNotFound(_))
        ));
        assert!(mock.searches().is_empty());
    }
}
