//! Lazy download of photo bytes with one flight per photo.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Result, TouristError};
use crate::flickr::ImageFetcher;
use crate::imaging::validate_image;
use crate::state::data::PhotoId;
use crate::state::store::Store;

/// Result shared between everyone waiting on the same photo
type FlightResult = std::result::Result<Vec<u8>, String>;
type Flight = Shared<BoxFuture<'static, FlightResult>>;

/// Replaces placeholder bytes with downloaded images.
///
/// Every photo has at most one download in flight; later requests for the
/// same photo join it. Downloads run as their own tasks, so the result is
/// persisted even when nobody is waiting for it anymore.
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct Materializer {
    store: Store,
    fetcher: Arc<dyn ImageFetcher>,
    in_flight: Arc<Mutex<HashMap<PhotoId, Flight>>>,
}

fn lock(map: &Mutex<HashMap<PhotoId, Flight>>) -> MutexGuard<'_, HashMap<PhotoId, Flight>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Materializer {
    pub fn new(store: Store, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of downloads currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Get the real bytes of a photo, downloading them if needed.
    ///
    /// Materialized photos are answered from the store without touching the
    /// network. A failed download leaves the placeholder in place; calling
    /// again retries.
    pub async fn materialize(&self, photo_id: PhotoId) -> Result<Vec<u8>> {
        let photo = self.store.perform(move |lib| lib.photo(photo_id)).await?;
        if photo.is_materialized() {
            return Ok(photo.image);
        }

        let flight = {
            let mut in_flight = lock(&self.in_flight);
            in_flight
                .entry(photo_id)
                .or_insert_with(|| self.launch(photo_id, photo.url))
                .clone()
        };

        flight.await.map_err(|reason| TouristError::Download {
            photo: photo_id,
            reason,
        })
    }

    /// Spawn the download for `photo_id` and wrap it for sharing.
    /// Called with the in-flight map locked.
    fn launch(&self, photo_id: PhotoId, url: String) -> Flight {
        debug!(photo = %photo_id, url = %url, "Starting download");

        let store = self.store.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            let result = download_and_store(&store, fetcher.as_ref(), photo_id, &url).await;
            if let Err(e) = &result {
                warn!(photo = %photo_id, error = %e, "Photo download failed");
            }
            lock(&in_flight).remove(&photo_id);
            result.map_err(|e| e.to_string())
        });

        async move { task.await.map_err(|e| e.to_string())? }
            .boxed()
            .shared()
    }
}

async fn download_and_store(
    store: &Store,
    fetcher: &dyn ImageFetcher,
    photo_id: PhotoId,
    url: &str,
) -> Result<Vec<u8>> {
    // An earlier flight may have finished between the caller's read and now
    let current = store.perform(move |lib| lib.photo(photo_id)).await?;
    if current.is_materialized() {
        return Ok(current.image);
    }

    let bytes = fetcher.download_photo(url).await?;
    let (width, height) = validate_image(&bytes)?;

    let stored = bytes.clone();
    store
        .perform(move |lib| lib.set_photo_image(photo_id, &stored))
        .await?;

    debug!(photo = %photo_id, bytes = bytes.len(), width, height, "Photo materialized");
    Ok(bytes)
}
