use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::library::Library;
use crate::error::{Result, TouristError};

/// Shared handle to the catalog.
///
/// `rusqlite::Connection` must not be used from two threads at once, so the
/// library sits behind a mutex and every access goes through [`Store::perform`],
/// which runs the closure on tokio's blocking pool. Work submitted here is
/// serialized, and callers only ever pass ids in and get owned records out.
/// Clone is cheap (Arc internally).
#[derive(Clone, Debug)]
pub struct Store {
    library: Arc<Mutex<Library>>,
}

impl Store {
    pub fn new(library: Library) -> Self {
        Self {
            library: Arc::new(Mutex::new(library)),
        }
    }

    /// Open the catalog file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Library::open(path)?))
    }

    /// In-memory catalog, mostly for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Library::open_in_memory()?))
    }

    /// Run `f` against the library on the blocking pool
    pub async fn perform<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Library) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let library = Arc::clone(&self.library);
        tokio::task::spawn_blocking(move || {
            let mut guard = library.lock().map_err(|_| {
                warn!("Library mutex poisoned");
                TouristError::Poisoned
            })?;
            f(&mut guard)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_perform_serializes_writes() {
        let store = Store::in_memory().unwrap();
        let pin_id = store.perform(|lib| lib.create_pin(1.0, 1.0)).await.unwrap().id;

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let url = vec![format!("https://example.com/{i}.jpg")];
                store.perform(move |lib| lib.insert_page(pin_id, &url)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count = store.perform(move |lib| lib.photo_count(pin_id)).await.unwrap();
        assert_eq!(count, 8);
    }

    #[tokio::test]
    async fn test_perform_propagates_errors() {
        let store = Store::in_memory().unwrap();
        let result = store
            .perform(|lib| lib.pin(crate::state::data::PinId(3)))
            .await;
        assert!(matches!(result, Err(TouristError::PinNotFound(_))));
    }
}
