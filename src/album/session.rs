//! One open photo album: the state behind a pin's photo grid.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::cell::{CellBinding, PhotoCell};
use super::changes::{AlbumQuery, ChangeBatch, ChangeBuffer};
use super::materialize::Materializer;
use super::pager::{PageOutcome, PhotoPager};
use crate::error::{Result, TouristError};
use crate::flickr::PhotoSearch;
use crate::state::data::{PhotoId, PinId};
use crate::state::store::Store;

/// Label shown instead of the grid when a page came back empty
pub const NO_IMAGES_MESSAGE: &str = "This pin has no images.";

/// What the album area should show besides the grid itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumStatus {
    Ready,
    Loading,
    /// Search returned nothing: hide the grid, show the empty-state label
    Empty,
    /// Search or storage failed; the message is meant for a banner
    Failed(String),
}

impl AlbumStatus {
    /// Text to show the user, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            AlbumStatus::Empty => Some(NO_IMAGES_MESSAGE),
            AlbumStatus::Failed(message) => Some(message),
            AlbumStatus::Ready | AlbumStatus::Loading => None,
        }
    }
}

/// Holds the busy flag up for as long as it lives
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn engage(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Load {
    Current,
    Next,
}

/// Album state for one pin.
///
/// The [`Materializer`] outlives any one session, since downloads keep running
/// after an album closes. Hand every session of a process the same one.
///
/// Selecting photos switches the primary action from "New Collection" to
/// "Remove Selected Pictures". Download completions are tracked per
/// session and aborted when it is closed or dropped, so nothing touches a
/// cell after its album is gone.
pub struct AlbumSession {
    pin_id: PinId,
    store: Store,
    pager: PhotoPager,
    materializer: Materializer,
    query: AlbumQuery,
    changes: ChangeBuffer,
    selection: BTreeSet<PhotoId>,
    busy: Arc<AtomicBool>,
    status: AlbumStatus,
    pending: JoinSet<()>,
}

impl AlbumSession {
    pub fn new(
        store: Store,
        search: Arc<dyn PhotoSearch>,
        materializer: Materializer,
        pin_id: PinId,
    ) -> Self {
        Self {
            pin_id,
            pager: PhotoPager::new(store.clone(), search),
            materializer,
            store,
            query: AlbumQuery::new(pin_id),
            changes: ChangeBuffer::new(),
            selection: BTreeSet::new(),
            busy: Arc::new(AtomicBool::new(false)),
            status: AlbumStatus::Ready,
            pending: JoinSet::new(),
        }
    }

    pub fn pin_id(&self) -> PinId {
        self.pin_id
    }

    pub fn status(&self) -> &AlbumStatus {
        &self.status
    }

    /// True when the empty-state label should replace the grid
    pub fn is_empty_state(&self) -> bool {
        self.status == AlbumStatus::Empty
    }

    /// Whether the primary action is currently disabled
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Handle a front end can poll while an action is running
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    /// Number of photos in the grid
    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Photos in grid order
    pub fn photo_ids(&self) -> Vec<PhotoId> {
        self.query.photo_ids()
    }

    /// Load cached photos, fetching the pin's current page if there are none
    pub async fn open(&mut self) -> Result<Option<ChangeBatch>> {
        let pin_id = self.pin_id;
        let pin = self.store.perform(move |lib| lib.pin(pin_id)).await?;
        debug!(pin = %pin_id, page = pin.page, "Opening album");

        let batch = self.refresh().await?;
        if !self.query.is_empty() {
            return Ok(batch);
        }
        self.load(Load::Current).await
    }

    /// Re-read the pin's photos and report what changed since the last look
    pub async fn refresh(&mut self) -> Result<Option<ChangeBatch>> {
        let pin_id = self.pin_id;
        let photos = self
            .store
            .perform(move |lib| lib.photos_for_pin(pin_id))
            .await?;
        Ok(self.query.refresh(&photos, &mut self.changes))
    }

    /// Replace every photo with the next page of results
    pub async fn new_collection(&mut self) -> Result<Option<ChangeBatch>> {
        if !self.selection.is_empty() {
            return Err(TouristError::SelectionActive);
        }
        self.load(Load::Next).await
    }

    /// The bottom button: remove the selection if there is one, otherwise
    /// load a new collection
    pub async fn primary_action(&mut self) -> Result<Option<ChangeBatch>> {
        if self.is_selecting() {
            self.remove_selected().await
        } else {
            self.new_collection().await
        }
    }

    /// Delete the selected photos and leave delete mode
    pub async fn remove_selected(&mut self) -> Result<Option<ChangeBatch>> {
        if self.selection.is_empty() {
            return Ok(None);
        }
        let _busy = BusyGuard::engage(&self.busy);

        let pin_id = self.pin_id;
        let ids: Vec<PhotoId> = self.selection.iter().copied().collect();
        let removed = self
            .store
            .perform(move |lib| lib.delete_photos(pin_id, &ids))
            .await?;
        self.selection.clear();

        info!(pin = %pin_id, removed, "Removed selected photos");
        self.refresh().await
    }

    pub fn is_selecting(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn is_selected(&self, position: usize) -> bool {
        self.query
            .photo_at(position)
            .is_some_and(|id| self.selection.contains(&id))
    }

    /// Flip the selection of the photo at `position`.
    /// Returns the new state, or `None` for a position outside the grid.
    pub fn toggle_selection(&mut self, position: usize) -> Option<bool> {
        let id = self.query.photo_at(position)?;
        if self.selection.remove(&id) {
            Some(false)
        } else {
            self.selection.insert(id);
            Some(true)
        }
    }

    /// Bind `cell` to the photo at `position`.
    ///
    /// Materialized photos show immediately. Otherwise the cell shows the
    /// placeholder and a download is started (or joined); its result is
    /// always stored, but only shown if the cell still displays this photo
    /// at this position. Returns false for a position outside the grid.
    pub async fn display(&mut self, cell: &PhotoCell, position: usize) -> Result<bool> {
        let Some(photo_id) = self.query.photo_at(position) else {
            return Ok(false);
        };

        let photo = self.store.perform(move |lib| lib.photo(photo_id)).await?;
        let binding = CellBinding {
            position,
            photo: photo_id,
        };

        if photo.is_materialized() {
            cell.bind(binding, Some(photo.image));
            return Ok(true);
        }

        cell.bind(binding, None);
        let materializer = self.materializer.clone();
        let cell = cell.clone();
        self.pending.spawn(async move {
            match materializer.materialize(photo_id).await {
                Ok(bytes) => {
                    if !cell.complete(binding, bytes) {
                        debug!(photo = %photo_id, position, "Cell was reused, image only stored");
                    }
                }
                Err(e) => {
                    debug!(photo = %photo_id, error = %e, "Leaving placeholder in cell");
                    cell.fail(binding);
                }
            }
        });
        Ok(true)
    }

    /// Wait until every started cell completion has run
    pub async fn wait_for_downloads(&mut self) {
        while let Some(result) = self.pending.join_next().await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!(error = %e, "Cell completion task failed");
                }
            }
        }
    }

    /// Tear the album down, invalidating every pending cell completion.
    /// Downloads already running still finish and are stored.
    pub fn close(mut self) {
        let pending = self.pending.len();
        self.pending.abort_all();
        debug!(pin = %self.pin_id, pending, "Album closed");
    }

    async fn load(&mut self, request: Load) -> Result<Option<ChangeBatch>> {
        let _busy = BusyGuard::engage(&self.busy);
        self.status = AlbumStatus::Loading;

        let outcome = match request {
            Load::Current => self.pager.fetch_page(self.pin_id).await,
            Load::Next => self.pager.next_page(self.pin_id).await,
        };

        self.status = match outcome {
            Ok(PageOutcome::Empty) => AlbumStatus::Empty,
            Ok(PageOutcome::Loaded(_)) => AlbumStatus::Ready,
            Err(TouristError::PinNotFound(id)) => return Err(TouristError::PinNotFound(id)),
            Err(e) => {
                warn!(pin = %self.pin_id, error = %e, "Could not load photos");
                AlbumStatus::Failed(e.to_string())
            }
        };

        self.refresh().await
    }
}
