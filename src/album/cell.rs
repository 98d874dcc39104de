//! Grid cells as seen by the album protocol.
//!
//! A front end owns the real views; it mirrors each one with a [`PhotoCell`]
//! and renders whatever the cell currently holds. Cells get recycled, so a
//! download completion only lands if the cell is still bound to the same
//! grid position *and* the same photo it was bound to when the request started.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::imaging::placeholder::placeholder_bytes;
use crate::state::data::PhotoId;

/// What a cell was asked to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBinding {
    pub position: usize,
    pub photo: PhotoId,
}

/// Snapshot of a cell's visible state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellContent {
    pub binding: Option<CellBinding>,
    /// Encoded image currently shown (the placeholder while loading)
    pub image: Vec<u8>,
    /// Activity indicator running
    pub loading: bool,
}

impl Default for CellContent {
    fn default() -> Self {
        Self {
            binding: None,
            image: placeholder_bytes().to_vec(),
            loading: false,
        }
    }
}

impl CellContent {
    pub fn shows_placeholder(&self) -> bool {
        self.image == placeholder_bytes()
    }
}

/// Shared handle to one reusable grid cell.
/// Clone is cheap (Arc internally).
#[derive(Debug, Clone, Default)]
pub struct PhotoCell {
    inner: Arc<Mutex<CellContent>>,
}

impl PhotoCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn content(&self) -> MutexGuard<'_, CellContent> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind the cell to a photo.
    ///
    /// With `image` the cell shows it right away; without, it shows the
    /// placeholder and starts its activity indicator.
    pub fn bind(&self, binding: CellBinding, image: Option<Vec<u8>>) {
        let mut content = self.content();
        content.binding = Some(binding);
        content.loading = image.is_none();
        content.image = image.unwrap_or_else(|| placeholder_bytes().to_vec());
    }

    pub fn binding(&self) -> Option<CellBinding> {
        self.content().binding
    }

    /// Show downloaded bytes if the cell still shows `expected`.
    /// Returns whether the cell was updated.
    pub fn complete(&self, expected: CellBinding, image: Vec<u8>) -> bool {
        let mut content = self.content();
        if content.binding != Some(expected) {
            return false;
        }
        content.image = image;
        content.loading = false;
        true
    }

    /// Stop the activity indicator after a failed download, keeping the placeholder.
    /// Returns whether the cell was still bound to `expected`.
    pub fn fail(&self, expected: CellBinding) -> bool {
        let mut content = self.content();
        if content.binding != Some(expected) {
            return false;
        }
        content.loading = false;
        true
    }

    pub fn snapshot(&self) -> CellContent {
        self.content().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: CellBinding = CellBinding {
        position: 0,
        photo: PhotoId(10),
    };

    #[test]
    fn test_bind_without_image_shows_placeholder() {
        let cell = PhotoCell::new();
        cell.bind(FIRST, None);

        let content = cell.snapshot();
        assert!(content.loading);
        assert!(content.shows_placeholder());
        assert_eq!(content.binding, Some(FIRST));
    }

    #[test]
    fn test_complete_applies_to_current_binding() {
        let cell = PhotoCell::new();
        cell.bind(FIRST, None);

        assert!(cell.complete(FIRST, vec![9, 9]));
        let content = cell.snapshot();
        assert_eq!(content.image, vec![9, 9]);
        assert!(!content.loading);
    }

    #[test]
    fn test_complete_ignored_after_rebind() {
        let cell = PhotoCell::new();
        cell.bind(FIRST, None);
        cell.bind(
            CellBinding {
                position: 4,
                photo: PhotoId(14),
            },
            Some(vec![4]),
        );

        assert!(!cell.complete(FIRST, vec![1]));
        assert_eq!(cell.snapshot().image, vec![4]);
    }

    #[test]
    fn test_same_position_different_photo_is_stale() {
        // A reload can put another photo at the same position
        let cell = PhotoCell::new();
        cell.bind(FIRST, None);
        let replaced = CellBinding {
            position: 0,
            photo: PhotoId(11),
        };
        cell.bind(replaced, None);

        assert!(!cell.complete(FIRST, vec![1]));
        assert!(!cell.fail(FIRST));
        assert!(cell.snapshot().loading);
    }

    #[test]
    fn test_fail_stops_indicator() {
        let cell = PhotoCell::new();
        cell.bind(FIRST, None);
        assert!(cell.fail(FIRST));

        let content = cell.snapshot();
        assert!(!content.loading);
        assert!(content.shows_placeholder());
    }
}
