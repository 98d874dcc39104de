//! Structural change tracking for an album grid.
//!
//! [`AlbumQuery`] holds the ordered photo list a grid is showing and diffs it
//! against fresh store contents. The diff is fed through a [`ChangeBuffer`]
//! as will-change, one did-change per edit, did-change-content, and comes
//! out as a single [`ChangeBatch`] for the front end to apply in one
//! animated update.

use std::collections::HashMap;
use tracing::debug;

use crate::state::data::{Photo, PhotoId, PinId};

/// One structural edit, positions as in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// New item at `index` (post-update position)
    Insert { index: usize },
    /// Item at `index` (pre-update position) removed
    Delete { index: usize },
    /// Item at `index` (post-update position) needs redrawing
    Update { index: usize },
    /// Item moved from `from` (pre-update) to `to` (post-update)
    Move { from: usize, to: usize },
}

/// Edits to apply together
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeBatch {
    pub changes: Vec<Change>,
}

impl ChangeBatch {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn inserts(&self) -> usize {
        self.count(|c| matches!(c, Change::Insert { .. }))
    }

    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, Change::Delete { .. }))
    }

    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, Change::Update { .. }))
    }

    fn count(&self, f: impl Fn(&Change) -> bool) -> usize {
        self.changes.iter().filter(|c| f(c)).count()
    }
}

/// Accumulates individual edits between will-change and did-change-content
#[derive(Debug, Default)]
pub struct ChangeBuffer {
    pending: Option<Vec<Change>>,
}

impl ChangeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a cycle, discarding anything left from an unfinished one
    pub fn will_change(&mut self) {
        self.pending = Some(Vec::new());
    }

    pub fn did_change(&mut self, change: Change) {
        self.pending.get_or_insert_with(Vec::new).push(change);
    }

    /// End the cycle; `None` when nothing changed
    pub fn did_change_content(&mut self) -> Option<ChangeBatch> {
        let changes = self.pending.take()?;
        if changes.is_empty() {
            return None;
        }
        Some(ChangeBatch { changes })
    }
}

/// An item as the grid knows it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    id: PhotoId,
    materialized: bool,
}

/// Live view over one pin's photos, in display order
#[derive(Debug)]
pub struct AlbumQuery {
    pin_id: PinId,
    entries: Vec<Entry>,
}

impl AlbumQuery {
    pub fn new(pin_id: PinId) -> Self {
        Self {
            pin_id,
            entries: Vec::new(),
        }
    }

    pub fn pin_id(&self) -> PinId {
        self.pin_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn photo_at(&self, position: usize) -> Option<PhotoId> {
        self.entries.get(position).map(|e| e.id)
    }

    pub fn position_of(&self, id: PhotoId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn photo_ids(&self) -> Vec<PhotoId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Replace the snapshot with `photos` (already in display order) and
    /// report what changed as one batch.
    pub fn refresh(&mut self, photos: &[Photo], buffer: &mut ChangeBuffer) -> Option<ChangeBatch> {
        let fresh: Vec<Entry> = photos
            .iter()
            .map(|p| Entry {
                id: p.id,
                materialized: p.is_materialized(),
            })
            .collect();

        buffer.will_change();
        for change in diff(&self.entries, &fresh) {
            buffer.did_change(change);
        }
        self.entries = fresh;

        let batch = buffer.did_change_content();
        if let Some(batch) = &batch {
            debug!(
                pin = %self.pin_id,
                inserts = batch.inserts(),
                deletes = batch.deletes(),
                updates = batch.updates(),
                "Album changed"
            );
        }
        batch
    }
}

fn diff(old: &[Entry], new: &[Entry]) -> Vec<Change> {
    let old_index: HashMap<PhotoId, usize> =
        old.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
    let new_index: HashMap<PhotoId, usize> =
        new.iter().enumerate().map(|(i, e)| (e.id, i)).collect();

    let mut changes = Vec::new();

    for (index, entry) in old.iter().enumerate() {
        if !new_index.contains_key(&entry.id) {
            changes.push(Change::Delete { index });
        }
    }

    // Rank among survivors tells whether an item really moved, as opposed to
    // shifting because of inserts and deletes around it
    let surviving_old: Vec<PhotoId> = old
        .iter()
        .filter(|e| new_index.contains_key(&e.id))
        .map(|e| e.id)
        .collect();
    let old_rank: HashMap<PhotoId, usize> = surviving_old
        .iter()
        .enumerate()
        .map(|(rank, id)| (*id, rank))
        .collect();

    let mut new_rank = 0;
    for (index, entry) in new.iter().enumerate() {
        let Some(&from) = old_index.get(&entry.id) else {
            changes.push(Change::Insert { index });
            continue;
        };

        if old_rank.get(&entry.id) != Some(&new_rank) {
            changes.push(Change::Move { from, to: index });
        }
        // A moved item can change too; its new cell still needs redrawing
        if old[from].materialized != entry.materialized {
            changes.push(Change::Update { index });
        }
        new_rank += 1;
    }

    changes
}
