use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::data::{MapRegion, Photo, PhotoId, Pin, PinId};
use crate::error::{Result, TouristError};
use crate::imaging::placeholder::placeholder_bytes;

/// Settings keys for the persisted map region
const CENTER_LATITUDE: &str = "centerLatitude";
const CENTER_LONGITUDE: &str = "centerLongitude";
const SPAN_LATITUDE: &str = "spanLatitude";
const SPAN_LONGITUDE: &str = "spanLongitude";

/// The Library manages the SQLite catalog database.
/// It stores pins, the cached photos of each pin, and a few UI settings.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the catalog at `db_path` and initialize the schema.
    pub fn open(db_path: &Path) -> Result<Self> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        info!(path = %db_path.display(), "Database opened");

        let library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Open a throwaway catalog that lives only in memory
    pub fn open_in_memory() -> Result<Self> {
        let library = Library {
            conn: Connection::open_in_memory()?,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        // Cascading photo deletion relies on this
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS pins (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                latitude        REAL NOT NULL,
                longitude       REAL NOT NULL,
                page            INTEGER NOT NULL DEFAULT 1,
                created_at      INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS photos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                pin_id          INTEGER NOT NULL,
                url             TEXT NOT NULL,
                image           BLOB NOT NULL,
                created_at      INTEGER NOT NULL,
                FOREIGN KEY(pin_id) REFERENCES pins(id) ON DELETE CASCADE
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key             TEXT PRIMARY KEY,
                value           REAL NOT NULL
            )",
            [],
        )?;

        // Coordinate lookups and album ordering
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pins_coordinate
             ON pins(latitude, longitude)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_photos_pin_created
             ON photos(pin_id, created_at, id)",
            [],
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    // ---------- Pins ----------

    /// Create a pin and commit it right away
    pub fn create_pin(&self, latitude: f64, longitude: f64) -> Result<Pin> {
        let now = Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO pins (latitude, longitude, page, created_at) VALUES (?1, ?2, 1, ?3)",
            params![latitude, longitude, now],
        )?;

        let id = PinId(self.conn.last_insert_rowid());
        info!(pin = %id, latitude, longitude, "Pin dropped");

        Ok(Pin {
            id,
            latitude,
            longitude,
            page: 1,
            created_at: now,
        })
    }

    /// Get a pin by id
    pub fn pin(&self, id: PinId) -> Result<Pin> {
        self.conn
            .query_row(
                "SELECT id, latitude, longitude, page, created_at FROM pins WHERE id = ?1",
                [id.0],
                pin_from_row,
            )
            .optional()?
            .ok_or(TouristError::PinNotFound(id))
    }

    /// Get all pins, oldest first
    pub fn all_pins(&self) -> Result<Vec<Pin>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, latitude, longitude, page, created_at FROM pins ORDER BY created_at, id",
        )?;
        let pins = stmt
            .query_map([], pin_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pins)
    }

    /// Find a pin by exact coordinates.
    ///
    /// Coordinates are not unique; when several pins share them the oldest wins.
    pub fn find_pin_at(&self, latitude: f64, longitude: f64) -> Result<Option<Pin>> {
        let pin = self
            .conn
            .query_row(
                "SELECT id, latitude, longitude, page, created_at FROM pins
                 WHERE latitude = ?1 AND longitude = ?2
                 ORDER BY created_at, id
                 LIMIT 1",
                params![latitude, longitude],
                pin_from_row,
            )
            .optional()?;
        Ok(pin)
    }

    /// Delete a pin together with all of its photos
    pub fn delete_pin(&self, id: PinId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM pins WHERE id = ?1", [id.0])?;
        if deleted == 0 {
            return Err(TouristError::PinNotFound(id));
        }
        info!(pin = %id, "Pin deleted");
        Ok(())
    }

    // ---------- Photos ----------

    /// Count the photos owned by a pin
    pub fn photo_count(&self, pin_id: PinId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM photos WHERE pin_id = ?1",
            [pin_id.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get a pin's photos in display order (creation time, then id)
    pub fn photos_for_pin(&self, pin_id: PinId) -> Result<Vec<Photo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pin_id, url, image, created_at FROM photos
             WHERE pin_id = ?1
             ORDER BY created_at, id",
        )?;
        let photos = stmt
            .query_map([pin_id.0], photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    /// Get a photo by id
    pub fn photo(&self, id: PhotoId) -> Result<Photo> {
        self.conn
            .query_row(
                "SELECT id, pin_id, url, image, created_at FROM photos WHERE id = ?1",
                [id.0],
                photo_from_row,
            )
            .optional()?
            .ok_or(TouristError::PhotoNotFound(id))
    }

    /// Store one page of search results as placeholder photos of a pin.
    ///
    /// All records are inserted in a single transaction so readers never
    /// observe a partial page. The pin is resolved inside the transaction.
    pub fn insert_page(&mut self, pin_id: PinId, urls: &[String]) -> Result<Vec<PhotoId>> {
        let tx = self.conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM pins WHERE id = ?1)",
            [pin_id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(TouristError::PinNotFound(pin_id));
        }

        let now = Utc::now().timestamp_millis();
        let placeholder = placeholder_bytes();
        let mut ids = Vec::with_capacity(urls.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO photos (pin_id, url, image, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for url in urls {
                stmt.execute(params![pin_id.0, url, placeholder, now])?;
                ids.push(PhotoId(tx.last_insert_rowid()));
            }
        }
        tx.commit()?;

        debug!(pin = %pin_id, count = ids.len(), "Page of placeholder photos stored");
        Ok(ids)
    }

    /// Drop every photo of a pin and advance its page counter, atomically.
    /// Returns the new page number.
    pub fn replace_collection(&mut self, pin_id: PinId) -> Result<u32> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute("UPDATE pins SET page = page + 1 WHERE id = ?1", [pin_id.0])?;
        if updated == 0 {
            return Err(TouristError::PinNotFound(pin_id));
        }
        let removed = tx.execute("DELETE FROM photos WHERE pin_id = ?1", [pin_id.0])?;
        let page: u32 = tx.query_row("SELECT page FROM pins WHERE id = ?1", [pin_id.0], |row| {
            row.get(0)
        })?;
        tx.commit()?;

        info!(pin = %pin_id, removed, page, "Collection cleared for next page");
        Ok(page)
    }

    /// Delete selected photos of a pin in one transaction.
    /// Ids that don't belong to the pin are ignored. Returns how many were removed.
    pub fn delete_photos(&mut self, pin_id: PinId, ids: &[PhotoId]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM photos WHERE id = ?1 AND pin_id = ?2")?;
            for id in ids {
                removed += stmt.execute(params![id.0, pin_id.0])?;
            }
        }
        tx.commit()?;

        debug!(pin = %pin_id, removed, "Selected photos deleted");
        Ok(removed)
    }

    /// Replace a photo's cached bytes with downloaded content
    pub fn set_photo_image(&self, id: PhotoId, image: &[u8]) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE photos SET image = ?1 WHERE id = ?2",
            params![image, id.0],
        )?;
        if updated == 0 {
            return Err(TouristError::PhotoNotFound(id));
        }
        Ok(())
    }

    // ---------- Settings ----------

    /// Persist the last viewed map region
    pub fn save_region(&mut self, region: &MapRegion) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )?;
            stmt.execute(params![CENTER_LATITUDE, region.center_latitude])?;
            stmt.execute(params![CENTER_LONGITUDE, region.center_longitude])?;
            stmt.execute(params![SPAN_LATITUDE, region.span_latitude])?;
            stmt.execute(params![SPAN_LONGITUDE, region.span_longitude])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Restore the last viewed map region, if all of it was saved
    pub fn load_region(&self) -> Result<Option<MapRegion>> {
        let get = |key: &str| -> Result<Option<f64>> {
            let value = self
                .conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        };

        match (
            get(CENTER_LATITUDE)?,
            get(CENTER_LONGITUDE)?,
            get(SPAN_LATITUDE)?,
            get(SPAN_LONGITUDE)?,
        ) {
            (Some(center_latitude), Some(center_longitude), Some(span_latitude), Some(span_longitude)) => {
                Ok(Some(MapRegion {
                    center_latitude,
                    center_longitude,
                    span_latitude,
                    span_longitude,
                }))
            }
            _ => Ok(None),
        }
    }
}

fn pin_from_row(row: &Row<'_>) -> rusqlite::Result<Pin> {
    Ok(Pin {
        id: PinId(row.get(0)?),
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        page: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: PhotoId(row.get(0)?),
        pin_id: PinId(row.get(1)?),
        url: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://live.staticflickr.com/{i}_s.jpg")).collect()
    }

    #[test]
    fn test_pin_round_trip_by_coordinate() {
        let library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(48.8584, 2.2945).unwrap();

        let found = library.find_pin_at(48.8584, 2.2945).unwrap().unwrap();
        assert_eq!(found, pin);
        assert_eq!(found.page, 1);
        assert!(library.find_pin_at(48.8584, 2.2946).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_coordinates_return_oldest() {
        let library = Library::open_in_memory().unwrap();
        let first = library.create_pin(10.0, 20.0).unwrap();
        let second = library.create_pin(10.0, 20.0).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(library.find_pin_at(10.0, 20.0).unwrap().unwrap().id, first.id);
        assert_eq!(library.all_pins().unwrap().len(), 2);
    }

    #[test]
    fn test_insert_page_uses_placeholder() {
        let mut library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(1.0, 2.0).unwrap();
        let refs = urls(3);

        let ids = library.insert_page(pin.id, &refs).unwrap();
        assert_eq!(ids.len(), 3);

        let photos = library.photos_for_pin(pin.id).unwrap();
        assert_eq!(photos.len(), 3);
        for (photo, url) in photos.iter().zip(&refs) {
            assert_eq!(&photo.url, url);
            assert_eq!(photo.pin_id, pin.id);
            assert_eq!(photo.image, placeholder_bytes());
            assert!(!photo.is_materialized());
        }
    }

    #[test]
    fn test_insert_page_for_missing_pin_stores_nothing() {
        let mut library = Library::open_in_memory().unwrap();
        let result = library.insert_page(PinId(42), &urls(2));
        assert!(matches!(result, Err(TouristError::PinNotFound(PinId(42)))));
    }

    #[test]
    fn test_replace_collection_is_atomic() {
        let mut library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(1.0, 2.0).unwrap();
        library.insert_page(pin.id, &urls(4)).unwrap();

        let page = library.replace_collection(pin.id).unwrap();
        assert_eq!(page, 2);
        assert_eq!(library.photo_count(pin.id).unwrap(), 0);
        assert_eq!(library.pin(pin.id).unwrap().page, 2);
    }

    #[test]
    fn test_replace_collection_missing_pin() {
        let mut library = Library::open_in_memory().unwrap();
        assert!(matches!(
            library.replace_collection(PinId(7)),
            Err(TouristError::PinNotFound(_))
        ));
    }

    #[test]
    fn test_delete_pin_cascades_to_photos() {
        let mut library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(1.0, 2.0).unwrap();
        let ids = library.insert_page(pin.id, &urls(2)).unwrap();

        library.delete_pin(pin.id).unwrap();
        assert!(matches!(library.pin(pin.id), Err(TouristError::PinNotFound(_))));
        assert!(matches!(library.photo(ids[0]), Err(TouristError::PhotoNotFound(_))));
    }

    #[test]
    fn test_delete_selected_photos_only_for_owner() {
        let mut library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(1.0, 2.0).unwrap();
        let other = library.create_pin(3.0, 4.0).unwrap();
        let ids = library.insert_page(pin.id, &urls(3)).unwrap();
        let other_ids = library.insert_page(other.id, &urls(1)).unwrap();

        let removed = library
            .delete_photos(pin.id, &[ids[0], ids[2], other_ids[0]])
            .unwrap();
        assert_eq!(removed, 2);

        let remaining: Vec<_> = library
            .photos_for_pin(pin.id)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(remaining, vec![ids[1]]);
        assert_eq!(library.photo_count(other.id).unwrap(), 1);
    }

    #[test]
    fn test_set_photo_image() {
        let mut library = Library::open_in_memory().unwrap();
        let pin = library.create_pin(1.0, 2.0).unwrap();
        let ids = library.insert_page(pin.id, &urls(1)).unwrap();

        library.set_photo_image(ids[0], b"real image").unwrap();
        let photo = library.photo(ids[0]).unwrap();
        assert_eq!(photo.image, b"real image");
        assert!(photo.is_materialized());

        assert!(library.set_photo_image(PhotoId(999), b"x").is_err());
    }

    #[test]
    fn test_region_round_trip() {
        let mut library = Library::open_in_memory().unwrap();
        assert!(library.load_region().unwrap().is_none());

        let region = MapRegion {
            center_latitude: 41.0082,
            center_longitude: 28.9784,
            span_latitude: 0.2,
            span_longitude: 0.3,
        };
        library.save_region(&region).unwrap();
        assert_eq!(library.load_region().unwrap(), Some(region));

        let moved = MapRegion {
            center_latitude: -33.8688,
            ..region
        };
        library.save_region(&moved).unwrap();
        assert_eq!(library.load_region().unwrap(), Some(moved));
    }

    #[test]
    fn test_reopen_file_keeps_pins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog").join("tourist.db");

        let pin = Library::open(&path).unwrap().create_pin(5.0, 6.0).unwrap();
        let reopened = Library::open(&path).unwrap();
        assert_eq!(reopened.pin(pin.id).unwrap(), pin);
        assert_eq!(reopened.path(), &path);
    }
}
