/// Shared data structures for the catalog
///
/// These structs represent the data model that flows between
/// the database layer, the album protocol and whatever front end renders it.
/// Only the id newtypes are meant to cross task boundaries; records are
/// re-read from the store on whichever side needs them.

use std::fmt;

/// Database id of a pin (SQLite rowid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub i64);

/// Database id of a photo (SQLite rowid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(pub i64);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A user-placed map marker
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: PinId,
    pub latitude: f64,
    pub longitude: f64,
    /// Flickr result page currently shown for this pin (starts at 1)
    pub page: u32,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

/// One cached image belonging to a pin
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: PhotoId,
    pub pin_id: PinId,
    /// Remote image reference (Flickr `url_s`)
    pub url: String,
    /// Encoded image bytes: the placeholder until materialized
    pub image: Vec<u8>,
    /// Milliseconds since the Unix epoch; display order key
    pub created_at: i64,
}

impl Photo {
    /// True once the placeholder has been replaced by downloaded content
    pub fn is_materialized(&self) -> bool {
        !crate::imaging::placeholder::is_placeholder(&self.image)
    }
}

/// Last viewed map area, restored on next launch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub span_latitude: f64,
    pub span_longitude: f64,
}
