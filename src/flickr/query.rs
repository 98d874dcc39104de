//! Search query construction: bounding box and request parameters.

use std::fmt;

/// Half the width of the search box, in degrees of longitude
pub const SEARCH_BBOX_HALF_WIDTH: f64 = 1.0;
/// Half the height of the search box, in degrees of latitude
pub const SEARCH_BBOX_HALF_HEIGHT: f64 = 1.0;
/// Legal latitude range
pub const SEARCH_LAT_RANGE: (f64, f64) = (-90.0, 90.0);
/// Legal longitude range
pub const SEARCH_LON_RANGE: (f64, f64) = (-180.0, 180.0);

/// Number of photos requested per page
pub const PHOTOS_PER_PAGE: u32 = 21;

/// Flickr method used for searches
pub const SEARCH_METHOD: &str = "flickr.photos.search";

/// Extras value asking Flickr to include the small image URL
pub const SMALL_URL_EXTRA: &str = "url_s";

/// Rectangle used to scope a search, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Expand a point by the fixed half extents, clamped to legal coordinates
    pub fn around(latitude: f64, longitude: f64) -> Self {
        Self {
            min_lon: (longitude - SEARCH_BBOX_HALF_WIDTH).max(SEARCH_LON_RANGE.0),
            min_lat: (latitude - SEARCH_BBOX_HALF_HEIGHT).max(SEARCH_LAT_RANGE.0),
            max_lon: (longitude + SEARCH_BBOX_HALF_WIDTH).min(SEARCH_LON_RANGE.1),
            max_lat: (latitude + SEARCH_BBOX_HALF_HEIGHT).min(SEARCH_LAT_RANGE.1),
        }
    }
}

/// Rendered as Flickr's `bbox` parameter: `minLon,minLat,maxLon,maxLat`
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// One page request for the photos around a coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// 1-based result page
    pub page: u32,
}

impl SearchQuery {
    pub fn new(latitude: f64, longitude: f64, page: u32) -> Self {
        Self {
            latitude,
            longitude,
            page: page.max(1),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(self.latitude, self.longitude)
    }

    /// Query string parameters for `flickr.photos.search`
    pub fn to_params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        vec![
            ("method", SEARCH_METHOD.to_string()),
            ("api_key", api_key.to_string()),
            ("bbox", self.bounding_box().to_string()),
            ("safe_search", "1".to_string()),
            ("extras", SMALL_URL_EXTRA.to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
            ("per_page", PHOTOS_PER_PAGE.to_string()),
            ("page", self.page.to_string()),
        ]
    }
}
