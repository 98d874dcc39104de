//! Parsing of the `flickr.photos.search` response envelope.
//!
//! The envelope is walked by hand rather than deserialized into a struct so
//! that a bad body, a non-"ok" status and a missing key each produce their
//! own error.

use serde_json::Value;
use tracing::debug;

use super::{PhotoRef, SearchPage};
use crate::error::{Result, TouristError};

const STATUS_KEY: &str = "stat";
const OK_STATUS: &str = "ok";
const PHOTOS_KEY: &str = "photos";
const PHOTO_KEY: &str = "photo";
const SMALL_URL_KEY: &str = "url_s";

/// Parse a search response body into a page of photo references
pub fn parse_search_response(body: &[u8], page: u32) -> Result<SearchPage> {
    let value: Value = serde_json::from_slice(body)?;

    if value.get(STATUS_KEY).and_then(Value::as_str) != Some(OK_STATUS) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        let detail = match value.get("code").and_then(Value::as_i64) {
            Some(code) => format!("{message} (code {code})"),
            None => message.to_string(),
        };
        return Err(TouristError::Api(detail));
    }

    let photos = value
        .get(PHOTOS_KEY)
        .and_then(Value::as_object)
        .ok_or(TouristError::MissingKey(PHOTOS_KEY))?;

    let list = photos
        .get(PHOTO_KEY)
        .and_then(Value::as_array)
        .ok_or(TouristError::MissingKey(PHOTO_KEY))?;

    let refs: Vec<PhotoRef> = list
        .iter()
        .filter_map(|entry| {
            let url = entry.get(SMALL_URL_KEY).and_then(Value::as_str)?;
            Some(PhotoRef {
                url: url.to_string(),
                title: entry
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            })
        })
        .collect();

    if refs.len() < list.len() {
        debug!(
            skipped = list.len() - refs.len(),
            "Search results without a small URL were skipped"
        );
    }

    Ok(SearchPage {
        photos: refs,
        page,
        pages: photos.get("pages").and_then(number_or_string),
        total: photos.get("total").and_then(number_or_string),
    })
}

/// Flickr reports some counters as numbers and others as strings
fn number_or_string(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
