use reqwest::StatusCode;
use thiserror::Error;

use crate::state::data::{PhotoId, PinId};

/// Every failure the album cache can surface.
///
/// Network, decode and API failures are reported through the search and
/// download operations; the album session turns them into a user-facing
/// status instead of letting them escape.
#[derive(Error, Debug)]
pub enum TouristError {
    #[error("There was an error with your request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Your request returned a status code other than 2xx: {0}")]
    HttpStatus(StatusCode),

    #[error("Could not parse the data as JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Flickr API returned an error: {0}")]
    Api(String),

    #[error("Cannot find key '{0}' in the search response")]
    MissingKey(&'static str),

    #[error("Downloaded data is not a valid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("Download of photo {photo} failed: {reason}")]
    Download { photo: PhotoId, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pin {0} does not exist")]
    PinNotFound(PinId),

    #[error("Photo {0} does not exist")]
    PhotoNotFound(PhotoId),

    #[error("Photos are selected for removal; clear the selection first")]
    SelectionActive,

    #[error("Catalog lock poisoned by an earlier panic")]
    Poisoned,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, TouristError>;
