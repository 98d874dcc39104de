//! Virtual Tourist: drop pins on a map and browse a locally cached album of
//! Flickr photos taken around each one.

pub mod album;
pub mod config;
pub mod error;
pub mod flickr;
pub mod imaging;
pub mod state;

pub use config::TouristConfig;
pub use error::{Result, TouristError};
