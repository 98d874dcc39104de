/// State management module
///
/// This module handles all persisted state, including:
/// - The SQLite catalog of pins and photos (library.rs)
/// - Shared data structures (data.rs)
/// - The serialized, thread-safe handle used by background work (store.rs)

pub mod data;
pub mod library;
pub mod store;

pub use data::{MapRegion, Photo, PhotoId, Pin, PinId};
pub use library::Library;
pub use store::Store;
