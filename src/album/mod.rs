/// Photo album for a single pin
///
/// This module handles:
/// - Fetching result pages and replacing them with the next page (pager.rs)
/// - Downloading placeholder photos on demand, once per photo (materialize.rs)
/// - Reporting grid changes as batches (changes.rs)
/// - Recyclable cell state and its stale-completion guard (cell.rs)
/// - The album screen state tying it all together (session.rs)

pub mod cell;
pub mod changes;
pub mod materialize;
pub mod pager;
pub mod session;

pub use cell::{CellBinding, CellContent, PhotoCell};
pub use changes::{AlbumQuery, Change, ChangeBatch, ChangeBuffer};
pub use materialize::Materializer;
pub use pager::{PageOutcome, PhotoPager};
pub use session::{AlbumSession, AlbumStatus, NO_IMAGES_MESSAGE};
