//! Streaming access to entries of compressed archives

mod error;
mod request;
mod stream;
mod zip_source;

pub use error::ArchiveError;
pub use request::entry_path_for_request;
pub use stream::{Archive, ArchiveEntryStream};
pub use zip_source::{ZipArchiveSource, ZipEntryReader};
