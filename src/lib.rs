pub mod archive;
pub mod document;
pub mod panic_handler;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::{Archive, ArchiveEntryStream, ArchiveError, ZipArchiveSource};
pub use document::{
    DocumentSession, FitPolicy, NavigationEntry, RenderedBuffer, ViewerError, Viewport,
};
