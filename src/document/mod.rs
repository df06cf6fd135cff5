//! Document viewing: session lifecycle, page rendering and outline navigation

mod backend;
mod error;
mod geometry;
#[cfg(feature = "pdf")]
mod mupdf_backend;
mod outline;
mod pixels;
mod render;
mod session;

pub use backend::{Backend, BackendDocument, BackendPage};
pub use error::{BackendError, Result, ViewerError};
pub use geometry::*;
#[cfg(feature = "pdf")]
pub use mupdf_backend::{MupdfBackend, MupdfDocument, MupdfPage};
pub use outline::{
    NavigationEntry, NavigationRow, OutlineGraph, OutlineId, OutlineNode, ROOT_TITLE,
    build_navigation_tree,
};
pub use pixels::{ChannelOrder, RenderedBuffer, reorder_channels};
pub use session::{DocumentSession, MAX_ZOOM, MIN_ZOOM, OpenOptions};
