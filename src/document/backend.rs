//! Capability interface to a page-description library
//!
//! The session only talks to documents through these traits, so any
//! binding (MuPDF, a test double) can stand behind it.

use std::path::Path;

use super::error::BackendError;
use super::geometry::{IRect, Matrix, Rect};
use super::outline::OutlineGraph;
use super::pixels::RenderedBuffer;

/// Opens documents
pub trait Backend {
    type Document: BackendDocument;

    /// Open the container and load its cross-reference table
    fn open(&self, path: &Path) -> Result<Self::Document, BackendError>;

    /// Best-effort reconstruction of a damaged cross-reference table
    fn repair(&self, path: &Path) -> Result<Self::Document, BackendError>;
}

/// An opened document
pub trait BackendDocument {
    type Page: BackendPage;
    type Destination;

    fn needs_password(&self) -> bool;

    /// Returns true when `password` unlocks the document
    fn authenticate(&mut self, password: &str) -> bool;

    fn page_count(&self) -> Result<usize, BackendError>;

    /// Load a page by 1-based number
    fn load_page(&self, page_number: usize) -> Result<Self::Page, BackendError>;

    fn load_outline(&self) -> Option<OutlineGraph<Self::Destination>>;

    /// 1-based page number an outline destination points at
    fn resolve_page_number(&self, destination: &Self::Destination) -> Option<usize>;

    /// Title from the document information dictionary
    fn title(&self) -> Option<String> {
        None
    }

    /// Write back pending cross-reference changes before a page load
    fn flush(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// A loaded page
pub trait BackendPage {
    fn bounds(&self) -> Result<Rect, BackendError>;

    /// Intrinsic page rotation in degrees
    fn rotation(&self) -> i32 {
        0
    }

    /// Rasterize with `transform` into native BGRA samples.
    ///
    /// `clip` is the device-space box of the transformed page bounds, and
    /// the buffer is expected to match its size. Backends that size the
    /// raster themselves, such as MuPDF, treat it as advisory and report a
    /// mismatch.
    fn render(&self, transform: &Matrix, clip: IRect) -> Result<RenderedBuffer, BackendError>;
}
