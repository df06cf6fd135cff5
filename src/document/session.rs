//! Document session lifecycle
//!
//! A session owns one opened document together with the single loaded
//! page, the single rendered buffer and the outline graph. Closing (or
//! dropping) the session releases them in that order before the document
//! itself.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::backend::{Backend, BackendDocument};
use super::error::{Result, ViewerError};
use super::geometry::{Rect, Viewport, normalize_rotation};
use super::outline::{NavigationEntry, OutlineGraph, build_navigation_tree};
use super::pixels::RenderedBuffer;

/// Smallest zoom factor a session accepts
pub const MIN_ZOOM: f32 = 0.1;
/// Largest zoom factor a session accepts
pub const MAX_ZOOM: f32 = 3.0;

/// Initial view state applied when a document is opened
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpenOptions {
    /// 1-based page, clamped into the document
    pub page: i64,
    pub zoom: f32,
    /// Degrees, normalized into `[0, 360)`
    pub rotation: i32,
    pub viewport: Viewport,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            page: 1,
            zoom: 1.0,
            rotation: 0,
            viewport: Viewport::default(),
        }
    }
}

/// The page currently held by a session
pub(super) struct LoadedPage<P> {
    pub number: usize,
    pub page: P,
    pub mediabox: Rect,
    pub rotation: i32,
}

/// Resources of an open session.
///
/// Field order is drop order: page, buffer, outline, then the document.
pub(super) struct OpenDocument<D: BackendDocument> {
    pub page: Option<LoadedPage<D::Page>>,
    pub buffer: Option<RenderedBuffer>,
    pub outline: Option<OutlineGraph<D::Destination>>,
    pub doc: D,
}

/// An opened document and its view state
pub struct DocumentSession<D: BackendDocument> {
    pub(super) path: PathBuf,
    pub(super) title: String,
    pub(super) page_count: usize,
    pub(super) current_page: usize,
    pub(super) zoom: f32,
    pub(super) rotation: i32,
    pub(super) viewport: Viewport,
    pub(super) state: Option<OpenDocument<D>>,
}

impl<D: BackendDocument> std::fmt::Debug for DocumentSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("path", &self.path)
            .field("title", &self.title)
            .field("page_count", &self.page_count)
            .field("current_page", &self.current_page)
            .field("zoom", &self.zoom)
            .field("rotation", &self.rotation)
            .field("open", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

impl<D: BackendDocument> DocumentSession<D> {
    /// Open a document.
    ///
    /// A document whose cross-reference table cannot be loaded gets one
    /// repair attempt. Encrypted documents need a non-empty password.
    pub fn open<B>(
        backend: &B,
        path: impl AsRef<Path>,
        password: Option<&str>,
        options: OpenOptions,
    ) -> Result<Self>
    where
        B: Backend<Document = D>,
    {
        let path = path.as_ref();
        let open_error = |source| ViewerError::Open {
            path: path.display().to_string(),
            source,
        };

        let mut doc = match backend.open(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "There was a problem with file {path:?} ({e}). It may be corrupted or \
                     generated by faulty software. Trying to repair the file."
                );
                backend.repair(path).map_err(open_error)?
            }
        };

        if doc.needs_password() {
            let Some(password) = password.filter(|p| !p.is_empty()) else {
                info!("{path:?} is encrypted and no password was supplied");
                return Err(ViewerError::AuthenticationRequired);
            };
            if !doc.authenticate(password) {
                warn!("Invalid password for {path:?}");
                return Err(ViewerError::AuthenticationFailed);
            }
            debug!("Authenticated {path:?}");
        }

        let page_count = doc.page_count().map_err(open_error)?;
        if page_count == 0 {
            return Err(open_error(super::error::BackendError::new(
                "Document has no pages",
            )));
        }

        let title = doc
            .title()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| file_title(path));

        let outline = doc.load_outline();
        if outline.is_none() {
            debug!("{path:?} has no outline");
        }

        info!("Opened {path:?}: \"{title}\", {page_count} pages");

        Ok(Self {
            path: path.to_path_buf(),
            title,
            page_count,
            current_page: clamp_page(options.page, page_count),
            zoom: clamp_zoom(options.zoom),
            rotation: normalize_rotation(options.rotation),
            viewport: options.viewport,
            state: Some(OpenDocument {
                page: None,
                buffer: None,
                outline,
                doc,
            }),
        })
    }

    pub(super) fn open_state(&self) -> Result<&OpenDocument<D>> {
        self.state.as_ref().ok_or(ViewerError::UseAfterClose)
    }

    pub(super) fn open_state_mut(&mut self) -> Result<&mut OpenDocument<D>> {
        self.state.as_mut().ok_or(ViewerError::UseAfterClose)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> Result<&str> {
        self.open_state()?;
        Ok(&self.title)
    }

    pub fn page_count(&self) -> Result<usize> {
        self.open_state()?;
        Ok(self.page_count)
    }

    pub fn current_page(&self) -> Result<usize> {
        self.open_state()?;
        Ok(self.current_page)
    }

    /// Move the page cursor; out-of-range input is clamped, not rejected.
    pub fn set_current_page(&mut self, page: i64) -> Result<usize> {
        self.open_state()?;
        self.current_page = clamp_page(page, self.page_count);
        Ok(self.current_page)
    }

    pub fn next_page(&mut self) -> Result<usize> {
        let page = self.current_page()? as i64 + 1;
        self.set_current_page(page)
    }

    pub fn previous_page(&mut self) -> Result<usize> {
        let page = self.current_page()? as i64 - 1;
        self.set_current_page(page)
    }

    /// Zoom used by [`render_page_at_zoom`](Self::render_page_at_zoom),
    /// always within `[MIN_ZOOM, MAX_ZOOM]`. A fit render stores its zoom
    /// here clamped; the fit render itself is not.
    pub fn zoom(&self) -> Result<f32> {
        self.open_state()?;
        Ok(self.zoom)
    }

    /// Set a fixed zoom factor, clamped into `[MIN_ZOOM, MAX_ZOOM]`
    pub fn set_zoom(&mut self, zoom: f32) -> Result<f32> {
        self.open_state()?;
        self.zoom = clamp_zoom(zoom);
        Ok(self.zoom)
    }

    pub fn rotation(&self) -> Result<i32> {
        self.open_state()?;
        Ok(self.rotation)
    }

    pub fn set_rotation(&mut self, degrees: i32) -> Result<i32> {
        self.open_state()?;
        self.rotation = normalize_rotation(degrees);
        Ok(self.rotation)
    }

    pub fn rotate_by(&mut self, delta: i32) -> Result<i32> {
        let rotation = self.rotation()?;
        self.set_rotation(rotation.wrapping_add(delta))
    }

    /// Viewport of the most recent render (or the opening viewport)
    pub fn viewport(&self) -> Result<Viewport> {
        self.open_state()?;
        Ok(self.viewport)
    }

    /// Page number currently loaded, if any
    pub fn loaded_page(&self) -> Result<Option<usize>> {
        Ok(self.open_state()?.page.as_ref().map(|p| p.number))
    }

    /// Most recently rendered buffer, if any
    pub fn current_buffer(&self) -> Result<Option<&RenderedBuffer>> {
        Ok(self.open_state()?.buffer.as_ref())
    }

    /// Build the navigation tree from the document outline.
    pub fn navigation_tree(&self) -> Result<NavigationEntry> {
        let state = self.open_state()?;
        let tree = build_navigation_tree(state.outline.as_ref(), |dest| {
            state.doc.resolve_page_number(dest)
        });
        debug!(
            "Navigation tree for {:?}: {} entries",
            self.path,
            tree.entry_count() - 1
        );
        Ok(tree)
    }

    /// Release page, buffer, outline and document, in that order.
    ///
    /// Closing an already closed session does nothing.
    pub fn close(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        drop(state.page.take());
        drop(state.buffer.take());
        drop(state.outline.take());
        drop(state);

        debug!("Closed {:?}", self.path);
    }
}

fn clamp_page(page: i64, page_count: usize) -> usize {
    let last = page_count.max(1) as i64;
    page.clamp(1, last) as usize
}

pub(super) fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// Display title derived from the file name
fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
