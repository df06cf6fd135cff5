//! Page render pipeline: page (re)load, transform, rasterization and
//! channel reordering.

use log::debug;

use super::backend::{BackendDocument, BackendPage};
use super::error::{Result, ViewerError};
use super::geometry::{
    FitPolicy, Viewport, compose_page_to_device, compute_fit_zoom, normalize_rotation,
    rotated_extent, transform_bounds,
};
use super::pixels::{ChannelOrder, RenderedBuffer, reorder_channels};
use super::session::{DocumentSession, LoadedPage, OpenDocument, clamp_zoom};

/// How the zoom factor of a render is chosen
#[derive(Clone, Copy, Debug, PartialEq)]
enum Scale {
    Fit(Viewport, FitPolicy),
    Fixed(f32),
}

impl<D: BackendDocument> DocumentSession<D> {
    /// Render `page_number` (1-based) to fit `viewport` under `fit`.
    ///
    /// The page is only reloaded when it differs from the loaded one; the
    /// zoom is recomputed on every call. The returned buffer is in
    /// alpha-red-green-blue order and stays owned by the session until the
    /// next render or close.
    pub fn render_page(
        &mut self,
        page_number: usize,
        viewport: Viewport,
        fit: FitPolicy,
    ) -> Result<&RenderedBuffer> {
        self.render_with(page_number, Scale::Fit(viewport, fit))?;
        self.viewport = viewport;
        self.rendered()
    }

    /// Render the page under the cursor to fit `viewport`.
    pub fn render_current(&mut self, viewport: Viewport, fit: FitPolicy) -> Result<&RenderedBuffer> {
        let page = self.current_page()?;
        self.render_page(page, viewport, fit)
    }

    /// Render `page_number` at the session's fixed zoom factor.
    pub fn render_page_at_zoom(&mut self, page_number: usize) -> Result<&RenderedBuffer> {
        let zoom = self.zoom()?;
        self.render_with(page_number, Scale::Fixed(zoom))?;
        self.rendered()
    }

    fn rendered(&self) -> Result<&RenderedBuffer> {
        let state = self.open_state()?;
        let page = self.current_page;
        state
            .buffer
            .as_ref()
            .ok_or_else(|| ViewerError::render(page, "No buffer produced"))
    }

    fn render_with(&mut self, page_number: usize, scale: Scale) -> Result<()> {
        let page_count = self.page_count;
        let rotation = self.rotation;
        let state = self.open_state_mut()?;

        ensure_page_loaded(state, page_number, page_count)?;
        let zoom = rasterize(state, page_number, rotation, scale)?;

        if let Scale::Fit(..) = scale {
            self.zoom = clamp_zoom(zoom);
        }
        self.current_page = page_number;
        Ok(())
    }
}

/// Make `page_number` the loaded page, releasing the previous one first.
fn ensure_page_loaded<D: BackendDocument>(
    state: &mut OpenDocument<D>,
    page_number: usize,
    page_count: usize,
) -> Result<()> {
    if state.page.as_ref().is_some_and(|p| p.number == page_number) {
        return Ok(());
    }

    state.buffer = None;
    state.page = None;

    if page_number == 0 || page_number > page_count {
        return Err(ViewerError::page_load(
            page_number as i64,
            format!("Page out of range 1..={page_count}"),
        ));
    }

    state
        .doc
        .flush()
        .map_err(|e| ViewerError::page_load(page_number as i64, e.to_string()))?;

    let page = state
        .doc
        .load_page(page_number)
        .map_err(|e| ViewerError::page_load(page_number as i64, e.to_string()))?;
    let mediabox = page
        .bounds()
        .map_err(|e| ViewerError::page_load(page_number as i64, e.to_string()))?;
    let rotation = page.rotation();

    debug!("Loaded page {page_number}: mediabox {mediabox:?}, rotation {rotation}");

    state.page = Some(LoadedPage {
        number: page_number,
        page,
        mediabox,
        rotation,
    });
    Ok(())
}

/// Rasterize the loaded page into a fresh buffer. Returns the zoom used.
fn rasterize<D: BackendDocument>(
    state: &mut OpenDocument<D>,
    page_number: usize,
    view_rotation: i32,
    scale: Scale,
) -> Result<f32> {
    state.buffer = None;

    let Some(loaded) = state.page.as_ref() else {
        return Err(ViewerError::page_load(page_number as i64, "No page loaded"));
    };

    let rotation = normalize_rotation(view_rotation.wrapping_add(loaded.rotation)) as f32;
    let zoom = match scale {
        Scale::Fit(viewport, fit) => {
            let (page_width, page_height) = rotated_extent(&loaded.mediabox, rotation);
            compute_fit_zoom(
                page_width,
                page_height,
                viewport.width as f32,
                viewport.height as f32,
                fit,
            )
        }
        Scale::Fixed(zoom) => zoom,
    };

    let ctm = compose_page_to_device(loaded.mediabox.y1, zoom, rotation);
    let clip = transform_bounds(&ctm, &loaded.mediabox).round_out();
    if clip.is_empty() {
        return Err(ViewerError::render(page_number, format!("Empty page area {clip:?}")));
    }

    let mut buffer = loaded
        .page
        .render(&ctm, clip)
        .map_err(|e| ViewerError::render(page_number, e.to_string()))?;

    if buffer.channel_order() == ChannelOrder::Bgra {
        reorder_channels(&mut buffer);
    }

    debug!(
        "Rendered page {page_number} at zoom {zoom:.3}, rotation {rotation}: {}x{}",
        buffer.width(),
        buffer.height()
    );

    state.buffer = Some(buffer);
    Ok(zoom)
}
