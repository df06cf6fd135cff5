//! MuPDF binding of the backend traits

use std::path::Path;

use log::{debug, warn};
use mupdf::{Colorspace, Document, MetadataName, Page};

use super::backend::{Backend, BackendDocument, BackendPage};
use super::error::BackendError;
use super::geometry::{IRect, Matrix, Rect};
use super::outline::{OutlineGraph, OutlineId};
use super::pixels::{ChannelOrder, RenderedBuffer};

/// Opens documents through MuPDF
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfBackend;

impl Backend for MupdfBackend {
    type Document = MupdfDocument;

    fn open(&self, path: &Path) -> Result<MupdfDocument, BackendError> {
        let doc = Document::open(path.to_string_lossy().as_ref())?;
        Ok(MupdfDocument::new(doc))
    }

    fn repair(&self, path: &Path) -> Result<MupdfDocument, BackendError> {
        // Second attempt through an in-memory stream, with the file name as
        // the format hint. MuPDF reconstructs a broken xref while opening.
        let bytes = std::fs::read(path)
            .map_err(|e| BackendError::new(format!("Failed to read {}: {e}", path.display())))?;
        let magic = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "application/pdf".to_string());
        let doc = Document::from_bytes(&bytes, &magic)?;
        debug!("Repaired {path:?}");
        Ok(MupdfDocument::new(doc))
    }
}

pub struct MupdfDocument {
    doc: Document,
}

impl MupdfDocument {
    fn new(doc: Document) -> Self {
        Self { doc }
    }
}

impl BackendDocument for MupdfDocument {
    type Page = MupdfPage;
    /// 0-based page index
    type Destination = usize;

    fn needs_password(&self) -> bool {
        match self.doc.needs_password() {
            Ok(needs) => needs,
            Err(e) => {
                warn!("Cannot tell whether the document is encrypted, assuming not: {e}");
                false
            }
        }
    }

    fn authenticate(&mut self, password: &str) -> bool {
        match self.doc.authenticate(password) {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Authentication error: {e}");
                false
            }
        }
    }

    fn page_count(&self) -> Result<usize, BackendError> {
        let count = self.doc.page_count()?;
        Ok(count.max(0) as usize)
    }

    fn load_page(&self, page_number: usize) -> Result<MupdfPage, BackendError> {
        let index = page_number
            .checked_sub(1)
            .and_then(|i| i32::try_from(i).ok())
            .ok_or_else(|| BackendError::new(format!("Invalid page number {page_number}")))?;
        let page = self.doc.load_page(index)?;
        Ok(MupdfPage { page })
    }

    fn load_outline(&self) -> Option<OutlineGraph<usize>> {
        let outlines = match self.doc.outlines() {
            Ok(outlines) => outlines,
            Err(e) => {
                warn!("Could not load outline: {e}");
                return None;
            }
        };
        if outlines.is_empty() {
            return None;
        }
        Some(link_outlines(&outlines))
    }

    fn resolve_page_number(&self, destination: &usize) -> Option<usize> {
        let count = self.page_count().ok()?;
        (*destination < count).then_some(destination + 1)
    }

    fn title(&self) -> Option<String> {
        self.doc
            .metadata(MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty())
    }
}

/// Re-link MuPDF's nested outline vectors as a first-child/next-sibling
/// graph without recursing.
fn link_outlines(outlines: &[mupdf::Outline]) -> OutlineGraph<usize> {
    let mut graph = OutlineGraph::new();
    let mut pending: Vec<(&[mupdf::Outline], Option<OutlineId>)> = vec![(outlines, None)];

    while let Some((siblings, parent)) = pending.pop() {
        let mut prev: Option<OutlineId> = None;
        for outline in siblings {
            let destination = outline.dest.as_ref().map(|d| d.loc.page_number as usize);
            let id = graph.add(outline.title.trim(), destination);

            match (prev, parent) {
                (Some(prev), _) => graph.set_next(prev, id),
                (None, Some(parent)) => graph.set_child(parent, id),
                (None, None) => graph.set_first(id),
            }

            if !outline.down.is_empty() {
                pending.push((outline.down.as_slice(), Some(id)));
            }
            prev = Some(id);
        }
    }

    graph
}

pub struct MupdfPage {
    page: Page,
}

impl BackendPage for MupdfPage {
    fn bounds(&self) -> Result<Rect, BackendError> {
        // MuPDF reports bounds with the page /Rotate already applied, so the
        // intrinsic rotation stays at the trait default of 0.
        let b = self.page.bounds()?;
        Ok(Rect::new(b.x0, b.y0, b.x1, b.y1))
    }

    fn render(&self, transform: &Matrix, clip: IRect) -> Result<RenderedBuffer, BackendError> {
        // `transform` expects y-up page space. MuPDF pages are already y-down,
        // so mirror the bounds vertically first.
        let b = self.page.bounds()?;
        let flip = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, b.y0 + b.y1);
        let m = flip.concat(transform);
        let ctm = mupdf::Matrix::new(m.a, m.b, m.c, m.d, m.e, m.f);
        let bgr = Colorspace::device_bgr();
        let pixmap = self.page.to_pixmap(&ctm, &bgr, true, false)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        if width != clip.width() || height != clip.height() {
            warn!(
                "Pixmap {width}x{height} differs from clip {}x{}",
                clip.width(),
                clip.height()
            );
        }

        RenderedBuffer::new(
            width,
            height,
            pixmap.n() as usize,
            pixmap.stride() as usize,
            ChannelOrder::Bgra,
            pixmap.samples().to_vec(),
        )
        .map_err(|e| BackendError::new(e.to_string()))
    }
}
