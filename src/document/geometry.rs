//! Page-to-device geometry
//!
//! Affine matrices use the row-vector convention of the rendering backend:
//! a point `(x, y)` maps to `(x*a + y*c + e, x*b + y*d + f)`, and
//! `m1.concat(&m2)` applies `m1` first.

/// Rule for deriving a zoom factor from a target viewport
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitPolicy {
    /// Whole page visible, no overflow in either dimension
    #[default]
    ContainWithinViewport,
    /// Page covers the viewport, overflowing in one dimension
    CoverViewport,
}

/// Target viewport in device pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 1000)
    }
}

/// Floating point rectangle in page or device space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Round outward to the smallest enclosing integer rectangle
    #[must_use]
    pub fn round_out(&self) -> IRect {
        IRect {
            x0: self.x0.floor() as i32,
            y0: self.y0.floor() as i32,
            x1: self.x1.ceil() as i32,
            y1: self.y1.ceil() as i32,
        }
    }
}

/// Integer pixel rectangle used as the rasterization clip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl IRect {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// 2D affine transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    #[must_use]
    pub const fn new_translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[must_use]
    pub const fn new_scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `degrees`; quarter turns are exact.
    #[must_use]
    pub fn new_rotate(degrees: f32) -> Self {
        let degrees = normalize_degrees(degrees);
        let (sin, cos) = if degrees == 0.0 {
            (0.0, 1.0)
        } else if degrees == 90.0 {
            (1.0, 0.0)
        } else if degrees == 180.0 {
            (0.0, -1.0)
        } else if degrees == 270.0 {
            (-1.0, 0.0)
        } else {
            degrees.to_radians().sin_cos()
        };
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Compose `self` followed by `next`.
    #[must_use]
    pub fn concat(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }
}

/// Normalize an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

/// Integer variant used for session rotation state.
pub fn normalize_rotation(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

/// Zoom factor satisfying `fit` for a page inside a viewport.
///
/// Degenerate sizes (zero, negative or non-finite) fall back to 1.0.
pub fn compute_fit_zoom(
    page_width: f32,
    page_height: f32,
    viewport_width: f32,
    viewport_height: f32,
    fit: FitPolicy,
) -> f32 {
    let sizes = [page_width, page_height, viewport_width, viewport_height];
    if sizes.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return 1.0;
    }

    let page_aspect = page_height / page_width;
    let viewport_aspect = viewport_height / viewport_width;
    let viewport_is_wider = viewport_aspect < page_aspect;

    match fit {
        FitPolicy::CoverViewport => {
            if viewport_is_wider {
                viewport_width / page_width
            } else {
                viewport_height / page_height
            }
        }
        FitPolicy::ContainWithinViewport => {
            if viewport_is_wider {
                viewport_height / page_height
            } else {
                viewport_width / page_width
            }
        }
    }
}

/// Page-to-device transform: anchor the page top, flip the vertical axis
/// while scaling, then rotate.
pub fn compose_page_to_device(page_top_y: f32, zoom: f32, rotation_degrees: f32) -> Matrix {
    Matrix::IDENTITY
        .concat(&Matrix::new_translate(0.0, -page_top_y))
        .concat(&Matrix::new_scale(zoom, -zoom))
        .concat(&Matrix::new_rotate(rotation_degrees))
}

/// Axis-aligned bounding box of `rect` after `matrix`.
pub fn transform_bounds(matrix: &Matrix, rect: &Rect) -> Rect {
    let corners = [
        matrix.transform_point(rect.x0, rect.y0),
        matrix.transform_point(rect.x1, rect.y0),
        matrix.transform_point(rect.x0, rect.y1),
        matrix.transform_point(rect.x1, rect.y1),
    ];

    let mut out = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for (x, y) in corners {
        out.x0 = out.x0.min(x);
        out.y0 = out.y0.min(y);
        out.x1 = out.x1.max(x);
        out.y1 = out.y1.max(y);
    }
    out
}

/// Page extent once the view rotation is applied, at zoom 1.
pub fn rotated_extent(mediabox: &Rect, rotation_degrees: f32) -> (f32, f32) {
    let matrix = compose_page_to_device(mediabox.y1, 1.0, rotation_degrees);
    let bounds = transform_bounds(&matrix, mediabox);
    (bounds.width(), bounds.height())
}
