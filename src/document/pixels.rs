//! Rendered pixel buffers and channel order reconciliation

use image::RgbaImage;

use super::error::ViewerError;

/// Byte order of the four samples of a pixel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Renderer native order: blue, green, red, alpha
    Bgra,
    /// Consumer order: alpha, red, green, blue
    Argb,
}

impl ChannelOrder {
    fn swapped(self) -> Self {
        match self {
            ChannelOrder::Bgra => ChannelOrder::Argb,
            ChannelOrder::Argb => ChannelOrder::Bgra,
        }
    }
}

/// Rectangular grid of premultiplied pixel samples.
///
/// Geometry is validated on construction, so every row of `width` pixels
/// is guaranteed to lie inside `samples`.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedBuffer {
    width: u32,
    height: u32,
    channels: usize,
    stride: usize,
    order: ChannelOrder,
    samples: Vec<u8>,
}

impl std::fmt::Debug for RenderedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("stride", &self.stride)
            .field("order", &self.order)
            .field("samples_len", &self.samples.len())
            .finish()
    }
}

impl RenderedBuffer {
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        stride: usize,
        order: ChannelOrder,
        samples: Vec<u8>,
    ) -> Result<Self, ViewerError> {
        if channels < 4 {
            return Err(ViewerError::invalid_buffer(format!(
                "Unsupported pixel format: {channels} channels"
            )));
        }

        let row_bytes = (width as usize)
            .checked_mul(channels)
            .ok_or_else(|| ViewerError::invalid_buffer("Row size overflow"))?;
        if row_bytes > stride {
            return Err(ViewerError::invalid_buffer(format!(
                "Stride {stride} shorter than row of {row_bytes} bytes"
            )));
        }

        // The last row only needs its pixels, not the trailing padding.
        let required = match height {
            0 => 0,
            h => stride
                .checked_mul(h as usize - 1)
                .and_then(|v| v.checked_add(row_bytes))
                .ok_or_else(|| ViewerError::invalid_buffer("Buffer size overflow"))?,
        };
        if samples.len() < required {
            return Err(ViewerError::invalid_buffer(format!(
                "Buffer holds {} bytes, {width}x{height} needs {required}",
                samples.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            stride,
            order,
            samples,
        })
    }

    /// Tightly packed buffer (`stride == width * channels`)
    pub fn packed(
        width: u32,
        height: u32,
        order: ChannelOrder,
        samples: Vec<u8>,
    ) -> Result<Self, ViewerError> {
        Self::new(width, height, 4, width as usize * 4, order, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Pixel samples at `(x, y)`, if inside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y as usize * self.stride + x as usize * self.channels;
        self.samples.get(start..start + self.channels)
    }

    /// Convert premultiplied ARGB output into a straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, ViewerError> {
        if self.order != ChannelOrder::Argb {
            return Err(ViewerError::invalid_buffer(
                "Export expects alpha-red-green-blue samples",
            ));
        }

        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for row in self.rows() {
            for px in row.chunks_exact(self.channels) {
                let (a, r, g, b) = (px[0], px[1], px[2], px[3]);
                out.extend_from_slice(&[
                    unpremultiply(r, a),
                    unpremultiply(g, a),
                    unpremultiply(b, a),
                    a,
                ]);
            }
        }

        RgbaImage::from_raw(self.width, self.height, out)
            .ok_or_else(|| ViewerError::invalid_buffer("Image size mismatch"))
    }

    fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.width as usize * self.channels;
        (0..self.height as usize).filter_map(move |y| {
            let start = y * self.stride;
            self.samples.get(start..start + row_bytes)
        })
    }
}

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    match alpha {
        0 => 0,
        255 => channel,
        a => ((u16::from(channel) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8,
    }
}

/// Swap samples 0<->3 and 1<->2 of every pixel, in place.
///
/// Converts between blue-green-red-alpha and alpha-red-green-blue; applying
/// it twice restores the original bytes. Row padding is left untouched.
pub fn reorder_channels(buffer: &mut RenderedBuffer) {
    let n = buffer.channels;
    let row_bytes = buffer.width as usize * n;
    let stride = buffer.stride;

    for y in 0..buffer.height as usize {
        let start = y * stride;
        let Some(row) = buffer.samples.get_mut(start..start + row_bytes) else {
            break;
        };
        for px in row.chunks_exact_mut(n) {
            px.swap(0, 3);
            px.swap(1, 2);
        }
    }

    buffer.order = buffer.order.swapped();
}
