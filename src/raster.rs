//! 16-bit raster images with explicit bounds.
//!
//! Every pipeline stage reads a [`Raster`] and allocates a fresh one for its
//! output. Samples are stored interleaved, row-major, one `u16` per channel.

use crate::{HalftoneError, Result};
use image::{DynamicImage, ImageBuffer, Luma, Rgba};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, Compression, DeflateLevel, Predictor, TiffEncoder};

/// Fully opaque alpha / full-scale sample.
pub const MAX_SAMPLE: u16 = u16::MAX;

/// Half-open integer rectangle `[min, max)`. The origin need not be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    /// Build bounds from corners. Inverted corners collapse to an empty rectangle.
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    /// Bounds anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Same size, moved so the top-left corner is at `(x, y)`.
    pub fn at(self, x: i32, y: i32) -> Self {
        Self::new(x, y, x + self.width() as i32, y + self.height() as i32)
    }

    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

/// Channel layout of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One luminance sample per pixel.
    Gray,
    /// Red, green, blue, alpha.
    Rgba,
}

impl PixelFormat {
    /// Samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgba => 4,
        }
    }

    /// Samples per pixel that carry light intensity (everything but alpha).
    pub fn color_channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgba => 3,
        }
    }

    /// Index of the alpha sample within a pixel, if any.
    pub fn alpha_index(self) -> Option<usize> {
        match self {
            PixelFormat::Gray => None,
            PixelFormat::Rgba => Some(3),
        }
    }
}

/// Luminance of a 16-bit RGB triple, using the integer ITU-R 601 weights
/// `0.299, 0.587, 0.114` scaled by 65536 with rounding.
#[inline]
pub fn luminance(r: u16, g: u16, b: u16) -> u16 {
    ((19595 * r as u32 + 38470 * g as u32 + 7471 * b as u32 + (1 << 15)) >> 16) as u16
}

/// A rectangular grid of 16-bit pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    bounds: Bounds,
    format: PixelFormat,
    samples: Vec<u16>,
}

impl Raster {
    /// All-zero raster (black, and transparent for RGBA).
    pub fn new(bounds: Bounds, format: PixelFormat) -> Self {
        let len = bounds.width() as usize * bounds.height() as usize * format.channels();
        Self {
            bounds,
            format,
            samples: vec![0; len],
        }
    }

    /// Raster where every pixel equals `pixel`.
    ///
    /// # Panics
    /// Panics if `pixel.len()` differs from the format's channel count.
    pub fn filled(bounds: Bounds, format: PixelFormat, pixel: &[u16]) -> Self {
        assert_eq!(pixel.len(), format.channels(), "pixel has wrong channel count");
        let count = bounds.width() as usize * bounds.height() as usize;
        let mut samples = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            samples.extend_from_slice(pixel);
        }
        Self {
            bounds,
            format,
            samples,
        }
    }

    /// Wrap an existing interleaved sample buffer.
    pub fn from_samples(bounds: Bounds, format: PixelFormat, samples: Vec<u16>) -> Result<Self> {
        let expected = bounds.width() as usize * bounds.height() as usize * format.channels();
        if samples.len() != expected {
            return Err(HalftoneError::Raster(format!(
                "{}x{} {:?} raster needs {} samples, got {}",
                bounds.width(),
                bounds.height(),
                format,
                expected,
                samples.len()
            )));
        }
        Ok(Self {
            bounds,
            format,
            samples,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.bounds.width()
    }

    pub fn height(&self) -> u32 {
        self.bounds.height()
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u16] {
        &mut self.samples
    }

    /// Samples in one row.
    pub fn row_len(&self) -> usize {
        self.width() as usize * self.format.channels()
    }

    /// Same pixels, with the top-left corner moved to `(x, y)`.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.bounds = self.bounds.at(x, y);
        self
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        assert!(
            self.bounds.contains(x, y),
            "pixel ({x}, {y}) outside {:?}",
            self.bounds
        );
        let col = (x - self.bounds.min_x) as usize;
        let row = (y - self.bounds.min_y) as usize;
        (row * self.width() as usize + col) * self.format.channels()
    }

    /// Samples of the pixel at absolute coordinates `(x, y)`.
    pub fn pixel(&self, x: i32, y: i32) -> &[u16] {
        let start = self.offset(x, y);
        &self.samples[start..start + self.format.channels()]
    }

    pub fn pixel_mut(&mut self, x: i32, y: i32) -> &mut [u16] {
        let start = self.offset(x, y);
        let channels = self.format.channels();
        &mut self.samples[start..start + channels]
    }

    /// Pixel as RGBA. Gray expands to equal channels with opaque alpha.
    pub fn rgba(&self, x: i32, y: i32) -> [u16; 4] {
        match *self.pixel(x, y) {
            [v] => [v, v, v, MAX_SAMPLE],
            [r, g, b, a] => [r, g, b, a],
            _ => unreachable!("unsupported channel count"),
        }
    }

    /// Pixel as a single luminance sample.
    pub fn gray(&self, x: i32, y: i32) -> u16 {
        match *self.pixel(x, y) {
            [v] => v,
            [r, g, b, _] => luminance(r, g, b),
            _ => unreachable!("unsupported channel count"),
        }
    }

    /// Import a decoded image. Images with color or alpha become RGBA, the
    /// rest gray; 8-bit samples are widened to 16 bits.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let color = image.color();
        let bounds = Bounds::from_size(image.width(), image.height());
        if color.has_color() || color.has_alpha() {
            Self {
                bounds,
                format: PixelFormat::Rgba,
                samples: image.to_rgba16().into_raw(),
            }
        } else {
            Self {
                bounds,
                format: PixelFormat::Gray,
                samples: image.to_luma16().into_raw(),
            }
        }
    }

    /// Export for encoding or for `image::imageops`. The origin is dropped.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width(), self.height());
        let samples = self.samples.clone();
        let image = match self.format {
            PixelFormat::Gray => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, samples)
                .map(DynamicImage::ImageLuma16),
            PixelFormat::Rgba => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, samples)
                .map(DynamicImage::ImageRgba16),
        };
        image.ok_or_else(|| HalftoneError::Raster(format!("cannot export {w}x{h} raster")))
    }

    /// Write a 16-bit TIFF, Deflate-compressed with the horizontal
    /// differencing predictor.
    pub fn write_tiff(&self, path: &Path) -> Result<()> {
        let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?
            .with_compression(Compression::Deflate(DeflateLevel::Balanced))
            .with_predictor(Predictor::Horizontal);
        let (w, h) = (self.width(), self.height());
        match self.format {
            PixelFormat::Gray => encoder.write_image::<colortype::Gray16>(w, h, &self.samples)?,
            PixelFormat::Rgba => encoder.write_image::<colortype::RGBA16>(w, h, &self.samples)?,
        }
        Ok(())
    }
}
