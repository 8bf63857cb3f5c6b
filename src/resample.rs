//! Block pixelation: shrink to a coarse grid of blocks, and bring the
//! dithered grid back to full size.

use crate::raster::{Bounds, PixelFormat, Raster};
use crate::{HalftoneError, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgba};

/// How the dithered coarse grid becomes the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upscale {
    /// Replicate each block: hard pixel edges.
    Nearest,
    /// Bicubic interpolation: soft, anti-aliased blocks.
    Smooth,
    /// Emit the coarse grid itself, one pixel per block.
    Coarse,
}

impl Upscale {
    /// Smoothing wins over coarse output; with neither, blocks are replicated.
    pub fn from_flags(smooth: bool, rescale_output: bool) -> Self {
        match (smooth, rescale_output) {
            (true, _) => Upscale::Smooth,
            (false, true) => Upscale::Coarse,
            (false, false) => Upscale::Nearest,
        }
    }
}

/// Size of the coarse grid, or `None` to work at native resolution.
///
/// A zero count on one axis is derived from the other so the aspect ratio is
/// kept, truncating toward zero (but never below one block).
pub fn block_grid(x_blocks: u32, y_blocks: u32, width: u32, height: u32) -> Option<(u32, u32)> {
    let derive = |given: u32, num: u32, den: u32| -> u32 {
        (given as u64 * num as u64 / den.max(1) as u64).clamp(1, u32::MAX as u64) as u32
    };
    match (x_blocks, y_blocks) {
        (0, 0) => None,
        (x, 0) => Some((x, derive(x, height, width))),
        (0, y) => Some((derive(y, width, height), y)),
        (x, y) => Some((x, y)),
    }
}

fn resize_with(src: &Raster, width: u32, height: u32, filter: FilterType) -> Result<Raster> {
    let (w, h) = (src.width(), src.height());
    let samples = src.samples().to_vec();
    let invalid = || HalftoneError::Raster(format!("cannot resample {w}x{h} raster"));
    let resized = match src.format() {
        PixelFormat::Gray => {
            let buf = ImageBuffer::<Luma<u16>, _>::from_raw(w, h, samples).ok_or_else(invalid)?;
            imageops::resize(&buf, width, height, filter).into_raw()
        }
        PixelFormat::Rgba => {
            let buf = ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, samples).ok_or_else(invalid)?;
            imageops::resize(&buf, width, height, filter).into_raw()
        }
    };
    Raster::from_samples(Bounds::from_size(width, height), src.format(), resized)
}

/// Shrink to `width x height` blocks with a 3-lobe Lanczos filter.
/// The coarse grid is anchored at the origin.
pub fn downsample(src: &Raster, width: u32, height: u32) -> Result<Raster> {
    tracing::debug!(
        src_width = src.width(),
        src_height = src.height(),
        width,
        height,
        "lanczos3 downsample"
    );
    resize_with(src, width, height, FilterType::Lanczos3)
}

/// Replicate each coarse pixel over the block of `bounds` it covers.
pub fn upsample_nearest(src: &Raster, bounds: Bounds) -> Raster {
    let (src_w, src_h) = (src.width() as u64, src.height() as u64);
    let (dst_w, dst_h) = (bounds.width() as u64, bounds.height() as u64);
    let origin = src.bounds();
    let mut out = Raster::new(bounds, src.format());
    if src_w == 0 || src_h == 0 {
        return out;
    }

    for y in 0..dst_h {
        let sy = origin.min_y + (y * src_h / dst_h) as i32;
        for x in 0..dst_w {
            let sx = origin.min_x + (x * src_w / dst_w) as i32;
            out.pixel_mut(bounds.min_x + x as i32, bounds.min_y + y as i32)
                .copy_from_slice(src.pixel(sx, sy));
        }
    }
    out
}

/// Bring a coarse grid back to `bounds` in the requested style.
pub fn upscale(src: &Raster, bounds: Bounds, mode: Upscale) -> Result<Raster> {
    match mode {
        Upscale::Coarse => Ok(src.clone()),
        Upscale::Nearest => Ok(upsample_nearest(src, bounds)),
        Upscale::Smooth => {
            let out = resize_with(src, bounds.width(), bounds.height(), FilterType::CatmullRom)?;
            Ok(out.with_origin(bounds.min_x, bounds.min_y))
        }
    }
}
