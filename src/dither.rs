//! Random-threshold dithering of linear-light rasters to binary samples.
//!
//! No error is diffused between pixels: every sample is compared against an
//! independent draw from its row's [`RowRng`], so rows are processed in
//! parallel and the result does not depend on scheduling.

use crate::raster::{PixelFormat, Raster, MAX_SAMPLE};
use crate::rng::RowRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which samples get thresholded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DitherMode {
    /// Luminance only; output is a gray raster of black and white.
    #[default]
    Monochrome,
    /// Red, green and blue independently; alpha is kept.
    Color,
}

#[inline]
fn threshold(rng: &mut RowRng, sample: u16) -> u16 {
    if rng.next_threshold() < sample {
        MAX_SAMPLE
    } else {
        0
    }
}

/// Dither `src` with one generator per row derived from `seed`.
pub fn dither(src: &Raster, seed: i64, mode: DitherMode) -> Raster {
    match mode {
        DitherMode::Monochrome => dither_monochrome(src, seed),
        DitherMode::Color => dither_color(src, seed),
    }
}

/// One draw per pixel against its luminance.
pub fn dither_monochrome(src: &Raster, seed: i64) -> Raster {
    let bounds = src.bounds();
    let mut out = Raster::new(bounds, PixelFormat::Gray);
    let width = bounds.width() as usize;

    out.samples_mut()
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(row, line)| {
            let y = bounds.min_y + row as i32;
            let mut rng = RowRng::new(seed, y as i64);
            for (col, dst) in line.iter_mut().enumerate() {
                *dst = threshold(&mut rng, src.gray(bounds.min_x + col as i32, y));
            }
        });

    out
}

/// Three draws per pixel, consumed in R, G, B order.
pub fn dither_color(src: &Raster, seed: i64) -> Raster {
    let bounds = src.bounds();
    let mut out = Raster::new(bounds, PixelFormat::Rgba);
    let row_len = bounds.width() as usize * PixelFormat::Rgba.channels();

    out.samples_mut()
        .par_chunks_mut(row_len.max(1))
        .enumerate()
        .for_each(|(row, line)| {
            let y = bounds.min_y + row as i32;
            let mut rng = RowRng::new(seed, y as i64);
            for (col, dst) in line.chunks_exact_mut(4).enumerate() {
                let [r, g, b, a] = src.rgba(bounds.min_x + col as i32, y);
                dst[0] = threshold(&mut rng, r);
                dst[1] = threshold(&mut rng, g);
                dst[2] = threshold(&mut rng, b);
                dst[3] = a;
            }
        });

    out
}
