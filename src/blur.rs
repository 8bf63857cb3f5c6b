//! Fast approximate Gaussian blur.
//!
//! Three successive box blurs whose widths are chosen so the cascade has the
//! variance of the requested Gaussian (after Ivan Kuzmichev,
//! <http://blog.ivank.net/fastest-gaussian-blur.html>). Each box blur is a
//! horizontal sliding-window pass over rows followed by a vertical one over
//! columns, so the cost per pixel does not depend on the radius.
//!
//! Samples outside the image repeat the nearest edge sample. Alpha is not
//! blurred: every output pixel keeps the alpha of the input pixel at the same
//! position.

use crate::raster::{PixelFormat, Raster};
use rayon::prelude::*;

/// Number of cascaded boxes.
pub const PASSES: usize = 3;

/// Widest box considered. Any window at least as wide as the line already
/// averages the whole line, so larger widths change nothing but the sums.
const MAX_BOX_WIDTH: usize = (1 << 30) - 1;

/// Box widths (odd) whose cascade approximates a Gaussian of std-dev `sigma`.
pub fn boxes_for_gauss(sigma: f64, n: usize) -> Vec<usize> {
    let n_f = n as f64;
    let w_ideal = (12.0 * sigma * sigma / n_f + 1.0).sqrt();
    let mut wl = w_ideal.floor().clamp(1.0, MAX_BOX_WIDTH as f64) as usize;
    if wl % 2 == 0 {
        wl -= 1;
    }
    let wu = wl + 2;

    let wl_f = wl as f64;
    let m_ideal = (12.0 * sigma * sigma - n_f * wl_f * wl_f - 4.0 * n_f * wl_f - 3.0 * n_f)
        / (-4.0 * wl_f - 4.0);
    let m = m_ideal.round().clamp(0.0, n_f) as usize;

    (0..n).map(|i| if i < m { wl } else { wu }).collect()
}

/// Running color sums of one sliding window.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: [f64; 3],
}

impl Accumulator {
    fn of(pixel: &[u16]) -> Self {
        let mut acc = Self::default();
        acc.add_pixel(pixel);
        acc
    }

    fn times(mut self, k: f64) -> Self {
        self.sum.iter_mut().for_each(|s| *s *= k);
        self
    }

    // Zipping against `sum` visits the color samples only; alpha never enters.
    #[inline]
    fn add_pixel(&mut self, pixel: &[u16]) {
        for (s, &v) in self.sum.iter_mut().zip(pixel) {
            *s += v as f64;
        }
    }

    #[inline]
    fn sub_pixel(&mut self, pixel: &[u16]) {
        for (s, &v) in self.sum.iter_mut().zip(pixel) {
            *s -= v as f64;
        }
    }

    #[inline]
    fn add(&mut self, other: &Accumulator) {
        for (s, v) in self.sum.iter_mut().zip(other.sum) {
            *s += v;
        }
    }

    #[inline]
    fn sub(&mut self, other: &Accumulator) {
        for (s, v) in self.sum.iter_mut().zip(other.sum) {
            *s -= v;
        }
    }

    #[inline]
    fn write(&self, dst: &mut [u16], scale: f64) {
        for (d, s) in dst.iter_mut().zip(self.sum) {
            *d = (s * scale).round().clamp(0.0, u16::MAX as f64) as u16;
        }
    }
}

/// Box-blur one row or column of `len` pixels into the packed buffer `out`.
///
/// `at(i)` returns the samples of pixel `i` of the line.
fn blur_line<'a>(
    len: usize,
    format: PixelFormat,
    r: usize,
    at: impl Fn(usize) -> &'a [u16],
    out: &mut [u16],
) {
    if len == 0 {
        return;
    }
    let channels = format.channels();
    let color = format.color_channels();
    let scale = 1.0 / (2 * r + 1) as f64;
    let emit = |i: usize, acc: &Accumulator, out: &mut [u16]| {
        let dst = &mut out[i * channels..(i + 1) * channels];
        acc.write(&mut dst[..color], scale);
        if let Some(a) = format.alpha_index() {
            dst[a] = at(i)[a];
        }
    };

    if len > 2 * r {
        let first = Accumulator::of(at(0));
        let last = Accumulator::of(at(len - 1));
        let mut acc = first.times((r + 1) as f64);
        for i in 0..r {
            acc.add_pixel(at(i));
        }
        for i in 0..=r {
            acc.add_pixel(at(i + r));
            acc.sub(&first);
            emit(i, &acc, out);
        }
        for i in r + 1..len - r {
            acc.add_pixel(at(i + r));
            acc.sub_pixel(at(i - r - 1));
            emit(i, &acc, out);
        }
        for i in len - r..len {
            acc.add(&last);
            acc.sub_pixel(at(i - r - 1));
            emit(i, &acc, out);
        }
    } else {
        // Window wider than the line: clamp every index instead. The first
        // window is r copies of the first pixel, the line up to index r, and
        // whatever remains past the end as copies of the last pixel.
        let last = len as isize - 1;
        let clamped = |j: isize| at(j.clamp(0, last) as usize);
        let mut acc = Accumulator::of(at(0)).times(r as f64);
        for j in 0..len.min(r + 1) {
            acc.add_pixel(at(j));
        }
        if r + 1 > len {
            acc.add(&Accumulator::of(at(len - 1)).times((r + 1 - len) as f64));
        }
        let r = r as isize;
        for i in 0..len {
            emit(i, &acc, out);
            let i = i as isize;
            acc.add_pixel(clamped(i + r + 1));
            acc.sub_pixel(clamped(i - r));
        }
    }
}

fn blur_horizontal(src: &Raster, r: usize) -> Raster {
    let format = src.format();
    let channels = format.channels();
    let width = src.width() as usize;
    let row_len = src.row_len();
    let mut out = Raster::new(src.bounds(), format);

    out.samples_mut()
        .par_chunks_mut(row_len)
        .zip(src.samples().par_chunks(row_len))
        .for_each(|(dst, line)| {
            let at = move |i: usize| &line[i * channels..(i + 1) * channels];
            blur_line(width, format, r, at, dst);
        });

    out
}

fn blur_vertical(src: &Raster, r: usize) -> Raster {
    let format = src.format();
    let channels = format.channels();
    let (width, height) = (src.width() as usize, src.height() as usize);
    let samples = src.samples();

    let columns: Vec<Vec<u16>> = (0..width)
        .into_par_iter()
        .map(|x| {
            let mut column = vec![0u16; height * channels];
            blur_line(
                height,
                format,
                r,
                move |i| {
                    let start = (i * width + x) * channels;
                    &samples[start..start + channels]
                },
                &mut column,
            );
            column
        })
        .collect();

    let mut out = Raster::new(src.bounds(), format);
    let dst = out.samples_mut();
    for (x, column) in columns.iter().enumerate() {
        for (y, pixel) in column.chunks_exact(channels).enumerate() {
            let start = (y * width + x) * channels;
            dst[start..start + channels].copy_from_slice(pixel);
        }
    }
    out
}

/// One separable box blur of radius `r` (window `2r + 1`).
pub fn box_blur(src: &Raster, r: usize) -> Raster {
    if src.bounds().is_empty() {
        return src.clone();
    }
    blur_vertical(&blur_horizontal(src, r), r)
}

/// Approximate Gaussian blur with standard deviation `sigma`.
///
/// A non-positive or non-finite `sigma` returns a copy of the input.
pub fn gaussian_blur(src: &Raster, sigma: f64) -> Raster {
    if !(sigma.is_finite() && sigma > 0.0) {
        return src.clone();
    }
    let boxes = boxes_for_gauss(sigma, PASSES);
    tracing::debug!(sigma, ?boxes, "gaussian blur");

    let mut out = src.clone();
    for width in boxes {
        out = box_blur(&out, (width - 1) / 2);
    }
    out
}
