//! Gamma-correct stochastic halftoning.
//!
//! Images are decoded to linear light, dithered against per-row random
//! thresholds (optionally on a coarse grid of blocks), optionally blurred,
//! and encoded back to sRGB.

pub mod blur;
pub mod dither;
pub mod gamma;
pub mod pipeline;
pub mod raster;
pub mod resample;
pub mod rng;
pub mod transcode;

pub use dither::DitherMode;
pub use gamma::{Gamma, Lut};
pub use pipeline::{DitherConfig, FileOutcome, Pipeline};
pub use raster::{Bounds, PixelFormat, Raster};
pub use transcode::AlphaPolicy;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HalftoneError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Raster error: {0}")]
    Raster(String),
}

pub type Result<T> = std::result::Result<T, HalftoneError>;
