//! Per-image processing and batch dispatch.

use crate::blur::gaussian_blur;
use crate::dither::{dither, DitherMode};
use crate::gamma::{Gamma, Lut};
use crate::raster::Raster;
use crate::resample::{self, block_grid, Upscale};
use crate::transcode::{transcode, AlphaPolicy};
use crate::{HalftoneError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything that controls how an image is halftoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DitherConfig {
    /// Blocks across; 0 derives from `y_blocks` or keeps native width.
    pub x_blocks: u32,
    /// Blocks down; 0 derives from `x_blocks` or keeps native height.
    pub y_blocks: u32,
    pub seed: i64,
    /// Interpolate blocks back to full size instead of replicating them.
    pub smooth: bool,
    /// Emit one pixel per block.
    pub rescale_output: bool,
    /// Input gamma; 0.0 means sRGB.
    pub gamma: f64,
    /// Dither red, green and blue separately.
    pub color_dither: bool,
    /// Gaussian sigma of the final blur; 0.0 disables it.
    pub blur_radius: f64,
    pub alpha: AlphaPolicy,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self {
            x_blocks: 0,
            y_blocks: 0,
            seed: 0,
            smooth: false,
            rescale_output: false,
            gamma: 0.0,
            color_dither: false,
            blur_radius: 1.0,
            alpha: AlphaPolicy::PassThrough,
        }
    }
}

impl DitherConfig {
    /// Load a JSON config. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| HalftoneError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(HalftoneError::Config(format!(
                "gamma must be 0 (sRGB) or positive, got {}",
                self.gamma
            )));
        }
        if !self.blur_radius.is_finite() {
            return Err(HalftoneError::Config(format!(
                "blur radius must be finite, got {}",
                self.blur_radius
            )));
        }
        Ok(())
    }

    pub fn gamma_curve(&self) -> Gamma {
        Gamma::from_value(self.gamma)
    }

    pub fn dither_mode(&self) -> DitherMode {
        if self.color_dither {
            DitherMode::Color
        } else {
            DitherMode::Monochrome
        }
    }

    pub fn upscale(&self) -> Upscale {
        Upscale::from_flags(self.smooth, self.rescale_output)
    }

    /// Dimensions recorded in the output name: the block grid when blocks are
    /// set, otherwise the image size.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        block_grid(self.x_blocks, self.y_blocks, width, height).unwrap_or((width, height))
    }

    /// `<input>.<s|d><WWWW>x<HHHH>.tiff`, next to the input.
    pub fn output_path(&self, input: &Path, width: u32, height: u32) -> PathBuf {
        let kind = if self.smooth { 's' } else { 'd' };
        let (w, h) = self.output_size(width, height);
        let mut name = input.as_os_str().to_owned();
        name.push(format!(".{kind}{w:04}x{h:04}.tiff"));
        PathBuf::from(name)
    }
}

/// Outcome of one file in a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<PathBuf>,
}

/// A configured halftoning pipeline. Both lookup tables are built once and
/// shared read-only by every image the pipeline processes.
#[derive(Debug)]
pub struct Pipeline {
    config: DitherConfig,
    decode: Lut,
    encode: Lut,
}

impl Pipeline {
    pub fn new(config: DitherConfig) -> Result<Self> {
        config.validate()?;
        let decode = Lut::decode(config.gamma_curve());
        Ok(Self {
            config,
            decode,
            encode: Lut::encode(),
        })
    }

    pub fn config(&self) -> &DitherConfig {
        &self.config
    }

    /// Halftone a device-space raster. The result stays in linear light.
    pub fn process(&self, src: &Raster) -> Result<Raster> {
        let config = &self.config;
        let linear = transcode(src, &self.decode, config.alpha);
        let bounds = linear.bounds();
        let mode = config.dither_mode();

        let grid = block_grid(config.x_blocks, config.y_blocks, bounds.width(), bounds.height());
        let dithered = match grid {
            Some((w, h)) if !bounds.is_empty() => {
                let coarse = resample::downsample(&linear, w, h)?;
                let dots = dither(&coarse, config.seed, mode);
                resample::upscale(&dots, bounds, config.upscale())?
            }
            _ => dither(&linear, config.seed, mode),
        };
        tracing::debug!(
            width = dithered.width(),
            height = dithered.height(),
            format = ?dithered.format(),
            "dithered"
        );

        if config.blur_radius > 0.0 {
            Ok(gaussian_blur(&dithered, config.blur_radius))
        } else {
            Ok(dithered)
        }
    }

    /// Halftone and encode back to sRGB: the image that gets written.
    pub fn render(&self, src: &Raster) -> Result<Raster> {
        let processed = self.process(src)?;
        Ok(transcode(&processed, &self.encode, self.config.alpha))
    }

    /// Decode `input`, render it, and write a compressed 16-bit TIFF beside it.
    pub fn process_file(&self, input: &Path) -> Result<PathBuf> {
        let decoded = image::open(input)?;
        let src = Raster::from_dynamic(&decoded);
        tracing::debug!(
            input = %input.display(),
            width = src.width(),
            height = src.height(),
            "decoded"
        );

        let rendered = self.render(&src)?;
        let output = self.config.output_path(input, src.width(), src.height());
        rendered.write_tiff(&output)?;
        tracing::info!(input = %input.display(), output = %output.display(), "wrote");
        Ok(output)
    }

    /// Process files in parallel. A failing file is logged and reported in
    /// its outcome; the others still run to completion.
    pub fn process_batch(&self, inputs: &[PathBuf]) -> Vec<FileOutcome> {
        inputs
            .par_iter()
            .map(|input| {
                let result = self.process_file(input);
                if let Err(e) = &result {
                    tracing::error!(input = %input.display(), error = %e, "failed");
                }
                FileOutcome {
                    input: input.clone(),
                    result,
                }
            })
            .collect()
    }
}
