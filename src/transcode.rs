//! Per-sample table mapping between color representations.

use crate::gamma::Lut;
use crate::raster::Raster;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What the transcoder does with the alpha channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaPolicy {
    /// Alpha is coverage, not light: copy it unchanged.
    #[default]
    PassThrough,
    /// Map alpha through the table like the color channels.
    Lookup,
}

/// Map every color sample of `src` through `lut` into a new raster of the
/// same bounds and format.
pub fn transcode(src: &Raster, lut: &Lut, alpha: AlphaPolicy) -> Raster {
    let format = src.format();
    let channels = format.channels();
    let skip_alpha = match alpha {
        AlphaPolicy::PassThrough => format.alpha_index(),
        AlphaPolicy::Lookup => None,
    };

    let mut out = src.clone();
    let row_len = src.row_len().max(channels);
    out.samples_mut()
        .par_chunks_mut(row_len)
        .for_each(|row| {
            for pixel in row.chunks_exact_mut(channels) {
                for (c, s) in pixel.iter_mut().enumerate() {
                    if Some(c) != skip_alpha {
                        *s = lut[*s];
                    }
                }
            }
        });

    out
}
