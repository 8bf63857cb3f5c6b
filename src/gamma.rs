//! Gamma lookup tables between device-encoded and linear-light samples.
//!
//! Tables cover the full 16-bit sample space, so a conversion is a single
//! index operation instead of a `powf` per channel.

use std::ops::Index;

/// Number of entries in a lookup table: one per 16-bit sample value.
pub const LUT_SIZE: usize = 1 << 16;

/// Scale factor applied by the power-law decode curve.
pub const POWER_LAW_SCALE: f64 = 0.985;

const SRGB_OFFSET: f64 = 0.055;
const SRGB_EXPONENT: f64 = 2.4;
const SRGB_LINEAR_SLOPE: f64 = 12.92;
const SRGB_DECODE_KNEE: f64 = 0.04045;
const SRGB_ENCODE_KNEE: f64 = 0.003_130_8;

/// Transfer curve of the input device space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gamma {
    /// IEC 61966-2-1 piecewise curve.
    Srgb,
    /// `0.985 * x^g`.
    Power(f64),
}

impl Gamma {
    /// Interpret a numeric gamma where `0.0` selects sRGB.
    pub fn from_value(gamma: f64) -> Self {
        if gamma == 0.0 {
            Gamma::Srgb
        } else {
            Gamma::Power(gamma)
        }
    }

    /// Decode a normalized device value to normalized linear light.
    pub fn decode(self, v: f64) -> f64 {
        match self {
            Gamma::Srgb => srgb_decode(v),
            Gamma::Power(g) => POWER_LAW_SCALE * v.powf(g),
        }
    }
}

/// sRGB device value to linear light, both in `0.0..=1.0`.
pub fn srgb_decode(v: f64) -> f64 {
    if v <= SRGB_DECODE_KNEE {
        v / SRGB_LINEAR_SLOPE
    } else {
        ((v + SRGB_OFFSET) / (1.0 + SRGB_OFFSET)).powf(SRGB_EXPONENT)
    }
}

/// Linear light to sRGB device value, both in `0.0..=1.0`.
pub fn srgb_encode(l: f64) -> f64 {
    if l <= SRGB_ENCODE_KNEE {
        l * SRGB_LINEAR_SLOPE
    } else {
        (1.0 + SRGB_OFFSET) * l.powf(1.0 / SRGB_EXPONENT) - SRGB_OFFSET
    }
}

/// A 65536-entry sample-to-sample mapping.
#[derive(Clone, PartialEq, Eq)]
pub struct Lut {
    table: Box<[u16]>,
}

impl Lut {
    /// Tabulate `f` over normalized input, rounding and clamping the result.
    pub fn from_fn(f: impl Fn(f64) -> f64) -> Self {
        let table = (0..LUT_SIZE)
            .map(|i| {
                let out = f(i as f64 / u16::MAX as f64) * u16::MAX as f64;
                out.round().clamp(0.0, u16::MAX as f64) as u16
            })
            .collect();
        Self { table }
    }

    /// Device space to linear light for the given input curve.
    pub fn decode(gamma: Gamma) -> Self {
        Self::from_fn(|v| gamma.decode(v))
    }

    /// Linear light to sRGB device space. Output is always sRGB.
    pub fn encode() -> Self {
        Self::from_fn(srgb_encode)
    }
}

impl Index<u16> for Lut {
    type Output = u16;

    fn index(&self, sample: u16) -> &u16 {
        &self.table[sample as usize]
    }
}

impl std::fmt::Debug for Lut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lut")
            .field("first", &self.table[0])
            .field("mid", &self.table[LUT_SIZE / 2])
            .field("last", &self.table[LUT_SIZE - 1])
            .finish()
    }
}
