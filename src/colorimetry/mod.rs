pub mod chromaticity;
pub mod colorimeter;
pub mod cri;
pub mod illuminant;
pub mod rgb;
pub mod tristimulus;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

pub use chromaticity::{CctMethod, correlated_color_temperature};
pub use illuminant::{IlluminantKind, ReferenceIlluminant};
pub use tristimulus::{SwatchIntegrator, tristimulus};

/// Denominators smaller than this are treated as zero.
pub(crate) const DEGENERATE_EPSILON: f64 = 1e-12;

pub(crate) fn nonzero(quantity: &'static str, value: f64) -> AnalysisResult<f64> {
    if value.abs() < DEGENERATE_EPSILON || !value.is_finite() {
        Err(AnalysisError::degenerate(quantity, value))
    } else {
        Ok(value)
    }
}

/// Relative size below which a sum counts as cancelled against its terms.
pub(crate) const CANCELLATION_EPSILON: f64 = 1e-12;

/// Rejects a sum that vanishes relative to `magnitude`, the sum of the
/// absolute values of its terms. Unlike [`nonzero`] this is independent of
/// the overall scale of the input.
pub(crate) fn nonvanishing(
    quantity: &'static str,
    value: f64,
    magnitude: f64,
) -> AnalysisResult<f64> {
    if !value.is_finite() || value == 0.0 || value.abs() <= CANCELLATION_EPSILON * magnitude {
        Err(AnalysisError::degenerate(quantity, value))
    } else {
        Ok(value)
    }
}

/// CIE 1931 tristimulus values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn sum(&self) -> f64 {
        self.x + self.y + self.z
    }

    /// CIE 1931 (x, y).
    pub fn chromaticity(&self) -> AnalysisResult<Chromaticity> {
        let magnitude = self.x.abs() + self.y.abs() + self.z.abs();
        let s = nonvanishing("X + Y + Z", self.sum(), magnitude)?;
        Ok(Chromaticity {
            x: self.x / s,
            y: self.y / s,
        })
    }

    /// `X + 15Y + 3Z`, shared by the 1960 and 1976 UCS.
    pub(crate) fn ucs_denominator(&self) -> AnalysisResult<f64> {
        let magnitude = self.x.abs() + 15.0 * self.y.abs() + 3.0 * self.z.abs();
        nonvanishing(
            "X + 15Y + 3Z",
            self.x + 15.0 * self.y + 3.0 * self.z,
            magnitude,
        )
    }

    /// CIE 1960 (u, v), computed directly from XYZ.
    pub fn uv(&self) -> AnalysisResult<Uv> {
        let d = self.ucs_denominator()?;
        Ok(Uv {
            u: 4.0 * self.x / d,
            v: 6.0 * self.y / d,
        })
    }
}

/// CIE 1931 chromaticity coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// CIE 1960 UCS coordinates.
    pub fn uv(&self) -> AnalysisResult<Uv> {
        let d = nonzero("12y - 2x + 3", 12.0 * self.y - 2.0 * self.x + 3.0)?;
        Ok(Uv {
            u: 4.0 * self.x / d,
            v: 6.0 * self.y / d,
        })
    }

    /// Tristimulus values with the given luminance.
    pub fn to_xyz(&self, luminance: f64) -> AnalysisResult<Xyz> {
        let y = nonzero("chromaticity y", self.y)?;
        Ok(Xyz {
            x: luminance * self.x / y,
            y: luminance,
            z: luminance * (1.0 - self.x - self.y) / y,
        })
    }
}

/// CIE 1960 UCS coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}
