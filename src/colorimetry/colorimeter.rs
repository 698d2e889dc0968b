use colorimetry_data::Spectrum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::{Band, ReshapedSpectrum};
use crate::resample::reshape;
use crate::tables::ReferenceTables;

use super::illuminant::daylight;
use super::rgb::{ChromaticAdaptation, Rgb};
use super::{Chromaticity, SwatchIntegrator, Xyz, nonzero};

/// CIE constants for the L* cube-root branch, ε = (6/29)³ and κ = (29/3)³
/// as rounded in CIE 15.
const EPSILON: f64 = 0.008856;
const KAPPA: f64 = 903.3;

/// Reference intensities below this are treated as this value.
pub const REFERENCE_FLOOR: f64 = 0.1;

/// Correlated color temperature of D65 on the current temperature scale.
const D65_CCT_K: f64 = 6504.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum StandardIlluminant {
    /// Equal-energy illuminant.
    #[default]
    #[strum(serialize = "E")]
    E,
    #[strum(serialize = "D65")]
    D65,
}

impl StandardIlluminant {
    pub fn spd(self, band: Band, tables: &ReferenceTables) -> AnalysisResult<ReshapedSpectrum> {
        match self {
            StandardIlluminant::E => {
                band.validate()?;
                Ok(ReshapedSpectrum::from_fn(band, |_| 1.0))
            }
            StandardIlluminant::D65 => daylight(band, D65_CCT_K, tables),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyy {
    pub x: f64,
    pub y: f64,
    pub luminance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Luv {
    pub l: f64,
    pub u: f64,
    pub v: f64,
}

/// Cylindrical form of a Lab or Luv color, hue in degrees `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Lch {
    fn from_cartesian(l: f64, a: f64, b: f64) -> Self {
        Self {
            l,
            c: a.hypot(b),
            h: b.atan2(a).to_degrees().rem_euclid(360.0),
        }
    }
}

fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

impl Lab {
    pub fn from_xyz(xyz: Xyz, white: Xyz) -> AnalysisResult<Self> {
        let fx = lab_f(xyz.x / nonzero("white X", white.x)?);
        let fy = lab_f(xyz.y / nonzero("white Y", white.y)?);
        let fz = lab_f(xyz.z / nonzero("white Z", white.z)?);
        Ok(Self {
            l: 116.0 * fy - 16.0,
            a: 500.0 * (fx - fy),
            b: 200.0 * (fy - fz),
        })
    }

    pub fn lch(&self) -> Lch {
        Lch::from_cartesian(self.l, self.a, self.b)
    }
}

/// CIE 1976 (u', v').
fn uv_prime(xyz: Xyz) -> AnalysisResult<(f64, f64)> {
    let d = xyz.ucs_denominator()?;
    Ok((4.0 * xyz.x / d, 9.0 * xyz.y / d))
}

impl Luv {
    pub fn from_xyz(xyz: Xyz, white: Xyz) -> AnalysisResult<Self> {
        let yr = xyz.y / nonzero("white Y", white.y)?;
        let l = if yr > EPSILON {
            116.0 * yr.cbrt() - 16.0
        } else {
            KAPPA * yr
        };
        let (u, v) = uv_prime(xyz)?;
        let (un, vn) = uv_prime(white)?;
        Ok(Self {
            l,
            u: 13.0 * l * (u - un),
            v: 13.0 * l * (v - vn),
        })
    }

    pub fn lch(&self) -> Lch {
        Lch::from_cartesian(self.l, self.u, self.v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorimeterReading {
    pub illuminant: StandardIlluminant,
    pub white: Xyz,
    pub xyz: Xyz,
    pub xyy: Xyy,
    pub lab: Lab,
    pub lch_ab: Lch,
    pub luv: Luv,
    pub lch_uv: Lch,
    pub adaptation: ChromaticAdaptation,
    pub srgb: Rgb,
}

/// Color of a sample measured against a reference (white standard or empty
/// cuvette) under a standard illuminant.
#[derive(Debug, Clone)]
pub struct Colorimeter<'a> {
    tables: &'a ReferenceTables,
    band: Band,
    illuminant: StandardIlluminant,
    step_nm: u32,
    adaptation: ChromaticAdaptation,
}

impl<'a> Colorimeter<'a> {
    pub fn new(tables: &'a ReferenceTables, band: Band, illuminant: StandardIlluminant) -> Self {
        Self {
            tables,
            band,
            illuminant,
            step_nm: 1,
            adaptation: ChromaticAdaptation::default(),
        }
    }

    pub fn with_step(mut self, step_nm: u32) -> Self {
        self.step_nm = step_nm;
        self
    }

    /// Adaptation from the illuminant white to the sRGB (D65) white.
    pub fn with_adaptation(mut self, adaptation: ChromaticAdaptation) -> Self {
        self.adaptation = adaptation;
        self
    }

    /// Per-wavelength `sample / max(reference, 0.1)` of the last frames,
    /// resampled onto the band.
    pub fn transmittance(
        &self,
        reference: &Spectrum,
        sample: &Spectrum,
    ) -> AnalysisResult<ReshapedSpectrum> {
        if reference.wavelength() != sample.wavelength() {
            return Err(AnalysisError::shape(
                "colorimeter",
                "reference and sample wavelength grids differ",
            ));
        }
        let ratio: Vec<f64> = sample
            .last_frame()
            .iter()
            .zip(reference.last_frame())
            .map(|(s, r)| s / r.max(REFERENCE_FLOOR))
            .collect();
        reshape(sample.wavelength(), &ratio, self.band)
    }

    pub fn measure(
        &self,
        reference: &Spectrum,
        sample: &Spectrum,
    ) -> AnalysisResult<ColorimeterReading> {
        let ratio = self.transmittance(reference, sample)?;
        let illuminant = self.illuminant.spd(self.band, self.tables)?;
        let swatches = SwatchIntegrator::new(&illuminant, self.tables, self.step_nm)?;

        let white = swatches.white();
        let xyz = swatches.integrate(|wl| ratio.at(wl));
        let Chromaticity { x, y } = xyz.chromaticity()?;
        let lab = Lab::from_xyz(xyz, white)?;
        let luv = Luv::from_xyz(xyz, white)?;
        let srgb = Rgb::srgb(xyz, white, self.adaptation)?;
        tracing::debug!(illuminant = %self.illuminant, l = lab.l, a = lab.a, b = lab.b, "colorimeter");

        Ok(ColorimeterReading {
            illuminant: self.illuminant,
            white,
            xyz,
            xyy: Xyy {
                x,
                y,
                luminance: xyz.y,
            },
            lab,
            lch_ab: lab.lch(),
            luv,
            lch_uv: luv.lch(),
            adaptation: self.adaptation,
            srgb,
        })
    }
}
