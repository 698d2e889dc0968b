use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::ReshapedSpectrum;
use crate::tables::ReferenceTables;

use super::{Xyz, nonvanishing};

/// Raw tristimulus values of a spectral power distribution:
/// `X = Σ I(λ)·x̄(λ)·Δλ` over the spectrum's band at 1 nm.
pub fn tristimulus(spectrum: &ReshapedSpectrum, tables: &ReferenceTables) -> AnalysisResult<Xyz> {
    tables.check_cmf(spectrum.band())?;
    let mut xyz = Xyz::default();
    for (wl, intensity) in spectrum.iter() {
        let [xb, yb, zb] = tables.cmf_at(wl);
        xyz.x += intensity * xb;
        xyz.y += intensity * yb;
        xyz.z += intensity * zb;
    }
    Ok(xyz)
}

/// Integrates reflecting swatches under an illuminant, normalized so the
/// perfect white diffuser has `Y = 100`.
///
/// Sums run over `λ = min, min + step, … < max` with `Δλ = step`.
#[derive(Debug, Clone)]
pub struct SwatchIntegrator<'a> {
    illuminant: &'a ReshapedSpectrum,
    tables: &'a ReferenceTables,
    step_nm: u32,
    k: f64,
}

impl<'a> SwatchIntegrator<'a> {
    pub fn new(
        illuminant: &'a ReshapedSpectrum,
        tables: &'a ReferenceTables,
        step_nm: u32,
    ) -> AnalysisResult<Self> {
        if step_nm == 0 {
            return Err(AnalysisError::shape("reference step", "must be at least 1 nm"));
        }
        let band = illuminant.band();
        tables.check_cmf(band)?;

        let dl = step_nm as f64;
        let (norm, magnitude) = band
            .stepped(step_nm)
            .map(|wl| illuminant.at(wl) * tables.cmf_at(wl)[1] * dl)
            .fold((0.0, 0.0), |(sum, abs), term: f64| (sum + term, abs + term.abs()));
        let k = 100.0 / nonvanishing("illuminant luminance", norm, magnitude)?;

        Ok(Self {
            illuminant,
            tables,
            step_nm,
            k,
        })
    }

    /// Normalization factor `100 / Σ S(λ)·ȳ(λ)·Δλ`.
    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn step_nm(&self) -> u32 {
        self.step_nm
    }

    /// Tristimulus values of the perfect white diffuser.
    pub fn white(&self) -> Xyz {
        self.integrate(|_| 1.0)
    }

    /// Tristimulus values of a swatch with the given reflectance. The
    /// reflectance is only evaluated at the stepped wavelengths.
    pub fn integrate(&self, reflectance: impl Fn(u32) -> f64) -> Xyz {
        let dl = self.step_nm as f64;
        let mut xyz = Xyz::default();
        for wl in self.illuminant.band().stepped(self.step_nm) {
            let w = self.illuminant.at(wl) * reflectance(wl) * dl;
            let [xb, yb, zb] = self.tables.cmf_at(wl);
            xyz.x += w * xb;
            xyz.y += w * yb;
            xyz.z += w * zb;
        }
        Xyz {
            x: self.k * xyz.x,
            y: self.k * xyz.y,
            z: self.k * xyz.z,
        }
    }
}
