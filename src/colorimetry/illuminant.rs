use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::{Band, ReshapedSpectrum};
use crate::tables::ReferenceTables;

use super::{Chromaticity, nonzero};

/// First radiation constant for spectral radiance, W·m²·sr⁻¹.
pub const PLANCK_C1: f64 = 3.741771e-16;
/// Second radiation constant, m·K.
pub const PLANCK_C2: f64 = 1.4388e-2;

fn check_temperature(temperature_k: f64) -> AnalysisResult<()> {
    if temperature_k > 0.0 && temperature_k.is_finite() {
        Ok(())
    } else {
        Err(AnalysisError::degenerate("temperature", temperature_k))
    }
}

/// Spectral exitance of a blackbody at `wavelength_nm`, per nanometre.
pub fn planck_radiance(wavelength_nm: f64, temperature_k: f64) -> f64 {
    let l = wavelength_nm * 1e-9;
    PLANCK_C1 / (l.powi(5) * ((PLANCK_C2 / (l * temperature_k)).exp() - 1.0)) * 1e-9
}

/// Planckian radiator sampled on the band's 1 nm grid.
pub fn planck(band: Band, temperature_k: f64) -> AnalysisResult<ReshapedSpectrum> {
    band.validate()?;
    check_temperature(temperature_k)?;
    Ok(ReshapedSpectrum::from_fn(band, |wl| {
        planck_radiance(wl as f64, temperature_k)
    }))
}

/// Chromaticity of the CIE daylight locus at a correlated color temperature.
///
/// The locus is defined for 4 000 - 25 000 K; outside that range the nearest
/// branch is extrapolated and a warning is logged.
pub fn daylight_chromaticity(cct_k: f64) -> AnalysisResult<Chromaticity> {
    check_temperature(cct_k)?;
    if !(4000.0..=25_000.0).contains(&cct_k) {
        tracing::warn!(cct_k, "extrapolating CIE daylight locus outside 4000-25000 K");
    }

    let t = cct_k;
    let x = if t <= 7000.0 {
        -4.6070e9 / t.powi(3) + 2.9678e6 / t.powi(2) + 0.09911e3 / t + 0.244063
    } else {
        -2.0064e9 / t.powi(3) + 1.9018e6 / t.powi(2) + 0.24748e3 / t + 0.237040
    };
    let y = -3.0 * x * x + 2.87 * x - 0.275;
    Ok(Chromaticity { x, y })
}

/// CIE daylight phase `S0 + M1·S1 + M2·S2` at a correlated color temperature.
pub fn daylight(
    band: Band,
    cct_k: f64,
    tables: &ReferenceTables,
) -> AnalysisResult<ReshapedSpectrum> {
    band.validate()?;
    tables.check_daylight(band)?;
    let Chromaticity { x, y } = daylight_chromaticity(cct_k)?;

    let m = nonzero("daylight M denominator", 0.0241 + 0.2562 * x - 0.7341 * y)?;
    let m1 = (-1.3515 - 1.7703 * x + 5.9114 * y) / m;
    let m2 = (0.0300 - 31.4424 * x + 30.0717 * y) / m;
    tracing::debug!(cct_k, m1, m2, "daylight phase");

    Ok(ReshapedSpectrum::from_fn(band, |wl| {
        let [s0, s1, s2] = tables.daylight_at(wl);
        s0 + m1 * s1 + m2 * s2
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum IlluminantKind {
    #[strum(serialize = "Planckian")]
    Planckian,
    #[strum(serialize = "CIE daylight")]
    Daylight,
}

/// Reference illuminant for color rendering: Planckian below the daylight
/// threshold, CIE daylight at or above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceIlluminant {
    pub kind: IlluminantKind,
    pub temperature_k: f64,
}

impl ReferenceIlluminant {
    /// `daylight_threshold_k = None` always selects the Planckian radiator.
    pub fn for_cct(cct_k: f64, daylight_threshold_k: Option<f64>) -> Self {
        let kind = match daylight_threshold_k {
            Some(threshold) if cct_k >= threshold => IlluminantKind::Daylight,
            _ => IlluminantKind::Planckian,
        };
        Self {
            kind,
            temperature_k: cct_k,
        }
    }

    pub fn synthesize(
        &self,
        band: Band,
        tables: &ReferenceTables,
    ) -> AnalysisResult<ReshapedSpectrum> {
        match self.kind {
            IlluminantKind::Planckian => planck(band, self.temperature_k),
            IlluminantKind::Daylight => daylight(band, self.temperature_k, tables),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorimetry::{chromaticity::mccamy, tristimulus};

    fn visible() -> Band {
        Band::new(380, 781).unwrap()
    }

    #[test]
    fn planck_peak_follows_wien_displacement() {
        let spd = planck(Band::new(300, 1100).unwrap(), 5800.0).unwrap();
        let (peak, _) = spd
            .iter()
            .fold((0, f64::MIN), |best, (wl, v)| if v > best.1 { (wl, v) } else { best });
        let expected = 2.8977719e6 / 5800.0;
        assert!(
            (peak as f64 - expected).abs() <= 2.0,
            "peak at {peak} nm, expected {expected:.1}"
        );
    }

    #[test]
    fn planck_rejects_non_positive_temperature() {
        for t in [0.0, -100.0, f64::NAN] {
            let err = planck(visible(), t).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::ArithmeticDomain);
        }
    }

    #[test]
    fn daylight_locus_at_d65() {
        let xy = daylight_chromaticity(6504.0).unwrap();
        assert!((xy.x - 0.3127).abs() < 5e-4, "x = {}", xy.x);
        assert!((xy.y - 0.3291).abs() < 5e-4, "y = {}", xy.y);
    }

    #[test]
    fn daylight_spd_is_anchored_at_560nm() {
        let tables = ReferenceTables::builtin();
        let spd = daylight(visible(), 6504.0, &tables).unwrap();
        assert!((spd.get(560).unwrap() - 100.0).abs() < 1e-9);

        let xy = tristimulus(&spd, &tables).unwrap().chromaticity().unwrap();
        let cct = mccamy(xy).unwrap();
        assert!((cct - 6504.0).abs() < 100.0, "CCT of D65 = {cct}");
    }

    #[test]
    fn threshold_selects_reference() {
        let low = ReferenceIlluminant::for_cct(3000.0, Some(5000.0));
        assert_eq!(low.kind, IlluminantKind::Planckian);
        let high = ReferenceIlluminant::for_cct(6500.0, Some(5000.0));
        assert_eq!(high.kind, IlluminantKind::Daylight);
        let never = ReferenceIlluminant::for_cct(6500.0, None);
        assert_eq!(never.kind, IlluminantKind::Planckian);
    }
}
