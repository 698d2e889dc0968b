use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::ReshapedSpectrum;
use crate::tables::ReferenceTables;

use super::illuminant::ReferenceIlluminant;
use super::{SwatchIntegrator, Uv, Xyz, nonzero};

/// Special color rendering index of one test color sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRendering {
    pub name: String,
    pub index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderingReport {
    pub reference: ReferenceIlluminant,
    pub samples: Vec<SampleRendering>,
    /// General color rendering index, the mean of every sample index.
    pub cri: f64,
}

/// CIE 13.3 `c` and `d` adaptation coordinates.
fn cd(uv: Uv) -> AnalysisResult<(f64, f64)> {
    let v = nonzero("v", uv.v)?;
    let c = (4.0 - uv.u - 10.0 * uv.v) / v;
    let d = (1.708 * uv.v + 0.404 - 1.481 * uv.u) / v;
    Ok((c, d))
}

/// CIE 1964 U*V*W* relative to a white point.
fn uvw(xyz: Xyz, uv: Uv, white: Uv) -> [f64; 3] {
    let w = 25.0 * xyz.y.cbrt() - 17.0;
    [13.0 * w * (uv.u - white.u), 13.0 * w * (uv.v - white.v), w]
}

/// A light whose whites and test colors have been integrated once.
struct Lighting {
    white: Uv,
    c: f64,
    d: f64,
    samples: Vec<(Xyz, Uv)>,
}

impl Lighting {
    fn integrate(
        illuminant: &ReshapedSpectrum,
        tables: &ReferenceTables,
        step_nm: u32,
    ) -> AnalysisResult<Self> {
        let swatches = SwatchIntegrator::new(illuminant, tables, step_nm)?;
        let white = swatches.white().uv()?;
        let (c, d) = cd(white)?;
        let samples = tables
            .reflectances()
            .iter()
            .map(|r| {
                let xyz = swatches.integrate(|wl| r.at(wl));
                Ok((xyz, xyz.uv()?))
            })
            .collect::<AnalysisResult<Vec<_>>>()?;
        Ok(Self {
            white,
            c: nonzero("c", c)?,
            d: nonzero("d", d)?,
            samples,
        })
    }
}

/// CIE 13.3 test-color method with von Kries-type chromatic adaptation.
#[derive(Debug, Clone)]
pub struct CriEngine<'a> {
    tables: &'a ReferenceTables,
    step_nm: u32,
    daylight_threshold_k: Option<f64>,
}

impl<'a> CriEngine<'a> {
    pub fn new(
        tables: &'a ReferenceTables,
        step_nm: u32,
        daylight_threshold_k: Option<f64>,
    ) -> Self {
        Self {
            tables,
            step_nm,
            daylight_threshold_k,
        }
    }

    /// Synthesize the reference illuminant for `cct_k` and rate `source`
    /// against it.
    pub fn evaluate(&self, source: &ReshapedSpectrum, cct_k: f64) -> AnalysisResult<RenderingReport> {
        let reference = ReferenceIlluminant::for_cct(cct_k, self.daylight_threshold_k);
        let reference_spd = reference.synthesize(source.band(), self.tables)?;
        let samples = self.compare(source, &reference_spd)?;
        let cri = samples.iter().map(|s| s.index).sum::<f64>() / samples.len() as f64;
        tracing::debug!(cct_k, reference = %reference.kind, cri, "color rendering");
        Ok(RenderingReport {
            reference,
            samples,
            cri,
        })
    }

    /// Special color rendering indices of `source` relative to `reference`.
    pub fn compare(
        &self,
        source: &ReshapedSpectrum,
        reference: &ReshapedSpectrum,
    ) -> AnalysisResult<Vec<SampleRendering>> {
        if source.band() != reference.band() {
            return Err(AnalysisError::shape(
                "reference illuminant",
                format!("band {} differs from source band {}", reference.band(), source.band()),
            ));
        }
        self.tables.check_reflectances(source.band())?;

        let k = Lighting::integrate(source, self.tables, self.step_nm)?;
        let r = Lighting::integrate(reference, self.tables, self.step_nm)?;
        let c_ratio = r.c / k.c;
        let d_ratio = r.d / k.d;

        self.tables
            .reflectances()
            .iter()
            .zip(k.samples.iter().zip(&r.samples))
            .map(|(reflectance, (&(xyz_k, uv_k), &(xyz_r, uv_r)))| {
                let (c_ki, d_ki) = cd(uv_k)?;
                let denom = nonzero(
                    "adaptation denominator",
                    16.518 + 1.481 * c_ratio * c_ki - d_ratio * d_ki,
                )?;
                let adapted = Uv {
                    u: (10.872 + 0.404 * c_ratio * c_ki - 4.0 * d_ratio * d_ki) / denom,
                    v: 5.520 / denom,
                };

                // The adapted source white coincides with the reference white.
                let [u_r, v_r, w_r] = uvw(xyz_r, uv_r, r.white);
                let [u_k, v_k, w_k] = uvw(xyz_k, adapted, r.white);
                let delta_e = ((u_r - u_k).powi(2) + (v_r - v_k).powi(2) + (w_r - w_k).powi(2)).sqrt();

                Ok(SampleRendering {
                    name: reflectance.name().to_string(),
                    index: 100.0 - 4.6 * delta_e,
                })
            })
            .collect()
    }
}
