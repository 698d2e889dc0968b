use colorimetry_data::Spectrum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::{Band, ReshapedSpectrum};
use crate::resample::reshape_frame;
use crate::tables::ReferenceTables;

/// Maximum luminous efficacy, lm/W.
pub const MAX_LUMINOUS_EFFICACY: f64 = 683.0;
/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Which frames contribute to the mean in the flicker index denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ExtremaPolicy {
    /// Mean over every frame.
    #[default]
    #[strum(serialize = "include")]
    Include,
    /// Mean over every frame except the maximum and minimum frames.
    #[strum(serialize = "exclude")]
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlickerReport {
    pub index: f64,
    /// Scotopic luminous power of each frame, in frame order.
    pub luminous_power: Vec<f64>,
    pub max_frame: usize,
    pub min_frame: usize,
    pub mean: f64,
    pub extrema: ExtremaPolicy,
}

/// `Σ V'(λ)·I(λ)·(Km / c)` over the spectrum's band.
pub fn luminous_power(spectrum: &ReshapedSpectrum, tables: &ReferenceTables) -> AnalysisResult<f64> {
    tables.check_scotopic(spectrum.band())?;
    let sum: f64 = spectrum
        .iter()
        .map(|(wl, intensity)| tables.scotopic_at(wl) * intensity)
        .sum();
    Ok(sum * MAX_LUMINOUS_EFFICACY / SPEED_OF_LIGHT)
}

/// Flicker index `(max − min) / (2·mean)` of the per-frame luminous power.
///
/// Frames are resampled and integrated in parallel; the extrema search is a
/// sequential pass in frame order, so the first of several equal extrema is
/// reported.
pub fn flicker_index(
    spectrum: &Spectrum,
    band: Band,
    tables: &ReferenceTables,
    extrema: ExtremaPolicy,
) -> AnalysisResult<FlickerReport> {
    tables.check_scotopic(band)?;
    let powers = (0..spectrum.n_frames())
        .into_par_iter()
        .map(|frame| luminous_power(&reshape_frame(spectrum, frame, band)?, tables))
        .collect::<AnalysisResult<Vec<f64>>>()?;

    let mut max_frame = 0;
    let mut min_frame = 0;
    for (i, &p) in powers.iter().enumerate() {
        if p > powers[max_frame] {
            max_frame = i;
        }
        if p < powers[min_frame] {
            min_frame = i;
        }
    }

    let counted: Vec<f64> = match extrema {
        ExtremaPolicy::Include => powers.clone(),
        ExtremaPolicy::Exclude => powers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != max_frame && *i != min_frame)
            .map(|(_, p)| *p)
            .collect(),
    };
    if counted.is_empty() {
        return Err(AnalysisError::shape(
            "flicker",
            format!(
                "no frames left after excluding extrema ({} frames)",
                powers.len()
            ),
        ));
    }
    let mean = counted.iter().sum::<f64>() / counted.len() as f64;
    if mean == 0.0 || !mean.is_finite() {
        return Err(AnalysisError::degenerate("mean luminous power", mean));
    }

    let index = (powers[max_frame] - powers[min_frame]) / (2.0 * mean);
    tracing::debug!(index, max_frame, min_frame, mean, %extrema, "flicker");

    Ok(FlickerReport {
        index,
        luminous_power: powers,
        max_frame,
        min_frame,
        mean,
        extrema,
    })
}
