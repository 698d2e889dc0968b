use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::colorimetry::CctMethod;
use crate::colorimetry::colorimeter::StandardIlluminant;
use crate::colorimetry::rgb::ChromaticAdaptation;
use crate::error::{AnalysisError, AnalysisResult};
use crate::flicker::ExtremaPolicy;
use crate::grid::Band;
use crate::pyrometer::FitWindow;
use crate::tables::CmfSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaticityConfig {
    pub cct_method: CctMethod,
    pub cmf: CmfSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Wavelength step for the swatch and white integrations.
    pub reference_step_nm: u32,
    /// At or above this CCT the reference illuminant is CIE daylight.
    pub daylight_threshold_k: f64,
    /// Ignore the threshold and always compare against a Planckian radiator.
    pub planckian_only: bool,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            reference_step_nm: 5,
            daylight_threshold_k: 5000.0,
            planckian_only: false,
        }
    }
}

impl RenderingConfig {
    pub fn daylight_threshold(&self) -> Option<f64> {
        (!self.planckian_only).then_some(self.daylight_threshold_k)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickerConfig {
    pub extrema: ExtremaPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyrometerConfig {
    pub calibration_temperature_k: f64,
    pub window_min_nm: f64,
    pub window_max_nm: f64,
    #[serde(default = "default_intensity_floor")]
    pub intensity_floor: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_intensity_floor() -> f64 {
    0.1
}

fn default_confidence() -> f64 {
    0.95
}

impl PyrometerConfig {
    pub fn window(&self) -> FitWindow {
        FitWindow {
            min_nm: self.window_min_nm,
            max_nm: self.window_max_nm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorimeterConfig {
    pub illuminant: StandardIlluminant,
    pub step_nm: u32,
    /// Adaptation to the sRGB white for the RGB reading.
    pub adaptation: ChromaticAdaptation,
}

impl Default for ColorimeterConfig {
    fn default() -> Self {
        Self {
            illuminant: StandardIlluminant::E,
            step_nm: 1,
            adaptation: ChromaticAdaptation::Bradford,
        }
    }
}

/// Analysis settings, normally read from a TOML file. Every section and key
/// is optional except inside `[pyrometer]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub band: Band,
    pub chromaticity: ChromaticityConfig,
    pub rendering: RenderingConfig,
    pub flicker: FlickerConfig,
    pub colorimeter: ColorimeterConfig,
    pub pyrometer: Option<PyrometerConfig>,
}

fn invalid(detail: impl Into<String>) -> AnalysisError {
    AnalysisError::shape("config", detail)
}

impl AnalysisConfig {
    pub fn from_toml(text: &str) -> AnalysisResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        self.band.validate()?;

        if self.rendering.reference_step_nm == 0 {
            return Err(invalid("rendering.reference_step_nm must be at least 1"));
        }
        let threshold = self.rendering.daylight_threshold_k;
        if !(threshold > 0.0 && threshold.is_finite()) {
            return Err(invalid(format!(
                "rendering.daylight_threshold_k = {threshold} must be a positive temperature"
            )));
        }
        if self.colorimeter.step_nm == 0 {
            return Err(invalid("colorimeter.step_nm must be at least 1"));
        }

        if let Some(p) = &self.pyrometer {
            if !(p.calibration_temperature_k > 0.0 && p.calibration_temperature_k.is_finite()) {
                return Err(invalid(format!(
                    "pyrometer.calibration_temperature_k = {} must be positive",
                    p.calibration_temperature_k
                )));
            }
            p.window().validate()?;
            if !(p.intensity_floor > 0.0) {
                return Err(invalid(format!(
                    "pyrometer.intensity_floor = {} must be positive",
                    p.intensity_floor
                )));
            }
            if !(p.confidence > 0.0 && p.confidence < 1.0) {
                return Err(invalid(format!(
                    "pyrometer.confidence = {} must lie in (0, 1)",
                    p.confidence
                )));
            }
        }
        Ok(())
    }
}
