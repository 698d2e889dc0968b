use std::sync::Arc;

use colorimetry_data::Spectrum;
use serde::Serialize;

use crate::colorimetry::colorimeter::{Colorimeter, ColorimeterReading};
use crate::colorimetry::cri::{CriEngine, RenderingReport};
use crate::colorimetry::{Chromaticity, Uv, Xyz, correlated_color_temperature, tristimulus};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::flicker::{self, FlickerReport};
use crate::grid::Band;
use crate::pyrometer::{Pyrometer, ThermalResult};
use crate::resample::reshape_mean;
use crate::tables::ReferenceTables;

/// Everything derived from one spectrum. The `Result` fields fail
/// independently: a failed chromaticity also fails CCT and rendering, but
/// never the flicker index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorimetricResult {
    pub band: Band,
    pub xyz: Xyz,
    pub peak_wavelength_nm: f64,
    pub luminous_power: f64,
    pub clipped_samples: usize,
    pub xy: Result<Chromaticity, AnalysisError>,
    pub uv: Result<Uv, AnalysisError>,
    pub cct_k: Result<f64, AnalysisError>,
    pub rendering: Result<RenderingReport, AnalysisError>,
    pub flicker: Result<FlickerReport, AnalysisError>,
}

/// Runs the full colorimetric pipeline against shared reference tables.
#[derive(Debug, Clone)]
pub struct Analyzer {
    tables: Arc<ReferenceTables>,
    config: AnalysisConfig,
}

impl Analyzer {
    /// Validates `config` and applies its CMF choice to `tables`.
    pub fn new(tables: ReferenceTables, config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let tables = tables.with_cmf(config.chromaticity.cmf);
        Ok(Self {
            tables: Arc::new(tables),
            config,
        })
    }

    pub fn builtin(config: AnalysisConfig) -> AnalysisResult<Self> {
        Self::new(ReferenceTables::builtin(), config)
    }

    pub fn tables(&self) -> &Arc<ReferenceTables> {
        &self.tables
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, spectrum: &Spectrum) -> AnalysisResult<ColorimetricResult> {
        let band = self.config.band;
        let _span =
            tracing::info_span!("analysis", frames = spectrum.n_frames(), %band).entered();

        let clipped_samples = spectrum.clipped_count();
        if clipped_samples > 0 {
            tracing::warn!(clipped_samples, "spectrum contains clipped samples");
        }

        let reshaped = reshape_mean(spectrum, band)?;
        let xyz = tristimulus(&reshaped, &self.tables)?;
        let peak_wavelength_nm = spectrum.peak_wavelength();
        let luminous_power = flicker::luminous_power(&reshaped, &self.tables)?;

        let xy = xyz.chromaticity();
        if let Ok(xy) = &xy {
            tracing::debug!(x = xy.x, y = xy.y, peak_wavelength_nm, luminous_power, "chromaticity");
        }
        let uv = xy.clone().and_then(|xy| xy.uv());
        let cct_k = xy
            .clone()
            .and_then(|xy| correlated_color_temperature(xy, self.config.chromaticity.cct_method));
        let rendering = cct_k.clone().and_then(|cct| {
            CriEngine::new(
                &self.tables,
                self.config.rendering.reference_step_nm,
                self.config.rendering.daylight_threshold(),
            )
            .evaluate(&reshaped, cct)
        });
        let flicker =
            flicker::flicker_index(spectrum, band, &self.tables, self.config.flicker.extrema);

        for (what, err) in [
            ("chromaticity", xy.as_ref().err()),
            ("cct", cct_k.as_ref().err()),
            ("rendering", rendering.as_ref().err()),
            ("flicker", flicker.as_ref().err()),
        ] {
            if let Some(err) = err {
                tracing::warn!(what, %err, "partial result");
            }
        }
        if let Ok(cct) = &cct_k {
            tracing::info!(cct_k = *cct, "analysis complete");
        }

        Ok(ColorimetricResult {
            band,
            xyz,
            peak_wavelength_nm,
            luminous_power,
            clipped_samples,
            xy,
            uv,
            cct_k,
            rendering,
            flicker,
        })
    }

    /// Sample-vs-reference colorimetry with the `[colorimeter]` settings.
    pub fn colorimeter(
        &self,
        reference: &Spectrum,
        sample: &Spectrum,
    ) -> AnalysisResult<ColorimeterReading> {
        let settings = &self.config.colorimeter;
        Colorimeter::new(&self.tables, self.config.band, settings.illuminant)
            .with_step(settings.step_nm)
            .with_adaptation(settings.adaptation)
            .measure(reference, sample)
    }

    /// Calibrate on `calibration` and measure every frame of `measurement`
    /// with the `[pyrometer]` settings.
    pub fn pyrometer(
        &self,
        calibration: &Spectrum,
        measurement: &Spectrum,
    ) -> AnalysisResult<ThermalResult> {
        let settings = self
            .config
            .pyrometer
            .as_ref()
            .ok_or_else(|| AnalysisError::shape("config", "missing [pyrometer] section"))?;
        Pyrometer::calibrate(
            calibration,
            settings.calibration_temperature_k,
            settings.intensity_floor,
        )?
        .measure(measurement, settings.window(), settings.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn flat_spectrum(frames: usize) -> Spectrum {
        let wl: Vec<f64> = (400..=700).step_by(5).map(f64::from).collect();
        let rows = vec![vec![1.0; wl.len()]; frames];
        Spectrum::from_frames(wl, rows, 5.0).unwrap()
    }

    fn config(min_nm: u32, max_nm: u32) -> AnalysisConfig {
        AnalysisConfig {
            band: Band::new(min_nm, max_nm).unwrap(),
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn uncovered_band_aborts() {
        let analyzer = Analyzer::builtin(config(380, 780)).unwrap();
        let err = analyzer.run(&flat_spectrum(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn later_failures_keep_earlier_results() {
        let mut cfg = config(400, 700);
        cfg.flicker.extrema = crate::flicker::ExtremaPolicy::Exclude;
        let analyzer = Analyzer::builtin(cfg).unwrap();

        // One frame leaves nothing after excluding extrema.
        let result = analyzer.run(&flat_spectrum(1)).unwrap();
        assert!(result.cct_k.is_ok());
        assert!(result.rendering.is_ok());
        assert_eq!(
            result.flicker.unwrap_err().kind(),
            ErrorKind::DataShape
        );
        assert!(result.xyz.y > 0.0);
    }

    #[test]
    fn cancelled_chromaticity_keeps_flicker() {
        // Positive blue, negative red: X + Y + Z cancels on the 1 nm grid.
        let tables = ReferenceTables::builtin();
        let band = Band::new(400, 700).unwrap();
        let cmf_sum = |range: std::ops::Range<u32>| -> f64 {
            range.map(|wl| tables.cmf(wl).unwrap().iter().sum::<f64>()).sum()
        };
        let a = cmf_sum(400..500) / cmf_sum(550..650);
        let wl: Vec<f64> = (400..700).map(f64::from).collect();
        let row: Vec<f64> = (400..700)
            .map(|wl| match wl {
                400..500 => 1.0,
                550..650 => -a,
                _ => 0.0,
            })
            .collect();
        let spectrum = Spectrum::from_frames(wl, vec![row; 3], 5.0).unwrap();

        let analyzer = Analyzer::builtin(AnalysisConfig {
            band,
            ..AnalysisConfig::default()
        })
        .unwrap();
        let result = analyzer.run(&spectrum).unwrap();

        assert!(result.xyz.sum().abs() < 1e-9, "X + Y + Z = {}", result.xyz.sum());
        assert_eq!(result.xy.unwrap_err().kind(), ErrorKind::ArithmeticDomain);
        assert!(result.uv.is_err());
        assert!(result.cct_k.is_err());
        assert!(result.rendering.is_err());
        assert_eq!(result.flicker.unwrap().index, 0.0);
    }

    #[test]
    fn dim_spectrum_has_the_same_color() {
        let analyzer = Analyzer::builtin(config(400, 700)).unwrap();
        let wl: Vec<f64> = (400..=700).step_by(5).map(f64::from).collect();
        let scaled = |level: f64| {
            let rows = vec![vec![level; wl.len()]; 3];
            analyzer
                .run(&Spectrum::from_frames(wl.clone(), rows, 5.0).unwrap())
                .unwrap()
        };
        let bright = scaled(1.0);
        let dim = scaled(1e-15);

        let (b, d) = (bright.xy.unwrap(), dim.xy.unwrap());
        assert!((b.x - d.x).abs() < 1e-12 && (b.y - d.y).abs() < 1e-12);
        let (b, d) = (bright.cct_k.unwrap(), dim.cct_k.unwrap());
        assert!((b - d).abs() < 1e-6, "CCT {b} vs {d}");
        let (b, d) = (bright.rendering.unwrap(), dim.rendering.unwrap());
        assert!((b.cri - d.cri).abs() < 1e-6, "CRI {} vs {}", b.cri, d.cri);
    }

    #[test]
    fn pyrometer_needs_its_section() {
        let analyzer = Analyzer::builtin(AnalysisConfig::default()).unwrap();
        let s = flat_spectrum(1);
        assert!(analyzer.pyrometer(&s, &s).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.rendering.reference_step_nm = 0;
        assert!(Analyzer::builtin(cfg).is_err());
    }

    #[test]
    fn result_serializes_to_json() {
        let analyzer = Analyzer::builtin(config(400, 700)).unwrap();
        let result = analyzer.run(&flat_spectrum(2)).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["band"]["min_nm"], 400);
        assert!(json["cct_k"]["Ok"].is_number());
        assert_eq!(json["flicker"]["Ok"]["index"], 0.0);
    }
}
