pub mod student_t;

use colorimetry_data::Spectrum;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Second radiation constant in nm·K.
pub const WIEN_C2_NM_K: f64 = 14_388_000.0;

/// Slopes smaller than this in magnitude cannot be inverted to a temperature.
const MIN_SLOPE: f64 = 1e-12;

/// Wavelength window used for the line fit, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWindow {
    pub min_nm: f64,
    pub max_nm: f64,
}

impl FitWindow {
    pub fn new(min_nm: f64, max_nm: f64) -> AnalysisResult<Self> {
        let window = Self { min_nm, max_nm };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.min_nm > 0.0 && self.min_nm < self.max_nm && self.max_nm.is_finite()) {
            return Err(AnalysisError::shape(
                "fitting window",
                format!("invalid range [{}, {}] nm", self.min_nm, self.max_nm),
            ));
        }
        Ok(())
    }

    /// The window in Wien x, `[c2/λmax, c2/λmin]`.
    pub fn wien_x(&self) -> (f64, f64) {
        (WIEN_C2_NM_K / self.max_nm, WIEN_C2_NM_K / self.min_nm)
    }
}

/// A spectrum in Wien coordinates `x = c2/λ`, `y = ln(λ⁴·I)`, ordered by
/// ascending `x`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WienCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl WienCurve {
    /// Intensities at or below `floor` are raised to it before the logarithm.
    pub fn transform(wavelength: &[f64], intensity: &[f64], floor: f64) -> Self {
        let (x, y) = wavelength
            .iter()
            .zip(intensity)
            .rev()
            .map(|(&wl, &i)| (WIEN_C2_NM_K / wl, (wl.powi(4) * i.max(floor)).ln()))
            .unzip();
        Self { x, y }
    }
}

/// Least-squares line `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// `Σ(y − ŷ)² / (n − 2)`.
    pub residual_variance: f64,
    /// `Σ(x − x̄)²`.
    pub sxx: f64,
    pub points: usize,
}

impl LineFit {
    pub fn fit(x: &[f64], y: &[f64]) -> AnalysisResult<Self> {
        let n = x.len();
        if n < 3 || y.len() != n {
            return Err(AnalysisError::shape(
                "line fit",
                format!("{n} x values and {} y values, need at least 3", y.len()),
            ));
        }

        let design = DMatrix::from_fn(n, 2, |r, c| if c == 0 { x[r] } else { 1.0 });
        let rhs = DVector::from_column_slice(y);
        let solution = design
            .svd(true, true)
            .solve(&rhs, 1e-12)
            .map_err(|e| AnalysisError::shape("line fit", e))?;
        let (slope, intercept) = (solution[0], solution[1]);

        let residual_sum: f64 = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
            .sum();
        let mean_x = x.iter().sum::<f64>() / n as f64;
        let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
        if sxx <= 0.0 {
            return Err(AnalysisError::degenerate("x spread", sxx));
        }

        Ok(Self {
            slope,
            intercept,
            residual_variance: residual_sum / (n - 2) as f64,
            sxx,
            points: n,
        })
    }

    /// Half-width of the slope's two-sided confidence interval.
    pub fn slope_half_width(&self, t_critical: f64) -> f64 {
        t_critical * (self.residual_variance / self.sxx).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameTemperature {
    pub temperature_k: f64,
    /// Half-width of the confidence interval on the temperature.
    pub error_k: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalResult {
    pub frames: Vec<FrameTemperature>,
    pub confidence: f64,
    /// Calibrated Wien curve of the last frame.
    pub wien: WienCurve,
    /// Fit of the last frame.
    pub fit: LineFit,
    pub window_x: (f64, f64),
}

impl ThermalResult {
    pub fn last(&self) -> FrameTemperature {
        // Every result carries at least one frame.
        self.frames[self.frames.len() - 1]
    }
}

/// Two-color-style pyrometer that fits Wien's approximation after removing
/// the instrument response measured on a blackbody of known temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyrometer {
    wavelength: Vec<f64>,
    /// Per-sample correction `e = −x/T_cal − y_cal`, in ascending x order.
    offsets: Vec<f64>,
    calibration_temperature_k: f64,
    intensity_floor: f64,
}

impl Pyrometer {
    /// Calibrate against the last frame of `calibration`, a blackbody at
    /// `temperature_k`.
    pub fn calibrate(
        calibration: &Spectrum,
        temperature_k: f64,
        intensity_floor: f64,
    ) -> AnalysisResult<Self> {
        if !(temperature_k > 0.0 && temperature_k.is_finite()) {
            return Err(AnalysisError::degenerate("calibration temperature", temperature_k));
        }
        if !(intensity_floor > 0.0) {
            return Err(AnalysisError::shape(
                "intensity floor",
                format!("{intensity_floor} must be positive"),
            ));
        }

        let curve = WienCurve::transform(
            calibration.wavelength(),
            calibration.last_frame(),
            intensity_floor,
        );
        let offsets = curve
            .x
            .iter()
            .zip(&curve.y)
            .map(|(x, y)| -x / temperature_k - y)
            .collect();

        Ok(Self {
            wavelength: calibration.wavelength().to_vec(),
            offsets,
            calibration_temperature_k: temperature_k,
            intensity_floor,
        })
    }

    pub fn calibration_temperature_k(&self) -> f64 {
        self.calibration_temperature_k
    }

    /// Calibrated Wien curve of one frame.
    pub fn wien_curve(&self, intensity: &[f64]) -> WienCurve {
        let mut curve = WienCurve::transform(&self.wavelength, intensity, self.intensity_floor);
        for (y, e) in curve.y.iter_mut().zip(&self.offsets) {
            *y += e;
        }
        curve
    }

    /// Fit every frame of `spectrum` over `window`, with a two-sided interval
    /// at the `confidence` level.
    pub fn measure(
        &self,
        spectrum: &Spectrum,
        window: FitWindow,
        confidence: f64,
    ) -> AnalysisResult<ThermalResult> {
        let _span = tracing::info_span!("pyrometer", frames = spectrum.n_frames()).entered();

        window.validate()?;
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(AnalysisError::shape(
                "confidence",
                format!("{confidence} must lie in (0, 1)"),
            ));
        }
        if spectrum.wavelength() != self.wavelength.as_slice() {
            return Err(AnalysisError::shape(
                "measurement",
                format!(
                    "wavelength grid of {} samples differs from calibration grid of {}",
                    spectrum.n_samples(),
                    self.wavelength.len()
                ),
            ));
        }

        let window_x = window.wien_x();
        let (lo, hi) = window_x;
        // Every frame shares the grid, so the cropped index range is too.
        let xs: Vec<f64> = self.wavelength.iter().rev().map(|wl| WIEN_C2_NM_K / wl).collect();
        let start = xs.iter().position(|x| *x >= lo);
        let end = xs.iter().rposition(|x| *x <= hi);
        let range = match (start, end) {
            (Some(a), Some(b)) if b >= a && b - a + 1 >= 3 => a..b + 1,
            (Some(a), Some(b)) if b >= a => {
                return Err(self.too_narrow(window, b - a + 1));
            }
            _ => return Err(self.too_narrow(window, 0)),
        };

        let df = (range.len() - 2) as f64;
        let t_critical = student_t::quantile((1.0 + confidence) / 2.0, df)?;
        tracing::debug!(points = range.len(), df, t_critical, "fitting window");

        let fits = spectrum
            .intensity()
            .par_iter()
            .map(|frame| {
                let curve = self.wien_curve(frame);
                let y = &curve.y[range.clone()];
                if let Some(bad) = y.iter().find(|y| !y.is_finite()) {
                    return Err(AnalysisError::degenerate("Wien ordinate", *bad));
                }
                let fit = LineFit::fit(&curve.x[range.clone()], y)?;
                if !(fit.slope.abs() >= MIN_SLOPE) {
                    return Err(AnalysisError::degenerate("Wien slope", fit.slope));
                }
                let temperature_k = -1.0 / fit.slope;
                let error_k = fit.slope_half_width(t_critical) / (fit.slope * fit.slope);
                if !temperature_k.is_finite() {
                    return Err(AnalysisError::degenerate("temperature", temperature_k));
                }
                if !error_k.is_finite() {
                    return Err(AnalysisError::degenerate("temperature error", error_k));
                }
                Ok((FrameTemperature { temperature_k, error_k }, fit, curve))
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        let mut frames = Vec::with_capacity(fits.len());
        let mut last = None;
        for (temperature, fit, curve) in fits {
            frames.push(temperature);
            last = Some((fit, curve));
        }
        let Some((fit, wien)) = last else {
            return Err(AnalysisError::shape("measurement", "no frames"));
        };

        tracing::debug!(
            slope = fit.slope,
            intercept = fit.intercept,
            points = fit.points,
            "last frame fit"
        );

        Ok(ThermalResult {
            frames,
            confidence,
            wien,
            fit,
            window_x,
        })
    }

    fn too_narrow(&self, window: FitWindow, points: usize) -> AnalysisError {
        AnalysisError::WindowTooNarrow {
            min_nm: window.min_nm,
            max_nm: window.max_nm,
            points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorimetry::illuminant::planck_radiance;

    fn blackbody(temperature_k: f64, frames: usize) -> Spectrum {
        let wl: Vec<f64> = (400..=900).map(f64::from).collect();
        let row: Vec<f64> = wl
            .iter()
            .map(|w| 1000.0 * planck_radiance(*w, temperature_k))
            .collect();
        Spectrum::from_frames(wl, vec![row; frames], 10.0).unwrap()
    }

    #[test]
    fn wien_transform_reverses_order() {
        let curve = WienCurve::transform(&[500.0, 600.0], &[1.0, -5.0], 0.1);
        assert!((curve.x[0] - WIEN_C2_NM_K / 600.0).abs() < 1e-9);
        assert!((curve.y[0] - (600f64.powi(4) * 0.1).ln()).abs() < 1e-12);
        assert!((curve.y[1] - (500f64.powi(4)).ln()).abs() < 1e-12);
    }

    #[test]
    fn line_fit_recovers_exact_line() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| -0.5 * v + 3.0).collect();
        let fit = LineFit::fit(&x, &y).unwrap();
        assert!((fit.slope + 0.5).abs() < 1e-12, "slope {}", fit.slope);
        assert!((fit.intercept - 3.0).abs() < 1e-12);
        assert!(fit.residual_variance < 1e-20);
        assert!((fit.sxx - 5.0).abs() < 1e-12);
    }

    #[test]
    fn calibration_source_reads_its_own_temperature() {
        let cal = blackbody(2200.0, 1);
        let pyro = Pyrometer::calibrate(&cal, 2200.0, 0.1).unwrap();
        let result = pyro
            .measure(&blackbody(2200.0, 3), FitWindow::new(500.0, 800.0).unwrap(), 0.95)
            .unwrap();
        assert_eq!(result.frames.len(), 3);
        for f in &result.frames {
            assert!((f.temperature_k - 2200.0).abs() < 1e-6, "T = {}", f.temperature_k);
            assert!(f.error_k < 1e-3, "error = {}", f.error_k);
        }
        assert_eq!(result.fit.points, 301);
    }

    #[test]
    fn window_with_two_samples_is_too_narrow() {
        let cal = blackbody(2000.0, 1);
        let pyro = Pyrometer::calibrate(&cal, 2000.0, 0.1).unwrap();
        let err = pyro
            .measure(&cal, FitWindow::new(600.0, 601.0).unwrap(), 0.95)
            .unwrap_err();
        assert!(
            matches!(err, AnalysisError::WindowTooNarrow { points: 2, .. }),
            "{err}"
        );
        let err = pyro
            .measure(&cal, FitWindow::new(950.0, 990.0).unwrap(), 0.95)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::WindowTooNarrow { points: 0, .. }));
    }

    #[test]
    fn mismatched_grid_is_data_shape() {
        let pyro = Pyrometer::calibrate(&blackbody(2000.0, 1), 2000.0, 0.1).unwrap();
        let other = Spectrum::from_frames(vec![500.0, 600.0, 700.0], vec![vec![1.0; 3]], 1.0)
            .unwrap();
        let err = pyro
            .measure(&other, FitWindow::new(500.0, 700.0).unwrap(), 0.95)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataShape);
    }

    #[test]
    fn flat_corrected_curve_is_degenerate() {
        // A measurement that exactly cancels the calibration slope.
        let wl: Vec<f64> = (500..=700).map(f64::from).collect();
        let cal_row: Vec<f64> = wl
            .iter()
            .map(|w| (-(WIEN_C2_NM_K / w) / 2000.0).exp() / w.powi(4) * 1e12)
            .collect();
        let cal = Spectrum::from_frames(wl.clone(), vec![cal_row.clone()], 1.0).unwrap();
        let pyro = Pyrometer::calibrate(&cal, 2000.0, 1e-30).unwrap();
        let meas_row: Vec<f64> = wl
            .iter()
            .zip(&cal_row)
            .map(|(w, c)| c * (WIEN_C2_NM_K / w / 2000.0).exp())
            .collect();
        let meas = Spectrum::from_frames(wl, vec![meas_row], 1.0).unwrap();
        let err = pyro
            .measure(&meas, FitWindow::new(500.0, 700.0).unwrap(), 0.95)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArithmeticDomain);
    }

    #[test]
    fn confidence_outside_unit_interval_is_rejected() {
        let cal = blackbody(2000.0, 1);
        let pyro = Pyrometer::calibrate(&cal, 2000.0, 0.1).unwrap();
        let window = FitWindow::new(500.0, 800.0).unwrap();
        for confidence in [-0.5, 0.0, 1.0, f64::NAN] {
            let err = pyro.measure(&cal, window, confidence).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::DataShape, "{confidence}");
        }
    }

    #[test]
    fn overflowing_intensity_is_degenerate() {
        let cal = blackbody(2000.0, 1);
        let pyro = Pyrometer::calibrate(&cal, 2000.0, 0.1).unwrap();
        let wl = cal.wavelength().to_vec();
        let hot = Spectrum::from_frames(wl.clone(), vec![vec![1e300; wl.len()]], 1.0).unwrap();
        let err = pyro
            .measure(&hot, FitWindow::new(500.0, 800.0).unwrap(), 0.95)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArithmeticDomain, "{err}");
    }

    #[test]
    fn invalid_calibration_is_rejected() {
        let cal = blackbody(2000.0, 1);
        assert!(Pyrometer::calibrate(&cal, 0.0, 0.1).is_err());
        assert!(Pyrometer::calibrate(&cal, 2000.0, 0.0).is_err());
    }
}
