use colorimetry::colorimetry::illuminant::planck_radiance;
use colorimetry::config::PyrometerConfig;
use colorimetry::{AnalysisConfig, AnalysisError, Analyzer, FitWindow, Pyrometer, Spectrum};

/// A blackbody seen through a made-up instrument response, optionally with
/// deterministic multiplicative noise.
fn measured(temperature_k: f64, noise: f64, frames: usize) -> Spectrum {
    let wl: Vec<f64> = (400..=900).map(f64::from).collect();
    let rows = (0..frames)
        .map(|f| {
            wl.iter()
                .enumerate()
                .map(|(i, w)| {
                    let response = 0.5 + 0.4 * ((w - 400.0) / 150.0).sin().abs();
                    let jitter = 1.0 + noise * ((i as f64) * 1.37 + f as f64).sin();
                    1.0e4 * response * planck_radiance(*w, temperature_k) * jitter
                })
                .collect()
        })
        .collect();
    Spectrum::from_frames(wl, rows, 50.0).unwrap()
}

fn analyzer(calibration_temperature_k: f64, window_min_nm: f64, window_max_nm: f64) -> Analyzer {
    let config = AnalysisConfig {
        pyrometer: Some(PyrometerConfig {
            calibration_temperature_k,
            window_min_nm,
            window_max_nm,
            intensity_floor: 0.1,
            confidence: 0.95,
        }),
        ..AnalysisConfig::default()
    };
    Analyzer::builtin(config).unwrap()
}

#[test]
fn same_temperature_is_recovered_exactly() {
    let cal = measured(2856.0, 0.0, 1);
    let result = analyzer(2856.0, 500.0, 850.0)
        .pyrometer(&cal, &measured(2856.0, 0.0, 2))
        .unwrap();
    for frame in &result.frames {
        assert!(
            (frame.temperature_k - 2856.0).abs() < 1e-6,
            "T = {}",
            frame.temperature_k
        );
    }
    assert_eq!(result.fit.points, 351);
    assert_eq!(result.wien.x.len(), 501);
    // Wien x ascends.
    assert!(result.wien.x.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn hotter_source_is_recovered_within_one_percent() {
    let cal = measured(2856.0, 0.0, 1);
    for t in [1800.0, 2400.0, 3200.0] {
        let result = analyzer(2856.0, 500.0, 850.0)
            .pyrometer(&cal, &measured(t, 0.0, 1))
            .unwrap();
        let got = result.last().temperature_k;
        assert!((got - t).abs() / t < 0.01, "T = {t}: got {got:.1}");
    }
}

#[test]
fn confidence_interval_narrows_with_wider_window() {
    let cal = measured(2856.0, 0.0, 1);
    let meas = measured(2200.0, 0.02, 3);

    let narrow = analyzer(2856.0, 600.0, 650.0).pyrometer(&cal, &meas).unwrap();
    let wide = analyzer(2856.0, 450.0, 880.0).pyrometer(&cal, &meas).unwrap();

    assert_eq!(narrow.frames.len(), 3);
    for (n, w) in narrow.frames.iter().zip(&wide.frames) {
        assert!(n.error_k > 0.0 && w.error_k > 0.0);
        assert!(
            w.error_k < n.error_k,
            "wide window ±{:.2} K should be tighter than narrow ±{:.2} K",
            w.error_k,
            n.error_k
        );
        assert!((w.temperature_k - 2200.0).abs() < 3.0 * w.error_k + 25.0);
    }
}

#[test]
fn window_outside_grid_is_too_narrow() {
    let cal = measured(2856.0, 0.0, 1);
    let pyro = Pyrometer::calibrate(&cal, 2856.0, 0.1).unwrap();
    let err = pyro
        .measure(&cal, FitWindow::new(300.0, 401.0).unwrap(), 0.95)
        .unwrap_err();
    assert!(
        matches!(err, AnalysisError::WindowTooNarrow { points: 2, .. }),
        "{err}"
    );
}

#[test]
fn thermal_result_serializes() {
    let cal = measured(2856.0, 0.0, 1);
    let result = analyzer(2856.0, 500.0, 850.0)
        .pyrometer(&cal, &measured(2000.0, 0.0, 1))
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["frames"][0]["temperature_k"].is_number());
    assert!(json["wien"]["x"].is_array());
}
