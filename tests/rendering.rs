use colorimetry::colorimetry::cri::CriEngine;
use colorimetry::colorimetry::illuminant::IlluminantKind;
use colorimetry::resample::reshape;
use colorimetry::{Band, ReferenceTables};

/// CIE F2 (cool white fluorescent) relative spectral power, 380-780 nm at 5 nm.
const CIE_F2: [f64; 81] = [
    1.18, 1.48, 1.84, 2.15, 3.44, 15.69, 3.85, 3.74, 4.19, 4.62, 5.06, 34.98, 11.81, 6.27, 6.63,
    6.93, 7.19, 7.40, 7.54, 7.62, 7.65, 7.62, 7.62, 7.45, 7.28, 7.15, 7.05, 7.04, 7.16, 7.47,
    8.04, 8.88, 10.01, 24.88, 16.64, 14.59, 16.16, 17.56, 18.62, 21.47, 22.79, 19.29, 18.66,
    17.73, 16.54, 15.21, 13.80, 12.36, 10.95, 9.65, 8.40, 7.32, 6.31, 5.43, 4.68, 4.02, 3.45,
    2.96, 2.55, 2.19, 1.89, 1.64, 1.53, 1.27, 1.10, 0.99, 0.88, 0.76, 0.68, 0.61, 0.56, 0.54,
    0.51, 0.47, 0.47, 0.43, 0.46, 0.47, 0.40, 0.33, 0.27,
];

/// Published CIE 13.3 special indices R1-R8 of F2 and its general index.
const F2_SPECIAL: [f64; 8] = [56.0, 77.0, 90.0, 57.0, 59.0, 67.0, 74.0, 33.0];
const F2_GENERAL: f64 = 64.0;
const F2_CCT_K: f64 = 4230.0;

#[test]
fn cool_white_fluorescent_matches_published_indices() {
    let wl: Vec<f64> = (380..=780).step_by(5).map(f64::from).collect();
    let band = Band::new(380, 781).unwrap();
    let source = reshape(&wl, &CIE_F2, band).unwrap();

    let tables = ReferenceTables::builtin();
    let report = CriEngine::new(&tables, 5, Some(5000.0))
        .evaluate(&source, F2_CCT_K)
        .unwrap();

    assert_eq!(report.reference.kind, IlluminantKind::Planckian);
    assert_eq!(report.samples.len(), 8);
    for (sample, expected) in report.samples.iter().zip(F2_SPECIAL) {
        assert!(
            (sample.index - expected).abs() <= 1.0,
            "{}: got {:.2}, published {expected}",
            sample.name,
            sample.index
        );
    }
    assert!(
        (report.cri - F2_GENERAL).abs() <= 1.0,
        "Ra = {:.2}, published {F2_GENERAL}",
        report.cri
    );
}
