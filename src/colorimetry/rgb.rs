use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::{AnalysisError, AnalysisResult};

use super::{Xyz, nonzero};

/// ITU-R BT.709 primaries used by sRGB, as (x, y).
const SRGB_PRIMARIES: [(f64, f64); 3] = [(0.64, 0.33), (0.30, 0.60), (0.15, 0.06)];

/// D65 white of sRGB, 2° observer, normalized to `Y = 1`.
pub const SRGB_WHITE: Xyz = Xyz {
    x: 0.95047,
    y: 1.0,
    z: 1.08883,
};

const BRADFORD: [[f64; 3]; 3] = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

const VON_KRIES: [[f64; 3]; 3] = [
    [0.40024, 0.7076, -0.08081],
    [-0.2263, 1.16532, 0.0457],
    [0.0, 0.0, 0.91822],
];

fn matrix(rows: [[f64; 3]; 3]) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| rows[r][c])
}

fn vector(xyz: Xyz) -> Vector3<f64> {
    Vector3::new(xyz.x, xyz.y, xyz.z)
}

/// How colors are carried from the illuminant white to the RGB space white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ChromaticAdaptation {
    #[default]
    Bradford,
    VonKries,
    XyzScaling,
    /// Use tristimulus values as they are.
    None,
}

impl ChromaticAdaptation {
    fn cone_response(self) -> Matrix3<f64> {
        match self {
            ChromaticAdaptation::Bradford => matrix(BRADFORD),
            ChromaticAdaptation::VonKries => matrix(VON_KRIES),
            ChromaticAdaptation::XyzScaling | ChromaticAdaptation::None => Matrix3::identity(),
        }
    }

    /// `M` with `XYZ_dst = M · XYZ_src`, scaling cone responses by the ratio
    /// of the two whites.
    pub fn matrix(self, source_white: Xyz, target_white: Xyz) -> AnalysisResult<Matrix3<f64>> {
        if self == ChromaticAdaptation::None {
            return Ok(Matrix3::identity());
        }
        let cone = self.cone_response();
        let inverse = cone
            .try_inverse()
            .ok_or_else(|| AnalysisError::degenerate("cone response determinant", 0.0))?;
        let source = cone * vector(source_white);
        let target = cone * vector(target_white);
        let scale = Vector3::new(
            target[0] / nonzero("source white cone response", source[0])?,
            target[1] / nonzero("source white cone response", source[1])?,
            target[2] / nonzero("source white cone response", source[2])?,
        );
        Ok(inverse * Matrix3::from_diagonal(&scale) * cone)
    }
}

/// Linear sRGB to XYZ, built from the primaries and the white point.
fn srgb_to_xyz() -> AnalysisResult<Matrix3<f64>> {
    let columns = SRGB_PRIMARIES.map(|(x, y)| Vector3::new(x / y, 1.0, (1.0 - x - y) / y));
    let primaries = Matrix3::from_columns(&columns);
    let weights = primaries
        .try_inverse()
        .ok_or_else(|| AnalysisError::degenerate("RGB primaries determinant", 0.0))?
        * vector(SRGB_WHITE);
    Ok(primaries * Matrix3::from_diagonal(&weights))
}

/// sRGB transfer function on a linear value in `[0, 1]`.
fn srgb_encode(linear: f64) -> f64 {
    if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

/// Gamma-encoded sRGB, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Converts `xyz`, seen under an illuminant with the given `white`, to
    /// sRGB. Out-of-gamut channels are clipped before encoding.
    pub fn srgb(xyz: Xyz, white: Xyz, adaptation: ChromaticAdaptation) -> AnalysisResult<Self> {
        let scale = nonzero("white Y", white.y)?;
        let relative = |c: Xyz| Xyz::new(c.x / scale, c.y / scale, c.z / scale);
        let adapt = adaptation.matrix(relative(white), SRGB_WHITE)?;
        let to_rgb = srgb_to_xyz()?
            .try_inverse()
            .ok_or_else(|| AnalysisError::degenerate("RGB matrix determinant", 0.0))?;
        let linear = to_rgb * adapt * vector(relative(xyz));
        let encoded = linear.map(|c| srgb_encode(c.clamp(0.0, 1.0)));
        Ok(Self {
            r: encoded.x,
            g: encoded.y,
            b: encoded.z,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    const D50: Xyz = Xyz {
        x: 0.96422,
        y: 1.0,
        z: 0.82521,
    };

    #[test]
    fn bradford_d65_to_d50() {
        let m = ChromaticAdaptation::Bradford.matrix(SRGB_WHITE, D50).unwrap();
        let expected = [
            [1.0478112, 0.0228866, -0.0501270],
            [0.0295424, 0.9904844, -0.0170491],
            [-0.0092345, 0.0150436, 0.7521316],
        ];
        for r in 0..3 {
            for c in 0..3 {
                assert!(
                    (m[(r, c)] - expected[r][c]).abs() < 1e-6,
                    "M[{r}][{c}] = {}",
                    m[(r, c)]
                );
            }
        }
    }

    #[test]
    fn adaptation_carries_white_to_white() {
        let equal_energy = Xyz::new(1.0, 1.0, 1.0);
        for method in ChromaticAdaptation::iter().filter(|m| *m != ChromaticAdaptation::None) {
            let adapted = method.matrix(equal_energy, SRGB_WHITE).unwrap() * vector(equal_energy);
            assert!((adapted[0] - SRGB_WHITE.x).abs() < 1e-12, "{method}");
            assert!((adapted[1] - SRGB_WHITE.y).abs() < 1e-12, "{method}");
            assert!((adapted[2] - SRGB_WHITE.z).abs() < 1e-12, "{method}");
        }
    }

    #[test]
    fn srgb_matrix_matches_published_values() {
        let m = srgb_to_xyz().unwrap();
        assert!((m[(0, 0)] - 0.41246).abs() < 1e-5, "{}", m[(0, 0)]);
        assert!((m[(1, 1)] - 0.71515).abs() < 1e-5, "{}", m[(1, 1)]);
        assert!((m[(2, 2)] - 0.95030).abs() < 1e-5, "{}", m[(2, 2)]);
    }

    #[test]
    fn white_and_grey_under_equal_energy() {
        let white = Xyz::new(100.0, 100.0, 100.0);
        let rgb = Rgb::srgb(white, white, ChromaticAdaptation::Bradford).unwrap();
        for channel in [rgb.r, rgb.g, rgb.b] {
            assert!((channel - 1.0).abs() < 1e-9, "{rgb:?}");
        }

        let grey = Rgb::srgb(Xyz::new(50.0, 50.0, 50.0), white, ChromaticAdaptation::Bradford)
            .unwrap();
        for channel in [grey.r, grey.g, grey.b] {
            assert!((channel - 0.7353570).abs() < 1e-6, "{grey:?}");
        }

        // Without adaptation the equal-energy white is warmer than D65.
        let raw = Rgb::srgb(white, white, ChromaticAdaptation::None).unwrap();
        assert!((raw.r - 1.0).abs() < 1e-12, "{raw:?}");
        assert!(raw.b < 0.97, "{raw:?}");
    }

    #[test]
    fn out_of_gamut_is_clipped() {
        let d65 = Xyz::new(95.047, 100.0, 108.883);
        let rgb = Rgb::srgb(Xyz::new(0.0, 100.0, 0.0), d65, ChromaticAdaptation::Bradford).unwrap();
        assert_eq!(rgb.r, 0.0);
        assert!((rgb.g - 1.0).abs() < 1e-12, "{rgb:?}");
        assert_eq!(rgb.b, 0.0);
    }
}
