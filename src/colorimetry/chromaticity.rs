use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::AnalysisResult;

use super::{Chromaticity, nonzero};

/// Correlated color temperature approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum CctMethod {
    /// McCamy's cubic in the inverse slope to the epicenter (1992).
    #[default]
    #[strum(serialize = "McCamy")]
    McCamy,
    /// Hernández-Andrés, Lee and Romero triple exponential (1999).
    #[strum(serialize = "Hernández-Andrés")]
    HernandezAndres,
}

pub fn correlated_color_temperature(xy: Chromaticity, method: CctMethod) -> AnalysisResult<f64> {
    match method {
        CctMethod::McCamy => mccamy(xy),
        CctMethod::HernandezAndres => hernandez_andres(xy),
    }
}

/// `CCT = 5520.33 − 6823.3n + 3525n² − 449n³` with
/// `n = (x − 0.332) / (y − 0.1858)`.
pub fn mccamy(xy: Chromaticity) -> AnalysisResult<f64> {
    let n = (xy.x - 0.332) / nonzero("y - 0.1858", xy.y - 0.1858)?;
    Ok(5520.33 - 6823.3 * n + 3525.0 * n * n - 449.0 * n * n * n)
}

struct ExponentialFit {
    xe: f64,
    ye: f64,
    a0: f64,
    terms: &'static [(f64, f64)],
}

impl ExponentialFit {
    fn eval(&self, xy: Chromaticity) -> AnalysisResult<f64> {
        let n = (xy.x - self.xe) / nonzero("y - ye", xy.y - self.ye)?;
        Ok(self.a0
            + self
                .terms
                .iter()
                .map(|(a, t)| a * (-n / t).exp())
                .sum::<f64>())
    }
}

/// Valid 3 000 - 50 000 K.
const HA_LOW: ExponentialFit = ExponentialFit {
    xe: 0.3366,
    ye: 0.1735,
    a0: -949.86315,
    terms: &[
        (6253.80338, 0.92159),
        (28.70599, 0.20039),
        (0.00004, 0.07125),
    ],
};

/// Valid 50 000 - 800 000 K.
const HA_HIGH: ExponentialFit = ExponentialFit {
    xe: 0.3356,
    ye: 0.1691,
    a0: 36284.48953,
    terms: &[(0.00228, 0.07861), (5.4535e-36, 0.01543)],
};

/// Hernández-Andrés triple exponential. Switches to the high-temperature
/// coefficients when the first estimate exceeds 50 000 K.
pub fn hernandez_andres(xy: Chromaticity) -> AnalysisResult<f64> {
    let cct = HA_LOW.eval(xy)?;
    if cct > 50_000.0 {
        HA_HIGH.eval(xy)
    } else {
        Ok(cct)
    }
}
