use serde::Serialize;

use colorimetry_data::{SpectrumError, TableError};

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Broad classification of an [`AnalysisError`], for callers that decide
/// whether to skip, retry with other bounds, or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The input does not cover the requested wavelength range or window.
    #[strum(serialize = "domain")]
    Domain,
    /// A formula hit a zero or near-zero denominator.
    #[strum(serialize = "arithmetic domain")]
    ArithmeticDomain,
    /// Input or reference data has the wrong shape or coverage.
    #[strum(serialize = "data shape")]
    DataShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum AnalysisError {
    BandNotCovered {
        min_nm: u32,
        max_nm: u32,
        source_min_nm: f64,
        source_max_nm: f64,
    },
    WindowTooNarrow {
        min_nm: f64,
        max_nm: f64,
        points: usize,
    },
    Degenerate {
        quantity: &'static str,
        value: f64,
    },
    DataShape {
        what: String,
        detail: String,
    },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::BandNotCovered { .. } | AnalysisError::WindowTooNarrow { .. } => {
                ErrorKind::Domain
            }
            AnalysisError::Degenerate { .. } => ErrorKind::ArithmeticDomain,
            AnalysisError::DataShape { .. } => ErrorKind::DataShape,
        }
    }

    pub(crate) fn degenerate(quantity: &'static str, value: f64) -> Self {
        AnalysisError::Degenerate { quantity, value }
    }

    pub(crate) fn shape(what: impl Into<String>, detail: impl Into<String>) -> Self {
        AnalysisError::DataShape {
            what: what.into(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::BandNotCovered {
                min_nm,
                max_nm,
                source_min_nm,
                source_max_nm,
            } => write!(
                f,
                "band [{min_nm}, {max_nm}) nm not covered by source range \
                 [{source_min_nm}, {source_max_nm}] nm"
            ),
            AnalysisError::WindowTooNarrow {
                min_nm,
                max_nm,
                points,
            } => write!(
                f,
                "fitting window [{min_nm}, {max_nm}] nm holds {points} samples, need at least 3"
            ),
            AnalysisError::Degenerate { quantity, value } => {
                write!(f, "{quantity} is degenerate (value {value:e})")
            }
            AnalysisError::DataShape { what, detail } => write!(f, "{what}: {detail}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<SpectrumError> for AnalysisError {
    fn from(err: SpectrumError) -> Self {
        AnalysisError::shape("spectrum", err.to_string())
    }
}

impl From<TableError> for AnalysisError {
    fn from(err: TableError) -> Self {
        AnalysisError::shape("reference table", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let band = AnalysisError::BandNotCovered {
            min_nm: 380,
            max_nm: 780,
            source_min_nm: 400.0,
            source_max_nm: 700.0,
        };
        assert_eq!(band.kind(), ErrorKind::Domain);
        assert_eq!(
            AnalysisError::degenerate("x + y + z", 0.0).kind(),
            ErrorKind::ArithmeticDomain
        );
        assert_eq!(
            AnalysisError::shape("cmf", "short").kind(),
            ErrorKind::DataShape
        );
    }

    #[test]
    fn spectrum_errors_become_data_shape() {
        let err: AnalysisError = SpectrumError::NoFrames.into();
        assert_eq!(err.kind(), ErrorKind::DataShape);
        assert!(err.to_string().contains("no frames"));
    }
}
