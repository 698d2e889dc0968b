use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum SpectrumError {
    NoFrames,
    NoSamples,
    RowLength {
        table: &'static str,
        frame: usize,
        expected: usize,
        found: usize,
    },
    ClippedFrames {
        expected: usize,
        found: usize,
    },
    NotIncreasing {
        index: usize,
    },
    NonFinite {
        frame: Option<usize>,
        index: usize,
    },
}

impl std::fmt::Display for SpectrumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumError::NoFrames => write!(f, "spectrum has no frames"),
            SpectrumError::NoSamples => write!(f, "spectrum has no wavelength samples"),
            SpectrumError::RowLength {
                table,
                frame,
                expected,
                found,
            } => write!(
                f,
                "{table} frame {frame}: expected {expected} samples, got {found}"
            ),
            SpectrumError::ClippedFrames { expected, found } => write!(
                f,
                "clipped table has {found} frames, intensity table has {expected}"
            ),
            SpectrumError::NotIncreasing { index } => {
                write!(f, "wavelength[{index}] is not greater than its predecessor")
            }
            SpectrumError::NonFinite {
                frame: Some(frame),
                index,
            } => write!(f, "intensity[{frame}][{index}] is not finite"),
            SpectrumError::NonFinite { frame: None, index } => {
                write!(f, "wavelength[{index}] is not finite")
            }
        }
    }
}

impl std::error::Error for SpectrumError {}

/// A spectrometer measurement: one wavelength axis shared by a series of
/// frames, each with a parallel clipped-flag row.
///
/// Shape invariants are checked on construction and on deserialization, so
/// a `Spectrum` in hand always has at least one frame and rectangular tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpectrum", into = "RawSpectrum")]
pub struct Spectrum {
    wavelength: Vec<f64>,
    intensity: Vec<Vec<f64>>,
    clipped: Vec<Vec<bool>>,
    exposure_ms: f64,
}

#[derive(Serialize, Deserialize)]
struct RawSpectrum {
    wavelength: Vec<f64>,
    intensity: Vec<Vec<f64>>,
    #[serde(default)]
    clipped: Vec<Vec<bool>>,
    #[serde(default)]
    exposure_ms: f64,
}

impl TryFrom<RawSpectrum> for Spectrum {
    type Error = SpectrumError;

    fn try_from(raw: RawSpectrum) -> Result<Self, Self::Error> {
        if raw.clipped.is_empty() {
            Spectrum::from_frames(raw.wavelength, raw.intensity, raw.exposure_ms)
        } else {
            Spectrum::new(raw.wavelength, raw.intensity, raw.clipped, raw.exposure_ms)
        }
    }
}

impl From<Spectrum> for RawSpectrum {
    fn from(s: Spectrum) -> Self {
        RawSpectrum {
            wavelength: s.wavelength,
            intensity: s.intensity,
            clipped: s.clipped,
            exposure_ms: s.exposure_ms,
        }
    }
}

impl Spectrum {
    pub fn new(
        wavelength: Vec<f64>,
        intensity: Vec<Vec<f64>>,
        clipped: Vec<Vec<bool>>,
        exposure_ms: f64,
    ) -> Result<Self, SpectrumError> {
        if wavelength.is_empty() {
            return Err(SpectrumError::NoSamples);
        }
        if intensity.is_empty() {
            return Err(SpectrumError::NoFrames);
        }
        if let Some(index) = wavelength.iter().position(|wl| !wl.is_finite()) {
            return Err(SpectrumError::NonFinite { frame: None, index });
        }
        if let Some(index) = wavelength.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SpectrumError::NotIncreasing { index: index + 1 });
        }
        if clipped.len() != intensity.len() {
            return Err(SpectrumError::ClippedFrames {
                expected: intensity.len(),
                found: clipped.len(),
            });
        }

        let expected = wavelength.len();
        for (frame, (row, flags)) in intensity.iter().zip(&clipped).enumerate() {
            if row.len() != expected {
                return Err(SpectrumError::RowLength {
                    table: "intensity",
                    frame,
                    expected,
                    found: row.len(),
                });
            }
            if flags.len() != expected {
                return Err(SpectrumError::RowLength {
                    table: "clipped",
                    frame,
                    expected,
                    found: flags.len(),
                });
            }
            if let Some(index) = row.iter().position(|v| !v.is_finite()) {
                return Err(SpectrumError::NonFinite {
                    frame: Some(frame),
                    index,
                });
            }
        }

        Ok(Self {
            wavelength,
            intensity,
            clipped,
            exposure_ms,
        })
    }

    /// Build a spectrum with no clipped samples.
    pub fn from_frames(
        wavelength: Vec<f64>,
        intensity: Vec<Vec<f64>>,
        exposure_ms: f64,
    ) -> Result<Self, SpectrumError> {
        let clipped = intensity.iter().map(|row| vec![false; row.len()]).collect();
        Self::new(wavelength, intensity, clipped, exposure_ms)
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn intensity(&self) -> &[Vec<f64>] {
        &self.intensity
    }

    pub fn clipped(&self) -> &[Vec<bool>] {
        &self.clipped
    }

    pub fn exposure_ms(&self) -> f64 {
        self.exposure_ms
    }

    pub fn n_frames(&self) -> usize {
        self.intensity.len()
    }

    pub fn n_samples(&self) -> usize {
        self.wavelength.len()
    }

    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        self.intensity.get(index).map(Vec::as_slice)
    }

    pub fn last_frame(&self) -> &[f64] {
        // Non-empty by construction.
        &self.intensity[self.intensity.len() - 1]
    }

    /// Per-wavelength mean over all frames.
    pub fn mean_intensity(&self) -> Vec<f64> {
        let n = self.n_frames() as f64;
        let mut mean = vec![0.0; self.n_samples()];
        for row in &self.intensity {
            for (acc, v) in mean.iter_mut().zip(row) {
                *acc += v;
            }
        }
        for acc in &mut mean {
            *acc /= n;
        }
        mean
    }

    /// Number of clipped samples across all frames.
    pub fn clipped_count(&self) -> usize {
        self.clipped
            .iter()
            .map(|row| row.iter().filter(|&&c| c).count())
            .sum()
    }

    /// Wavelength of the largest time-averaged sample. The first maximum wins.
    pub fn peak_wavelength(&self) -> f64 {
        let mean = self.mean_intensity();
        let mut best = 0;
        for (i, v) in mean.iter().enumerate() {
            if *v > mean[best] {
                best = i;
            }
        }
        self.wavelength[best]
    }
}
