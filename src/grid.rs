use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Half-open integer wavelength band `[min_nm, max_nm)` on a 1 nm grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Band {
    pub min_nm: u32,
    pub max_nm: u32,
}

impl Default for Band {
    fn default() -> Self {
        Self {
            min_nm: 400,
            max_nm: 780,
        }
    }
}

impl Band {
    pub fn new(min_nm: u32, max_nm: u32) -> AnalysisResult<Self> {
        let band = Self { min_nm, max_nm };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.min_nm >= self.max_nm {
            return Err(AnalysisError::shape(
                "band",
                format!("empty band [{}, {})", self.min_nm, self.max_nm),
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.max_nm.saturating_sub(self.min_nm) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, wavelength_nm: u32) -> bool {
        (self.min_nm..self.max_nm).contains(&wavelength_nm)
    }

    /// Every `step_nm`-th wavelength of the band, starting at `min_nm`.
    pub fn stepped(&self, step_nm: u32) -> impl Iterator<Item = u32> + use<> {
        (self.min_nm..self.max_nm).step_by(step_nm.max(1) as usize)
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}) nm", self.min_nm, self.max_nm)
    }
}

/// One value per integer wavelength of a [`Band`], stored densely and
/// indexed by `wavelength - min_nm`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapedSpectrum {
    band: Band,
    values: Vec<f64>,
}

impl ReshapedSpectrum {
    pub fn from_fn(band: Band, mut f: impl FnMut(u32) -> f64) -> Self {
        let values = (band.min_nm..band.max_nm).map(&mut f).collect();
        Self { band, values }
    }

    pub(crate) fn from_values(band: Band, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), band.len());
        Self { band, values }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, wavelength_nm: u32) -> Option<f64> {
        if !self.band.contains(wavelength_nm) {
            return None;
        }
        self.values
            .get((wavelength_nm - self.band.min_nm) as usize)
            .copied()
    }

    /// Value at a wavelength known to lie inside the band.
    pub(crate) fn at(&self, wavelength_nm: u32) -> f64 {
        self.values[(wavelength_nm - self.band.min_nm) as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        (self.band.min_nm..).zip(self.values.iter().copied())
    }
}
