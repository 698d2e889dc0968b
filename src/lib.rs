//! Spectral colorimetry and pyrometry.
//!
//! Spectrometer measurements ([`Spectrum`]) are resampled onto a 1 nm grid
//! and reduced to CIE 1931 tristimulus values, chromaticity, correlated color
//! temperature, the CIE 13.3 color rendering index and a scotopic flicker
//! index. A Wien-law pyrometer recovers blackbody temperatures with
//! confidence bounds from calibrated spectra.

pub mod analysis;
pub mod colorimetry;
pub mod config;
pub mod error;
pub mod flicker;
pub mod grid;
pub mod pyrometer;
pub mod resample;
pub mod tables;

pub use analysis::{Analyzer, ColorimetricResult};
pub use colorimetry_data::Spectrum;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult, ErrorKind};
pub use grid::{Band, ReshapedSpectrum};
pub use pyrometer::{FitWindow, Pyrometer, ThermalResult};
pub use tables::ReferenceTables;
