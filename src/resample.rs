use colorimetry_data::Spectrum;

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::{Band, ReshapedSpectrum};

/// How far (nm) the outermost source samples may sit inside the band edges
/// and still count as covering them.
pub const COVERAGE_TOLERANCE_NM: f64 = 0.5;

/// Nearest-neighbour resample of `samples` (parallel to `wavelength`, which
/// must be strictly increasing) onto the 1 nm grid of `band`.
///
/// A pointer walks the source axis once: for each target wavelength it
/// advances while the next source sample is strictly closer, then takes the
/// sample under the pointer. Sources coarser than 1 nm therefore replicate
/// one sample over several targets.
pub fn reshape(
    wavelength: &[f64],
    samples: &[f64],
    band: Band,
) -> AnalysisResult<ReshapedSpectrum> {
    band.validate()?;
    if wavelength.len() != samples.len() {
        return Err(AnalysisError::shape(
            "spectrum",
            format!(
                "{} wavelengths but {} samples",
                wavelength.len(),
                samples.len()
            ),
        ));
    }
    let (Some(&first), Some(&last)) = (wavelength.first(), wavelength.last()) else {
        return Err(AnalysisError::shape("spectrum", "no samples to resample"));
    };

    let lowest_target = band.min_nm as f64;
    let highest_target = (band.max_nm - 1) as f64;
    if first > lowest_target + COVERAGE_TOLERANCE_NM
        || last < highest_target - COVERAGE_TOLERANCE_NM
    {
        return Err(AnalysisError::BandNotCovered {
            min_nm: band.min_nm,
            max_nm: band.max_nm,
            source_min_nm: first,
            source_max_nm: last,
        });
    }

    let mut nearest = 0usize;
    let mut values = Vec::with_capacity(band.len());
    for target in band.min_nm..band.max_nm {
        let t = target as f64;
        while nearest + 1 < wavelength.len()
            && (wavelength[nearest + 1] - t).abs() < (wavelength[nearest] - t).abs()
        {
            nearest += 1;
        }
        values.push(samples[nearest]);
    }

    Ok(ReshapedSpectrum::from_values(band, values))
}

/// Resample the time-averaged intensity of `spectrum`.
pub fn reshape_mean(spectrum: &Spectrum, band: Band) -> AnalysisResult<ReshapedSpectrum> {
    reshape(spectrum.wavelength(), &spectrum.mean_intensity(), band)
}

/// Resample a single frame of `spectrum`.
pub fn reshape_frame(
    spectrum: &Spectrum,
    frame: usize,
    band: Band,
) -> AnalysisResult<ReshapedSpectrum> {
    let samples = spectrum.frame(frame).ok_or_else(|| {
        AnalysisError::shape(
            "spectrum",
            format!("frame {frame} out of range ({} frames)", spectrum.n_frames()),
        )
    })?;
    reshape(spectrum.wavelength(), samples, band)
}
