use std::path::Path;

use colorimetry_data::{NamedTable, load_columns_from_file, load_named_from_file};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::{AnalysisError, AnalysisResult};
use crate::grid::Band;

/// CIE 1931 2-degree standard observer color matching functions.
/// 5nm steps, 380-780nm. Each entry: (wavelength_nm, x_bar, y_bar, z_bar).
///
/// Source: the 5 nm rows of CIE 018:2019 (DOI: 10.25039/CIE.DS.xvudnb9b).
/// Between rows the 1 nm curve is a linear interpolation, so 1 nm sums are
/// slightly off the official 1 nm table. Load that table at runtime with
/// [`ReferenceTables::load_dir`] where it matters.
const CIE_1931_DATA: [(f32, f64, f64, f64); 81] =
    cie_data::cie_1931_table!("data/cie_1931_2deg_5nm.csv");

/// CIE 1951 scotopic luminous efficiency V'(λ), 10nm steps, 380-780nm.
const SCOTOPIC_DATA: [(f32, f64); 41] =
    cie_data::scotopic_table!("data/cie_1951_scotopic_10nm.csv");

/// CIE daylight components S0, S1, S2, 10nm steps, 380-780nm.
const DAYLIGHT_DATA: [(f32, f64, f64, f64); 41] =
    cie_data::cie_daylight_table!("data/cie_daylight_basis_10nm.csv");

/// CIE 13.3 test color samples TCS01-TCS08, 5nm steps, 380-780nm.
const TCS_DATA: ([&str; 8], [(f32, [f64; 8]); 81]) =
    cie_data::reflectance_table!("data/cie_13_3_tcs_5nm.csv");

/// Range covered by the analytic color matching functions.
const ANALYTIC_CMF_RANGE: (u32, u32) = (360, 830);

/// Where the color matching functions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum CmfSource {
    #[default]
    #[strum(serialize = "tabulated")]
    Tabulated,
    #[strum(serialize = "analytic")]
    Analytic,
}

/// A tabulated curve expanded to one entry per integer wavelength by linear
/// interpolation. Entries cover `[start_nm, start_nm + values.len())`.
#[derive(Debug, Clone, PartialEq)]
struct Curve<const N: usize> {
    start_nm: u32,
    values: Vec<[f64; N]>,
}

impl<const N: usize> Curve<N> {
    /// `points` must be sorted by wavelength with at least two entries.
    fn interpolate(points: &[(f64, [f64; N])]) -> Self {
        let first = points[0].0;
        let last = points[points.len() - 1].0;
        let start_nm = first.ceil().max(0.0) as u32;
        let end_nm = last.floor().max(0.0) as u32;

        let mut segment = 0usize;
        let mut values = Vec::with_capacity((end_nm + 1).saturating_sub(start_nm) as usize);
        for wl in start_nm..=end_nm {
            let t = wl as f64;
            while segment + 2 < points.len() && points[segment + 1].0 <= t {
                segment += 1;
            }
            let (x0, y0) = points[segment];
            let (x1, y1) = points[segment + 1];
            let f = ((t - x0) / (x1 - x0)).clamp(0.0, 1.0);
            let mut v = [0.0; N];
            for k in 0..N {
                v[k] = y0[k] + f * (y1[k] - y0[k]);
            }
            values.push(v);
        }

        Self { start_nm, values }
    }

    fn from_fn(start_nm: u32, end_nm: u32, f: impl Fn(f64) -> [f64; N]) -> Self {
        Self {
            start_nm,
            values: (start_nm..=end_nm).map(|wl| f(wl as f64)).collect(),
        }
    }

    /// Exclusive end of the covered range.
    fn end_nm(&self) -> u32 {
        self.start_nm + self.values.len() as u32
    }

    fn covers(&self, band: Band) -> bool {
        self.start_nm <= band.min_nm && self.end_nm() >= band.max_nm
    }

    fn get(&self, wavelength_nm: u32) -> Option<[f64; N]> {
        let offset = wavelength_nm.checked_sub(self.start_nm)?;
        self.values.get(offset as usize).copied()
    }

    fn at(&self, wavelength_nm: u32) -> [f64; N] {
        self.values[(wavelength_nm - self.start_nm) as usize]
    }

    fn check(&self, what: &str, band: Band) -> AnalysisResult<()> {
        if self.covers(band) {
            Ok(())
        } else {
            Err(AnalysisError::shape(
                what,
                format!(
                    "covers [{}, {}) nm, band {band} requested",
                    self.start_nm,
                    self.end_nm()
                ),
            ))
        }
    }
}

/// A named reflectance (spectral radiance factor) curve.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflectance {
    name: String,
    curve: Curve<1>,
}

impl Reflectance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, wavelength_nm: u32) -> Option<f64> {
        self.curve.get(wavelength_nm).map(|[v]| v)
    }

    pub(crate) fn at(&self, wavelength_nm: u32) -> f64 {
        self.curve.at(wavelength_nm)[0]
    }
}

/// Immutable reference data shared by every analysis: color matching
/// functions, scotopic efficiency, test color reflectances, and the daylight
/// basis, all on a dense 1 nm grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTables {
    cmf: Curve<3>,
    scotopic: Curve<1>,
    daylight: Curve<3>,
    reflectances: Vec<Reflectance>,
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceTables {
    /// Tables baked into the binary at compile time.
    pub fn builtin() -> Self {
        let cmf: Vec<(f64, [f64; 3])> = CIE_1931_DATA
            .iter()
            .map(|&(wl, x, y, z)| (wl as f64, [x, y, z]))
            .collect();
        let scotopic: Vec<(f64, [f64; 1])> = SCOTOPIC_DATA
            .iter()
            .map(|&(wl, v)| (wl as f64, [v]))
            .collect();
        let daylight: Vec<(f64, [f64; 3])> = DAYLIGHT_DATA
            .iter()
            .map(|&(wl, s0, s1, s2)| (wl as f64, [s0, s1, s2]))
            .collect();

        let (names, rows) = &TCS_DATA;
        let reflectances = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let points: Vec<(f64, [f64; 1])> =
                    rows.iter().map(|(wl, r)| (*wl as f64, [r[i]])).collect();
                Reflectance {
                    name: (*name).to_string(),
                    curve: Curve::interpolate(&points),
                }
            })
            .collect();

        Self {
            cmf: Curve::interpolate(&cmf),
            scotopic: Curve::interpolate(&scotopic),
            daylight: Curve::interpolate(&daylight),
            reflectances,
        }
    }

    /// Build tables from CSV text. The daylight basis is optional and falls
    /// back to the built-in one.
    pub fn from_csv(
        cmf_csv: &str,
        scotopic_csv: &str,
        reflectance_csv: &str,
        daylight_csv: Option<&str>,
    ) -> AnalysisResult<Self> {
        let cmf = colorimetry_data::parse_columns(cmf_csv, 4)?;
        let scotopic = colorimetry_data::parse_columns(scotopic_csv, 2)?;
        let reflectances = colorimetry_data::parse_named_columns(reflectance_csv)?;
        let daylight = daylight_csv
            .map(|text| colorimetry_data::parse_columns(text, 4))
            .transpose()?;
        Ok(Self::from_parts(cmf, scotopic, reflectances, daylight))
    }

    /// Load `cmf.csv`, `scotopic.csv`, `reflectances.csv` and, if present,
    /// `daylight.csv` from a directory.
    pub fn load_dir(dir: &Path) -> AnalysisResult<Self> {
        let cmf = load_columns_from_file(&dir.join("cmf.csv"), 4)?;
        let scotopic = load_columns_from_file(&dir.join("scotopic.csv"), 2)?;
        let reflectances = load_named_from_file(&dir.join("reflectances.csv"))?;
        let daylight_path = dir.join("daylight.csv");
        let daylight = if daylight_path.exists() {
            Some(load_columns_from_file(&daylight_path, 4)?)
        } else {
            None
        };
        tracing::debug!(
            dir = %dir.display(),
            samples = reflectances.names.len(),
            "loaded reference tables"
        );
        Ok(Self::from_parts(cmf, scotopic, reflectances, daylight))
    }

    fn from_parts(
        cmf: Vec<Vec<f64>>,
        scotopic: Vec<Vec<f64>>,
        reflectances: NamedTable,
        daylight: Option<Vec<Vec<f64>>>,
    ) -> Self {
        let triples = |rows: &[Vec<f64>]| -> Vec<(f64, [f64; 3])> {
            rows.iter()
                .map(|r| (r[0], [r[1], r[2], r[3]]))
                .collect()
        };
        let scotopic: Vec<(f64, [f64; 1])> = scotopic.iter().map(|r| (r[0], [r[1]])).collect();

        let reflectances = reflectances
            .names
            .iter()
            .zip(&reflectances.columns)
            .map(|(name, column)| {
                let points: Vec<(f64, [f64; 1])> = reflectances
                    .wavelengths
                    .iter()
                    .zip(column)
                    .map(|(wl, r)| (*wl, [*r]))
                    .collect();
                Reflectance {
                    name: name.clone(),
                    curve: Curve::interpolate(&points),
                }
            })
            .collect();

        let daylight = match daylight {
            Some(rows) => Curve::interpolate(&triples(&rows)),
            None => Self::builtin().daylight,
        };

        Self {
            cmf: Curve::interpolate(&triples(&cmf)),
            scotopic: Curve::interpolate(&scotopic),
            daylight,
            reflectances,
        }
    }

    /// Replace the tabulated color matching functions with the multi-lobe
    /// Gaussian fit of Wyman, Sloan and Shirley (JCGT 2013).
    pub fn with_analytic_cmf(mut self) -> Self {
        let (start, end) = ANALYTIC_CMF_RANGE;
        self.cmf = Curve::from_fn(start, end, analytic_cmf);
        self
    }

    pub fn with_cmf(self, source: CmfSource) -> Self {
        match source {
            CmfSource::Tabulated => self,
            CmfSource::Analytic => self.with_analytic_cmf(),
        }
    }

    /// Keep only the named reflectances, in the given order.
    pub fn with_reflectances(mut self, names: &[&str]) -> AnalysisResult<Self> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let found = self
                .reflectances
                .iter()
                .find(|r| r.name == *name)
                .ok_or_else(|| AnalysisError::shape("reflectances", format!("no sample {name}")))?;
            selected.push(found.clone());
        }
        self.reflectances = selected;
        Ok(self)
    }

    pub fn cmf(&self, wavelength_nm: u32) -> Option<[f64; 3]> {
        self.cmf.get(wavelength_nm)
    }

    pub fn scotopic(&self, wavelength_nm: u32) -> Option<f64> {
        self.scotopic.get(wavelength_nm).map(|[v]| v)
    }

    pub fn daylight_basis(&self, wavelength_nm: u32) -> Option<[f64; 3]> {
        self.daylight.get(wavelength_nm)
    }

    pub fn reflectances(&self) -> &[Reflectance] {
        &self.reflectances
    }

    pub(crate) fn cmf_at(&self, wavelength_nm: u32) -> [f64; 3] {
        self.cmf.at(wavelength_nm)
    }

    pub(crate) fn scotopic_at(&self, wavelength_nm: u32) -> f64 {
        self.scotopic.at(wavelength_nm)[0]
    }

    pub(crate) fn daylight_at(&self, wavelength_nm: u32) -> [f64; 3] {
        self.daylight.at(wavelength_nm)
    }

    pub fn check_cmf(&self, band: Band) -> AnalysisResult<()> {
        self.cmf.check("color matching functions", band)
    }

    pub fn check_scotopic(&self, band: Band) -> AnalysisResult<()> {
        self.scotopic.check("scotopic efficiency", band)
    }

    pub fn check_daylight(&self, band: Band) -> AnalysisResult<()> {
        self.daylight.check("daylight basis", band)
    }

    pub fn check_reflectances(&self, band: Band) -> AnalysisResult<()> {
        if self.reflectances.is_empty() {
            return Err(AnalysisError::shape("reflectances", "no test color samples"));
        }
        for r in &self.reflectances {
            r.curve.check(&format!("reflectance {}", r.name), band)?;
        }
        Ok(())
    }
}

fn lobe(wl: f64, mu: f64, sigma_lo: f64, sigma_hi: f64) -> f64 {
    let sigma = if wl < mu { sigma_lo } else { sigma_hi };
    let t = (wl - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// Multi-lobe Gaussian approximation of the CIE 1931 2-degree observer.
pub fn analytic_cmf(wl: f64) -> [f64; 3] {
    let x = 1.056 * lobe(wl, 599.8, 37.9, 31.0) + 0.362 * lobe(wl, 442.0, 16.0, 26.7)
        - 0.065 * lobe(wl, 501.1, 20.4, 26.2);
    let y = 0.821 * lobe(wl, 568.8, 46.9, 40.5) + 0.286 * lobe(wl, 530.9, 16.3, 31.1);
    let z = 1.217 * lobe(wl, 437.0, 11.8, 36.0) + 0.681 * lobe(wl, 459.0, 26.0, 13.8);
    [x, y, z]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_cmf_interpolates_to_one_nm() {
        let t = ReferenceTables::builtin();
        assert_eq!(t.cmf(555), Some([0.51205, 1.0, 0.00575]));
        let [x, _, _] = t.cmf(557).unwrap();
        // 2/5 of the way from 555 to 560.
        let expected = 0.51205 + 0.4 * (0.5945 - 0.51205);
        assert!((x - expected).abs() < 1e-12, "x_bar(557) = {x}");
        assert_eq!(t.cmf(379), None);
        assert!(t.cmf(780).is_some());
        assert_eq!(t.cmf(781), None);
    }

    #[test]
    fn builtin_has_eight_test_colors() {
        let t = ReferenceTables::builtin();
        let names: Vec<&str> = t.reflectances().iter().map(|r| r.name()).collect();
        assert_eq!(names.len(), 8);
        assert_eq!(names[0], "TCS01");
        assert_eq!(names[7], "TCS08");
        assert!((t.reflectances()[0].get(400).unwrap() - 0.256).abs() < 1e-12);
    }

    #[test]
    fn scotopic_peaks_near_507nm() {
        let t = ReferenceTables::builtin();
        let peak = (380..=780)
            .max_by(|a, b| {
                t.scotopic(*a)
                    .unwrap()
                    .partial_cmp(&t.scotopic(*b).unwrap())
                    .unwrap()
            })
            .unwrap();
        assert!((500..=515).contains(&peak), "peak at {peak}");
    }

    #[test]
    fn coverage_checks_report_data_shape() {
        let t = ReferenceTables::builtin();
        assert!(t.check_cmf(Band::new(380, 781).unwrap()).is_ok());
        let err = t.check_cmf(Band::new(360, 700).unwrap()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataShape);
        assert!(t.check_reflectances(Band::new(400, 782).unwrap()).is_err());
    }

    #[test]
    fn analytic_cmf_tracks_tabulated_peaks() {
        let [x, y, z] = analytic_cmf(555.0);
        assert!((y - 1.0).abs() < 0.05, "y_bar(555) = {y}");
        assert!((x - 0.512).abs() < 0.05, "x_bar(555) = {x}");
        assert!(z < 0.02);
        let t = ReferenceTables::builtin().with_analytic_cmf();
        assert!(t.check_cmf(Band::new(360, 831).unwrap()).is_ok());
    }

    #[test]
    fn runtime_tables_from_csv() {
        let cmf = "400,0.1,0.2,0.3\n410,0.2,0.4,0.6\n";
        let scotopic = "400,0.5\n410,1.0\n";
        let refl = "wavelength_nm,A\n400,0.5\n410,0.7\n";
        let t = ReferenceTables::from_csv(cmf, scotopic, refl, None).unwrap();
        let [x, y, z] = t.cmf(405).unwrap();
        assert!((x - 0.15).abs() < 1e-12);
        assert!((y - 0.3).abs() < 1e-12);
        assert!((z - 0.45).abs() < 1e-12);
        assert!((t.scotopic(405).unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(t.reflectances()[0].name(), "A");
        assert!(t.check_daylight(Band::new(400, 700).unwrap()).is_ok());
    }

    #[test]
    fn one_nm_table_is_used_verbatim() {
        // Curved on purpose: linear interpolation from 5 nm rows would miss it.
        let cmf: String = (400..=420)
            .map(|wl| {
                let t = f64::from(wl - 400);
                format!("{wl},{},{},{}\n", t * t, 1.0, 400.0 - t * t)
            })
            .collect();
        let scotopic = "400,1.0\n420,1.0\n";
        let refl = "wavelength_nm,A\n400,1\n420,1\n";
        let t = ReferenceTables::from_csv(&cmf, scotopic, refl, None).unwrap();
        for wl in 400..=420 {
            let d = f64::from(wl - 400);
            assert_eq!(t.cmf(wl), Some([d * d, 1.0, 400.0 - d * d]), "{wl} nm");
        }
    }

    #[test]
    fn select_reflectances_by_name() {
        let t = ReferenceTables::builtin()
            .with_reflectances(&["TCS03", "TCS01"])
            .unwrap();
        let names: Vec<&str> = t.reflectances().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["TCS03", "TCS01"]);
        assert!(ReferenceTables::builtin().with_reflectances(&["R99"]).is_err());
    }
}
