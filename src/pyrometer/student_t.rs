//! Student's t distribution via the regularized incomplete beta function.

use crate::error::{AnalysisError, AnalysisResult};

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_13,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection.
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let a = LANCZOS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS[0], |acc, (i, c)| acc + c / (x + i as f64));
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Continued fraction for the incomplete beta function (modified Lentz).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta `I_x(a, b)`.
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln())
        .exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Cumulative distribution of Student's t with `df` degrees of freedom.
pub fn cdf(t: f64, df: f64) -> f64 {
    let tail = 0.5 * incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t >= 0.0 { 1.0 - tail } else { tail }
}

/// Inverse of [`cdf`]: the `t` with `cdf(t, df) = p`.
pub fn quantile(p: f64, df: f64) -> AnalysisResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::shape(
            "t quantile",
            format!("probability {p} outside (0, 1)"),
        ));
    }
    if !(df > 0.0) {
        return Err(AnalysisError::degenerate("degrees of freedom", df));
    }
    if p < 0.5 {
        return quantile(1.0 - p, df).map(|t| -t);
    }
    if p == 0.5 {
        return Ok(0.0);
    }

    let mut lo = 0.0;
    let mut hi = 1.0;
    while cdf(hi, df) < p {
        lo = hi;
        hi *= 2.0;
        if hi > 1e12 {
            return Err(AnalysisError::degenerate("t quantile", hi));
        }
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if cdf(mid, df) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-12 * hi.max(1.0) {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_gamma_matches_factorials() {
        // Γ(5) = 24, Γ(0.5) = √π.
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-12);
    }

    #[test]
    fn cdf_is_symmetric() {
        for df in [1.0, 3.0, 30.0] {
            assert!((cdf(0.0, df) - 0.5).abs() < 1e-12);
            let p = cdf(1.3, df);
            assert!((p + cdf(-1.3, df) - 1.0).abs() < 1e-12, "df {df}");
        }
    }

    #[test]
    fn two_sided_95_percent_quantiles() {
        // Published critical values.
        for (df, expected) in [(1.0, 12.706), (2.0, 4.303), (10.0, 2.228), (30.0, 2.042)] {
            let t = quantile(0.975, df).unwrap();
            assert!((t - expected).abs() < 1e-3, "df {df}: t = {t}");
        }
        let t = quantile(0.975, 1000.0).unwrap();
        assert!((t - 1.962).abs() < 1e-3, "df 1000: t = {t}");
    }

    #[test]
    fn lower_tail_is_negated() {
        let hi = quantile(0.9, 5.0).unwrap();
        let lo = quantile(0.1, 5.0).unwrap();
        assert!((hi + lo).abs() < 1e-9);
    }

    #[test]
    fn invalid_arguments() {
        assert!(quantile(1.0, 5.0).is_err());
        assert!(quantile(0.0, 5.0).is_err());
        assert!(quantile(0.9, 0.0).is_err());
    }
}
