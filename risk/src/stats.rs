//! Statistics kernel
//!
//! Sample moments, covariance/correlation, an inverse normal CDF
//! approximation and a Box-Muller normal draw. Everything here is a pure
//! function of its inputs; the only randomness comes from the generator the
//! caller passes in.

use crate::error::{Result, RiskError};
use rand::Rng;
use std::f64::consts::PI;

// Acklam's rational approximation coefficients
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

/// Arithmetic mean
pub fn mean(xs: &[f64]) -> Result<f64> {
    if xs.is_empty() {
        return Err(RiskError::InsufficientData(
            "Mean requires at least 1 observation".to_string(),
        ));
    }
    Ok(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample variance (divisor n-1)
pub fn variance(xs: &[f64]) -> Result<f64> {
    if xs.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "Variance requires at least 2 observations, got {}",
            xs.len()
        )));
    }
    let m = mean(xs)?;
    let sum_sq: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    Ok(sum_sq / (xs.len() - 1) as f64)
}

/// Sample standard deviation
pub fn std_dev(xs: &[f64]) -> Result<f64> {
    Ok(variance(xs)?.sqrt())
}

/// Sample covariance of two equal-length series
pub fn covariance(xs: &[f64], ys: &[f64]) -> Result<f64> {
    if xs.len() != ys.len() {
        return Err(RiskError::LengthMismatch {
            left: xs.len(),
            right: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Err(RiskError::InsufficientData(format!(
            "Covariance requires at least 2 observations, got {}",
            xs.len()
        )));
    }

    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;
    let sum: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    Ok(sum / (xs.len() - 1) as f64)
}

/// Pearson correlation
///
/// Returns 0 when either series has zero standard deviation. That is a
/// convention for constant series, not a true correlation.
pub fn correlation(xs: &[f64], ys: &[f64]) -> Result<f64> {
    let cov = covariance(xs, ys)?;
    let std_x = std_dev(xs)?;
    let std_y = std_dev(ys)?;

    if std_x == 0.0 || std_y == 0.0 {
        return Ok(0.0);
    }

    Ok(cov / (std_x * std_y))
}

/// Inverse of the standard normal CDF
///
/// Rational approximation with a relative error around 1e-9, split into a
/// central region and two tails at `p = 0.02425`. Defined only for `p` in
/// the open interval (0, 1).
pub fn inverse_normal_cdf(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(RiskError::InvalidProbability(p));
    }

    let z = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        tail(q)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -tail(q)
    };

    Ok(z)
}

fn tail(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

/// Draw from N(mean, std) with the Box-Muller transform
///
/// Uniform draws of exactly zero are rejected and redrawn so `ln(u)` stays
/// finite.
pub fn normal_random<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let u = nonzero_uniform(rng);
    let v = nonzero_uniform(rng);
    let z = (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos();
    z * std + mean
}

fn nonzero_uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u != 0.0 {
            return u;
        }
    }
}
