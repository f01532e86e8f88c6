//! ARMA parameters and their stability-preserving parametrization.
//!
//! Each polynomial `1 + c1 B + ... + cp B^p` is mapped to `p` partial
//! autocorrelations `r_k = tanh(u_k)` through the Durbin-Levinson
//! recursion. Any real vector `u` therefore yields a stationary
//! (resp. invertible) polynomial, which lets the optimizer work without
//! constraints.

use super::polynomial::BackshiftPolynomial;
use super::spec::SarimaSpec;
use serde::{Deserialize, Serialize};

/// Partial autocorrelation of the MA starting values.
const MA_START_PACF: f64 = 0.3;

/// Polynomial coefficients `c` from partial autocorrelations `r`.
pub fn pacf_to_coefficients(pacf: &[f64]) -> Vec<f64> {
    let mut a: Vec<f64> = Vec::with_capacity(pacf.len());
    for (j, &r) in pacf.iter().enumerate() {
        let previous = a.clone();
        for i in 0..j {
            a[i] = previous[i] - r * previous[j - 1 - i];
        }
        a.push(r);
    }
    a.iter().map(|v| -v).collect()
}

/// Partial autocorrelations from polynomial coefficients.
///
/// Returns `None` when the polynomial has a root on or inside the unit circle.
pub fn coefficients_to_pacf(coefficients: &[f64]) -> Option<Vec<f64>> {
    let p = coefficients.len();
    let mut a: Vec<f64> = coefficients.iter().map(|c| -c).collect();
    let mut pacf = vec![0.0; p];
    for j in (0..p).rev() {
        let r = a[j];
        if !r.is_finite() || r.abs() >= 1.0 {
            return None;
        }
        pacf[j] = r;
        let denom = 1.0 - r * r;
        let previous = a.clone();
        for i in 0..j {
            a[i] = (previous[i] + r * previous[j - 1 - i]) / denom;
        }
        a.truncate(j);
    }
    Some(pacf)
}

/// Coefficients of the four ARMA polynomials of a SARIMA model.
///
/// Conventions: `Phi(B) = 1 + phi_1 B + ...`, `Theta(B) = 1 + theta_1 B + ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmaParameters {
    /// Regular AR coefficients.
    pub phi: Vec<f64>,
    /// Seasonal AR coefficients.
    pub bphi: Vec<f64>,
    /// Regular MA coefficients.
    pub theta: Vec<f64>,
    /// Seasonal MA coefficients.
    pub btheta: Vec<f64>,
    /// Seasonal period.
    pub period: usize,
}

impl ArmaParameters {
    /// Starting values: zero AR terms, MA terms with first partial
    /// autocorrelation 0.3 (`theta_1 = -0.3`).
    pub fn initial(spec: &SarimaSpec) -> Self {
        let ma_start = |order: usize| {
            let mut pacf = vec![0.0; order];
            if let Some(first) = pacf.first_mut() {
                *first = MA_START_PACF;
            }
            pacf_to_coefficients(&pacf)
        };
        Self {
            phi: vec![0.0; spec.p],
            bphi: vec![0.0; spec.cap_p],
            theta: ma_start(spec.q),
            btheta: ma_start(spec.cap_q),
            period: spec.period,
        }
    }

    /// Whether these parameters have the ARMA orders of `spec`.
    pub fn matches(&self, spec: &SarimaSpec) -> bool {
        self.period == spec.period
            && self.phi.len() == spec.p
            && self.bphi.len() == spec.cap_p
            && self.theta.len() == spec.q
            && self.btheta.len() == spec.cap_q
    }

    /// Number of free parameters.
    pub fn len(&self) -> usize {
        self.phi.len() + self.bphi.len() + self.theta.len() + self.btheta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build from unconstrained values ordered `[phi, bphi, theta, btheta]`.
    pub fn from_unconstrained(spec: &SarimaSpec, values: &[f64]) -> Self {
        let mut offset = 0;
        let mut next = |order: usize| {
            let pacf: Vec<f64> = values[offset..offset + order].iter().map(|u| u.tanh()).collect();
            offset += order;
            pacf_to_coefficients(&pacf)
        };
        let phi = next(spec.p);
        let bphi = next(spec.cap_p);
        let theta = next(spec.q);
        let btheta = next(spec.cap_q);
        Self {
            phi,
            bphi,
            theta,
            btheta,
            period: spec.period,
        }
    }

    /// Unconstrained values ordered `[phi, bphi, theta, btheta]`.
    ///
    /// Returns `None` if a polynomial is not strictly stationary/invertible.
    pub fn to_unconstrained(&self) -> Option<Vec<f64>> {
        let mut values = Vec::with_capacity(self.len());
        for coefficients in [&self.phi, &self.bphi, &self.theta, &self.btheta] {
            let pacf = coefficients_to_pacf(coefficients)?;
            values.extend(pacf.iter().map(|r| r.atanh()));
        }
        Some(values)
    }

    /// Largest absolute partial autocorrelation of the AR polynomials.
    pub fn max_ar_pacf(&self) -> f64 {
        [&self.phi, &self.bphi]
            .iter()
            .map(|c| match coefficients_to_pacf(c) {
                Some(pacf) => pacf.iter().fold(0.0, |m: f64, r| m.max(r.abs())),
                None => 1.0,
            })
            .fold(0.0, f64::max)
    }

    pub fn regular_ar(&self) -> BackshiftPolynomial {
        BackshiftPolynomial::from_lag_coefficients(&self.phi, 1)
    }

    pub fn regular_ma(&self) -> BackshiftPolynomial {
        BackshiftPolynomial::from_lag_coefficients(&self.theta, 1)
    }

    pub fn seasonal_ar(&self) -> BackshiftPolynomial {
        BackshiftPolynomial::from_lag_coefficients(&self.bphi, self.period)
    }

    pub fn seasonal_ma(&self) -> BackshiftPolynomial {
        BackshiftPolynomial::from_lag_coefficients(&self.btheta, self.period)
    }

    /// Full AR polynomial `Phi(B) Phi_s(B^s)`.
    pub fn ar_polynomial(&self) -> BackshiftPolynomial {
        self.regular_ar().times(&self.seasonal_ar())
    }

    /// Full MA polynomial `Theta(B) Theta_s(B^s)`.
    pub fn ma_polynomial(&self) -> BackshiftPolynomial {
        self.regular_ma().times(&self.seasonal_ma())
    }

    /// All coefficients in the order `[phi, bphi, theta, btheta]`.
    pub fn values(&self) -> Vec<f64> {
        [&self.phi, &self.bphi, &self.theta, &self.btheta]
            .iter()
            .flat_map(|c| c.iter().copied())
            .collect()
    }
}
