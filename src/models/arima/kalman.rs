//! Exact likelihood filter for stationary ARMA processes.
//!
//! State-space form (Harvey): `x_t = Z a_t`, `a_{t+1} = T a_t + R e_{t+1}`
//! with `Z = (1, 0, ..., 0)`, `T` holding the AR coefficients in its first
//! column and ones on the superdiagonal, and `R = (1, theta_1, ...)`.
//! The initial covariance is the unconditional one. Gains and prediction
//! variances only depend on the ARMA parameters, so they are computed once
//! and shared by every series filtered with the same model (the data and
//! each regression column).

use super::params::ArmaParameters;

/// Maximum number of doubling steps for the stationary covariance.
const MAX_DOUBLING: usize = 64;

/// Precomputed prediction variances and Kalman gains.
#[derive(Debug, Clone)]
pub struct ArmaFilter {
    /// `a_i`: `x_t = sum a_i x_{t-i} + ...` (length `dim`, zero padded).
    transition: Vec<f64>,
    /// Prediction error variances (unit innovation variance).
    variances: Vec<f64>,
    /// Gains `T P Z' / F`, one vector of length `dim` per observation.
    gains: Vec<Vec<f64>>,
    dim: usize,
    log_det: f64,
}

impl ArmaFilter {
    /// Build the filter for `len` observations.
    ///
    /// Returns `None` if the AR polynomial is not stationary enough for the
    /// initial covariance to exist or a prediction variance degenerates.
    pub fn new(params: &ArmaParameters, len: usize) -> Option<Self> {
        let ar = params.ar_polynomial();
        let ma = params.ma_polynomial();
        let p = ar.degree();
        let q = ma.degree();
        let dim = p.max(q + 1);

        let mut transition = vec![0.0; dim];
        for (i, c) in ar.lag_coefficients().iter().enumerate() {
            transition[i] = -c;
        }
        let mut r = vec![0.0; dim];
        r[0] = 1.0;
        for (i, c) in ma.lag_coefficients().iter().enumerate() {
            r[i + 1] = *c;
        }

        let mut cov = initial_covariance(&transition, &r)?;
        let mut variances = Vec::with_capacity(len);
        let mut gains = Vec::with_capacity(len);
        let mut log_det = 0.0;

        for _ in 0..len {
            let f = cov[0][0];
            if !f.is_finite() || f <= 0.0 {
                return None;
            }
            // T P
            let tp = transition_times(&transition, &cov);
            let gain: Vec<f64> = (0..dim).map(|i| tp[i][0] / f).collect();

            // P <- T P T' + R R' - K K' F
            let mut next = vec![vec![0.0; dim]; dim];
            for i in 0..dim {
                for j in 0..=i {
                    let mut v = tp[i][0] * transition[j];
                    if j + 1 < dim {
                        v += tp[i][j + 1];
                    }
                    v += r[i] * r[j] - gain[i] * gain[j] * f;
                    next[i][j] = v;
                    next[j][i] = v;
                }
            }

            log_det += f.ln();
            variances.push(f);
            gains.push(gain);
            cov = next;
        }

        Some(Self {
            transition,
            variances,
            gains,
            dim,
            log_det,
        })
    }

    /// Number of observations the filter was built for.
    pub fn len(&self) -> usize {
        self.variances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variances.is_empty()
    }

    /// `sum ln F_t`
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Standardized one-step prediction errors `v_t / sqrt(F_t)`.
    pub fn filter(&self, values: &[f64]) -> Vec<f64> {
        self.filter_from(values, 0)
    }

    /// Standardized prediction errors of a series that is zero before `start`.
    ///
    /// Values before `start` are ignored and reported as zero errors; the
    /// state stays at zero until then.
    pub fn filter_from(&self, values: &[f64], start: usize) -> Vec<f64> {
        let n = values.len().min(self.len());
        let mut errors = vec![0.0; n];
        let mut state = vec![0.0; self.dim];
        let mut next = vec![0.0; self.dim];

        for t in start..n {
            let v = values[t] - state[0];
            errors[t] = v / self.variances[t].sqrt();
            let gain = &self.gains[t];
            for i in 0..self.dim {
                let shifted = if i + 1 < self.dim { state[i + 1] } else { 0.0 };
                next[i] = self.transition[i] * state[0] + shifted + gain[i] * v;
            }
            std::mem::swap(&mut state, &mut next);
        }
        errors
    }
}

/// `T P` for the companion-like transition matrix.
fn transition_times(transition: &[f64], cov: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = transition.len();
    (0..dim)
        .map(|i| {
            (0..dim)
                .map(|j| {
                    let below = if i + 1 < dim { cov[i + 1][j] } else { 0.0 };
                    transition[i] * cov[0][j] + below
                })
                .collect()
        })
        .collect()
}

fn dense_transition(transition: &[f64]) -> Vec<Vec<f64>> {
    let dim = transition.len();
    let mut t = vec![vec![0.0; dim]; dim];
    for i in 0..dim {
        t[i][0] = transition[i];
        if i + 1 < dim {
            t[i][i + 1] = 1.0;
        }
    }
    t
}

fn multiply(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    let mut c = vec![vec![0.0; n]; n];
    for i in 0..n {
        for k in 0..n {
            let aik = a[i][k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..n {
                c[i][j] += aik * b[k][j];
            }
        }
    }
    c
}

fn transpose(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    (0..n).map(|i| (0..n).map(|j| a[j][i]).collect()).collect()
}

/// Stationary covariance `P = T P T' + R R'` by the doubling algorithm.
fn initial_covariance(transition: &[f64], r: &[f64]) -> Option<Vec<Vec<f64>>> {
    let dim = transition.len();
    let mut p: Vec<Vec<f64>> = (0..dim)
        .map(|i| (0..dim).map(|j| r[i] * r[j]).collect())
        .collect();
    let mut a = dense_transition(transition);

    for _ in 0..MAX_DOUBLING {
        let apa = multiply(&multiply(&a, &p), &transpose(&a));
        let scale = p.iter().flatten().fold(0.0, |m: f64, v| m.max(v.abs()));
        let change = apa.iter().flatten().fold(0.0, |m: f64, v| m.max(v.abs()));
        for i in 0..dim {
            for j in 0..dim {
                p[i][j] += apa[i][j];
            }
        }
        if !scale.is_finite() || !change.is_finite() {
            return None;
        }
        if change <= 1e-14 * scale {
            return Some(p);
        }
        a = multiply(&a, &a);
    }
    None
}
