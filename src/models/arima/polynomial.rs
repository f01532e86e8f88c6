//! Polynomials in the backshift operator `B`.

/// `1 + c1 B + c2 B^2 + ...`, stored by increasing degree with `c0 = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackshiftPolynomial {
    coefficients: Vec<f64>,
}

impl BackshiftPolynomial {
    /// The constant polynomial `1`.
    pub fn one() -> Self {
        Self {
            coefficients: vec![1.0],
        }
    }

    /// `1 + c1 B^lag + c2 B^(2 lag) + ...`
    pub fn from_lag_coefficients(coefficients: &[f64], lag: usize) -> Self {
        let lag = lag.max(1);
        let mut all = vec![0.0; coefficients.len() * lag + 1];
        all[0] = 1.0;
        for (i, c) in coefficients.iter().enumerate() {
            all[(i + 1) * lag] = *c;
        }
        Self { coefficients: all }
    }

    /// `(1 - B^lag)^order`
    pub fn difference(lag: usize, order: usize) -> Self {
        let factor = Self::from_lag_coefficients(&[-1.0], lag);
        (0..order).fold(Self::one(), |acc, _| acc.times(&factor))
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// All coefficients including the leading `1`.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Coefficients of `B, B^2, ...` (without the leading `1`).
    pub fn lag_coefficients(&self) -> &[f64] {
        &self.coefficients[1..]
    }

    pub fn times(&self, other: &Self) -> Self {
        let mut product = vec![0.0; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                product[i + j] += a * b;
            }
        }
        Self {
            coefficients: product,
        }
    }

    /// Value at `B = 1`.
    pub fn value_at_one(&self) -> f64 {
        self.coefficients.iter().sum()
    }

    /// Apply the polynomial as a filter: `out[t] = sum_j c_j x[t + degree - j]`.
    ///
    /// The result has `len - degree` values (empty if the input is too short).
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let degree = self.degree();
        if values.len() <= degree {
            return Vec::new();
        }
        (degree..values.len())
            .map(|t| {
                self.coefficients
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| **c != 0.0)
                    .map(|(j, c)| c * values[t - j])
                    .sum()
            })
            .collect()
    }
}
