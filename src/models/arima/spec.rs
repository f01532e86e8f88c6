//! SARIMA model specification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orders of a seasonal ARIMA model `(p,d,q)(P,D,Q)[s]` plus the mean flag.
///
/// The struct does not enforce the search bounds (`d <= 2`, `D <= 1`,
/// `p, q <= 3`, `P, Q <= 1`); the identification modules do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SarimaSpec {
    /// Seasonal period (1 for non-seasonal data).
    pub period: usize,
    /// Non-seasonal AR order.
    pub p: usize,
    /// Non-seasonal differencing order.
    pub d: usize,
    /// Non-seasonal MA order.
    pub q: usize,
    /// Seasonal AR order.
    pub cap_p: usize,
    /// Seasonal differencing order.
    pub cap_d: usize,
    /// Seasonal MA order.
    pub cap_q: usize,
    /// Whether the differenced series has a non-zero mean.
    pub mean: bool,
}

impl SarimaSpec {
    /// Create a specification without mean.
    pub fn new(
        period: usize,
        (p, d, q): (usize, usize, usize),
        (cap_p, cap_d, cap_q): (usize, usize, usize),
    ) -> Self {
        let period = period.max(1);
        let seasonal = period > 1;
        Self {
            period,
            p,
            d,
            q,
            cap_p: if seasonal { cap_p } else { 0 },
            cap_d: if seasonal { cap_d } else { 0 },
            cap_q: if seasonal { cap_q } else { 0 },
            mean: false,
        }
    }

    /// The airline model `(0,1,1)(0,1,1)`, or `(0,1,1)` for non-seasonal data.
    pub fn airline(period: usize) -> Self {
        Self::new(period, (0, 1, 1), (0, 1, 1))
    }

    /// The canonical high-order fallback `(3,1,1)(0,1,1)`.
    pub fn last_solution(period: usize) -> Self {
        Self::new(period, (3, 1, 1), (0, 1, 1))
    }

    /// White noise around zero (used for pure regression checks).
    pub fn white_noise(period: usize) -> Self {
        Self::new(period, (0, 0, 0), (0, 0, 0))
    }

    pub fn with_mean(mut self, mean: bool) -> Self {
        self.mean = mean;
        self
    }

    pub fn with_regular(mut self, p: usize, d: usize, q: usize) -> Self {
        self.p = p;
        self.d = d;
        self.q = q;
        self
    }

    /// Set the seasonal orders; ignored for non-seasonal periods.
    pub fn with_seasonal(mut self, cap_p: usize, cap_d: usize, cap_q: usize) -> Self {
        if self.is_seasonal() {
            self.cap_p = cap_p;
            self.cap_d = cap_d;
            self.cap_q = cap_q;
        }
        self
    }

    /// Drop every seasonal term.
    pub fn without_seasonal(self) -> Self {
        Self {
            cap_p: 0,
            cap_d: 0,
            cap_q: 0,
            ..self
        }
    }

    /// Whether the period allows seasonal terms.
    pub fn is_seasonal(&self) -> bool {
        self.period > 1
    }

    /// Whether any seasonal term is present.
    pub fn has_seasonal_part(&self) -> bool {
        self.cap_p + self.cap_d + self.cap_q > 0
    }

    /// Number of free ARMA parameters.
    pub fn narma(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }

    /// Degree of the full AR polynomial.
    pub fn ar_degree(&self) -> usize {
        self.p + self.cap_p * self.period
    }

    /// Degree of the full MA polynomial.
    pub fn ma_degree(&self) -> usize {
        self.q + self.cap_q * self.period
    }

    /// Degree of the differencing polynomial.
    pub fn differencing_degree(&self) -> usize {
        self.d + self.cap_d * self.period
    }

    /// Same ARMA structure (orders of the four polynomials).
    pub fn same_arma(&self, other: &SarimaSpec) -> bool {
        self.period == other.period
            && self.p == other.p
            && self.q == other.q
            && self.cap_p == other.cap_p
            && self.cap_q == other.cap_q
    }

    /// Minimum number of observations able to support this model.
    pub fn minimum_length(&self) -> usize {
        self.differencing_degree() + self.ar_degree().max(self.ma_degree()) + self.narma() + 1
    }
}

impl fmt::Display for SarimaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(f, "({},{},{})", self.cap_p, self.cap_d, self.cap_q)?;
        }
        if self.mean {
            write!(f, " + mean")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airline_orders() {
        let airline = SarimaSpec::airline(12);
        assert_eq!((airline.p, airline.d, airline.q), (0, 1, 1));
        assert_eq!((airline.cap_p, airline.cap_d, airline.cap_q), (0, 1, 1));
        assert_eq!(airline.narma(), 2);
        assert_eq!(airline.to_string(), "(0,1,1)(0,1,1)");
        // 13 + 13 + 2 + 1
        assert_eq!(airline.minimum_length(), 29);
    }

    #[test]
    fn non_seasonal_specs_drop_seasonal_orders() {
        let spec = SarimaSpec::airline(1);
        assert!(!spec.has_seasonal_part());
        assert_eq!(spec.to_string(), "(0,1,1)");
        let spec = spec.with_seasonal(1, 1, 1);
        assert_eq!(spec.cap_q, 0);
    }

    #[test]
    fn degrees() {
        let spec = SarimaSpec::last_solution(4).with_mean(true);
        assert_eq!(spec.ar_degree(), 3);
        assert_eq!(spec.ma_degree(), 5);
        assert_eq!(spec.differencing_degree(), 5);
        assert_eq!(spec.to_string(), "(3,1,1)(0,1,1) + mean");
        assert!(spec.same_arma(&SarimaSpec::last_solution(4)));
    }
}
