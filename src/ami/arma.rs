//! Selection of the ARMA orders for fixed differencing.
//!
//! Candidate models are fitted as pure ARMA models on the differenced
//! linearized series. The search runs in three stages: seasonal orders with
//! a regular AR(3), regular orders with the chosen seasonal part, then the
//! seasonal orders again. Inside each stage the model with the fewest
//! parameters among those within [`ARMA_PARSIMONY`] of the best BICC wins.

use super::config::{ARMA_PARSIMONY, MAX_PASS};
use super::ProcessingResult;
use crate::models::arima::{apply_differencing, SarimaSpec};
use crate::models::regarima::{RegArimaEstimator, RegArimaModelling, RegressionData, MAX_AR_PACF};
use crate::utils::mean;
use std::collections::HashMap;
use tracing::debug;

/// Largest regular AR or MA order searched.
pub const MAX_REGULAR_ORDER: usize = 3;
/// Largest seasonal AR or MA order searched.
pub const MAX_SEASONAL_ORDER: usize = 1;

type Orders = (usize, usize, usize, usize);

/// A fitted candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmaCandidate {
    /// `(p, q, P, Q)`
    pub orders: Orders,
    pub bicc: f64,
}

impl ArmaCandidate {
    pub fn narma(&self) -> usize {
        let (p, q, bp, bq) = self.orders;
        p + q + bp + bq
    }
}

/// Parsimonious choice: fewest parameters within `ARMA_PARSIMONY` of the
/// best BICC, ties broken by BICC.
fn choose(candidates: &[ArmaCandidate]) -> Option<ArmaCandidate> {
    let best = candidates.iter().map(|c| c.bicc).min_by(|a, b| a.total_cmp(b))?;
    candidates
        .iter()
        .filter(|c| c.bicc <= best + ARMA_PARSIMONY)
        .min_by(|a, b| a.narma().cmp(&b.narma()).then(a.bicc.total_cmp(&b.bicc)))
        .copied()
}

struct Search<'a> {
    data: RegressionData,
    period: usize,
    estimator: &'a RegArimaEstimator,
    cache: HashMap<Orders, Option<f64>>,
}

impl Search<'_> {
    fn fit(&mut self, orders: Orders) -> Option<ArmaCandidate> {
        if let Some(cached) = self.cache.get(&orders) {
            return cached.map(|bicc| ArmaCandidate { orders, bicc });
        }
        let (p, q, bp, bq) = orders;
        let spec = SarimaSpec::new(self.period, (p, 0, q), (bp, 0, bq));
        let bicc = self
            .estimator
            .estimate(&self.data, &spec, None, 0.0)
            .filter(|e| e.parameters.max_ar_pacf() <= MAX_AR_PACF)
            .map(|e| e.bicc())
            .filter(|b| b.is_finite());
        self.cache.insert(orders, bicc);
        bicc.map(|bicc| ArmaCandidate { orders, bicc })
    }

    fn stage(&mut self, grid: Vec<Orders>) -> Option<ArmaCandidate> {
        let candidates: Vec<ArmaCandidate> = grid.into_iter().filter_map(|o| self.fit(o)).collect();
        choose(&candidates)
    }

    fn seasonal_grid(p: usize, q: usize) -> Vec<Orders> {
        (0..=MAX_SEASONAL_ORDER)
            .flat_map(|bp| (0..=MAX_SEASONAL_ORDER).map(move |bq| (p, q, bp, bq)))
            .collect()
    }

    fn regular_grid(bp: usize, bq: usize) -> Vec<Orders> {
        (0..=MAX_REGULAR_ORDER)
            .flat_map(|p| (0..=MAX_REGULAR_ORDER).map(move |q| (p, q, bp, bq)))
            .collect()
    }
}

/// ARMA order search of the identification.
#[derive(Debug, Clone)]
pub struct ArmaModule {
    /// Whether seasonal ARMA terms may be used.
    pub seasonal: bool,
    estimator: RegArimaEstimator,
}

impl ArmaModule {
    pub fn new(seasonal: bool, precision: f64) -> Self {
        Self {
            seasonal,
            estimator: RegArimaEstimator::new(precision),
        }
    }

    /// Best orders `(p, q, P, Q)` for the stationary series `values`.
    pub fn select(&self, values: &[f64], period: usize) -> Option<ArmaCandidate> {
        let seasonal = self.seasonal && period > 1;
        let mut search = Search {
            data: RegressionData::arma(values.to_vec()),
            period,
            estimator: &self.estimator,
            cache: HashMap::new(),
        };

        let (mut bp, mut bq) = (0, 0);
        if seasonal {
            if let Some(c) = search.stage(Search::seasonal_grid(MAX_REGULAR_ORDER, 0)) {
                (_, _, bp, bq) = c.orders;
            }
        }
        let mut best = search.stage(Search::regular_grid(bp, bq))?;
        if seasonal {
            let (p, q, _, _) = best.orders;
            if let Some(c) = search.stage(Search::seasonal_grid(p, q)) {
                best = c;
            }
        }
        Some(best)
    }

    /// Select the ARMA orders of the current model.
    ///
    /// From pass [`MAX_PASS`] on, a model without any ARMA parameter gets
    /// an MA(1) term.
    pub fn process(&self, ctx: &mut RegArimaModelling, pass: usize) -> ProcessingResult {
        ctx.estimate(self.estimator.precision);
        let current = ctx.spec();
        let coefficients = ctx
            .estimation()
            .map(|e| e.likelihood.coefficients.clone())
            .unwrap_or_default();
        let linearized = ctx.description().linearize(&coefficients);
        let mut z = apply_differencing(&linearized, &current);
        if current.mean {
            let m = mean(&z);
            z.iter_mut().for_each(|v| *v -= m);
        }

        let Some(best) = self.select(&z, current.period) else {
            debug!(spec = %current, "no ARMA candidate could be estimated");
            return ProcessingResult::Failed;
        };
        let (p, mut q, bp, bq) = best.orders;
        if pass >= MAX_PASS && best.narma() == 0 {
            q = 1;
        }
        let spec = current
            .with_regular(p, current.d, q)
            .with_seasonal(bp, current.cap_d, bq);
        debug!(spec = %spec, bicc = best.bicc, "ARMA orders selected");

        if ctx.set_spec(spec) {
            ProcessingResult::Changed
        } else {
            ProcessingResult::Unchanged
        }
    }
}
