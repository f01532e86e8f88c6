//! Total order over fitted candidate models.

use super::config::{ARMA_PARSIMONY, SE_TOLERANCE};
use super::statistics::{AirlineShape, ModelStatistics};
use std::cmp::Ordering;

/// Which model a comparison favours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preference {
    /// Lower BIC, then fewer outliers, then the more airline-like shape.
    #[default]
    Bic,
    /// Always the first model.
    First,
    /// Always the second model.
    Second,
}

/// Compare two models; `Ordering::Less` means `a` is preferred.
///
/// Under [`Preference::Bic`] this is a strict weak order: antisymmetric,
/// transitive and `compare(a, a) == Equal`.
pub fn compare(a: &ModelStatistics, b: &ModelStatistics, preference: Preference) -> Ordering {
    match preference {
        Preference::First => Ordering::Less,
        Preference::Second => Ordering::Greater,
        Preference::Bic => a
            .bic
            .total_cmp(&b.bic)
            .then(a.outliers.cmp(&b.outliers))
            .then(b.shape.rank().cmp(&a.shape.rank())),
    }
}

/// Preference used to compare a new model with the reference model.
///
/// The reference (second) is kept without looking at the BIC when:
/// * the new model fails the Ljung-Box check the reference passes;
/// * its standard error grew by more than [`SE_TOLERANCE`] without better
///   Ljung-Box results;
/// * the reference is an airline model and the new one, far from the
///   airline shape, is not clearly better.
pub fn preference_between(
    current: &ModelStatistics,
    reference: &ModelStatistics,
    acceptance_level: f64,
) -> Preference {
    let passes = |s: &ModelStatistics| s.ljung_box.is_white_noise(acceptance_level);
    if !passes(current) && passes(reference) {
        return Preference::Second;
    }
    if current.se > reference.se * (1.0 + SE_TOLERANCE)
        && current.ljung_box.p_value <= reference.ljung_box.p_value
    {
        return Preference::Second;
    }
    if reference.shape == AirlineShape::Airline
        && current.shape == AirlineShape::Other
        && current.bic > reference.bic - ARMA_PARSIMONY
    {
        return Preference::Second;
    }
    Preference::Bic
}
