//! States, counters and transition table of the identification loop.
//!
//! A run is a sequence of rounds. Each round executes the modules listed
//! in its [`RoundPlan`], estimates the resulting model once and evaluates
//! it against the reference model. The plan only depends on the round
//! number and on whether the fallback model has been forced, so every round
//! ends in `Evaluation` after a bounded number of transitions; the number
//! of rounds is capped by [`MAX_ITERATIONS`].

use super::config::{
    AmiSpec, CV_REDUCTION, FIRST_PASS_INCREMENT, MAXIMUM_ACCEPTANCE, MAX_ITERATIONS, MINCV,
    PASS_INCREMENT,
};
use super::ProcessingResult;
use crate::models::arima::SarimaSpec;
use serde::{Deserialize, Serialize};

/// Step of the identification loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmiState {
    Init,
    Differencing,
    ArmaSearch,
    OutlierSearch,
    Estimation,
    Evaluation,
    /// The reference model passed the residual checks.
    Accepted,
    /// The fallback specification is being forced.
    Fallback,
    /// The loop stopped without acceptance.
    Finished,
}

impl AmiState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AmiState::Accepted | AmiState::Finished)
    }
}

/// How the differencing orders are revisited in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifferencingStep {
    Skip,
    /// Greedy search on the linearized series.
    Greedy,
    /// Correction from near-unit roots of the current estimation.
    UnitRoots,
}

/// Modules executed in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPlan {
    pub differencing: DifferencingStep,
    pub arma: bool,
    pub outliers: bool,
}

impl RoundPlan {
    /// Plan of `round`.
    ///
    /// * round 0 and the fallback round: outliers only;
    /// * round 1: greedy differencing, ARMA search, outliers;
    /// * later rounds: unit-root check, ARMA search, outliers.
    pub fn for_round(round: usize, fallback: bool, spec: &AmiSpec) -> Self {
        let outliers = spec.outlier_detection;
        if fallback || round == 0 || !spec.auto_modelling {
            return Self {
                differencing: DifferencingStep::Skip,
                arma: false,
                outliers,
            };
        }
        Self {
            differencing: if round == 1 {
                DifferencingStep::Greedy
            } else {
                DifferencingStep::UnitRoots
            },
            arma: true,
            outliers,
        }
    }

    /// State following `state` inside a round.
    pub fn next(&self, state: AmiState) -> AmiState {
        let order = [
            (
                AmiState::Differencing,
                self.differencing != DifferencingStep::Skip,
            ),
            (AmiState::ArmaSearch, self.arma),
            (AmiState::OutlierSearch, self.outliers),
            (AmiState::Estimation, true),
        ];
        let from = match state {
            AmiState::Differencing => 1,
            AmiState::ArmaSearch => 2,
            AmiState::OutlierSearch => 3,
            AmiState::Estimation => return AmiState::Evaluation,
            _ => 0,
        };
        order[from..]
            .iter()
            .find(|(_, active)| *active)
            .map(|(s, _)| *s)
            .unwrap_or(AmiState::Estimation)
    }
}

/// Round and pass counters with the thresholds they drive.
#[derive(Debug, Clone, PartialEq)]
pub struct AmiCounters {
    pub round: usize,
    pub pass: usize,
    /// Number of evaluated rounds.
    pub iterations: usize,
    /// Outlier critical value; non-increasing, never below [`MINCV`].
    pub cv: f64,
    /// Ljung-Box confidence level.
    pub pcr: f64,
    /// Whether the fallback specification has been forced.
    pub fallback: bool,
}

impl AmiCounters {
    pub fn new(cv: f64, pcr: f64) -> Self {
        Self {
            round: 0,
            pass: 0,
            iterations: 0,
            cv: cv.max(MINCV),
            pcr,
            fallback: false,
        }
    }

    /// Lower the critical value by [`CV_REDUCTION`]; returns the previous
    /// value when it changed.
    pub fn reduce_cv(&mut self) -> Option<f64> {
        let previous = self.cv;
        self.cv = (self.cv * (1.0 - CV_REDUCTION)).max(MINCV);
        (self.cv < previous).then_some(previous)
    }

    /// Raise the Ljung-Box confidence level after a rejected pass.
    pub fn raise_acceptance(&mut self) {
        let increment = if self.pass <= 1 {
            FIRST_PASS_INCREMENT
        } else {
            PASS_INCREMENT
        };
        self.pcr = (self.pcr + increment).min(MAXIMUM_ACCEPTANCE);
    }

    pub fn advance(&mut self) {
        self.round += 1;
        self.pass += 1;
    }

    pub fn enter_fallback(&mut self) {
        self.fallback = true;
        self.round = 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.iterations >= MAX_ITERATIONS
    }

    /// Minimum Ljung-Box p-value of an acceptable model.
    pub fn acceptance_level(&self) -> f64 {
        1.0 - self.pcr
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmiStatus {
    /// A model passed the Ljung-Box check.
    Accepted,
    /// The fallback specification was forced.
    Fallback,
    /// The iteration cap was reached.
    Exhausted,
    /// Nothing to identify: the model was estimated once.
    FullySpecified,
}

/// Trace entry of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AmiEvent {
    Transition {
        from: AmiState,
        to: AmiState,
    },
    PreTest {
        name: &'static str,
        result: ProcessingResult,
    },
    Module {
        state: AmiState,
        result: ProcessingResult,
    },
    OutliersSearched {
        added: usize,
        removed: usize,
        converged: bool,
    },
    Estimated {
        round: usize,
        pass: usize,
        spec: SarimaSpec,
        valid: bool,
    },
    ReferenceAdopted {
        round: usize,
        spec: SarimaSpec,
        bic: f64,
    },
    ReferenceReverted {
        round: usize,
        rejected: SarimaSpec,
    },
    CriticalValueReduced {
        from: f64,
        to: f64,
    },
    AcceptanceRaised {
        pcr: f64,
    },
    FallbackEntered {
        spec: SarimaSpec,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_plans() {
        let spec = AmiSpec::default();
        let zero = RoundPlan::for_round(0, false, &spec);
        assert_eq!(zero.differencing, DifferencingStep::Skip);
        assert!(!zero.arma && zero.outliers);

        assert_eq!(
            RoundPlan::for_round(1, false, &spec).differencing,
            DifferencingStep::Greedy
        );
        assert_eq!(
            RoundPlan::for_round(2, false, &spec).differencing,
            DifferencingStep::UnitRoots
        );
        let fallback = RoundPlan::for_round(1, true, &spec);
        assert!(!fallback.arma && fallback.differencing == DifferencingStep::Skip);
    }

    #[test]
    fn transitions_inside_a_round() {
        let spec = AmiSpec::default();
        let plan = RoundPlan::for_round(1, false, &spec);
        assert_eq!(plan.next(AmiState::Init), AmiState::Differencing);
        assert_eq!(plan.next(AmiState::Differencing), AmiState::ArmaSearch);
        assert_eq!(plan.next(AmiState::ArmaSearch), AmiState::OutlierSearch);
        assert_eq!(plan.next(AmiState::OutlierSearch), AmiState::Estimation);
        assert_eq!(plan.next(AmiState::Estimation), AmiState::Evaluation);

        let bare = RoundPlan::for_round(0, false, &AmiSpec::fixed());
        assert_eq!(bare.next(AmiState::Init), AmiState::Estimation);
        assert_eq!(bare.next(AmiState::Evaluation), AmiState::Estimation);
    }

    #[test]
    fn every_round_reaches_evaluation() {
        let spec = AmiSpec::default();
        for round in 0..4 {
            for fallback in [false, true] {
                let plan = RoundPlan::for_round(round, fallback, &spec);
                let mut state = AmiState::Init;
                let mut steps = 0;
                while state != AmiState::Evaluation {
                    state = plan.next(state);
                    steps += 1;
                    assert!(steps <= 5);
                }
            }
        }
    }

    #[test]
    fn critical_value_is_floored() {
        let mut counters = AmiCounters::new(2.2, 0.95);
        assert_eq!(counters.reduce_cv(), Some(2.2));
        assert_relative_eq!(counters.cv, MINCV);
        assert_eq!(counters.reduce_cv(), None);
        assert_relative_eq!(counters.cv, MINCV);
    }

    #[test]
    fn acceptance_increments() {
        let mut counters = AmiCounters::new(3.5, 0.95);
        counters.advance();
        counters.raise_acceptance();
        assert_relative_eq!(counters.pcr, 0.975, epsilon = 1e-12);
        counters.advance();
        counters.raise_acceptance();
        assert_relative_eq!(counters.pcr, 0.99, epsilon = 1e-12);
        assert_relative_eq!(counters.acceptance_level(), 0.01, epsilon = 1e-12);
    }
}
