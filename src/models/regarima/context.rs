//! Mutable modelling context shared by the identification modules.

use super::description::{ModelDescription, Transformation};
use super::estimation::{RegArimaEstimation, RegArimaEstimator};
use super::variables::Variable;
use crate::calendar::{CalendarProvider, GregorianCalendar};
use crate::error::Result;
use crate::models::arima::{ArmaParameters, SarimaSpec};
use std::sync::Arc;
use tracing::debug;

/// Number of superseded estimations kept for reuse.
const HISTORY: usize = 4;

/// Working state of one identification run: a model description and the
/// estimation of that exact description, if any.
///
/// Every mutation of the description goes through this type and bumps the
/// version; mutations that change the design or the ARIMA orders drop the
/// estimation (the context becomes dirty). The estimations of the last few
/// versions are kept aside so that a mutation followed by its inverse finds
/// the exact same estimation again.
#[derive(Debug, Clone)]
pub struct RegArimaModelling {
    description: ModelDescription,
    estimation: Option<RegArimaEstimation>,
    history: Vec<(ModelDescription, RegArimaEstimation)>,
    version: u64,
    estimation_count: usize,
    warm_start: Option<ArmaParameters>,
    calendar: Arc<dyn CalendarProvider>,
}

impl RegArimaModelling {
    /// Context over `description` using the Gregorian calendar.
    pub fn new(description: ModelDescription) -> Self {
        Self::with_calendar(description, Arc::new(GregorianCalendar))
    }

    pub fn with_calendar(description: ModelDescription, calendar: Arc<dyn CalendarProvider>) -> Self {
        Self {
            description,
            estimation: None,
            history: Vec::new(),
            version: 0,
            estimation_count: 0,
            warm_start: None,
            calendar,
        }
    }

    pub fn description(&self) -> &ModelDescription {
        &self.description
    }

    pub fn spec(&self) -> SarimaSpec {
        *self.description.spec()
    }

    pub fn estimation(&self) -> Option<&RegArimaEstimation> {
        self.estimation.as_ref()
    }

    /// Whether the description changed since the last estimation.
    pub fn is_dirty(&self) -> bool {
        self.estimation.is_none()
    }

    /// Incremented by every mutation of the description.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of likelihood optimizations run in this context.
    pub fn estimation_count(&self) -> usize {
        self.estimation_count
    }

    pub fn calendar(&self) -> &Arc<dyn CalendarProvider> {
        &self.calendar
    }

    fn invalidate(&mut self) {
        self.version += 1;
        if let Some(estimation) = self.estimation.take() {
            self.history.insert(0, (self.description.clone(), estimation));
            self.history.truncate(HISTORY);
        }
    }

    /// Change the SARIMA orders (and mean flag). Returns whether anything changed.
    pub fn set_spec(&mut self, spec: SarimaSpec) -> bool {
        if spec == *self.description.spec() {
            return false;
        }
        self.invalidate();
        self.description.set_spec(spec);
        true
    }

    pub fn set_mean(&mut self, mean: bool) -> bool {
        let spec = self.spec().with_mean(mean);
        self.set_spec(spec)
    }

    pub fn set_transformation(&mut self, transformation: Transformation) -> Result<bool> {
        if transformation == self.description.transformation() {
            return Ok(false);
        }
        let mut description = self.description.clone();
        description.set_transformation(transformation)?;
        self.invalidate();
        self.description = description;
        self.warm_start = None;
        Ok(true)
    }

    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        let mut description = self.description.clone();
        description.add_variable(variable)?;
        self.invalidate();
        self.description = description;
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        if !self.description.contains(name) {
            return None;
        }
        self.invalidate();
        self.description.remove_variable(name)
    }

    /// Remove all automatic outliers; returns how many were removed.
    pub fn remove_automatic_outliers(&mut self) -> usize {
        if self.description.automatic_outlier_count() == 0 {
            return 0;
        }
        self.invalidate();
        self.description.remove_automatic_outliers()
    }

    /// Replace description and estimation together (used to restore a
    /// reference model).
    pub(crate) fn restore(&mut self, description: ModelDescription, estimation: Option<RegArimaEstimation>) {
        self.invalidate();
        if let Some(e) = &estimation {
            self.warm_start = Some(e.parameters.clone());
        }
        self.description = description;
        self.estimation = estimation;
    }

    /// Estimate the current description at the given precision.
    ///
    /// An up-to-date estimation at the same or a finer precision is reused.
    /// Returns `false` when the optimizer did not converge, the AR part is on
    /// the stationarity boundary, or the likelihood could not be evaluated.
    pub fn estimate(&mut self, precision: f64) -> bool {
        if let Some(estimation) = &self.estimation {
            if estimation.precision <= precision {
                return estimation.is_valid();
            }
        }
        let cached = self
            .history
            .iter()
            .find(|(description, estimation)| {
                *description == self.description && estimation.precision <= precision
            })
            .map(|(_, estimation)| estimation.clone());
        if let Some(estimation) = cached {
            let valid = estimation.is_valid();
            self.estimation = Some(estimation);
            return valid;
        }

        let data = self.description.regression_data();
        let spec = self.spec();
        self.estimation_count += 1;
        let estimation = RegArimaEstimator::new(precision).estimate(
            &data,
            &spec,
            self.warm_start.as_ref(),
            self.description.log_jacobian(),
        );
        match estimation {
            Some(estimation) => {
                let valid = estimation.is_valid();
                debug!(
                    spec = %spec,
                    bicc = estimation.bicc(),
                    converged = estimation.converged,
                    valid,
                    "model estimated"
                );
                self.warm_start = Some(estimation.parameters.clone());
                self.estimation = Some(estimation);
                valid
            }
            None => {
                debug!(spec = %spec, "likelihood could not be evaluated");
                false
            }
        }
    }
}
