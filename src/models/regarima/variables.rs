//! Regression variables of a RegARIMA model.

use crate::calendar::TradingDaysType;
use crate::error::{ModellingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decay rate of the transitory-change outlier.
pub const TC_RATE: f64 = 0.7;

/// Outlier types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutlierType {
    /// Additive outlier (single pulse).
    AO,
    /// Level shift.
    LS,
    /// Transitory change (exponentially decaying pulse).
    TC,
    /// Seasonal (periodic) outlier.
    SO,
}

impl OutlierType {
    pub fn code(&self) -> &'static str {
        match self {
            OutlierType::AO => "AO",
            OutlierType::LS => "LS",
            OutlierType::TC => "TC",
            OutlierType::SO => "SO",
        }
    }

    /// Whether an outlier of this type can be placed at `position`.
    pub fn is_admissible(&self, position: usize, len: usize, period: usize) -> bool {
        if position >= len {
            return false;
        }
        match self {
            OutlierType::AO | OutlierType::TC => true,
            // A level shift at the first observation is a constant.
            OutlierType::LS => position > 0,
            OutlierType::SO => period > 1 && position + period <= len,
        }
    }

    /// Regression column of length `len` for an outlier at `position`.
    pub fn column(&self, position: usize, len: usize, period: usize) -> Vec<f64> {
        let mut column = vec![0.0; len];
        match self {
            OutlierType::AO => {
                if position < len {
                    column[position] = 1.0;
                }
            }
            OutlierType::LS => {
                for v in column.iter_mut().take(position.min(len)) {
                    *v = -1.0;
                }
            }
            OutlierType::TC => {
                let mut weight = 1.0;
                for v in column.iter_mut().skip(position) {
                    *v = weight;
                    weight *= TC_RATE;
                }
            }
            OutlierType::SO => {
                if period > 1 {
                    let other = -1.0 / (period - 1) as f64;
                    for (t, v) in column.iter_mut().enumerate().skip(position) {
                        *v = if (t - position) % period == 0 { 1.0 } else { other };
                    }
                }
            }
        }
        column
    }
}

impl fmt::Display for OutlierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Identity of an outlier: type and 0-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutlierKey {
    pub kind: OutlierType,
    pub position: usize,
}

impl OutlierKey {
    pub fn new(kind: OutlierType, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for OutlierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.position)
    }
}

/// What a regression variable represents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableKind {
    Outlier(OutlierKey),
    TradingDays(TradingDaysType),
    LeapYear,
    /// Easter effect with the duration of its window in days.
    Easter(usize),
    User,
}

/// Coarse category used by the selection modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Outlier,
    Calendar,
    TradingDays,
    Easter,
    User,
}

/// Who introduced a variable into the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Identified by the automatic procedure; may be removed by it.
    Automatic,
    /// Supplied by the user; never removed automatically.
    User,
}

/// A named block of regression columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    provenance: Provenance,
    columns: Vec<Vec<f64>>,
    fixed: Option<Vec<f64>>,
}

impl Variable {
    /// Outlier variable for a series of `len` observations.
    pub fn outlier(key: OutlierKey, len: usize, period: usize, provenance: Provenance) -> Self {
        Self {
            name: key.to_string(),
            kind: VariableKind::Outlier(key),
            provenance,
            columns: vec![key.kind.column(key.position, len, period)],
            fixed: None,
        }
    }

    pub fn trading_days(kind: TradingDaysType, columns: Vec<Vec<f64>>) -> Self {
        Self {
            name: kind.label().to_string(),
            kind: VariableKind::TradingDays(kind),
            provenance: Provenance::User,
            columns,
            fixed: None,
        }
    }

    pub fn leap_year(column: Vec<f64>) -> Self {
        Self {
            name: "lp".to_string(),
            kind: VariableKind::LeapYear,
            provenance: Provenance::User,
            columns: vec![column],
            fixed: None,
        }
    }

    pub fn easter(duration: usize, column: Vec<f64>) -> Self {
        Self {
            name: "easter".to_string(),
            kind: VariableKind::Easter(duration),
            provenance: Provenance::User,
            columns: vec![column],
            fixed: None,
        }
    }

    /// User-defined regression variable.
    ///
    /// # Errors
    /// `InvalidParameter` if there is no column, `DimensionMismatch` if the
    /// columns have different lengths.
    pub fn user(name: impl Into<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        let first = columns
            .first()
            .ok_or_else(|| ModellingError::InvalidParameter("user variable without data".into()))?;
        if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
            return Err(ModellingError::DimensionMismatch {
                expected: first.len(),
                got: bad.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            kind: VariableKind::User,
            provenance: Provenance::User,
            columns,
            fixed: None,
        })
    }

    /// Fix the coefficients instead of estimating them.
    pub fn with_fixed_coefficients(mut self, coefficients: Vec<f64>) -> Result<Self> {
        if coefficients.len() != self.columns.len() {
            return Err(ModellingError::DimensionMismatch {
                expected: self.columns.len(),
                got: coefficients.len(),
            });
        }
        self.fixed = Some(coefficients);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Number of regression columns.
    pub fn dim(&self) -> usize {
        self.columns.len()
    }

    pub fn fixed_coefficients(&self) -> Option<&[f64]> {
        self.fixed.as_deref()
    }

    pub fn is_free(&self) -> bool {
        self.fixed.is_none()
    }

    pub fn capability(&self) -> Capability {
        match self.kind {
            VariableKind::Outlier(_) => Capability::Outlier,
            VariableKind::TradingDays(_) => Capability::TradingDays,
            VariableKind::LeapYear => Capability::Calendar,
            VariableKind::Easter(_) => Capability::Easter,
            VariableKind::User => Capability::User,
        }
    }

    pub fn outlier_key(&self) -> Option<OutlierKey> {
        match self.kind {
            VariableKind::Outlier(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_automatic_outlier(&self) -> bool {
        self.outlier_key().is_some() && self.provenance == Provenance::Automatic
    }

    /// Names of the individual coefficients (`name` or `name #k`).
    pub fn coefficient_names(&self) -> Vec<String> {
        if self.columns.len() == 1 {
            vec![self.name.clone()]
        } else {
            (1..=self.columns.len())
                .map(|k| format!("{} #{}", self.name, k))
                .collect()
        }
    }
}
