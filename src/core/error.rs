use thiserror::Error;

use super::solver::SolveTarget;

pub type CoreResult<T> = Result<T, CoreError>;

/// Degenerate arithmetic in the closed-form metrics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{quantity} is undefined: division by zero")]
    DivisionByZero { quantity: &'static str },

    #[error("{quantity} is not finite ({value})")]
    NonFinite { quantity: &'static str, value: f64 },

    #[error(
        "no perpetuity exists: after-tax real return is {after_tax_real_return:.2}%, must be positive"
    )]
    NoPerpetuity { after_tax_real_return: f64 },
}

/// Rejected solver configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("invalid solver config: {0}")]
    InvalidConfig(String),

    #[error("{target:?} needs a withdrawal-rate floor, but the scenario is expense-only")]
    UnknownNotInModel { target: SolveTarget },
}

pub(crate) fn ensure_finite(quantity: &'static str, value: f64) -> CoreResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoreError::NonFinite { quantity, value })
    }
}
