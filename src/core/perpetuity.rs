//! Closed-form metrics for a withdrawal that must last forever.
//!
//! These ignore the horizon entirely: a perpetuity is sustainable when the
//! withdrawal never exceeds the after-tax real growth of the balance.

use serde::Serialize;

use super::error::{CoreError, CoreResult, ensure_finite};
use super::types::ScenarioAssumptions;

/// `(return - inflation) * (1 - tax drag)`, in percent.
pub fn after_tax_real_return(assumptions: &ScenarioAssumptions) -> f64 {
    (assumptions.return_rate - assumptions.inflation_rate) * (1.0 - assumptions.tax_drag())
}

pub fn sustainable_withdrawal(assumptions: &ScenarioAssumptions) -> CoreResult<f64> {
    ensure_finite(
        "sustainable withdrawal",
        assumptions.initial_capital * (after_tax_real_return(assumptions) / 100.0),
    )
}

/// Sustainable withdrawal as a percentage of initial capital.
pub fn sustainable_withdrawal_rate(assumptions: &ScenarioAssumptions) -> CoreResult<f64> {
    if assumptions.initial_capital == 0.0 {
        return Err(CoreError::DivisionByZero {
            quantity: "sustainable withdrawal rate",
        });
    }
    let withdrawal = sustainable_withdrawal(assumptions)?;
    ensure_finite(
        "sustainable withdrawal rate",
        withdrawal / assumptions.initial_capital * 100.0,
    )
}

/// Capital whose real after-tax growth covers the current expenses forever.
///
/// Zero real return is `DivisionByZero`. A negative real return is
/// `NoPerpetuity` rather than the formula's negative value.
pub fn required_capital(assumptions: &ScenarioAssumptions) -> CoreResult<f64> {
    let real_return = after_tax_real_return(assumptions);
    if real_return == 0.0 {
        return Err(CoreError::DivisionByZero {
            quantity: "perpetuity required capital",
        });
    }
    if real_return < 0.0 {
        return Err(CoreError::NoPerpetuity {
            after_tax_real_return: real_return,
        });
    }
    ensure_finite(
        "perpetuity required capital",
        assumptions.annual_expenses / (real_return / 100.0),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalComparison {
    pub current_withdrawal: f64,
    pub sustainable_withdrawal: f64,
    pub within_limit: bool,
}

/// Compares the year-0 withdrawal with the perpetuity limit.
pub fn compare_current_withdrawal(
    assumptions: &ScenarioAssumptions,
) -> CoreResult<WithdrawalComparison> {
    let current_withdrawal = assumptions.initial_withdrawal();
    let sustainable = sustainable_withdrawal(assumptions)?;
    Ok(WithdrawalComparison {
        current_withdrawal,
        sustainable_withdrawal: sustainable,
        within_limit: current_withdrawal <= sustainable,
    })
}
