use serde::Serialize;
use tracing::debug;

use super::engine::{effective_withdrawal_rates, project};
use super::error::{CoreResult, SolveError};
use super::perpetuity::{
    WithdrawalComparison, after_tax_real_return, compare_current_withdrawal, required_capital,
    sustainable_withdrawal, sustainable_withdrawal_rate,
};
use super::solver::{SolveResult, SolveTarget, solve_default};
use super::types::{
    ProjectionResult, ScenarioAssumptions, WithdrawalModel, WithdrawalRate, YearSnapshot,
};

pub const MILESTONE_INTERVAL: u32 = 10;

/// A scalar that may be undefined for degenerate inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetricValue {
    Defined { value: f64 },
    Undefined { reason: String },
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Defined { value } => Some(*value),
            MetricValue::Undefined { .. } => None,
        }
    }
}

impl From<CoreResult<f64>> for MetricValue {
    fn from(result: CoreResult<f64>) -> Self {
        match result {
            Ok(value) => MetricValue::Defined { value },
            Err(e) => MetricValue::Undefined {
                reason: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub year: u32,
    /// `None` once the capital has run out before `year`.
    pub snapshot: Option<YearSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScenarioOutcome {
    #[serde(rename_all = "camelCase")]
    Depleted {
        years_until_depletion: u32,
        required_capital: SolveResult,
        /// Only solved for scenarios with a withdrawal-rate floor.
        max_withdrawal_rate: Option<SolveResult>,
        max_annual_expenses: SolveResult,
    },
    #[serde(rename_all = "camelCase")]
    Sustained {
        final_capital: f64,
        total_withdrawals: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerpetuityReport {
    pub after_tax_real_return: f64,
    pub sustainable_withdrawal: MetricValue,
    pub sustainable_withdrawal_rate: MetricValue,
    pub required_capital: MetricValue,
    pub comparison: Option<WithdrawalComparison>,
}

impl PerpetuityReport {
    pub fn from_assumptions(assumptions: &ScenarioAssumptions) -> Self {
        Self {
            after_tax_real_return: after_tax_real_return(assumptions),
            sustainable_withdrawal: sustainable_withdrawal(assumptions).into(),
            sustainable_withdrawal_rate: sustainable_withdrawal_rate(assumptions).into(),
            required_capital: required_capital(assumptions).into(),
            comparison: compare_current_withdrawal(assumptions).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub assumptions: ScenarioAssumptions,
    pub years: Vec<YearSnapshot>,
    pub withdrawal_rates: Vec<WithdrawalRate>,
    pub milestones: Vec<Milestone>,
    pub outcome: ScenarioOutcome,
    pub perpetuity: PerpetuityReport,
}

/// Projects the scenario and derives every sustainability metric. The solver
/// metrics are only computed when the projection runs out before the horizon.
pub fn analyze(assumptions: &ScenarioAssumptions) -> Result<ScenarioReport, SolveError> {
    let projection = project(assumptions);
    let outcome = build_outcome(assumptions, &projection)?;
    debug!(
        years = projection.years_until_depletion(),
        depleted = projection.depleted_in.is_some(),
        "scenario analysed"
    );

    Ok(ScenarioReport {
        assumptions: *assumptions,
        years: projection.snapshots(),
        withdrawal_rates: effective_withdrawal_rates(&projection),
        milestones: milestones(&projection, assumptions.horizon_years),
        outcome,
        perpetuity: PerpetuityReport::from_assumptions(assumptions),
    })
}

pub fn milestone_years(horizon_years: u32) -> Vec<u32> {
    let mut years: Vec<u32> = (0..=horizon_years)
        .step_by(MILESTONE_INTERVAL as usize)
        .collect();
    if years.last() != Some(&horizon_years) {
        years.push(horizon_years);
    }
    years
}

fn milestones(projection: &ProjectionResult, horizon_years: u32) -> Vec<Milestone> {
    milestone_years(horizon_years)
        .into_iter()
        .map(|year| Milestone {
            year,
            snapshot: projection.snapshot(year),
        })
        .collect()
}

fn build_outcome(
    assumptions: &ScenarioAssumptions,
    projection: &ProjectionResult,
) -> Result<ScenarioOutcome, SolveError> {
    let horizon = assumptions.horizon_years;
    if projection.lasts_through(horizon) {
        return Ok(ScenarioOutcome::Sustained {
            final_capital: projection.final_capital(),
            total_withdrawals: projection.total_withdrawals(),
        });
    }

    let required = solve_default(assumptions, SolveTarget::RequiredCapital, horizon)?;
    let max_rate = match assumptions.withdrawal_model {
        WithdrawalModel::RateFloor { .. } => Some(solve_default(
            assumptions,
            SolveTarget::MaxWithdrawalRate,
            horizon,
        )?),
        WithdrawalModel::ExpenseOnly => None,
    };

    let max_expenses = solve_default(assumptions, SolveTarget::MaxAnnualExpenses, horizon)?;

    Ok(ScenarioOutcome::Depleted {
        years_until_depletion: projection.years_until_depletion(),
        required_capital: required,
        max_withdrawal_rate: max_rate,
        max_annual_expenses: max_expenses,
    })
}
