use serde::Serialize;
use tracing::{debug, warn};

use super::engine::project;
use super::error::SolveError;
use super::types::{ScenarioAssumptions, WithdrawalModel};

pub const REQUIRED_CAPITAL_SEARCH_MULTIPLE: f64 = 10.0;
pub const MAX_WITHDRAWAL_RATE_SEARCH_MAX: f64 = 20.0;
pub const MAX_EXPENSES_SEARCH_MULTIPLE: f64 = 2.0;
pub const CAPITAL_TOLERANCE: f64 = 1.0;
pub const RATE_TOLERANCE: f64 = 0.01;
pub const EXPENSES_TOLERANCE: f64 = 0.01;
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// The single assumption treated as unknown.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveTarget {
    /// Smallest starting capital that lasts the target horizon.
    RequiredCapital,
    /// Largest withdrawal-rate floor that lasts the target horizon.
    MaxWithdrawalRate,
    /// Largest year-0 spending need that lasts the target horizon, searched
    /// with any withdrawal-rate floor removed.
    MaxAnnualExpenses,
}

impl SolveTarget {
    fn minimizes(self) -> bool {
        matches!(self, SolveTarget::RequiredCapital)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolveStatus {
    Converged,
    /// The least generous end of the interval already lasts the horizon.
    SatisfiedAtBound,
    /// Not even the most generous end of the interval lasts the horizon.
    BoundExhausted,
    MaxIterations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveConfig {
    pub target: SolveTarget,
    pub target_years: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl SolveConfig {
    /// Default interval and tolerance for `target`, sized from the scenario's
    /// current values.
    pub fn for_target(
        target: SolveTarget,
        target_years: u32,
        assumptions: &ScenarioAssumptions,
    ) -> Self {
        let (search_max, tolerance) = match target {
            SolveTarget::RequiredCapital => (
                assumptions.initial_capital * REQUIRED_CAPITAL_SEARCH_MULTIPLE,
                CAPITAL_TOLERANCE,
            ),
            SolveTarget::MaxWithdrawalRate => (MAX_WITHDRAWAL_RATE_SEARCH_MAX, RATE_TOLERANCE),
            SolveTarget::MaxAnnualExpenses => (
                assumptions.annual_expenses * MAX_EXPENSES_SEARCH_MULTIPLE,
                EXPENSES_TOLERANCE,
            ),
        };
        Self {
            target,
            target_years,
            search_min: 0.0,
            search_max,
            tolerance,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub years_survived: u32,
    pub sufficient: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub target: SolveTarget,
    pub target_years: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    /// `None` only when the search bounds were exhausted.
    pub solved_value: Option<f64>,
    pub status: SolveStatus,
    pub iterations: Vec<SolveIteration>,
    pub message: String,
}

impl SolveResult {
    pub fn feasible(&self) -> bool {
        self.solved_value.is_some()
    }

    pub fn converged(&self) -> bool {
        matches!(
            self.status,
            SolveStatus::Converged | SolveStatus::SatisfiedAtBound
        )
    }

    /// The end of the interval that was tried without success.
    pub fn exhausted_bound(&self) -> Option<f64> {
        if self.status != SolveStatus::BoundExhausted {
            return None;
        }
        Some(if self.target.minimizes() {
            self.search_max
        } else {
            self.search_min
        })
    }
}

/// Bisects the unknown named by `config.target` until the interval between
/// the last sufficient and last insufficient candidate is within tolerance.
/// The sufficient end is returned, so the answer never overstates what the
/// scenario can sustain.
///
/// Relies on survival being monotonic in the unknown; this is not checked.
pub fn solve(
    assumptions: &ScenarioAssumptions,
    config: &SolveConfig,
) -> Result<SolveResult, SolveError> {
    validate_config(assumptions, config)?;

    // For a minimised unknown the top of the interval is the generous end;
    // for a maximised one it is the bottom.
    let (generous_end, strict_end) = if config.target.minimizes() {
        (config.search_max, config.search_min)
    } else {
        (config.search_min, config.search_max)
    };

    let strict_eval = evaluate_candidate(assumptions, config, strict_end);
    let generous_eval = evaluate_candidate(assumptions, config, generous_end);

    let mut iterations = Vec::new();
    let solved_value;
    let status;
    let message;

    if strict_eval.sufficient {
        solved_value = Some(strict_end);
        status = SolveStatus::SatisfiedAtBound;
        message = if config.target.minimizes() {
            "Already lasts the target horizon at the lower search bound.".to_string()
        } else {
            "Upper search bound still lasts the target horizon; raise the search max for a higher answer."
                .to_string()
        };
    } else if !generous_eval.sufficient {
        warn!(
            target = ?config.target,
            target_years = config.target_years,
            bound = generous_end,
            years_survived = generous_eval.years_survived,
            "search bound exhausted without reaching target horizon"
        );
        solved_value = None;
        status = SolveStatus::BoundExhausted;
        message = format!(
            "No value within [{}, {}] lasts {} years; the best candidate lasts {} years.",
            config.search_min, config.search_max, config.target_years, generous_eval.years_survived
        );
    } else {
        let mut sufficient = generous_end;
        let mut insufficient = strict_end;
        let mut it = 0;
        while it < config.max_iterations && (sufficient - insufficient).abs() > config.tolerance {
            it += 1;
            let mid = f64::midpoint(sufficient, insufficient);
            let eval = evaluate_candidate(assumptions, config, mid);
            iterations.push(SolveIteration {
                iteration: it,
                lower_bound: sufficient.min(insufficient),
                upper_bound: sufficient.max(insufficient),
                candidate_value: mid,
                years_survived: eval.years_survived,
                sufficient: eval.sufficient,
            });
            debug!(
                iteration = it,
                candidate = mid,
                years_survived = eval.years_survived,
                sufficient = eval.sufficient,
                "bisection step"
            );

            if eval.sufficient {
                sufficient = mid;
            } else {
                insufficient = mid;
            }
        }

        solved_value = Some(sufficient);
        if (sufficient - insufficient).abs() <= config.tolerance {
            status = SolveStatus::Converged;
            message = match config.target {
                SolveTarget::RequiredCapital => "Solved required initial capital.",
                SolveTarget::MaxWithdrawalRate => "Solved maximum sustainable withdrawal rate.",
                SolveTarget::MaxAnnualExpenses => "Solved maximum sustainable annual expenses.",
            }
            .to_string();
        } else {
            status = SolveStatus::MaxIterations;
            message =
                "Reached max iterations before tolerance was met; returning best estimate."
                    .to_string();
        }
    }

    Ok(SolveResult {
        target: config.target,
        target_years: config.target_years,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        solved_value,
        status,
        iterations,
        message,
    })
}

/// Solves `target` over its default interval.
pub fn solve_default(
    assumptions: &ScenarioAssumptions,
    target: SolveTarget,
    target_years: u32,
) -> Result<SolveResult, SolveError> {
    solve(
        assumptions,
        &SolveConfig::for_target(target, target_years, assumptions),
    )
}

#[derive(Debug, Clone, Copy)]
struct CandidateEval {
    years_survived: u32,
    sufficient: bool,
}

fn evaluate_candidate(
    base: &ScenarioAssumptions,
    config: &SolveConfig,
    candidate_value: f64,
) -> CandidateEval {
    let mut assumptions = *base;
    assumptions.horizon_years = config.target_years;

    match config.target {
        SolveTarget::RequiredCapital => assumptions.initial_capital = candidate_value,
        SolveTarget::MaxWithdrawalRate => {
            assumptions.withdrawal_model = WithdrawalModel::RateFloor {
                withdrawal_rate: candidate_value,
            }
        }
        SolveTarget::MaxAnnualExpenses => {
            // A floor would mask any expense level below it.
            assumptions.withdrawal_model = WithdrawalModel::ExpenseOnly;
            assumptions.annual_expenses = candidate_value;
        }
    }

    let projection = project(&assumptions);
    CandidateEval {
        years_survived: projection.years_until_depletion(),
        sufficient: projection.lasts_through(config.target_years),
    }
}

fn validate_config(
    assumptions: &ScenarioAssumptions,
    config: &SolveConfig,
) -> Result<(), SolveError> {
    if config.target == SolveTarget::MaxWithdrawalRate
        && assumptions.withdrawal_model == WithdrawalModel::ExpenseOnly
    {
        return Err(SolveError::UnknownNotInModel {
            target: config.target,
        });
    }
    if config.target_years == 0 {
        return Err(SolveError::InvalidConfig(
            "target_years must be > 0".to_string(),
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::InvalidConfig(
            "search bounds must be finite".to_string(),
        ));
    }
    if config.search_min < 0.0 {
        return Err(SolveError::InvalidConfig(
            "search_min must be >= 0".to_string(),
        ));
    }
    if config.search_max < config.search_min {
        return Err(SolveError::InvalidConfig(
            "search_max must be >= search_min".to_string(),
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidConfig(
            "tolerance must be > 0".to_string(),
        ));
    }
    if config.max_iterations == 0 {
        return Err(SolveError::InvalidConfig(
            "max_iterations must be > 0".to_string(),
        ));
    }
    Ok(())
}
