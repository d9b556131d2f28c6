mod analysis;
mod engine;
mod error;
mod perpetuity;
mod solver;
mod types;

pub use analysis::{
    MILESTONE_INTERVAL, MetricValue, Milestone, PerpetuityReport, ScenarioOutcome,
    ScenarioReport, analyze, milestone_years,
};
pub use engine::{effective_withdrawal_rates, project};
pub use error::{CoreError, CoreResult, SolveError};
pub use perpetuity::{
    WithdrawalComparison, after_tax_real_return, compare_current_withdrawal, required_capital,
    sustainable_withdrawal, sustainable_withdrawal_rate,
};
pub use solver::{
    SolveConfig, SolveIteration, SolveResult, SolveStatus, SolveTarget, solve, solve_default,
};
pub use types::{
    DEFAULT_HORIZON_YEARS, ProjectionResult, ScenarioAssumptions, Taxation, WithdrawalModel,
    WithdrawalRate, YearSnapshot,
};
