use super::types::{ProjectionResult, ScenarioAssumptions, WithdrawalModel, WithdrawalRate};

/// Runs the annual projection until the horizon or the first step whose
/// balance goes non-positive. That step is still recorded, with its balance
/// floored at zero.
pub fn project(assumptions: &ScenarioAssumptions) -> ProjectionResult {
    let capacity = assumptions.horizon_years as usize + 1;
    let mut capital = Vec::with_capacity(capacity);
    let mut expenses = Vec::with_capacity(capacity);
    let mut withdrawals = Vec::with_capacity(capacity);

    capital.push(assumptions.initial_capital);
    expenses.push(assumptions.annual_expenses);
    withdrawals.push(assumptions.initial_withdrawal());

    let inflation_factor = 1.0 + assumptions.inflation_rate / 100.0;
    let return_rate = assumptions.return_rate / 100.0;
    let tax_drag = assumptions.tax_drag();

    let mut prev_capital = assumptions.initial_capital;
    let mut prev_expense = assumptions.annual_expenses;
    let mut prev_withdrawal = withdrawals[0];
    let mut depleted_in = None;

    for year in 1..=assumptions.horizon_years {
        let expense = prev_expense * inflation_factor;
        let withdrawal = match assumptions.withdrawal_model {
            WithdrawalModel::RateFloor { .. } => expense.max(prev_withdrawal * inflation_factor),
            WithdrawalModel::ExpenseOnly => expense,
        };

        let growth = prev_capital * return_rate;
        let tax = growth * tax_drag;
        let new_capital = prev_capital + growth - tax - withdrawal;

        capital.push(new_capital.max(0.0));
        expenses.push(expense);
        withdrawals.push(withdrawal);

        if new_capital <= 0.0 {
            depleted_in = Some(year);
            break;
        }

        prev_capital = new_capital;
        prev_expense = expense;
        prev_withdrawal = withdrawal;
    }

    ProjectionResult {
        capital,
        expenses,
        withdrawals,
        depleted_in,
    }
}

/// Each year's withdrawal relative to the balance it was drawn from. Year 0
/// is measured against the initial capital.
pub fn effective_withdrawal_rates(projection: &ProjectionResult) -> Vec<WithdrawalRate> {
    projection
        .withdrawals
        .iter()
        .enumerate()
        .map(|(idx, &withdrawal)| {
            let prior = projection.capital[idx.saturating_sub(1)];
            if prior > 0.0 {
                WithdrawalRate::Percent(withdrawal / prior * 100.0)
            } else {
                WithdrawalRate::PriorBalanceExhausted
            }
        })
        .collect()
}
