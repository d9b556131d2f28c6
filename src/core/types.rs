use serde::Serialize;

pub const DEFAULT_HORIZON_YEARS: u32 = 50;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WithdrawalModel {
    /// Withdraw the larger of inflated expenses and an inflated percentage of
    /// initial capital.
    #[serde(rename_all = "camelCase")]
    RateFloor { withdrawal_rate: f64 },
    /// Withdraw exactly the inflated expenses.
    ExpenseOnly,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Taxation {
    pub tax_rate: f64,
    pub taxable_percentage: f64,
}

impl Taxation {
    /// Share of investment growth lost to tax, as a fraction.
    pub fn drag(self) -> f64 {
        (self.taxable_percentage / 100.0) * (self.tax_rate / 100.0)
    }
}

/// Rates are percentages, compounded once per annual step.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAssumptions {
    pub initial_capital: f64,
    pub annual_expenses: f64,
    pub withdrawal_model: WithdrawalModel,
    pub return_rate: f64,
    pub inflation_rate: f64,
    pub taxation: Option<Taxation>,
    pub horizon_years: u32,
}

impl ScenarioAssumptions {
    pub fn withdrawal_rate(&self) -> Option<f64> {
        match self.withdrawal_model {
            WithdrawalModel::RateFloor { withdrawal_rate } => Some(withdrawal_rate),
            WithdrawalModel::ExpenseOnly => None,
        }
    }

    /// Amount withdrawn in year 0, before any inflation is applied.
    pub fn initial_withdrawal(&self) -> f64 {
        match self.withdrawal_model {
            WithdrawalModel::RateFloor { withdrawal_rate } => self
                .annual_expenses
                .max(self.initial_capital * (withdrawal_rate / 100.0)),
            WithdrawalModel::ExpenseOnly => self.annual_expenses,
        }
    }

    pub fn tax_drag(&self) -> f64 {
        self.taxation.map_or(0.0, Taxation::drag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: u32,
    pub capital: f64,
    pub expenses: f64,
    pub withdrawal: f64,
}

/// Aligned yearly series produced by one projection run. Index 0 is the
/// starting position; all three series are truncated together on depletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub capital: Vec<f64>,
    pub expenses: Vec<f64>,
    pub withdrawals: Vec<f64>,
    pub depleted_in: Option<u32>,
}

impl ProjectionResult {
    pub fn len(&self) -> usize {
        self.capital.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capital.is_empty()
    }

    pub fn years_until_depletion(&self) -> u32 {
        self.capital.len().saturating_sub(1) as u32
    }

    /// True when the series covers `years` steps past year 0. Running out in
    /// the final step still counts, since that step is recorded.
    pub fn lasts_through(&self, years: u32) -> bool {
        self.capital.len() > years as usize
    }

    pub fn final_capital(&self) -> f64 {
        self.capital.last().copied().unwrap_or(0.0)
    }

    pub fn total_withdrawals(&self) -> f64 {
        self.withdrawals.iter().sum()
    }

    pub fn snapshot(&self, year: u32) -> Option<YearSnapshot> {
        let idx = year as usize;
        Some(YearSnapshot {
            year,
            capital: *self.capital.get(idx)?,
            expenses: *self.expenses.get(idx)?,
            withdrawal: *self.withdrawals.get(idx)?,
        })
    }

    pub fn snapshots(&self) -> Vec<YearSnapshot> {
        (0..self.capital.len() as u32)
            .filter_map(|year| self.snapshot(year))
            .collect()
    }
}

/// Withdrawal as a percentage of the balance it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum WithdrawalRate {
    Percent(f64),
    /// The prior balance was already zero, so no finite rate exists.
    PriorBalanceExhausted,
}
