use std::fmt;

use super::currency::{format_currency, format_currency_cents};
use crate::core::{
    MetricValue, PerpetuityReport, ScenarioOutcome, ScenarioReport, SolveResult, SolveStatus,
};

/// Plain-text rendering of a scenario report for the terminal.
pub fn render_report(report: &ScenarioReport) -> String {
    ReportText(report).to_string()
}

struct ReportText<'a>(&'a ScenarioReport);

impl fmt::Display for ReportText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let horizon = report.assumptions.horizon_years;

        writeln!(f, "Results")?;
        writeln!(
            f,
            "{:>5}  {:>20}  {:>18}  {:>18}",
            "Years", "Remaining Capital", "Annual Expenses", "Annual Withdrawal"
        )?;
        for milestone in &report.milestones {
            match milestone.snapshot {
                Some(s) => writeln!(
                    f,
                    "{:>5}  {:>20}  {:>18}  {:>18}",
                    milestone.year,
                    format_currency_cents(s.capital),
                    format_currency_cents(s.expenses),
                    format_currency_cents(s.withdrawal)
                )?,
                None => writeln!(
                    f,
                    "{:>5}  {:>20}  {:>18}  {:>18}",
                    milestone.year, "N/A", "N/A", "N/A"
                )?,
            }
        }
        writeln!(f)?;

        match &report.outcome {
            ScenarioOutcome::Depleted {
                years_until_depletion,
                required_capital,
                max_withdrawal_rate,
                max_annual_expenses,
            } => {
                writeln!(
                    f,
                    "Warning: capital depleted after {years_until_depletion} years."
                )?;
                writeln!(
                    f,
                    "Required initial capital for {horizon} years: {}",
                    solved_money(required_capital)
                )?;
                if let Some(rate) = max_withdrawal_rate {
                    writeln!(
                        f,
                        "Maximum sustainable withdrawal rate for {horizon} years: {}",
                        solved_percent(rate)
                    )?;
                }
                writeln!(
                    f,
                    "Maximum sustainable initial annual expenses for {horizon} years: {}",
                    solved_money(max_annual_expenses)
                )?;
            }
            ScenarioOutcome::Sustained {
                final_capital,
                total_withdrawals,
            } => {
                writeln!(f, "Capital lasts for the entire {horizon} year period.")?;
                writeln!(
                    f,
                    "Remaining capital after {horizon} years: {}",
                    format_currency_cents(*final_capital)
                )?;
                writeln!(
                    f,
                    "Total withdrawals over {horizon} years: {}",
                    format_currency_cents(*total_withdrawals)
                )?;
            }
        }
        writeln!(f)?;

        write_perpetuity(f, &report.perpetuity)
    }
}

fn write_perpetuity(f: &mut fmt::Formatter<'_>, perpetuity: &PerpetuityReport) -> fmt::Result {
    writeln!(f, "Perpetuity Calculations")?;
    writeln!(
        f,
        "After-tax real return: {:.2}%",
        perpetuity.after_tax_real_return
    )?;
    writeln!(
        f,
        "Sustainable annual withdrawal in perpetuity: {}",
        metric(&perpetuity.sustainable_withdrawal, format_currency_cents)
    )?;
    writeln!(
        f,
        "Sustainable withdrawal rate in perpetuity: {}",
        metric(&perpetuity.sustainable_withdrawal_rate, |v| format!("{v:.2}%"))
    )?;
    writeln!(
        f,
        "Required initial capital for perpetuity (based on current annual expenses): {}",
        metric(&perpetuity.required_capital, format_currency_cents)
    )?;

    if let Some(cmp) = perpetuity.comparison {
        if cmp.within_limit {
            writeln!(
                f,
                "Current withdrawal ({}) is within the sustainable withdrawal limit for perpetuity ({}).",
                format_currency_cents(cmp.current_withdrawal),
                format_currency_cents(cmp.sustainable_withdrawal)
            )?;
        } else {
            writeln!(
                f,
                "Warning: current withdrawal ({}) exceeds the sustainable withdrawal in perpetuity ({}).",
                format_currency_cents(cmp.current_withdrawal),
                format_currency_cents(cmp.sustainable_withdrawal)
            )?;
        }
    }
    Ok(())
}

fn metric(value: &MetricValue, fmt: impl Fn(f64) -> String) -> String {
    match value {
        MetricValue::Defined { value } => fmt(*value),
        MetricValue::Undefined { reason } => format!("undefined ({reason})"),
    }
}

fn solved_money(result: &SolveResult) -> String {
    solved(result, format_currency_cents, format_currency)
}

fn solved_percent(result: &SolveResult) -> String {
    solved(result, |v| format!("{v:.2}%"), |v| format!("{v:.2}%"))
}

fn solved(
    result: &SolveResult,
    fmt: impl Fn(f64) -> String,
    bound_fmt: impl Fn(f64) -> String,
) -> String {
    match (result.solved_value, result.status) {
        (Some(value), SolveStatus::SatisfiedAtBound) => {
            format!("{} or more (search bound reached)", fmt(value))
        }
        (Some(value), SolveStatus::MaxIterations) => format!("{} (not converged)", fmt(value)),
        (Some(value), _) => fmt(value),
        (None, _) => match result.exhausted_bound() {
            Some(bound) => format!("not found within search bound {}", bound_fmt(bound)),
            None => "not found".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ScenarioAssumptions, Taxation, WithdrawalModel, analyze};

    fn sample_assumptions() -> ScenarioAssumptions {
        ScenarioAssumptions {
            initial_capital: 1_000_000.0,
            annual_expenses: 40_000.0,
            withdrawal_model: WithdrawalModel::RateFloor {
                withdrawal_rate: 4.0,
            },
            return_rate: 10.0,
            inflation_rate: 3.8,
            taxation: Some(Taxation {
                tax_rate: 15.0,
                taxable_percentage: 50.0,
            }),
            horizon_years: 50,
        }
    }

    #[test]
    fn sustained_report_lists_milestones_and_perpetuity() {
        let report = analyze(&sample_assumptions()).expect("valid scenario");
        let text = render_report(&report);

        assert!(text.contains("$1,000,000.00"));
        assert!(text.contains("Capital lasts for the entire 50 year period."));
        assert!(text.contains("Sustainable withdrawal rate in perpetuity: 5.74%"));
        assert!(text.contains("is within the sustainable withdrawal limit"));
    }

    #[test]
    fn depleted_report_marks_missing_years_and_exhausted_bounds() {
        let mut assumptions = sample_assumptions();
        assumptions.return_rate = 3.8;
        assumptions.taxation = None;
        let report = analyze(&assumptions).expect("valid scenario");
        let text = render_report(&report);

        assert!(text.contains("Warning: capital depleted after 26 years."));
        assert!(text.contains("N/A"));
        assert!(text.contains("not found within search bound $10,000,000"));
        assert!(text.contains("undefined (perpetuity required capital is undefined"));
    }

    #[test]
    fn negative_real_return_renders_no_perpetuity() {
        let mut assumptions = sample_assumptions();
        assumptions.return_rate = 1.0;
        let report = analyze(&assumptions).expect("valid scenario");
        let text = render_report(&report);

        assert!(text.contains("After-tax real return: -2.59%"));
        assert!(text.contains("undefined (no perpetuity exists"));
        assert!(text.contains("Warning: current withdrawal ($40,000.00) exceeds"));
    }
}
