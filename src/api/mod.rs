mod currency;
mod error;
mod render;

use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use currency::{CurrencyInput, format_currency, format_currency_cents, parse_currency};
pub use error::InputError;
pub use render::render_report;

use crate::core::{
    DEFAULT_HORIZON_YEARS, ScenarioAssumptions, SolveTarget, Taxation, WithdrawalModel,
    YearSnapshot, analyze, project, solve_default,
};
use error::ErrorResponse;

pub const MAX_HORIZON_YEARS: u32 = 200;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Parser, Debug)]
#[command(
    name = "fire-calc",
    about = "Retirement withdrawal calculator (deterministic annual projection + sustainability solvers)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project a scenario and print the sustainability report.
    Report {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, help = "Print the report as JSON instead of text")]
        json: bool,
    },
    /// Solve for a single unknown and print the result as JSON.
    Solve {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, value_enum)]
        target: CliSolveTarget,
        #[arg(long, help = "Years the capital must last; defaults to --horizon-years")]
        target_years: Option<u32>,
    },
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "FIRE_CALC_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliSolveTarget {
    RequiredCapital,
    MaxWithdrawalRate,
    MaxAnnualExpenses,
}

impl From<CliSolveTarget> for SolveTarget {
    fn from(value: CliSolveTarget) -> Self {
        match value {
            CliSolveTarget::RequiredCapital => SolveTarget::RequiredCapital,
            CliSolveTarget::MaxWithdrawalRate => SolveTarget::MaxWithdrawalRate,
            CliSolveTarget::MaxAnnualExpenses => SolveTarget::MaxAnnualExpenses,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(
        long,
        default_value = "$1,000,000",
        help = "Initial capital; dollar signs and commas are allowed"
    )]
    pub initial_capital: String,
    #[arg(
        long,
        default_value = "$40,000",
        help = "Annual expenses; dollar signs and commas are allowed"
    )]
    pub annual_expenses: String,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual withdrawal rate in percent of initial capital"
    )]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = 10.0, help = "Expected annual return in percent")]
    pub return_rate: f64,
    #[arg(
        long,
        default_value_t = 3.8,
        help = "Expected annual inflation in percent"
    )]
    pub inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Tax rate applied to investment growth in percent"
    )]
    pub tax_rate: f64,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Percentage of growth subject to tax"
    )]
    pub taxable_percentage: f64,
    #[arg(long, default_value_t = DEFAULT_HORIZON_YEARS, help = "Years to project")]
    pub horizon_years: u32,
    #[arg(
        long,
        help = "Withdraw only the inflated expenses, ignoring --withdrawal-rate"
    )]
    pub no_withdrawal_floor: bool,
    #[arg(long, help = "Ignore tax on investment growth")]
    pub no_taxation: bool,
}

impl Default for ScenarioArgs {
    fn default() -> Self {
        Self {
            initial_capital: "$1,000,000".to_string(),
            annual_expenses: "$40,000".to_string(),
            withdrawal_rate: 4.0,
            return_rate: 10.0,
            inflation_rate: 3.8,
            tax_rate: 15.0,
            taxable_percentage: 50.0,
            horizon_years: DEFAULT_HORIZON_YEARS,
            no_withdrawal_floor: false,
            no_taxation: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    initial_capital: Option<CurrencyInput>,
    annual_expenses: Option<CurrencyInput>,
    withdrawal_rate: Option<f64>,
    return_rate: Option<f64>,
    inflation_rate: Option<f64>,
    tax_rate: Option<f64>,
    taxable_percentage: Option<f64>,
    horizon_years: Option<u32>,
    withdrawal_floor: Option<bool>,
    taxation: Option<bool>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSolveTarget {
    #[serde(alias = "requiredCapital", alias = "required_capital")]
    RequiredCapital,
    #[serde(alias = "maxWithdrawalRate", alias = "max_withdrawal_rate")]
    MaxWithdrawalRate,
    #[serde(alias = "maxAnnualExpenses", alias = "max_annual_expenses")]
    MaxAnnualExpenses,
}

impl From<ApiSolveTarget> for SolveTarget {
    fn from(value: ApiSolveTarget) -> Self {
        match value {
            ApiSolveTarget::RequiredCapital => SolveTarget::RequiredCapital,
            ApiSolveTarget::MaxWithdrawalRate => SolveTarget::MaxWithdrawalRate,
            ApiSolveTarget::MaxAnnualExpenses => SolveTarget::MaxAnnualExpenses,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolvePayload {
    target: ApiSolveTarget,
    target_years: Option<u32>,
    #[serde(flatten)]
    scenario: SimulatePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    assumptions: ScenarioAssumptions,
    depleted_in: Option<u32>,
    years_until_depletion: u32,
    years: Vec<YearSnapshot>,
}

pub fn build_assumptions(args: &ScenarioArgs) -> Result<ScenarioAssumptions, InputError> {
    let initial_capital =
        parse_currency(&args.initial_capital).ok_or_else(|| InputError::InvalidCurrency {
            field: "--initial-capital",
            value: args.initial_capital.clone(),
        })?;
    let annual_expenses =
        parse_currency(&args.annual_expenses).ok_or_else(|| InputError::InvalidCurrency {
            field: "--annual-expenses",
            value: args.annual_expenses.clone(),
        })?;

    if initial_capital < 0.0 {
        return Err(InputError::out_of_range("--initial-capital", "must be >= 0"));
    }
    if annual_expenses < 0.0 {
        return Err(InputError::out_of_range("--annual-expenses", "must be >= 0"));
    }

    for (name, pct) in [
        ("--withdrawal-rate", args.withdrawal_rate),
        ("--tax-rate", args.tax_rate),
        ("--taxable-percentage", args.taxable_percentage),
    ] {
        if !(0.0..=100.0).contains(&pct) {
            return Err(InputError::out_of_range(name, "must be between 0 and 100"));
        }
    }

    if !args.return_rate.is_finite() || args.return_rate <= -100.0 {
        return Err(InputError::out_of_range("--return-rate", "must be > -100"));
    }
    if !args.inflation_rate.is_finite() || args.inflation_rate <= -100.0 {
        return Err(InputError::out_of_range("--inflation-rate", "must be > -100"));
    }

    if args.horizon_years == 0 || args.horizon_years > MAX_HORIZON_YEARS {
        return Err(InputError::out_of_range(
            "--horizon-years",
            "must be between 1 and 200",
        ));
    }

    let withdrawal_model = if args.no_withdrawal_floor {
        WithdrawalModel::ExpenseOnly
    } else {
        WithdrawalModel::RateFloor {
            withdrawal_rate: args.withdrawal_rate,
        }
    };
    let taxation = (!args.no_taxation).then_some(Taxation {
        tax_rate: args.tax_rate,
        taxable_percentage: args.taxable_percentage,
    });

    Ok(ScenarioAssumptions {
        initial_capital,
        annual_expenses,
        withdrawal_model,
        return_rate: args.return_rate,
        inflation_rate: args.inflation_rate,
        taxation,
        horizon_years: args.horizon_years,
    })
}

/// Runs a CLI command that produces output, returning the text to print.
pub fn run_command_output(command: &Command) -> Result<String, InputError> {
    match command {
        Command::Report { scenario, json } => {
            let assumptions = build_assumptions(scenario)?;
            let report = analyze(&assumptions)?;
            if *json {
                serde_json::to_string_pretty(&report)
                    .map_err(|e| InputError::Payload(e.to_string()))
            } else {
                Ok(render_report(&report))
            }
        }
        Command::Solve {
            scenario,
            target,
            target_years,
        } => {
            let assumptions = build_assumptions(scenario)?;
            let years = target_years.unwrap_or(assumptions.horizon_years);
            let result = solve_default(&assumptions, (*target).into(), years)?;
            serde_json::to_string_pretty(&result).map_err(|e| InputError::Payload(e.to_string()))
        }
        Command::Serve { .. } => Err(InputError::Payload(
            "serve does not produce output".to_string(),
        )),
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fire-calc HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/simulate");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .fallback(not_found_handler)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let result = assumptions_from_payload(payload)
        .and_then(|assumptions| analyze(&assumptions).map_err(InputError::from));
    match result {
        Ok(report) => {
            info!(
                horizon_years = report.assumptions.horizon_years,
                years = report.years.len().saturating_sub(1),
                "simulate request served"
            );
            json_response(StatusCode::OK, report)
        }
        Err(e) => rejected(e),
    }
}

async fn project_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    project_handler_impl(payload)
}

fn project_handler_impl(payload: SimulatePayload) -> Response {
    match assumptions_from_payload(payload) {
        Ok(assumptions) => json_response(StatusCode::OK, build_project_response(&assumptions)),
        Err(e) => rejected(e),
    }
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let target: SolveTarget = payload.target.into();
    let target_years = payload.target_years;
    let result = assumptions_from_payload(payload.scenario).and_then(|assumptions| {
        let years = target_years.unwrap_or(assumptions.horizon_years);
        solve_default(&assumptions, target, years).map_err(InputError::from)
    });
    match result {
        Ok(solved) => {
            info!(solve_target = ?solved.target, status = ?solved.status, "solve request served");
            json_response(StatusCode::OK, solved)
        }
        Err(e) => rejected(e),
    }
}

fn rejected(e: InputError) -> Response {
    warn!(error = %e, "request rejected");
    e.into_response()
}

fn build_project_response(assumptions: &ScenarioAssumptions) -> ProjectResponse {
    let projection = project(assumptions);
    ProjectResponse {
        assumptions: *assumptions,
        depleted_in: projection.depleted_in,
        years_until_depletion: projection.years_until_depletion(),
        years: projection.snapshots(),
    }
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn assumptions_from_json(json: &str) -> Result<ScenarioAssumptions, InputError> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| InputError::Payload(format!("invalid JSON payload: {e}")))?;
    assumptions_from_payload(payload)
}

fn assumptions_from_payload(payload: SimulatePayload) -> Result<ScenarioAssumptions, InputError> {
    let mut args = ScenarioArgs::default();

    if let Some(v) = payload.initial_capital {
        args.initial_capital = v.into_text();
    }
    if let Some(v) = payload.annual_expenses {
        args.annual_expenses = v.into_text();
    }
    if let Some(v) = payload.withdrawal_rate {
        args.withdrawal_rate = v;
    }
    if let Some(v) = payload.return_rate {
        args.return_rate = v;
    }
    if let Some(v) = payload.inflation_rate {
        args.inflation_rate = v;
    }
    if let Some(v) = payload.tax_rate {
        args.tax_rate = v;
    }
    if let Some(v) = payload.taxable_percentage {
        args.taxable_percentage = v;
    }
    if let Some(v) = payload.horizon_years {
        args.horizon_years = v;
    }
    if let Some(v) = payload.withdrawal_floor {
        args.no_withdrawal_floor = !v;
    }
    if let Some(v) = payload.taxation {
        args.no_taxation = !v;
    }

    build_assumptions(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SolveError;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        ScenarioArgs::default()
    }

    #[test]
    fn build_assumptions_uses_calculator_defaults() {
        let assumptions = build_assumptions(&sample_args()).expect("valid inputs");

        assert_approx(assumptions.initial_capital, 1_000_000.0);
        assert_approx(assumptions.annual_expenses, 40_000.0);
        assert_eq!(assumptions.withdrawal_rate(), Some(4.0));
        assert_approx(assumptions.return_rate, 10.0);
        assert_approx(assumptions.inflation_rate, 3.8);
        assert_eq!(
            assumptions.taxation,
            Some(Taxation {
                tax_rate: 15.0,
                taxable_percentage: 50.0
            })
        );
        assert_eq!(assumptions.horizon_years, 50);
    }

    #[test]
    fn build_assumptions_rejects_unparsable_currency() {
        let mut args = sample_args();
        args.initial_capital = "a lot".to_string();

        let err = build_assumptions(&args).expect_err("must reject text");
        assert!(err.to_string().contains("--initial-capital"));
    }

    #[test]
    fn build_assumptions_rejects_negative_expenses() {
        let mut args = sample_args();
        args.annual_expenses = "-$5,000".to_string();

        let err = build_assumptions(&args).expect_err("must reject negative");
        assert_eq!(
            err,
            InputError::OutOfRange {
                field: "--annual-expenses",
                message: "must be >= 0"
            }
        );
    }

    #[test]
    fn build_assumptions_rejects_percentages_out_of_range() {
        let mut args = sample_args();
        args.tax_rate = 120.0;
        let err = build_assumptions(&args).expect_err("must reject tax rate");
        assert!(err.to_string().contains("--tax-rate"));

        let mut args = sample_args();
        args.withdrawal_rate = f64::NAN;
        let err = build_assumptions(&args).expect_err("must reject NaN rate");
        assert!(err.to_string().contains("--withdrawal-rate"));
    }

    #[test]
    fn build_assumptions_rejects_invalid_horizon() {
        let mut args = sample_args();
        args.horizon_years = 0;
        let err = build_assumptions(&args).expect_err("must reject zero horizon");
        assert!(err.to_string().contains("--horizon-years"));
    }

    #[test]
    fn build_assumptions_honours_variant_switches() {
        let mut args = sample_args();
        args.no_withdrawal_floor = true;
        args.no_taxation = true;

        let assumptions = build_assumptions(&args).expect("valid inputs");
        assert_eq!(assumptions.withdrawal_model, WithdrawalModel::ExpenseOnly);
        assert_eq!(assumptions.taxation, None);
    }

    #[test]
    fn assumptions_from_json_parses_web_keys() {
        let json = r#"{
          "initialCapital": "$750,000",
          "annualExpenses": 36000,
          "withdrawalRate": 3.5,
          "returnRate": 7,
          "inflationRate": 2.5,
          "taxRate": 20,
          "taxablePercentage": 40,
          "horizonYears": 35
        }"#;
        let assumptions = assumptions_from_json(json).expect("json should parse");

        assert_approx(assumptions.initial_capital, 750_000.0);
        assert_approx(assumptions.annual_expenses, 36_000.0);
        assert_eq!(assumptions.withdrawal_rate(), Some(3.5));
        assert_approx(assumptions.return_rate, 7.0);
        assert_approx(assumptions.inflation_rate, 2.5);
        assert_approx(assumptions.tax_drag(), 0.08);
        assert_eq!(assumptions.horizon_years, 35);
    }

    #[test]
    fn assumptions_from_json_switches_off_optional_terms() {
        let json = r#"{ "withdrawalFloor": false, "taxation": false }"#;
        let assumptions = assumptions_from_json(json).expect("json should parse");

        assert_eq!(assumptions.withdrawal_model, WithdrawalModel::ExpenseOnly);
        assert_eq!(assumptions.taxation, None);
    }

    #[test]
    fn assumptions_from_json_rejects_bad_currency_text() {
        let err = assumptions_from_json(r#"{ "annualExpenses": "forty grand" }"#)
            .expect_err("must reject");
        assert!(matches!(
            err,
            InputError::InvalidCurrency {
                field: "--annual-expenses",
                ..
            }
        ));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let assumptions = build_assumptions(&sample_args()).expect("valid inputs");
        let response = build_project_response(&assumptions);
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"yearsUntilDepletion\":50"));
        assert!(json.contains("\"depletedIn\":null"));
        assert!(json.contains("\"initialCapital\""));
        assert!(json.contains("\"withdrawalModel\":{\"kind\":\"rateFloor\""));
    }

    #[test]
    fn cli_solve_max_expenses_agrees_with_report() {
        let mut scenario = sample_args();
        scenario.annual_expenses = "$10,000".to_string();
        scenario.return_rate = 0.0;
        scenario.inflation_rate = 0.0;
        scenario.no_taxation = true;

        let solved = run_command_output(&Command::Solve {
            scenario: scenario.clone(),
            target: CliSolveTarget::MaxAnnualExpenses,
            target_years: None,
        })
        .expect("solve should run");
        let solved: serde_json::Value = serde_json::from_str(&solved).expect("json output");

        let report = run_command_output(&Command::Report {
            scenario,
            json: true,
        })
        .expect("report should run");
        let report: serde_json::Value = serde_json::from_str(&report).expect("json output");
        let reported = &report["outcome"]["maxAnnualExpenses"];

        assert_eq!(solved["status"], "satisfiedAtBound");
        assert_eq!(solved["solvedValue"], 20_000.0);
        assert_eq!(solved["status"], reported["status"]);
        assert_eq!(solved["solvedValue"], reported["solvedValue"]);
    }

    #[test]
    fn cli_solve_rejects_rate_target_without_floor() {
        let mut scenario = sample_args();
        scenario.no_withdrawal_floor = true;
        let command = Command::Solve {
            scenario,
            target: CliSolveTarget::MaxWithdrawalRate,
            target_years: None,
        };

        let err = run_command_output(&command).expect_err("rate needs a floor");
        assert!(matches!(
            err,
            InputError::Solve(SolveError::UnknownNotInModel { .. })
        ));
    }

    #[test]
    fn cli_parses_report_flags() {
        let cli = Cli::try_parse_from([
            "fire-calc",
            "report",
            "--initial-capital",
            "$2,000,000",
            "--no-taxation",
            "--json",
        ])
        .expect("flags should parse");

        match cli.command {
            Command::Report { scenario, json } => {
                assert!(json);
                assert!(scenario.no_taxation);
                assert_eq!(scenario.initial_capital, "$2,000,000");
                assert_approx(scenario.withdrawal_rate, 4.0);
            }
            other => panic!("expected report command, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn simulate_route_returns_report_json() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/api/simulate?initialCapital=%24500%2C000&horizonYears=30")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["assumptions"]["initialCapital"], 500_000.0);
        assert!(json["milestones"].is_array());
    }

    #[tokio::test]
    async fn solve_route_rejects_unknown_not_in_model() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/solve")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"target":"max-withdrawal-rate","withdrawalFloor":false}"#,
                    ))
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(
            json["error"]
                .as_str()
                .expect("error string")
                .contains("expense-only")
        );
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = router()
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router is infallible");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
