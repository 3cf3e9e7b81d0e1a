use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum, error::ErrorKind};
use serde::{Deserialize, Serialize, de::IgnoredAny};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    ConfigurationError, Horizon, Ledger, Projection, ReportMode, SimulationParams,
    WithdrawalCapPolicy, WithdrawalStart, project,
};
use crate::report::{ChartSeries, CsvStyle, chart_series, csv_bytes, render_table};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const CSV_DISPOSITION: &str = "attachment; filename=\"SIP_SWP_Report.csv\"";

const DEFAULT_WITHDRAWAL_START: u32 = 10;
const DEFAULT_WITHDRAWAL_YEARS: u32 = 20;
const SPLIT_EXTENSION_YEARS: u32 = 10;
const INTEGRATED_EXTENSION_YEARS: u32 = 20;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPreset {
    Split,
    Integrated,
    Capped,
}

impl CliPreset {
    fn report_mode(self) -> ReportMode {
        match self {
            CliPreset::Split => ReportMode::SplitLedger,
            CliPreset::Integrated | CliPreset::Capped => ReportMode::Integrated,
        }
    }

    fn cap_policy(self) -> WithdrawalCapPolicy {
        match self {
            CliPreset::Integrated => WithdrawalCapPolicy::Uncapped,
            CliPreset::Split | CliPreset::Capped => WithdrawalCapPolicy::CapToAvailableBalance,
        }
    }

    fn withdrawal_start(self) -> WithdrawalStart {
        match self {
            CliPreset::Capped => WithdrawalStart::AfterContributions,
            CliPreset::Split | CliPreset::Integrated => {
                WithdrawalStart::Year(DEFAULT_WITHDRAWAL_START)
            }
        }
    }

    fn horizon(self) -> Horizon {
        match self {
            CliPreset::Split => Horizon::FixedExtension(SPLIT_EXTENSION_YEARS),
            CliPreset::Integrated => Horizon::FixedExtension(INTEGRATED_EXTENSION_YEARS),
            CliPreset::Capped => Horizon::WithdrawalYears(DEFAULT_WITHDRAWAL_YEARS),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliReportMode {
    Integrated,
    Split,
}

impl From<CliReportMode> for ReportMode {
    fn from(value: CliReportMode) -> Self {
        match value {
            CliReportMode::Integrated => ReportMode::Integrated,
            CliReportMode::Split => ReportMode::SplitLedger,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCapPolicy {
    Uncapped,
    CapToBalance,
}

impl From<CliCapPolicy> for WithdrawalCapPolicy {
    fn from(value: CliCapPolicy) -> Self {
        match value {
            CliCapPolicy::Uncapped => WithdrawalCapPolicy::Uncapped,
            CliCapPolicy::CapToBalance => WithdrawalCapPolicy::CapToAvailableBalance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliOutputFormat {
    Csv,
    CsvCurrency,
    Json,
    Html,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPreset {
    #[serde(alias = "splitLedger", alias = "split-ledger", alias = "sip-then-swp")]
    Split,
    Integrated,
    #[serde(alias = "auto", alias = "autoStart", alias = "auto-start")]
    Capped,
}

impl From<ApiPreset> for CliPreset {
    fn from(value: ApiPreset) -> Self {
        match value {
            ApiPreset::Split => CliPreset::Split,
            ApiPreset::Integrated => CliPreset::Integrated,
            ApiPreset::Capped => CliPreset::Capped,
        }
    }
}

impl From<CliPreset> for ApiPreset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Split => ApiPreset::Split,
            CliPreset::Integrated => ApiPreset::Integrated,
            CliPreset::Capped => ApiPreset::Capped,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiReportMode {
    Integrated,
    #[serde(alias = "splitLedger", alias = "split-ledger")]
    Split,
}

impl From<ApiReportMode> for CliReportMode {
    fn from(value: ApiReportMode) -> Self {
        match value {
            ApiReportMode::Integrated => CliReportMode::Integrated,
            ApiReportMode::Split => CliReportMode::Split,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCapPolicy {
    Uncapped,
    #[serde(
        alias = "capped",
        alias = "capToBalance",
        alias = "cap-to-available-balance",
        alias = "capToAvailableBalance"
    )]
    CapToBalance,
}

impl From<ApiCapPolicy> for CliCapPolicy {
    fn from(value: ApiCapPolicy) -> Self {
        match value {
            ApiCapPolicy::Uncapped => CliCapPolicy::Uncapped,
            ApiCapPolicy::CapToBalance => CliCapPolicy::CapToBalance,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiCsvStyle {
    Raw,
    #[serde(alias = "inr", alias = "formatted")]
    Currency,
}

impl From<ApiCsvStyle> for CsvStyle {
    fn from(value: ApiCsvStyle) -> Self {
        match value {
            ApiCsvStyle::Raw => CsvStyle::Raw,
            ApiCsvStyle::Currency => CsvStyle::Currency,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ResponseMode {
    Integrated,
    Split,
}

impl From<ReportMode> for ResponseMode {
    fn from(value: ReportMode) -> Self {
        match value {
            ReportMode::Integrated => ResponseMode::Integrated,
            ReportMode::SplitLedger => ResponseMode::Split,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ResponseCapPolicy {
    Uncapped,
    CapToAvailableBalance,
}

impl From<WithdrawalCapPolicy> for ResponseCapPolicy {
    fn from(value: WithdrawalCapPolicy) -> Self {
        match value {
            WithdrawalCapPolicy::Uncapped => ResponseCapPolicy::Uncapped,
            WithdrawalCapPolicy::CapToAvailableBalance => ResponseCapPolicy::CapToAvailableBalance,
        }
    }
}

/// A form field as it arrives over JSON or a query string. Anything that does
/// not parse as a finite number is treated as missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl FieldValue {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(text) => text.trim().parse::<f64>().ok(),
            FieldValue::Other(_) => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Whole years, truncated. A negative count is an error carrying the value
    /// as sent; anything non-numeric is treated as missing.
    fn as_years(&self, field: &'static str) -> Result<Option<u32>, ConfigurationError> {
        match self.as_f64() {
            Some(value) if value < 0.0 => Err(ConfigurationError::Negative { field, value }),
            value => Ok(value.map(|v| v.trunc() as u32)),
        }
    }

    fn is_auto(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().eq_ignore_ascii_case("auto"))
    }
}

/// An option field; unrecognised values are treated as missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Choice<T> {
    Known(T),
    Unknown(IgnoredAny),
}

impl<T> Choice<T> {
    fn known(self) -> Option<T> {
        match self {
            Choice::Known(value) => Some(value),
            Choice::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    #[serde(alias = "sip")]
    contribution: Option<FieldValue>,
    years: Option<FieldValue>,
    rate: Option<FieldValue>,
    #[serde(alias = "stepup")]
    step_up: Option<FieldValue>,
    #[serde(alias = "swp_start")]
    withdrawal_start: Option<FieldValue>,
    #[serde(alias = "swp_withdrawal")]
    withdrawal: Option<FieldValue>,
    #[serde(alias = "swp_stepup")]
    withdrawal_step_up: Option<FieldValue>,
    #[serde(alias = "swp_years")]
    withdrawal_years: Option<FieldValue>,
    tax: Option<FieldValue>,
    inflation: Option<FieldValue>,

    preset: Option<Choice<ApiPreset>>,
    mode: Option<Choice<ApiReportMode>>,
    cap_policy: Option<Choice<ApiCapPolicy>>,
    csv_style: Option<Choice<ApiCsvStyle>>,
}

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "sipswp",
    about = "Year-by-year SIP + SWP projection (stepped-up contributions and withdrawals, monthly compounding)"
)]
struct Cli {
    #[arg(long, default_value_t = 1000.0, help = "Monthly SIP investment")]
    contribution: f64,
    #[arg(long, default_value_t = 10, help = "Years of investment")]
    years: u32,
    #[arg(long, default_value_t = 12.0, help = "Annual interest rate in percent")]
    rate: f64,
    #[arg(long, default_value_t = 10.0, help = "Annual SIP increase in percent")]
    step_up: f64,
    #[arg(
        long,
        help = "SWP start year; defaults to 10, or the year after the SIP ends for the capped preset"
    )]
    withdrawal_start: Option<u32>,
    #[arg(long, help = "Start withdrawals the year after contributions end")]
    auto_start: bool,
    #[arg(long, default_value_t = 10000.0, help = "Monthly SWP withdrawal")]
    withdrawal: f64,
    #[arg(long, default_value_t = 10.0, help = "Annual SWP increase in percent")]
    withdrawal_step_up: f64,
    #[arg(
        long,
        help = "Years of withdrawals after the SIP ends; defaults to 20 for the capped preset. \
                The whole projection is limited to 200 years"
    )]
    withdrawal_years: Option<u32>,
    #[arg(
        long,
        default_value_t = 12.5,
        help = "Tax on the SIP corpus in percent (split report only)"
    )]
    tax: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Annual inflation in percent (split report only)"
    )]
    inflation: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliPreset::Capped,
        help = "Report preset: separate SIP/SWP ledgers, integrated balance, or capped withdrawals with auto-start"
    )]
    preset: CliPreset,
    #[arg(long, value_enum, help = "Override the preset's ledger layout")]
    mode: Option<CliReportMode>,
    #[arg(long, value_enum, help = "Override the preset's withdrawal cap policy")]
    cap_policy: Option<CliCapPolicy>,
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Csv)]
    format: CliOutputFormat,
}

#[derive(Debug)]
struct ApiRequest {
    preset: CliPreset,
    params: SimulationParams,
    csv_style: CsvStyle,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    preset: ApiPreset,
    mode: ResponseMode,
    cap_policy: ResponseCapPolicy,
    withdrawal_start: u32,
    simulation_years: u32,
    ledger: Ledger,
    chart: ChartSeries,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_params(cli: &Cli) -> Result<SimulationParams, ConfigurationError> {
    let withdrawal_start = if cli.auto_start {
        WithdrawalStart::AfterContributions
    } else {
        cli.withdrawal_start
            .map(WithdrawalStart::Year)
            .unwrap_or_else(|| cli.preset.withdrawal_start())
    };
    let horizon = cli
        .withdrawal_years
        .map(Horizon::WithdrawalYears)
        .unwrap_or_else(|| cli.preset.horizon());

    let params = SimulationParams {
        monthly_contribution: cli.contribution,
        contribution_years: cli.years,
        annual_rate_percent: cli.rate,
        contribution_step_up_percent: cli.step_up,
        withdrawal_start,
        monthly_withdrawal: cli.withdrawal,
        withdrawal_step_up_percent: cli.withdrawal_step_up,
        horizon,
        withdrawal_cap_policy: cli
            .cap_policy
            .map(Into::into)
            .unwrap_or_else(|| cli.preset.cap_policy()),
        report_mode: cli
            .mode
            .map(Into::into)
            .unwrap_or_else(|| cli.preset.report_mode()),
        tax_percent: cli.tax,
        inflation_percent: cli.inflation,
    };
    params.validate()?;
    Ok(params)
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/report.csv",
            get(report_csv_get_handler).post(report_csv_post_handler),
        )
        .route(
            "/api/report.html",
            get(report_html_get_handler).post(report_html_post_handler),
        )
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "SIP/SWP HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, router()).await
}

/// Parses command-line flags and renders the requested report.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => return Ok(e.to_string()),
        Err(e) => return Err(e.to_string()),
    };
    let params = build_params(&cli).map_err(|e| e.to_string())?;
    let projection = project(&params).map_err(|e| e.to_string())?;
    debug!(
        years = projection.schedule.simulation_years,
        "projection computed"
    );

    match cli.format {
        CliOutputFormat::Csv => csv_text(&projection, CsvStyle::Raw),
        CliOutputFormat::CsvCurrency => csv_text(&projection, CsvStyle::Currency),
        CliOutputFormat::Html => Ok(render_table(&projection)),
        CliOutputFormat::Json => {
            let response = build_simulate_response(cli.preset, &params, projection);
            serde_json::to_string_pretty(&response)
                .map(|json| format!("{json}\n"))
                .map_err(|e| format!("Failed to encode JSON: {e}"))
        }
    }
}

fn csv_text(projection: &Projection, style: CsvStyle) -> Result<String, String> {
    let bytes = csv_bytes(projection, style).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| format!("CSV is not valid UTF-8: {e}"))
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
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

async fn report_csv_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    report_csv_handler_impl(payload)
}

async fn report_csv_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    report_csv_handler_impl(payload)
}

async fn report_html_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    report_html_handler_impl(payload)
}

async fn report_html_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    report_html_handler_impl(payload)
}

fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let (request, projection) = match run_projection(payload) {
        Ok(result) => result,
        Err(response) => return response,
    };
    let response = build_simulate_response(request.preset, &request.params, projection);
    json_response(StatusCode::OK, response)
}

fn report_csv_handler_impl(payload: SimulatePayload) -> Response {
    let (request, projection) = match run_projection(payload) {
        Ok(result) => result,
        Err(response) => return response,
    };
    match csv_bytes(&projection, request.csv_style) {
        Ok(bytes) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, CSV_DISPOSITION),
            ],
            bytes,
        )),
        Err(e) => {
            warn!(error = %e, "failed to encode CSV report");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode CSV")
        }
    }
}

fn report_html_handler_impl(payload: SimulatePayload) -> Response {
    match run_projection(payload) {
        Ok((_, projection)) => with_cache_control(Html(render_table(&projection))),
        Err(response) => response,
    }
}

fn run_projection(payload: SimulatePayload) -> Result<(ApiRequest, Projection), Response> {
    let request = api_request_from_payload(payload).map_err(|msg| {
        warn!(error = %msg, "rejected projection request");
        error_response(StatusCode::BAD_REQUEST, &msg)
    })?;
    let projection = project(&request.params).map_err(|e| {
        warn!(error = %e, "rejected projection request");
        error_response(StatusCode::BAD_REQUEST, &e.to_string())
    })?;
    debug!(
        preset = ?request.preset,
        years = projection.schedule.simulation_years,
        "projection computed"
    );
    Ok((request, projection))
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
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
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();
    let mut csv_style = CsvStyle::Raw;

    if let Some(v) = payload.preset.and_then(Choice::known) {
        cli.preset = v.into();
    }
    if let Some(v) = payload.mode.and_then(Choice::known) {
        cli.mode = Some(v.into());
    }
    if let Some(v) = payload.cap_policy.and_then(Choice::known) {
        cli.cap_policy = Some(v.into());
    }
    if let Some(v) = payload.csv_style.and_then(Choice::known) {
        csv_style = v.into();
    }

    if let Some(v) = payload.contribution.as_ref().and_then(FieldValue::as_f64) {
        cli.contribution = v;
    }
    if let Some(v) = whole_years(payload.years.as_ref(), "contribution years")? {
        cli.years = v;
    }
    if let Some(v) = payload.rate.as_ref().and_then(FieldValue::as_f64) {
        cli.rate = v;
    }
    if let Some(v) = payload.step_up.as_ref().and_then(FieldValue::as_f64) {
        cli.step_up = v;
    }
    if let Some(field) = payload.withdrawal_start.as_ref() {
        if field.is_auto() {
            cli.auto_start = true;
        } else if let Some(v) = whole_years(Some(field), "withdrawal start year")? {
            cli.withdrawal_start = Some(v);
        }
    }
    if let Some(v) = payload.withdrawal.as_ref().and_then(FieldValue::as_f64) {
        cli.withdrawal = v;
    }
    if let Some(v) = payload
        .withdrawal_step_up
        .as_ref()
        .and_then(FieldValue::as_f64)
    {
        cli.withdrawal_step_up = v;
    }
    if let Some(v) = whole_years(payload.withdrawal_years.as_ref(), "withdrawal years")? {
        cli.withdrawal_years = Some(v);
    }
    if let Some(v) = payload.tax.as_ref().and_then(FieldValue::as_f64) {
        cli.tax = v;
    }
    if let Some(v) = payload.inflation.as_ref().and_then(FieldValue::as_f64) {
        cli.inflation = v;
    }

    let params = build_params(&cli).map_err(|e| e.to_string())?;
    Ok(ApiRequest {
        preset: cli.preset,
        params,
        csv_style,
    })
}

fn whole_years(field: Option<&FieldValue>, name: &'static str) -> Result<Option<u32>, String> {
    match field {
        Some(value) => value.as_years(name).map_err(|e| e.to_string()),
        None => Ok(None),
    }
}

fn default_cli_for_api() -> Cli {
    Cli {
        contribution: 1_000.0,
        years: 10,
        rate: 12.0,
        step_up: 10.0,
        withdrawal_start: None,
        auto_start: false,
        withdrawal: 10_000.0,
        withdrawal_step_up: 10.0,
        withdrawal_years: None,
        tax: 12.5,
        inflation: 6.0,
        preset: CliPreset::Capped,
        mode: None,
        cap_policy: None,
        format: CliOutputFormat::Csv,
    }
}

fn build_simulate_response(
    preset: CliPreset,
    params: &SimulationParams,
    projection: Projection,
) -> SimulateResponse {
    let chart = chart_series(&projection);
    SimulateResponse {
        preset: preset.into(),
        mode: params.report_mode.into(),
        cap_policy: params.withdrawal_cap_policy.into(),
        withdrawal_start: projection.schedule.withdrawal_start,
        simulation_years: projection.schedule.simulation_years,
        ledger: projection.ledger,
        chart,
    }
}
