mod error;
mod state;

pub use error::ApiError;
pub use state::{AppState, LoanBook, SavedPlan, validate_loan};

use axum::{
    Router,
    extract::{Json, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::{
    AmortizationEntry, DEFAULT_RATE_DELTAS, InterestSaved, Loan, LumpSum, MAX_SIMULATION_MONTHS,
    OptimizationResult, PlanConfig, RateSolveResult, SensitivityResult, Strategy,
    analyze_sensitivity, calculate_affordability, calculate_emi, calculate_interest_saved,
    calculate_total_interest, generate_amortization, optimize, solve_emi_rate,
};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub loan_ids: Vec<String>,
    #[serde(default)]
    pub monthly_extra: f64,
    #[serde(default)]
    pub lump_sums: Vec<LumpSum>,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub annual_growth_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct SensitivityRequest {
    #[serde(default)]
    pub loan_ids: Vec<String>,
    #[serde(default)]
    pub monthly_extra: f64,
    #[serde(default)]
    pub lump_sums: Vec<LumpSum>,
    pub strategy: String,
    #[serde(default)]
    pub annual_growth_pct: f64,
    #[serde(default)]
    pub rate_deltas: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SavePlanConfig {
    #[serde(default)]
    pub monthly_extra: f64,
}

#[derive(Debug, Deserialize)]
pub struct SavePlanResults {
    #[serde(default)]
    pub interest_saved: f64,
    #[serde(default)]
    pub months_saved: u32,
}

#[derive(Debug, Deserialize)]
pub struct SavePlanRequest {
    pub name: String,
    pub strategy: String,
    pub config: SavePlanConfig,
    pub results: SavePlanResults,
}

#[derive(Debug, Serialize)]
struct SavePlanResponse {
    id: Uuid,
}

/// Loan intake payload; the id is generated when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub id: Option<String>,
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub tenure_months: u32,
    #[serde(default)]
    pub bank_label: String,
    #[serde(default)]
    pub loan_type_label: String,
}

#[derive(Debug, Deserialize)]
struct EmiRequest {
    principal: f64,
    annual_rate_pct: f64,
    tenure_months: u32,
}

#[derive(Debug, Serialize)]
struct EmiResponse {
    emi: f64,
    total_interest: f64,
    total_payment: f64,
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    principal: f64,
    annual_rate_pct: f64,
    tenure_months: u32,
    #[serde(default)]
    monthly_prepayment: f64,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    emi: f64,
    schedule: Vec<AmortizationEntry>,
}

#[derive(Debug, Deserialize)]
struct ReverseRateRequest {
    principal: f64,
    emi: f64,
    tenure_months: u32,
}

#[derive(Debug, Deserialize)]
struct AffordabilityRequest {
    emi: f64,
    annual_rate_pct: f64,
    tenure_months: u32,
}

#[derive(Debug, Serialize)]
struct AffordabilityResponse {
    principal: f64,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/loans", get(list_loans_handler).post(create_loan_handler))
        .route("/api/loans/:id", delete(delete_loan_handler))
        .route("/api/optimizer/analyze", post(analyze_handler))
        .route("/api/optimizer/sensitivity", post(sensitivity_handler))
        .route("/api/optimizer/save-plan", post(save_plan_handler))
        .route("/api/optimizer/plans", get(list_plans_handler))
        .route("/api/calculator/emi", post(emi_handler))
        .route("/api/calculator/amortization", post(amortization_handler))
        .route("/api/calculator/interest-saved", post(interest_saved_handler))
        .route("/api/calculator/reverse-rate", post(reverse_rate_handler))
        .route("/api/calculator/affordability", post(affordability_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_http_server(host: IpAddr, port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::new(host, port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "payoff HTTP API listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn list_loans_handler(State(state): State<AppState>) -> Response {
    let loans = state.loans.read().list().to_vec();
    json_response(StatusCode::OK, loans)
}

async fn create_loan_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateLoanRequest>,
) -> Result<Response, ApiError> {
    let loan = create_loan(&state, payload)?;
    Ok(json_response(StatusCode::CREATED, loan))
}

async fn delete_loan_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let removed = state.loans.write().remove(&id)?;
    tracing::info!(loan_id = %removed.id, "loan removed");
    Ok(json_response(StatusCode::OK, removed))
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    let result = analyze(&state, payload)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn sensitivity_handler(
    State(state): State<AppState>,
    Json(payload): Json<SensitivityRequest>,
) -> Result<Response, ApiError> {
    let result = sensitivity(&state, payload)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn save_plan_handler(
    State(state): State<AppState>,
    Json(payload): Json<SavePlanRequest>,
) -> Result<Response, ApiError> {
    let plan = save_plan(&state, payload)?;
    Ok(json_response(StatusCode::OK, SavePlanResponse { id: plan.id }))
}

async fn list_plans_handler(State(state): State<AppState>) -> Response {
    let plans = state.plans.read().clone();
    json_response(StatusCode::OK, plans)
}

async fn emi_handler(Json(payload): Json<EmiRequest>) -> Response {
    let emi = calculate_emi(payload.principal, payload.annual_rate_pct, payload.tenure_months);
    let total_interest =
        calculate_total_interest(payload.principal, payload.annual_rate_pct, payload.tenure_months);
    json_response(
        StatusCode::OK,
        EmiResponse {
            emi,
            total_interest,
            total_payment: emi * payload.tenure_months as f64,
        },
    )
}

async fn amortization_handler(Json(payload): Json<ScheduleRequest>) -> Response {
    json_response(
        StatusCode::OK,
        ScheduleResponse {
            emi: calculate_emi(payload.principal, payload.annual_rate_pct, payload.tenure_months),
            schedule: generate_amortization(
                payload.principal,
                payload.annual_rate_pct,
                payload.tenure_months,
                payload.monthly_prepayment,
            ),
        },
    )
}

async fn interest_saved_handler(Json(payload): Json<ScheduleRequest>) -> Response {
    let saved: InterestSaved = calculate_interest_saved(
        payload.principal,
        payload.annual_rate_pct,
        payload.tenure_months,
        payload.monthly_prepayment,
    );
    json_response(StatusCode::OK, saved)
}

async fn reverse_rate_handler(Json(payload): Json<ReverseRateRequest>) -> Response {
    let result: RateSolveResult =
        solve_emi_rate(payload.principal, payload.emi, payload.tenure_months);
    if !result.converged {
        tracing::debug!(
            principal = payload.principal,
            emi = payload.emi,
            tenure_months = payload.tenure_months,
            rate = result.annual_rate_pct,
            "reverse rate solve returned a low-confidence answer"
        );
    }
    json_response(StatusCode::OK, result)
}

async fn affordability_handler(Json(payload): Json<AffordabilityRequest>) -> Response {
    json_response(
        StatusCode::OK,
        AffordabilityResponse {
            principal: calculate_affordability(
                payload.emi,
                payload.annual_rate_pct,
                payload.tenure_months,
            ),
        },
    )
}

pub fn create_loan(state: &AppState, payload: CreateLoanRequest) -> Result<Loan, ApiError> {
    let loan = Loan {
        id: payload
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        principal: payload.principal,
        annual_rate_pct: payload.annual_rate_pct,
        tenure_months: payload.tenure_months,
        bank_label: payload.bank_label,
        loan_type_label: payload.loan_type_label,
    };
    state.loans.write().insert(loan.clone())?;
    tracing::info!(loan_id = %loan.id, principal = loan.principal, "loan added");
    Ok(loan)
}

pub fn analyze(state: &AppState, payload: AnalyzeRequest) -> Result<OptimizationResult, ApiError> {
    let strategies = parse_strategies(&payload.strategies)?;
    let config = build_plan_config(
        payload.monthly_extra,
        payload.lump_sums,
        payload.annual_growth_pct,
    )?;
    let loans = state.loans.read().resolve(&payload.loan_ids)?;

    let result = optimize(&loans, &config, &strategies);
    tracing::info!(
        loans = loans.len(),
        strategies = result.strategies.len(),
        recommended = %result.recommended_strategy,
        "analyze complete"
    );
    Ok(result)
}

pub fn sensitivity(
    state: &AppState,
    payload: SensitivityRequest,
) -> Result<SensitivityResult, ApiError> {
    let strategy = parse_strategy(&payload.strategy)?;
    let config = build_plan_config(
        payload.monthly_extra,
        payload.lump_sums,
        payload.annual_growth_pct,
    )?;
    let loans = state.loans.read().resolve(&payload.loan_ids)?;

    let deltas = if payload.rate_deltas.is_empty() {
        DEFAULT_RATE_DELTAS.to_vec()
    } else {
        if payload.rate_deltas.iter().any(|d| !d.is_finite()) {
            return Err(ApiError::bad_request("rate_deltas must be finite"));
        }
        payload.rate_deltas
    };

    let result = analyze_sensitivity(&loans, &config, strategy, &deltas);
    tracing::info!(
        loans = loans.len(),
        strategy = %strategy,
        points = result.points.len(),
        "sensitivity complete"
    );
    Ok(result)
}

pub fn save_plan(state: &AppState, payload: SavePlanRequest) -> Result<SavedPlan, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    let strategy = parse_strategy(&payload.strategy)?;
    if !payload.config.monthly_extra.is_finite() || payload.config.monthly_extra < 0.0 {
        return Err(ApiError::bad_request("config.monthly_extra must be >= 0"));
    }

    let plan = SavedPlan {
        id: Uuid::new_v4(),
        name: name.to_string(),
        strategy,
        monthly_extra: payload.config.monthly_extra,
        interest_saved: payload.results.interest_saved,
        months_saved: payload.results.months_saved,
    };
    state.plans.write().push(plan.clone());
    tracing::info!(plan_id = %plan.id, strategy = %strategy, "plan saved");
    Ok(plan)
}

fn parse_strategy(name: &str) -> Result<Strategy, ApiError> {
    name.parse::<Strategy>().map_err(ApiError::BadRequest)
}

fn parse_strategies(names: &[String]) -> Result<Vec<Strategy>, ApiError> {
    names.iter().map(|name| parse_strategy(name)).collect()
}

pub fn build_plan_config(
    monthly_extra: f64,
    lump_sums: Vec<LumpSum>,
    annual_growth_pct: f64,
) -> Result<PlanConfig, ApiError> {
    if !monthly_extra.is_finite() || monthly_extra < 0.0 {
        return Err(ApiError::bad_request("monthly_extra must be >= 0"));
    }
    if !annual_growth_pct.is_finite() || annual_growth_pct <= -100.0 {
        return Err(ApiError::bad_request("annual_growth_pct must be > -100"));
    }
    for lump in &lump_sums {
        if lump.month == 0 || lump.month > MAX_SIMULATION_MONTHS {
            return Err(ApiError::bad_request(format!(
                "lump_sums month must be between 1 and {MAX_SIMULATION_MONTHS}"
            )));
        }
        if !lump.amount.is_finite() || lump.amount < 0.0 {
            return Err(ApiError::bad_request("lump_sums amount must be >= 0"));
        }
    }

    Ok(PlanConfig {
        monthly_extra,
        lump_sums,
        annual_growth_pct,
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
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
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_state() -> AppState {
        AppState::with_loans([
            Loan {
                id: "hdfc-personal".to_string(),
                principal: 500_000.0,
                annual_rate_pct: 11.0,
                tenure_months: 36,
                bank_label: "HDFC".to_string(),
                loan_type_label: "personal".to_string(),
            },
            Loan {
                id: "sbi-home".to_string(),
                principal: 2_000_000.0,
                annual_rate_pct: 8.5,
                tenure_months: 96,
                bank_label: "SBI".to_string(),
                loan_type_label: "home".to_string(),
            },
        ])
        .expect("valid seed loans")
    }

    fn analyze_request_from_json(json: &str) -> AnalyzeRequest {
        serde_json::from_str(json).expect("valid analyze JSON")
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }

    const SCENARIO: &str = r#"{
        "loan_ids": ["hdfc-personal", "sbi-home"],
        "monthly_extra": 5000,
        "lump_sums": [{"month": 6, "amount": 100000}],
        "strategies": ["avalanche", "snowball", "smart_hybrid", "proportional"],
        "annual_growth_pct": 0
    }"#;

    #[test]
    fn analyze_runs_requested_strategies_and_recommends_cheapest() {
        let state = sample_state();
        let result = analyze(&state, analyze_request_from_json(SCENARIO)).expect("valid request");

        assert_eq!(result.strategies.len(), 4);
        assert_eq!(result.baseline_total_months, 96);
        let recommended = result
            .strategy_or_recommended(None)
            .expect("recommended strategy present");
        for plan in &result.strategies {
            assert!(recommended.total_interest_paid <= plan.total_interest_paid);
            assert!(plan.total_interest_paid <= result.baseline_total_interest);
            assert!(plan.total_months <= result.baseline_total_months);
        }
    }

    #[test]
    fn analyze_rejects_missing_loan_ids_and_unknown_strategy() {
        let state = sample_state();
        let err = analyze(&state, analyze_request_from_json(r#"{"monthly_extra": 100}"#))
            .expect_err("missing loan ids");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = analyze(
            &state,
            analyze_request_from_json(r#"{"loan_ids": ["sbi-home"], "strategies": ["debt_tsunami"]}"#),
        )
        .expect_err("unknown strategy");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("debt_tsunami"));

        let err = analyze(&state, analyze_request_from_json(r#"{"loan_ids": ["nope"]}"#))
            .expect_err("unknown loan");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn plan_config_validation_rejects_bad_budgets() {
        assert!(build_plan_config(-1.0, Vec::new(), 0.0).is_err());
        assert!(build_plan_config(f64::INFINITY, Vec::new(), 0.0).is_err());
        assert!(build_plan_config(0.0, Vec::new(), -100.0).is_err());
        assert!(build_plan_config(0.0, vec![LumpSum { month: 0, amount: 10.0 }], 0.0).is_err());
        assert!(build_plan_config(0.0, vec![LumpSum { month: 3, amount: -10.0 }], 0.0).is_err());
        let config = build_plan_config(5_000.0, vec![LumpSum { month: 3, amount: 10.0 }], 4.0)
            .expect("valid config");
        assert_eq!(config.lump_sum_for_month(3), 10.0);
    }

    #[test]
    fn sensitivity_zero_point_matches_analyze() {
        let state = sample_state();
        let analyzed = analyze(&state, analyze_request_from_json(SCENARIO)).expect("analyze");
        let avalanche = analyzed
            .strategy_or_recommended(Some(Strategy::Avalanche))
            .expect("avalanche present");

        let payload: SensitivityRequest = serde_json::from_str(
            r#"{
                "loan_ids": ["hdfc-personal", "sbi-home"],
                "monthly_extra": 5000,
                "lump_sums": [{"month": 6, "amount": 100000}],
                "strategy": "avalanche",
                "annual_growth_pct": 0
            }"#,
        )
        .expect("valid sensitivity JSON");
        let result = sensitivity(&state, payload).expect("sensitivity");
        assert_eq!(result.points.len(), 3);
        assert_eq!(result.points[1].rate_delta_pct, 0.0);
        assert_eq!(result.points[1].total_interest_paid, avalanche.total_interest_paid);
        assert_eq!(result.points[1].total_months, avalanche.total_months);
        assert!(result.points[0].total_interest_paid < result.points[1].total_interest_paid);
        assert!(result.points[1].total_interest_paid < result.points[2].total_interest_paid);
    }

    #[test]
    fn save_plan_stores_and_returns_id() {
        let state = sample_state();
        let payload: SavePlanRequest = serde_json::from_str(
            r#"{
                "name": "Aggressive payoff",
                "strategy": "avalanche",
                "config": {"monthly_extra": 5000},
                "results": {"interest_saved": 230000, "months_saved": 24}
            }"#,
        )
        .expect("valid save-plan JSON");
        let plan = save_plan(&state, payload).expect("saved");
        let plans = state.plans.read();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, plan.id);
        assert_eq!(plans[0].strategy, Strategy::Avalanche);
        assert_eq!(plans[0].months_saved, 24);
    }

    #[test]
    fn create_loan_generates_id_when_missing() {
        let state = AppState::new();
        let payload: CreateLoanRequest = serde_json::from_str(
            r#"{"principal": 300000, "annual_rate_pct": 10.5, "tenure_months": 24, "bank_label": "Axis"}"#,
        )
        .expect("valid loan JSON");
        let loan = create_loan(&state, payload).expect("created");
        assert!(Uuid::parse_str(&loan.id).is_ok());
        assert_eq!(state.loans.read().list().len(), 1);
    }

    #[tokio::test]
    async fn analyze_handler_emits_snake_case_contract() {
        let request = analyze_request_from_json(SCENARIO);
        let response = analyze_handler(State(sample_state()), Json(request))
            .await
            .expect("handler succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let body = body_json(response).await;
        assert!(body["baseline_total_interest"].is_number());
        assert!(body["baseline_total_months"].is_number());
        let recommended = body["recommended_strategy"].as_str().expect("name");
        let strategies = body["strategies"].as_array().expect("strategies array");
        assert!(strategies.iter().any(|s| s["strategy_name"] == recommended));

        let first = &strategies[0];
        for key in [
            "strategy_name",
            "strategy_description",
            "total_interest_paid",
            "total_months",
            "interest_saved_vs_baseline",
            "months_saved_vs_baseline",
            "payoff_order",
            "debt_free_date_months",
            "loan_results",
        ] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        let loan_result = &first["loan_results"][0];
        for key in [
            "loan_id",
            "bank_name",
            "loan_type",
            "original_balance",
            "payoff_month",
            "months_saved",
        ] {
            assert!(loan_result.get(key).is_some(), "missing {key}");
        }
        assert_eq!(loan_result["bank_name"], "HDFC");
    }

    #[tokio::test]
    async fn error_responses_carry_message() {
        let err = analyze_handler(
            State(sample_state()),
            Json(analyze_request_from_json(r#"{"loan_ids": []}"#)),
        )
        .await
        .expect_err("empty loan ids");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "loan_ids must not be empty");
    }

    #[tokio::test]
    async fn calculator_handlers_wrap_core_math() {
        let body = body_json(
            emi_handler(Json(EmiRequest {
                principal: 5_000_000.0,
                annual_rate_pct: 8.5,
                tenure_months: 240,
            }))
            .await,
        )
        .await;
        assert_eq!(body["emi"], 43_391.0);

        let body = body_json(
            reverse_rate_handler(Json(ReverseRateRequest {
                principal: 3_000_000.0,
                emi: calculate_emi(3_000_000.0, 10.0, 180),
                tenure_months: 180,
            }))
            .await,
        )
        .await;
        let rate = body["annual_rate_pct"].as_f64().expect("rate");
        assert!((rate - 10.0).abs() <= 0.1);
        assert_eq!(body["converged"], true);

        let body = body_json(
            affordability_handler(Json(AffordabilityRequest {
                emi: 12_500.0,
                annual_rate_pct: 0.0,
                tenure_months: 48,
            }))
            .await,
        )
        .await;
        assert_eq!(body["principal"], 600_000.0);

        let body = body_json(
            amortization_handler(Json(ScheduleRequest {
                principal: 120_000.0,
                annual_rate_pct: 0.0,
                tenure_months: 12,
                monthly_prepayment: 0.0,
            }))
            .await,
        )
        .await;
        assert_eq!(body["schedule"].as_array().map(Vec::len), Some(12));
        assert!(body["schedule"][0].get("cumulative_interest").is_some());
    }

    #[tokio::test]
    async fn router_builds_and_unknown_routes_are_json_404() {
        let _ = create_router(AppState::new());
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }
}
