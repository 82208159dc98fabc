//! AWS Lambda handler for deal projections
//!
//! Accepts a projection request as JSON and returns the period cash flows,
//! tranche summaries, point-in-time trigger tests and optionally break-even CDRs.
//!
//! Supports Lambda Function URLs for direct HTTP access.

use std::time::Instant;

use anyhow::Context;
use aws_lambda_events::event::lambda_function_urls::{
    LambdaFunctionUrlRequest, LambdaFunctionUrlResponse,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use serde::{Deserialize, Serialize};

use abs_waterfall::breakeven::{self, BreakevenConfig, BreakevenResult};
use abs_waterfall::deal::{templates, DealStructure, TriggerResult};
use abs_waterfall::projection::{PeriodCashFlow, ProjectionSummary, TrancheSummary};
use abs_waterfall::{ScenarioAssumptions, ScenarioRunner};

/// Input configuration for the projection
#[derive(Debug, Deserialize)]
pub struct ProjectionRequest {
    /// Template used when no deal is supplied (default: ACMAT 2025-4)
    #[serde(default = "default_template")]
    pub template: String,

    /// Full deal structure; overrides `template`
    #[serde(default)]
    pub deal: Option<DealStructure>,

    /// Full scenario; overrides the flat rate fields below
    #[serde(default)]
    pub scenario: Option<ScenarioAssumptions>,

    /// Annual CPR (default: 15%)
    #[serde(default = "default_cpr")]
    pub cpr: f64,

    /// Annual CDR (default: 3%)
    #[serde(default = "default_cdr")]
    pub cdr: f64,

    /// Recovery rate (default: 40%)
    #[serde(default = "default_recovery")]
    pub recovery_rate: f64,

    /// Index rate (default: 4.33%)
    #[serde(default = "default_index_rate")]
    pub index_rate: f64,

    /// Number of months to project (default: 60)
    #[serde(default = "default_projection_months")]
    pub projection_months: u32,

    /// Use the front-loaded stress default curve
    #[serde(default)]
    pub stress: bool,

    /// Tranche price for yield, percent of par (default: 100)
    #[serde(default = "default_price")]
    pub price: f64,

    /// Return every period snapshot (default: true)
    #[serde(default = "default_true")]
    pub include_periods: bool,

    /// Also solve break-even CDR for every rated tranche
    #[serde(default)]
    pub breakeven: bool,
}

fn default_template() -> String { "ACMAT 2025-4".to_string() }
fn default_cpr() -> f64 { 0.15 }
fn default_cdr() -> f64 { 0.03 }
fn default_recovery() -> f64 { 0.40 }
fn default_index_rate() -> f64 { 0.0433 }
fn default_projection_months() -> u32 { 60 }
fn default_price() -> f64 { 100.0 }
fn default_true() -> bool { true }

/// Response payload
#[derive(Debug, Serialize)]
pub struct ProjectionResponse {
    pub deal_name: String,
    pub scenario_name: String,
    pub summary: ProjectionSummary,
    pub tranches: Vec<TrancheSummary>,
    pub triggers: Vec<TriggerResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<PeriodCashFlow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakeven: Option<Vec<BreakevenResult>>,
    pub execution_time_ms: u64,
}

impl ProjectionRequest {
    fn deal(&self) -> anyhow::Result<DealStructure> {
        match &self.deal {
            Some(deal) => Ok(deal.clone()),
            None => templates::by_name(&self.template).context("resolving deal template"),
        }
    }

    fn scenario(&self) -> ScenarioAssumptions {
        if let Some(scenario) = &self.scenario {
            return scenario.clone();
        }
        if self.stress {
            ScenarioAssumptions::stress_case(
                self.cpr,
                self.cdr,
                self.recovery_rate,
                self.index_rate,
                self.projection_months,
            )
        } else {
            ScenarioAssumptions::base_case(
                self.cpr,
                self.cdr,
                self.recovery_rate,
                self.index_rate,
                self.projection_months,
            )
        }
    }
}

/// Run the projection described by a request
fn run_request(request: &ProjectionRequest) -> anyhow::Result<ProjectionResponse> {
    let start = Instant::now();

    let runner = ScenarioRunner::new(request.deal()?).context("invalid deal")?;
    let scenario = request.scenario();
    let result = runner.run(&scenario).context("projection failed")?;

    let deal = runner.deal();
    let triggers = deal.evaluate_triggers(scenario.index_rate, 0.0);

    let breakeven = if request.breakeven {
        let config = BreakevenConfig {
            recovery_rate: scenario.default.recovery_rate,
            cpr: scenario.prepayment.base_cpr,
            index_rate: scenario.index_rate,
            projection_months: scenario.projection_months,
            ..Default::default()
        };
        Some(breakeven::solve_all(deal, &config).context("break-even search failed")?)
    } else {
        None
    };

    let summary = result.summary();
    let tranches = result.tranche_summaries(request.price);
    let periods = request.include_periods.then_some(result.periods);

    Ok(ProjectionResponse {
        deal_name: result.deal_name,
        scenario_name: result.scenario_name,
        summary,
        tranches,
        triggers,
        periods,
        breakeven,
        execution_time_ms: start.elapsed().as_millis() as u64,
    })
}

fn http_response(status: i64, body: String) -> Result<LambdaFunctionUrlResponse, Error> {
    let mut response = LambdaFunctionUrlResponse {
        status_code: status,
        headers: Default::default(),
        body: Some(body),
        is_base64_encoded: false,
        cookies: Vec::new(),
    };
    response.headers.insert("content-type", "application/json".parse()?);
    response.headers.insert("access-control-allow-origin", "*".parse()?);
    response.headers.insert("access-control-allow-methods", "POST, OPTIONS".parse()?);
    response.headers.insert("access-control-allow-headers", "Content-Type".parse()?);
    Ok(response)
}

fn error_response(status: i64, message: &str) -> Result<LambdaFunctionUrlResponse, Error> {
    http_response(status, serde_json::json!({ "error": message }).to_string())
}

/// Lambda handler function
async fn handler(
    event: LambdaEvent<LambdaFunctionUrlRequest>,
) -> Result<LambdaFunctionUrlResponse, Error> {
    let request = event.payload;

    // Handle CORS preflight
    if request.request_context.http.method.as_deref() == Some("OPTIONS") {
        return http_response(200, String::new());
    }

    if request.is_base64_encoded {
        return error_response(400, "binary request bodies are not supported");
    }

    let body = request.body.unwrap_or_else(|| "{}".to_string());
    let projection_request: ProjectionRequest = match serde_json::from_str(&body) {
        Ok(r) => r,
        Err(e) => return error_response(400, &format!("Invalid JSON: {}", e)),
    };

    match run_request(&projection_request) {
        Ok(response) => {
            info!(
                "{} / {}: {} periods in {} ms",
                response.deal_name,
                response.scenario_name,
                response.summary.periods_run,
                response.execution_time_ms
            );
            http_response(200, serde_json::to_string(&response)?)
        }
        Err(e) => error_response(422, &format!("{:#}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_uses_defaults() {
        let request: ProjectionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.template, "ACMAT 2025-4");
        assert_eq!(request.projection_months, 60);
        assert!(request.include_periods);
        assert!(!request.breakeven);

        let response = run_request(&request).unwrap();
        assert_eq!(response.deal_name, "ACMAT 2025-4");
        assert_eq!(response.summary.periods_run, 60);
        assert_eq!(response.periods.map(|p| p.len()), Some(60));
        assert_eq!(response.triggers.len(), 3);
    }

    #[test]
    fn test_stress_request_with_breakeven() {
        let request: ProjectionRequest = serde_json::from_str(
            r#"{"template": "CLO", "stress": true, "cdr": 0.10, "include_periods": false, "breakeven": true}"#,
        )
        .unwrap();

        let response = run_request(&request).unwrap();
        assert_eq!(response.scenario_name, "Stress Case");
        assert!(response.periods.is_none());
        assert_eq!(response.breakeven.map(|b| b.len()), Some(5));
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        let request: ProjectionRequest = serde_json::from_str(r#"{"template": "RMBS"}"#).unwrap();
        let err = run_request(&request).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown deal template"));
    }
}
