//! Break-even CDR solver
//!
//! Finds the highest constant annual default rate at which a tranche is still
//! repaid over the projection horizon. Every bisection step projects the deal
//! with a fresh engine, so no state leaks between steps.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assumptions::ScenarioAssumptions;
use crate::deal::DealStructure;
use crate::error::{AbsError, Result};
use crate::projection::CashFlowEngine;

/// Configuration for the break-even search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakevenConfig {
    /// Recovery rate held fixed during the search
    pub recovery_rate: f64,
    /// Constant CPR used for every trial
    pub cpr: f64,
    pub index_rate: f64,
    pub projection_months: u32,
    /// Upper end of the CDR search bracket
    pub max_cdr: f64,
    /// Bracket width at which the search stops
    pub tolerance: f64,
    /// Tranche counts as impaired when its final balance exceeds this
    /// fraction of its starting balance
    pub impairment_threshold: f64,
    /// Optional cap on bisection steps
    pub max_iterations: Option<u32>,
}

impl Default for BreakevenConfig {
    fn default() -> Self {
        Self {
            recovery_rate: 0.40,
            cpr: 0.15,
            index_rate: 0.0433,
            projection_months: 60,
            max_cdr: 0.50,
            tolerance: 0.001,
            impairment_threshold: 0.01,
            max_iterations: None,
        }
    }
}

impl BreakevenConfig {
    fn validate(&self) -> Result<()> {
        if !(self.max_cdr > 0.0 && self.max_cdr <= 1.0) {
            return Err(AbsError::invalid_input("max_cdr", "must lie in (0, 1]"));
        }
        if !(self.tolerance > 0.0) {
            return Err(AbsError::invalid_input("tolerance", "must be positive"));
        }
        if self.impairment_threshold < 0.0 {
            return Err(AbsError::invalid_input(
                "impairment_threshold",
                "must be non-negative",
            ));
        }
        Ok(())
    }

    /// Constant-curve scenario at a trial CDR
    fn scenario(&self, cdr: f64) -> ScenarioAssumptions {
        ScenarioAssumptions::base_case(
            self.cpr,
            cdr,
            self.recovery_rate,
            self.index_rate,
            self.projection_months,
        )
        .with_name(&format!("Breakeven CDR {:.4}", cdr))
    }
}

/// Break-even CDR for one tranche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakevenResult {
    pub tranche: String,
    /// Annual CDR, rounded to 4 decimals
    pub cdr: f64,
    pub iterations: u32,
    /// False when the iteration cap stopped the search early
    pub converged: bool,
}

/// Break-even CDR for a tranche, rounded to 4 decimals
pub fn breakeven_cdr(deal: &DealStructure, tranche: &str, config: &BreakevenConfig) -> Result<f64> {
    solve(deal, tranche, config).map(|result| result.cdr)
}

/// Bisect [0, max_cdr] on the tranche's impairment
pub fn solve(deal: &DealStructure, tranche: &str, config: &BreakevenConfig) -> Result<BreakevenResult> {
    config.validate()?;
    deal.validate()?;
    let starting_balance = deal.tranche(tranche)?.current_balance;

    let is_impaired = |cdr: f64| -> Result<bool> {
        let scenario = config.scenario(cdr);
        let result = CashFlowEngine::new(deal, &scenario)?.run_projection();
        let final_balance = result.final_tranche_balance(tranche)?;
        Ok(final_balance > config.impairment_threshold * starting_balance)
    };

    let mut low = 0.0;
    let mut high = config.max_cdr;
    let mut iterations = 0;
    let mut converged = true;

    while high - low > config.tolerance {
        if config.max_iterations.is_some_and(|cap| iterations >= cap) {
            warn!(
                "{} / {}: break-even search stopped at iteration cap {} with bracket [{:.4}, {:.4}]",
                deal.deal_name, tranche, iterations, low, high
            );
            converged = false;
            break;
        }

        let mid = (low + high) / 2.0;
        if is_impaired(mid)? {
            high = mid;
        } else {
            low = mid;
        }
        iterations += 1;
    }

    let cdr = round4((low + high) / 2.0);
    info!(
        "{} / {}: break-even CDR {:.4} after {} iterations",
        deal.deal_name, tranche, cdr, iterations
    );

    Ok(BreakevenResult {
        tranche: tranche.to_string(),
        cdr,
        iterations,
        converged,
    })
}

/// Solve every rated tranche in parallel, in payment priority order
pub fn solve_all(deal: &DealStructure, config: &BreakevenConfig) -> Result<Vec<BreakevenResult>> {
    let rated: Vec<&str> = deal
        .tranches
        .iter()
        .filter(|t| !t.is_residual())
        .map(|t| t.name.as_str())
        .collect();

    if rated.is_empty() {
        warn!("{}: no rated tranches to solve", deal.deal_name);
        return Ok(Vec::new());
    }

    rated
        .par_iter()
        .map(|name| solve(deal, name, config))
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{templates, CollateralPool, CollateralType, Rating, RatingAgency, Tranche};

    fn rated(name: &str, balance: f64, spread: f64, rating: &str) -> Tranche {
        Tranche::floating(name, balance, spread, vec![Rating::new(RatingAgency::SP, rating)])
    }

    fn test_deal() -> DealStructure {
        let pool = CollateralPool::new(100_000_000.0, CollateralType::Consumer, 0.12, 48.0, 2.0);
        DealStructure::new(
            "Breakeven Test",
            pool,
            vec![
                rated("Class A", 70_000_000.0, 0.010, "AAA"),
                rated("Class B", 15_000_000.0, 0.030, "BBB"),
                rated("Residual", 15_000_000.0, 0.0, "NR"),
            ],
        )
    }

    #[test]
    fn test_unknown_tranche() {
        let deal = test_deal();
        assert!(matches!(
            breakeven_cdr(&deal, "Class Z", &BreakevenConfig::default()),
            Err(AbsError::TrancheNotFound(_))
        ));
    }

    #[test]
    fn test_result_within_bracket() {
        let deal = test_deal();
        let config = BreakevenConfig::default();
        let cdr = breakeven_cdr(&deal, "Class B", &config).unwrap();
        assert!(cdr >= 0.0 && cdr <= config.max_cdr);
        assert_eq!(cdr, round4(cdr));
    }

    #[test]
    fn test_junior_breaks_before_senior() {
        let deal = test_deal();
        let config = BreakevenConfig::default();
        let senior = breakeven_cdr(&deal, "Class A", &config).unwrap();
        let junior = breakeven_cdr(&deal, "Class B", &config).unwrap();
        assert!(junior <= senior + config.tolerance);
    }

    #[test]
    fn test_higher_recovery_does_not_lower_breakeven() {
        let deal = test_deal();
        let low_recovery = BreakevenConfig {
            recovery_rate: 0.20,
            ..Default::default()
        };
        let high_recovery = BreakevenConfig {
            recovery_rate: 0.60,
            ..Default::default()
        };
        let low = breakeven_cdr(&deal, "Class B", &low_recovery).unwrap();
        let high = breakeven_cdr(&deal, "Class B", &high_recovery).unwrap();
        assert!(high + low_recovery.tolerance >= low);
    }

    #[test]
    fn test_iteration_cap() {
        let deal = test_deal();
        let config = BreakevenConfig {
            max_iterations: Some(0),
            ..Default::default()
        };
        let result = solve(&deal, "Class A", &config).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.cdr, 0.25);
    }

    #[test]
    fn test_converges_within_tolerance() {
        let deal = test_deal();
        let result = solve(&deal, "Class A", &BreakevenConfig::default()).unwrap();
        assert!(result.converged);
        // 0.5 / 2^9 < 0.001
        assert_eq!(result.iterations, 9);
    }

    #[test]
    fn test_final_balance_rises_with_cdr() {
        let deal = templates::clo();
        let config = BreakevenConfig::default();

        let mut previous: Option<Vec<f64>> = None;
        for step in 0..=20 {
            let cdr = config.max_cdr * step as f64 / 20.0;
            let scenario = config.scenario(cdr);
            let result = CashFlowEngine::new(&deal, &scenario).unwrap().run_projection();
            let balances: Vec<f64> = deal
                .tranches
                .iter()
                .map(|t| result.final_tranche_balance(&t.name).unwrap())
                .collect();

            if let Some(prior) = &previous {
                for ((tranche, before), after) in deal.tranches.iter().zip(prior).zip(&balances) {
                    assert!(
                        *after + 1e-3 >= *before,
                        "{} final balance fell from {} to {} at CDR {}",
                        tranche.name,
                        before,
                        after,
                        cdr
                    );
                }
            }
            previous = Some(balances);
        }
    }

    #[test]
    fn test_solve_all_skips_residual() {
        let deal = templates::clo();
        let results = solve_all(&deal, &BreakevenConfig::default()).unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.tranche.as_str()).collect();
        assert_eq!(names, vec!["Class A", "Class B", "Class C", "Class D", "Class E"]);
        for pair in results.windows(2) {
            assert!(pair[1].cdr <= pair[0].cdr + 0.001);
        }
    }

    #[test]
    fn test_invalid_config() {
        let deal = test_deal();
        let config = BreakevenConfig {
            max_cdr: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            breakeven_cdr(&deal, "Class A", &config),
            Err(AbsError::InvalidInput { .. })
        ));
    }
}
