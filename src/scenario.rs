//! Scenario runner for batch projections of one deal
//!
//! Holds a deal as a read-only prototype and projects it under any number of
//! scenarios. Each run gets its own engine state, so runs are independent and
//! safe to execute in parallel.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assumptions::ScenarioAssumptions;
use crate::deal::{load_deal, templates, DealStructure};
use crate::error::Result;
use crate::projection::{CashFlowEngine, ProjectionResult, ProjectionSummary, TrancheSummary};

/// Side-by-side result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub scenario_name: String,
    pub summary: ProjectionSummary,
    pub tranches: Vec<TrancheSummary>,
}

/// Deal prototype plus runner for batch projections
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_template("CLO")?;
///
/// let scenarios: Vec<_> = [0.02, 0.05, 0.10]
///     .iter()
///     .map(|&cdr| ScenarioAssumptions::base_case(0.15, cdr, 0.40, 0.0433, 60))
///     .collect();
/// let results = runner.run_scenarios(&scenarios)?;
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    base_deal: DealStructure,
}

impl ScenarioRunner {
    /// Create runner from a validated deal
    pub fn new(deal: DealStructure) -> Result<Self> {
        deal.validate()?;
        Ok(Self { base_deal: deal })
    }

    /// Create runner from a named template
    pub fn from_template(name: &str) -> Result<Self> {
        Self::new(templates::by_name(name)?)
    }

    /// Create runner from a JSON deal file
    pub fn from_json_path(path: &Path) -> Result<Self> {
        Ok(Self {
            base_deal: load_deal(path)?,
        })
    }

    /// Run a single projection
    pub fn run(&self, scenario: &ScenarioAssumptions) -> Result<ProjectionResult> {
        let engine = CashFlowEngine::new(&self.base_deal, scenario)?;
        Ok(engine.run_projection())
    }

    /// Run multiple scenarios in parallel; results keep the input order
    pub fn run_scenarios(&self, scenarios: &[ScenarioAssumptions]) -> Result<Vec<ProjectionResult>> {
        scenarios.par_iter().map(|scenario| self.run(scenario)).collect()
    }

    /// Run scenarios and reduce each to summary and tranche metrics at `price`
    pub fn compare(&self, scenarios: &[ScenarioAssumptions], price: f64) -> Result<Vec<ScenarioComparison>> {
        let results = self.run_scenarios(scenarios)?;
        Ok(results
            .iter()
            .map(|result| ScenarioComparison {
                scenario_name: result.scenario_name.clone(),
                summary: result.summary(),
                tranches: result.tranche_summaries(price),
            })
            .collect())
    }

    /// Base case against stress case with the standard parameters, priced at par
    pub fn base_vs_stress(&self) -> Result<Vec<ScenarioComparison>> {
        let scenarios = [
            ScenarioAssumptions::base_case(0.15, 0.03, 0.40, 0.0433, 60),
            ScenarioAssumptions::stress_case(0.08, 0.10, 0.30, 0.0550, 60),
        ];
        self.compare(&scenarios, 100.0)
    }

    /// Get reference to the deal prototype
    pub fn deal(&self) -> &DealStructure {
        &self.base_deal
    }

    /// Get mutable reference to the deal prototype for customization
    pub fn deal_mut(&mut self) -> &mut DealStructure {
        &mut self.base_deal
    }
}
