//! Cash flow output structures for projections

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::irr::cash_flow_yield;
use crate::error::{AbsError, Result};

/// How principal was distributed in a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMode {
    Sequential,
    ProRata,
}

/// One tranche's slice of a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheFlow {
    pub name: String,
    pub interest_due: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub ending_balance: f64,
}

impl TrancheFlow {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interest_due: 0.0,
            interest_paid: 0.0,
            principal_paid: 0.0,
            ending_balance: 0.0,
        }
    }

    /// Interest due but not paid this period
    pub fn interest_shortfall(&self) -> f64 {
        (self.interest_due - self.interest_paid).max(0.0)
    }
}

/// Snapshot of one projection period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodCashFlow {
    // Timing
    pub period: u32,
    pub date: Option<NaiveDate>,

    // Rates applied
    pub smm: f64,
    pub mdr: f64,
    pub index_rate: f64,

    // Collateral roll-forward
    pub beginning_balance: f64,
    pub scheduled_principal: f64,
    pub prepayments: f64,
    pub defaults: f64,
    pub recoveries: f64,
    pub losses: f64,
    pub ending_balance: f64,
    pub interest_income: f64,

    // Cumulative
    pub cumulative_losses: f64,
    pub cumulative_principal: f64,
    /// Cumulative net loss, percent of original collateral
    pub cnl_rate: f64,

    // Waterfall
    pub fees_paid: f64,
    /// Tranche flows in payment priority order
    pub tranches: Vec<TrancheFlow>,
    /// Interest remaining after fees and tranche interest
    pub excess_spread: f64,
    /// Principal remaining after tranche principal
    pub residual: f64,

    // Tests
    pub oc_ratio: f64,
    pub ic_ratio: f64,
    pub trigger_status: BTreeMap<String, bool>,
    pub triggers_breached: bool,
    pub distribution_mode: DistributionMode,
}

impl PeriodCashFlow {
    /// Create an empty period with zero amounts
    pub fn new(period: u32) -> Self {
        Self {
            period,
            date: None,
            smm: 0.0,
            mdr: 0.0,
            index_rate: 0.0,
            beginning_balance: 0.0,
            scheduled_principal: 0.0,
            prepayments: 0.0,
            defaults: 0.0,
            recoveries: 0.0,
            losses: 0.0,
            ending_balance: 0.0,
            interest_income: 0.0,
            cumulative_losses: 0.0,
            cumulative_principal: 0.0,
            cnl_rate: 0.0,
            fees_paid: 0.0,
            tranches: Vec::new(),
            excess_spread: 0.0,
            residual: 0.0,
            oc_ratio: 0.0,
            ic_ratio: 0.0,
            trigger_status: BTreeMap::new(),
            triggers_breached: false,
            distribution_mode: DistributionMode::Sequential,
        }
    }

    pub fn tranche(&self, name: &str) -> Option<&TrancheFlow> {
        self.tranches.iter().find(|t| t.name == name)
    }

    /// Principal collected from the pool this period
    pub fn principal_collections(&self) -> f64 {
        self.scheduled_principal + self.prepayments + self.recoveries
    }

    pub fn total_interest_paid(&self) -> f64 {
        self.tranches.iter().map(|t| t.interest_paid).sum()
    }

    pub fn total_principal_paid(&self) -> f64 {
        self.tranches.iter().map(|t| t.principal_paid).sum()
    }
}

/// Tranche balance at the start of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheOpening {
    pub name: String,
    pub balance: f64,
}

/// Per-period series for one tranche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheCashFlow {
    pub name: String,
    pub starting_balance: f64,
    pub periods: Vec<u32>,
    pub interest: Vec<f64>,
    pub principal: Vec<f64>,
    pub balance: Vec<f64>,
}

impl TrancheCashFlow {
    pub fn total_interest(&self) -> f64 {
        self.interest.iter().sum()
    }

    pub fn total_principal(&self) -> f64 {
        self.principal.iter().sum()
    }

    /// Weighted average life in years
    pub fn weighted_average_life(&self) -> f64 {
        let total_principal = self.total_principal();
        if total_principal <= 0.0 {
            return 0.0;
        }
        let weighted_time: f64 = self
            .periods
            .iter()
            .zip(&self.principal)
            .map(|(&period, &principal)| principal * period as f64 / 12.0)
            .sum();
        weighted_time / total_principal
    }

    /// Yield approximation from total receipts over WAL:
    /// (receipts / cost)^(1 / WAL) - 1, with WAL of 1 when nothing amortized
    pub fn approximate_yield(&self, price: f64) -> f64 {
        let cost = self.starting_balance * price / 100.0;
        if cost <= 0.0 {
            return 0.0;
        }
        let total_return = self.total_interest() + self.total_principal();
        let wal = self.weighted_average_life();
        let avg_life = if wal > 0.0 { wal } else { 1.0 };
        (total_return / cost).powf(1.0 / avg_life) - 1.0
    }

    /// Annualized IRR of the monthly receipts against the purchase price
    pub fn cash_flow_yield(&self, price: f64) -> Option<f64> {
        let receipts: Vec<f64> = self
            .interest
            .iter()
            .zip(&self.principal)
            .map(|(i, p)| i + p)
            .collect();
        cash_flow_yield(self.starting_balance, price, &receipts, 12)
    }

    pub fn final_balance(&self) -> f64 {
        self.balance.last().copied().unwrap_or(self.starting_balance)
    }
}

/// Complete projection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub deal_name: String,
    pub scenario_name: String,

    /// Tranche balances the run started from, in payment priority order
    pub openings: Vec<TrancheOpening>,

    /// Period snapshots in order
    pub periods: Vec<PeriodCashFlow>,

    /// Recoveries still queued when the projection stopped
    #[serde(default)]
    pub unreleased_recoveries: f64,
}

impl ProjectionResult {
    pub fn new(deal_name: &str, scenario_name: &str, openings: Vec<TrancheOpening>) -> Self {
        Self {
            deal_name: deal_name.to_string(),
            scenario_name: scenario_name.to_string(),
            openings,
            periods: Vec::new(),
            unreleased_recoveries: 0.0,
        }
    }

    /// Append a period snapshot
    pub fn add_period(&mut self, period: PeriodCashFlow) {
        self.periods.push(period);
    }

    /// Working balance of a tranche after the last projected period
    pub fn final_tranche_balance(&self, name: &str) -> Result<f64> {
        let opening = self
            .openings
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| AbsError::TrancheNotFound(name.to_string()))?;

        Ok(self
            .periods
            .last()
            .and_then(|p| p.tranche(name))
            .map(|t| t.ending_balance)
            .unwrap_or(opening.balance))
    }

    /// Per-period series for one tranche
    pub fn tranche_cashflows(&self, name: &str) -> Result<TrancheCashFlow> {
        let opening = self
            .openings
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| AbsError::TrancheNotFound(name.to_string()))?;

        let mut flows = TrancheCashFlow {
            name: opening.name.clone(),
            starting_balance: opening.balance,
            periods: Vec::with_capacity(self.periods.len()),
            interest: Vec::with_capacity(self.periods.len()),
            principal: Vec::with_capacity(self.periods.len()),
            balance: Vec::with_capacity(self.periods.len()),
        };
        for period in &self.periods {
            if let Some(t) = period.tranche(name) {
                flows.periods.push(period.period);
                flows.interest.push(t.interest_paid);
                flows.principal.push(t.principal_paid);
                flows.balance.push(t.ending_balance);
            }
        }
        Ok(flows)
    }

    /// Summary metrics for every tranche at a purchase price (percent of par)
    pub fn tranche_summaries(&self, price: f64) -> Vec<TrancheSummary> {
        self.openings
            .iter()
            .filter_map(|o| self.tranche_cashflows(&o.name).ok())
            .map(|flows| TrancheSummary::from_flows(&flows, price))
            .collect()
    }

    /// Get summary statistics
    pub fn summary(&self) -> ProjectionSummary {
        let sum = |f: fn(&PeriodCashFlow) -> f64| -> f64 { self.periods.iter().map(f).sum() };

        let last = self.periods.last();
        ProjectionSummary {
            periods_run: self.periods.len() as u32,
            total_interest_income: sum(|p| p.interest_income),
            total_scheduled_principal: sum(|p| p.scheduled_principal),
            total_prepayments: sum(|p| p.prepayments),
            total_defaults: sum(|p| p.defaults),
            total_recoveries: sum(|p| p.recoveries),
            unreleased_recoveries: self.unreleased_recoveries,
            total_collections: sum(|p| p.interest_income + p.principal_collections()),
            total_fees: sum(|p| p.fees_paid),
            total_excess_spread: sum(|p| p.excess_spread),
            total_residual: sum(|p| p.residual),
            cumulative_losses: last.map(|p| p.cumulative_losses).unwrap_or(0.0),
            final_cnl: last.map(|p| p.cnl_rate).unwrap_or(0.0),
            final_collateral_balance: last.map(|p| p.ending_balance).unwrap_or(0.0),
            breached_periods: self.periods.iter().filter(|p| p.triggers_breached).count() as u32,
        }
    }
}

/// Summary statistics for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub periods_run: u32,
    pub total_interest_income: f64,
    pub total_scheduled_principal: f64,
    pub total_prepayments: f64,
    pub total_defaults: f64,
    pub total_recoveries: f64,
    /// Recoveries due after the last projected period
    pub unreleased_recoveries: f64,
    /// Interest income plus principal collections
    pub total_collections: f64,
    pub total_fees: f64,
    pub total_excess_spread: f64,
    pub total_residual: f64,
    pub cumulative_losses: f64,
    pub final_cnl: f64,
    pub final_collateral_balance: f64,
    pub breached_periods: u32,
}

/// Summary metrics for one tranche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheSummary {
    pub name: String,
    pub starting_balance: f64,
    pub final_balance: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    /// Years
    pub wal: f64,
    pub paid_down_pct: f64,
    /// Principal still outstanding at the end of the projection
    pub principal_shortfall: f64,
    pub approximate_yield: f64,
    pub cash_flow_yield: Option<f64>,
}

impl TrancheSummary {
    pub fn from_flows(flows: &TrancheCashFlow, price: f64) -> Self {
        let final_balance = flows.final_balance();
        let paid_down_pct = if flows.starting_balance > 0.0 {
            (flows.starting_balance - final_balance) / flows.starting_balance * 100.0
        } else {
            0.0
        };

        Self {
            name: flows.name.clone(),
            starting_balance: flows.starting_balance,
            final_balance,
            principal_paid: flows.total_principal(),
            interest_paid: flows.total_interest(),
            wal: flows.weighted_average_life(),
            paid_down_pct,
            principal_shortfall: final_balance.max(0.0),
            approximate_yield: flows.approximate_yield(price),
            cash_flow_yield: flows.cash_flow_yield(price),
        }
    }
}
