//! Core projection engine: monthly collateral roll-forward and payment waterfall

use std::collections::BTreeMap;

use chrono::Months;
use log::{debug, info};

use super::cashflows::{
    DistributionMode, PeriodCashFlow, ProjectionResult, TrancheFlow, TrancheOpening,
};
use super::state::ProjectionState;
use crate::assumptions::ScenarioAssumptions;
use crate::deal::{DealStructure, Fee, PaymentPriority, TestType};
use crate::error::Result;

/// Scheduled principal is half of straight-line amortization over remaining WAM
const SCHEDULED_PRINCIPAL_FACTOR: f64 = 0.5;

/// Projection engine bound to one deal and one scenario.
///
/// The deal is read-only input; all balance changes happen in the engine's own
/// [`ProjectionState`]. `run_projection` consumes the engine, so a partially
/// run engine can never be reused.
pub struct CashFlowEngine<'a> {
    deal: &'a DealStructure,
    scenario: &'a ScenarioAssumptions,
    state: ProjectionState,
    /// Senior fees in payment order
    senior_fees: Vec<&'a Fee>,
}

/// Ratios computed for trigger tests in a period
struct PeriodTests {
    oc_ratio: f64,
    ic_ratio: f64,
    cnl_rate: f64,
}

impl PeriodTests {
    /// Metric for a trigger type; `None` for types not tested during projection
    fn metric(&self, test_type: TestType) -> Option<f64> {
        match test_type {
            TestType::Oc => Some(self.oc_ratio),
            TestType::Ic => Some(self.ic_ratio),
            TestType::Cnl => Some(self.cnl_rate),
            TestType::Dscr | TestType::Delinquency | TestType::ExcessSpread => None,
        }
    }
}

impl<'a> CashFlowEngine<'a> {
    /// Validate inputs and initialize working state from the deal's balances
    pub fn new(deal: &'a DealStructure, scenario: &'a ScenarioAssumptions) -> Result<Self> {
        deal.validate()?;
        scenario.validate()?;

        let mut senior_fees: Vec<&Fee> = deal.fees.iter().filter(|f| !f.is_subordinated).collect();
        senior_fees.sort_by_key(|f| f.priority);

        Ok(Self {
            deal,
            scenario,
            state: ProjectionState::from_deal(deal),
            senior_fees,
        })
    }

    /// Project until the horizon or until the collateral is exhausted
    pub fn run_projection(mut self) -> ProjectionResult {
        let openings = self
            .deal
            .tranches
            .iter()
            .zip(&self.state.tranche_balances)
            .map(|(t, &balance)| TrancheOpening {
                name: t.name.clone(),
                balance,
            })
            .collect();
        let mut result = ProjectionResult::new(&self.deal.deal_name, &self.scenario.name, openings);

        let mut previous_mode = None;
        for _ in 0..self.scenario.projection_months {
            if self.state.collateral_balance <= 0.0 {
                break;
            }
            self.state.advance_period();

            let row = self.calculate_period();
            if previous_mode.is_some_and(|mode| mode != row.distribution_mode) {
                debug!(
                    "{}: period {} principal distribution switched to {:?}",
                    self.deal.deal_name, row.period, row.distribution_mode
                );
            }
            previous_mode = Some(row.distribution_mode);
            result.add_period(row);
        }
        result.unreleased_recoveries = self.state.pending_recoveries();

        info!(
            "{} / {}: projected {} periods, cumulative losses {:.2}",
            self.deal.deal_name,
            self.scenario.name,
            result.periods.len(),
            self.state.cumulative_losses
        );

        result
    }

    /// Calculate one period: collateral, fees, interest, triggers, principal
    fn calculate_period(&mut self) -> PeriodCashFlow {
        let period = self.state.period;
        let mut row = PeriodCashFlow::new(period);
        row.index_rate = self.scenario.index_rate_for(period);
        row.date = self
            .deal
            .closing_date
            .and_then(|closing| closing.checked_add_months(Months::new(period)));

        self.roll_collateral(&mut row);

        // Fee and coverage bases are the note balances before this period's paydown
        let notes_before_paydown = self.state.total_tranche_balance();
        let rated_before_paydown = self.rated_balance();

        let mut available_interest = row.interest_income;
        available_interest = self.pay_fees(&mut row, available_interest, notes_before_paydown);
        available_interest = self.pay_interest(&mut row, available_interest);
        row.excess_spread = available_interest;

        self.evaluate_triggers(&mut row, rated_before_paydown);

        let available_principal = row.principal_collections();
        row.distribution_mode = self.distribution_mode(row.triggers_breached);
        row.residual = match row.distribution_mode {
            DistributionMode::Sequential => self.pay_sequential(&mut row, available_principal),
            DistributionMode::ProRata => self.pay_pro_rata(&mut row, available_principal),
        };

        for (flow, &balance) in row.tranches.iter_mut().zip(&self.state.tranche_balances) {
            flow.ending_balance = balance;
        }

        row
    }

    /// Step 1: scheduled principal, prepayments, defaults and recoveries
    fn roll_collateral(&mut self, row: &mut PeriodCashFlow) {
        let period = self.state.period;
        let pool = &self.deal.collateral;
        let assumption = &self.scenario.default;
        let beginning = self.state.collateral_balance;

        row.smm = self.scenario.monthly_smm(period);
        row.mdr = self.scenario.monthly_mdr(period);

        // Defaults take precedence; scheduled and prepaid principal share what is left
        let remaining_term = (pool.weighted_average_maturity - (period - 1) as f64).max(1.0);
        let defaults = (beginning * row.mdr).min(beginning);
        let scheduled = (beginning / remaining_term * SCHEDULED_PRINCIPAL_FACTOR)
            .min(beginning - defaults);
        let prepayments = (row.smm * (beginning - scheduled))
            .min(beginning - defaults - scheduled)
            .max(0.0);

        self.state
            .queue_recovery(period + assumption.recovery_lag, defaults * assumption.recovery_rate);
        let recoveries = self.state.release_recoveries(period);
        let losses = defaults * assumption.loss_severity();

        let ending = (beginning - scheduled - prepayments - defaults + recoveries).clamp(0.0, beginning);

        self.state.cumulative_losses += losses;
        self.state.cumulative_principal += scheduled + prepayments + recoveries;
        self.state.collateral_balance = ending;

        row.beginning_balance = beginning;
        row.scheduled_principal = scheduled;
        row.prepayments = prepayments;
        row.defaults = defaults;
        row.recoveries = recoveries;
        row.losses = losses;
        row.ending_balance = ending;
        row.interest_income = pool.monthly_interest(beginning);
        row.cumulative_losses = self.state.cumulative_losses;
        row.cumulative_principal = self.state.cumulative_principal;
        row.cnl_rate = self.state.cnl_rate();
    }

    /// Step 2: senior fees in priority order; unpaid amounts are not carried
    fn pay_fees(&self, row: &mut PeriodCashFlow, mut available: f64, notes_balance: f64) -> f64 {
        for fee in &self.senior_fees {
            let due = fee.calculate(row.ending_balance, notes_balance, self.deal.payment_frequency);
            let paid = due.min(available).max(0.0);
            available -= paid;
            row.fees_paid += paid;
        }
        available
    }

    /// Step 3: tranche interest in seniority order, residual classes skipped
    fn pay_interest(&self, row: &mut PeriodCashFlow, mut available: f64) -> f64 {
        for (tranche, &balance) in self.deal.tranches.iter().zip(&self.state.tranche_balances) {
            let mut flow = TrancheFlow::new(&tranche.name);
            if !tranche.is_residual() && !tranche.is_po {
                flow.interest_due = tranche.interest_on(balance, row.index_rate);
                flow.interest_paid = flow.interest_due.min(available).max(0.0);
                available -= flow.interest_paid;
            }
            row.tranches.push(flow);
        }
        available
    }

    /// Step 4: OC / IC / CNL tests against each configured trigger
    fn evaluate_triggers(&mut self, row: &mut PeriodCashFlow, rated_balance: f64) {
        let interest_paid = row.total_interest_paid();
        let tests = PeriodTests {
            oc_ratio: if rated_balance > 0.0 {
                row.ending_balance / rated_balance * 100.0
            } else {
                0.0
            },
            ic_ratio: if interest_paid > 0.0 {
                row.interest_income / interest_paid
            } else {
                0.0
            },
            cnl_rate: row.cnl_rate,
        };

        let mut status = BTreeMap::new();
        for trigger in &self.deal.triggers {
            let passed = tests
                .metric(trigger.test_type)
                .map_or(true, |value| trigger.evaluate(value));
            status.insert(trigger.name.clone(), passed);
        }

        row.oc_ratio = tests.oc_ratio;
        row.ic_ratio = tests.ic_ratio;
        row.triggers_breached = status.values().any(|passed| !passed);
        row.trigger_status = status;

        if row.triggers_breached && !self.state.ever_breached {
            self.state.ever_breached = true;
            let failed: Vec<&str> = row
                .trigger_status
                .iter()
                .filter(|(_, passed)| !**passed)
                .map(|(name, _)| name.as_str())
                .collect();
            debug!(
                "{}: first trigger breach in period {}: {}",
                self.deal.deal_name,
                row.period,
                failed.join(", ")
            );
        }
    }

    fn distribution_mode(&self, triggers_breached: bool) -> DistributionMode {
        match self.deal.payment_priority {
            PaymentPriority::Sequential => DistributionMode::Sequential,
            _ if triggers_breached => DistributionMode::Sequential,
            PaymentPriority::ProRata | PaymentPriority::ModifiedProRata => DistributionMode::ProRata,
        }
    }

    /// Step 5a: senior-first paydown; returns undistributed principal
    fn pay_sequential(&mut self, row: &mut PeriodCashFlow, mut available: f64) -> f64 {
        for (flow, balance) in row.tranches.iter_mut().zip(self.state.tranche_balances.iter_mut()) {
            if available <= 0.0 {
                break;
            }
            let payment = available.min(*balance);
            *balance -= payment;
            flow.principal_paid = payment;
            available -= payment;
        }
        available.max(0.0)
    }

    /// Step 5b: paydown in proportion to balances, capped at each balance;
    /// returns undistributed principal
    fn pay_pro_rata(&mut self, row: &mut PeriodCashFlow, available: f64) -> f64 {
        let total = self.state.total_tranche_balance();
        if total <= 0.0 {
            return available;
        }

        let mut distributed = 0.0;
        for (flow, balance) in row.tranches.iter_mut().zip(self.state.tranche_balances.iter_mut()) {
            let payment = (available * *balance / total).min(*balance);
            *balance -= payment;
            flow.principal_paid = payment;
            distributed += payment;
        }
        (available - distributed).max(0.0)
    }

    /// Working balance of rated (non-residual) tranches
    fn rated_balance(&self) -> f64 {
        self.deal
            .tranches
            .iter()
            .zip(&self.state.tranche_balances)
            .filter(|(t, _)| !t.is_residual())
            .map(|(_, &balance)| balance)
            .sum()
    }
}
