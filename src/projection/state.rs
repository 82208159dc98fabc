//! Working state owned by the engine for a single projection run

use crate::deal::DealStructure;

/// Recovery cash waiting for its lag to elapse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingRecovery {
    /// Period in which the cash is released
    pub due_period: u32,
    pub amount: f64,
}

/// Mutable balances for one (deal, scenario) run.
///
/// Initialized from the deal's declared balances; the deal itself is never
/// touched, so the same deal can seed any number of runs.
#[derive(Debug, Clone)]
pub struct ProjectionState {
    /// Current projection period (1-indexed, 0 before the first period)
    pub period: u32,

    /// Working collateral balance
    pub collateral_balance: f64,

    /// Collateral balance at closing, denominator for CNL
    pub original_collateral: f64,

    /// Working tranche balances, aligned with the deal's tranche order
    pub tranche_balances: Vec<f64>,

    /// Cumulative net losses
    pub cumulative_losses: f64,

    /// Cumulative principal collected (scheduled + prepaid + recovered)
    pub cumulative_principal: f64,

    /// Recoveries not yet released
    pub recovery_queue: Vec<PendingRecovery>,

    /// Whether any trigger has breached so far
    pub ever_breached: bool,
}

impl ProjectionState {
    /// Initialize state from a deal's current balances
    pub fn from_deal(deal: &DealStructure) -> Self {
        Self {
            period: 0,
            collateral_balance: deal.collateral.current_balance,
            original_collateral: deal.collateral.original_balance,
            tranche_balances: deal.tranches.iter().map(|t| t.current_balance).collect(),
            cumulative_losses: 0.0,
            cumulative_principal: 0.0,
            recovery_queue: Vec::new(),
            ever_breached: false,
        }
    }

    /// Advance to next period
    pub fn advance_period(&mut self) {
        self.period += 1;
    }

    /// Queue recovery cash for a future period
    pub fn queue_recovery(&mut self, due_period: u32, amount: f64) {
        if amount > 0.0 {
            self.recovery_queue.push(PendingRecovery { due_period, amount });
        }
    }

    /// Release and remove every recovery due in `period`, returning the total
    pub fn release_recoveries(&mut self, period: u32) -> f64 {
        let mut released = 0.0;
        self.recovery_queue.retain(|pending| {
            if pending.due_period == period {
                released += pending.amount;
                false
            } else {
                true
            }
        });
        released
    }

    /// Sum of recoveries still queued
    pub fn pending_recoveries(&self) -> f64 {
        self.recovery_queue.iter().map(|p| p.amount).sum()
    }

    /// Sum of all working tranche balances
    pub fn total_tranche_balance(&self) -> f64 {
        self.tranche_balances.iter().sum()
    }

    /// Cumulative net loss as percent of original collateral
    pub fn cnl_rate(&self) -> f64 {
        if self.original_collateral > 0.0 {
            self.cumulative_losses / self.original_collateral * 100.0
        } else {
            0.0
        }
    }
}
