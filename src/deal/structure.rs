//! Deal aggregate root and derived structural ratios
//!
//! All ratios are computed on demand from the declared balances; nothing is cached.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::collateral::CollateralPool;
use super::fee::{Fee, ReserveAccount};
use super::tranche::Tranche;
use super::trigger::{TestType, TriggerResult, TriggerTest};
use crate::error::{AbsError, Result};

fn default_payment_frequency() -> u32 {
    12
}

fn default_format() -> String {
    "144A".to_string()
}

/// Principal distribution rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPriority {
    /// Senior paid first, then mezzanine, then subordinate
    Sequential,
    /// All tranches paid proportionally
    ProRata,
    /// Pro rata until a trigger breaches, then sequential
    ModifiedProRata,
}

impl Default for PaymentPriority {
    fn default() -> Self {
        PaymentPriority::Sequential
    }
}

/// Complete ABS/CLO deal structure.
///
/// Tranche order is payment priority: index 0 is the most senior class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealStructure {
    pub deal_name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub pricing_date: Option<NaiveDate>,
    #[serde(default)]
    pub closing_date: Option<NaiveDate>,

    pub collateral: CollateralPool,
    pub tranches: Vec<Tranche>,
    #[serde(default)]
    pub triggers: Vec<TriggerTest>,
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub reserve_accounts: Vec<ReserveAccount>,

    // Structural features
    #[serde(default)]
    pub payment_priority: PaymentPriority,
    /// Payments per year
    #[serde(default = "default_payment_frequency")]
    pub payment_frequency: u32,
    /// Months; stored only
    #[serde(default)]
    pub reinvestment_period: u32,
    #[serde(default)]
    pub call_date: Option<NaiveDate>,
    #[serde(default)]
    pub legal_final: Option<NaiveDate>,

    // Metadata
    #[serde(default)]
    pub bookrunner: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub shelf: String,
    #[serde(default)]
    pub series: String,
}

impl DealStructure {
    /// Create a sequential-pay, monthly deal with no triggers, fees or reserves
    pub fn new(deal_name: &str, collateral: CollateralPool, tranches: Vec<Tranche>) -> Self {
        Self {
            deal_name: deal_name.to_string(),
            issuer: String::new(),
            pricing_date: None,
            closing_date: None,
            collateral,
            tranches,
            triggers: Vec::new(),
            fees: Vec::new(),
            reserve_accounts: Vec::new(),
            payment_priority: PaymentPriority::Sequential,
            payment_frequency: default_payment_frequency(),
            reinvestment_period: 0,
            call_date: None,
            legal_final: None,
            bookrunner: String::new(),
            format: default_format(),
            shelf: String::new(),
            series: String::new(),
        }
    }

    pub fn with_triggers(mut self, triggers: Vec<TriggerTest>) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_fees(mut self, fees: Vec<Fee>) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_payment_priority(mut self, priority: PaymentPriority) -> Self {
        self.payment_priority = priority;
        self
    }

    /// Reject structures that cannot be projected meaningfully
    pub fn validate(&self) -> Result<()> {
        if self.tranches.is_empty() {
            return Err(AbsError::EmptyTranches(self.deal_name.clone()));
        }

        let mut seen = HashSet::new();
        for tranche in &self.tranches {
            if !seen.insert(tranche.name.as_str()) {
                return Err(AbsError::DuplicateTranche(tranche.name.clone()));
            }
            if tranche.current_balance < 0.0 || tranche.original_balance < 0.0 {
                return Err(AbsError::invalid_input(
                    format!("tranches.{}", tranche.name),
                    "balances must be non-negative",
                ));
            }
        }

        let pool = &self.collateral;
        if pool.original_balance <= 0.0 {
            return Err(AbsError::InvalidCollateral(
                "original balance must be positive".to_string(),
            ));
        }
        if pool.current_balance < 0.0 || pool.current_balance > pool.original_balance {
            return Err(AbsError::InvalidCollateral(format!(
                "current balance {} outside [0, {}]",
                pool.current_balance, pool.original_balance
            )));
        }
        if pool.weighted_average_maturity <= 0.0 {
            return Err(AbsError::InvalidCollateral(
                "weighted average maturity must be positive".to_string(),
            ));
        }
        if self.payment_frequency == 0 {
            return Err(AbsError::invalid_input("payment_frequency", "must be positive"));
        }

        Ok(())
    }

    /// Position of a tranche in payment priority
    pub fn tranche_index(&self, name: &str) -> Result<usize> {
        self.tranches
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| AbsError::TrancheNotFound(name.to_string()))
    }

    pub fn tranche(&self, name: &str) -> Result<&Tranche> {
        self.tranche_index(name).map(|idx| &self.tranches[idx])
    }

    /// Sum of all tranche balances
    pub fn total_notes(&self) -> f64 {
        self.tranches.iter().map(|t| t.current_balance).sum()
    }

    /// Sum of rated tranche balances (excludes residual/equity)
    pub fn rated_notes(&self) -> f64 {
        self.tranches
            .iter()
            .filter(|t| !t.is_residual())
            .map(|t| t.current_balance)
            .sum()
    }

    /// Credit enhancement for a tranche, percent of collateral:
    /// (subordination below + excess collateral) / collateral
    pub fn credit_enhancement(&self, tranche_name: &str) -> Result<f64> {
        let idx = self.tranche_index(tranche_name)?;
        let collateral = self.collateral.current_balance;
        if collateral <= 0.0 {
            return Ok(0.0);
        }

        let subordination: f64 = self.tranches[idx + 1..].iter().map(|t| t.current_balance).sum();
        let excess_collateral = collateral - self.total_notes();

        Ok((subordination + excess_collateral) / collateral * 100.0)
    }

    /// Overcollateralization, percent.
    ///
    /// Without `through_tranche` the denominator is all rated notes; with it,
    /// the notes from the most senior class through that class inclusive.
    pub fn overcollateralization(&self, through_tranche: Option<&str>) -> Result<f64> {
        let notes = match through_tranche {
            Some(name) => {
                let idx = self.tranche_index(name)?;
                self.tranches[..=idx].iter().map(|t| t.current_balance).sum()
            }
            None => self.rated_notes(),
        };

        Ok(if notes > 0.0 {
            self.collateral.current_balance / notes * 100.0
        } else {
            0.0
        })
    }

    /// Collateral interest income for one payment period
    fn period_interest_income(&self) -> f64 {
        self.collateral.current_balance * self.collateral.weighted_average_coupon
            / self.payment_frequency.max(1) as f64
    }

    /// Note interest expense for one period, principal-only classes excluded
    fn period_interest_expense(&self, index_rate: f64) -> f64 {
        self.tranches
            .iter()
            .filter(|t| !t.is_po)
            .map(|t| t.period_interest(index_rate))
            .sum()
    }

    /// Interest coverage ratio
    pub fn interest_coverage(&self, index_rate: f64) -> f64 {
        let expense = self.period_interest_expense(index_rate);
        if expense > 0.0 {
            self.period_interest_income() / expense
        } else {
            0.0
        }
    }

    /// Debt service coverage ratio: income / (interest expense + scheduled principal)
    pub fn dscr(&self, index_rate: f64, scheduled_principal: f64) -> f64 {
        let debt_service = self.period_interest_expense(index_rate) + scheduled_principal;
        if debt_service > 0.0 {
            self.period_interest_income() / debt_service
        } else {
            0.0
        }
    }

    /// Rough excess spread: WAC less average tranche spread, percent
    pub fn approximate_excess_spread(&self) -> f64 {
        if self.tranches.is_empty() {
            return 0.0;
        }
        let avg_spread =
            self.tranches.iter().map(|t| t.spread).sum::<f64>() / self.tranches.len() as f64;
        (self.collateral.weighted_average_coupon - avg_spread) * 100.0
    }

    /// Current value of the metric a trigger is tested against
    pub fn trigger_metric(&self, test_type: TestType, index_rate: f64, scheduled_principal: f64) -> f64 {
        match test_type {
            TestType::Oc => self.overcollateralization(None).unwrap_or(0.0),
            TestType::Ic => self.interest_coverage(index_rate),
            TestType::Cnl => self.collateral.cnl_rate(),
            TestType::Dscr => self.dscr(index_rate, scheduled_principal),
            TestType::Delinquency => self.collateral.delinquency_60,
            TestType::ExcessSpread => self.approximate_excess_spread(),
        }
    }

    /// Point-in-time evaluation of every configured trigger
    pub fn evaluate_triggers(&self, index_rate: f64, scheduled_principal: f64) -> Vec<TriggerResult> {
        self.triggers
            .iter()
            .map(|trigger| {
                let current_value = self.trigger_metric(trigger.test_type, index_rate, scheduled_principal);
                let passed = trigger.evaluate(current_value);
                TriggerResult {
                    name: trigger.name.clone(),
                    test_type: trigger.test_type,
                    passed,
                    current_value,
                    threshold: trigger.threshold,
                    comparison: trigger.comparison,
                    consequence: (!passed).then(|| trigger.consequence.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::collateral::CollateralType;
    use crate::deal::tranche::{Rating, RatingAgency};
    use crate::deal::trigger::Comparison;
    use approx::assert_abs_diff_eq;

    fn rated(name: &str, balance: f64, spread: f64, rating: &str) -> Tranche {
        Tranche::floating(name, balance, spread, vec![Rating::new(RatingAgency::SP, rating)])
    }

    fn test_deal() -> DealStructure {
        let pool = CollateralPool::new(100_000_000.0, CollateralType::Consumer, 0.12, 48.0, 2.0);
        DealStructure::new(
            "Test Deal",
            pool,
            vec![
                rated("Class A", 70_000_000.0, 0.01, "AAA"),
                rated("Class B", 20_000_000.0, 0.03, "BBB"),
                rated("Residual", 5_000_000.0, 0.0, "NR"),
            ],
        )
    }

    #[test]
    fn test_validate_ok() {
        assert!(test_deal().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_tranches() {
        let mut deal = test_deal();
        deal.tranches.clear();
        assert!(matches!(deal.validate(), Err(AbsError::EmptyTranches(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut deal = test_deal();
        deal.tranches[1].name = "Class A".to_string();
        assert!(matches!(deal.validate(), Err(AbsError::DuplicateTranche(name)) if name == "Class A"));
    }

    #[test]
    fn test_validate_rejects_non_positive_wam() {
        let mut deal = test_deal();
        deal.collateral.weighted_average_maturity = 0.0;
        assert!(matches!(deal.validate(), Err(AbsError::InvalidCollateral(_))));
    }

    #[test]
    fn test_note_totals() {
        let deal = test_deal();
        assert_abs_diff_eq!(deal.total_notes(), 95_000_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(deal.rated_notes(), 90_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_credit_enhancement() {
        let deal = test_deal();
        // Class A: (20M + 5M sub + 5M excess) / 100M
        assert_abs_diff_eq!(deal.credit_enhancement("Class A").unwrap(), 30.0, epsilon = 1e-9);
        // Class B: (5M + 5M) / 100M
        assert_abs_diff_eq!(deal.credit_enhancement("Class B").unwrap(), 10.0, epsilon = 1e-9);
        assert!(matches!(
            deal.credit_enhancement("Class Z"),
            Err(AbsError::TrancheNotFound(_))
        ));
    }

    #[test]
    fn test_overcollateralization() {
        let deal = test_deal();
        assert_abs_diff_eq!(
            deal.overcollateralization(None).unwrap(),
            100.0 / 90.0 * 100.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            deal.overcollateralization(Some("Class A")).unwrap(),
            100.0 / 70.0 * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_oc_zero_when_notes_paid_off() {
        let mut deal = test_deal();
        for tranche in &mut deal.tranches {
            tranche.current_balance = 0.0;
        }
        assert_eq!(deal.overcollateralization(None).unwrap(), 0.0);
        assert_eq!(deal.interest_coverage(0.05), 0.0);
    }

    #[test]
    fn test_interest_coverage_excludes_po() {
        let mut deal = test_deal();
        deal.tranches[2].is_po = true;
        let income = 100_000_000.0 * 0.12 / 12.0;
        let expense = 70_000_000.0 * 0.06 / 12.0 + 20_000_000.0 * 0.08 / 12.0;
        assert_abs_diff_eq!(deal.interest_coverage(0.05), income / expense, epsilon = 1e-9);
        assert_abs_diff_eq!(
            deal.dscr(0.05, 1_000_000.0),
            income / (expense + 1_000_000.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_evaluate_triggers() {
        let mut deal = test_deal().with_triggers(vec![
            TriggerTest::new("OC Test", TestType::Oc, 115.0, Comparison::AtLeast, "Trap cash"),
            TriggerTest::new("CNL Trigger", TestType::Cnl, 5.0, Comparison::AtMost, "Sequential pay"),
            TriggerTest::new("60+ Delinquency", TestType::Delinquency, 8.0, Comparison::AtMost, "Reserve step-up"),
        ]);
        deal.collateral.delinquency_60 = 9.5;

        let results = deal.evaluate_triggers(0.05, 0.0);
        assert_eq!(results.len(), 3);

        // OC = 111.1% < 115%
        assert!(!results[0].passed);
        assert_eq!(results[0].consequence.as_deref(), Some("Trap cash"));

        assert!(results[1].passed);
        assert!(results[1].consequence.is_none());

        assert!(!results[2].passed);
        assert_abs_diff_eq!(results[2].current_value, 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_approximate_excess_spread() {
        let deal = test_deal();
        // (0.12 - 0.04/3) * 100
        assert_abs_diff_eq!(
            deal.approximate_excess_spread(),
            (0.12 - 0.04 / 3.0) * 100.0,
            epsilon = 1e-9
        );
    }
}
