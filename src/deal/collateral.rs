//! Aggregated collateral pool characteristics

use serde::{Deserialize, Serialize};

/// Asset class backing the deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralType {
    PrimeAuto,
    SubprimeAuto,
    Consumer,
    Equipment,
    #[serde(rename = "CLO")]
    Clo,
    Esoteric,
    Custom,
}

impl CollateralType {
    /// Display label used by the deal database
    pub fn as_str(&self) -> &'static str {
        match self {
            CollateralType::PrimeAuto => "Prime Auto",
            CollateralType::SubprimeAuto => "Subprime Auto",
            CollateralType::Consumer => "Consumer",
            CollateralType::Equipment => "Equipment",
            CollateralType::Clo => "CLO",
            CollateralType::Esoteric => "Esoteric",
            CollateralType::Custom => "Custom",
        }
    }
}

impl Default for CollateralType {
    fn default() -> Self {
        CollateralType::Custom
    }
}

/// Homogeneous collateral pool (not loan-level)
///
/// The declared `current_balance` is the balance at the projection start date.
/// The engine rolls its own working copy forward and never writes back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralPool {
    /// Balance at closing
    pub original_balance: f64,

    /// Outstanding balance as of the projection start
    pub current_balance: f64,

    #[serde(default)]
    pub collateral_type: CollateralType,

    /// Weighted average coupon (annual, decimal)
    pub weighted_average_coupon: f64,

    /// Weighted average maturity in months
    pub weighted_average_maturity: f64,

    /// Weighted average life in years
    #[serde(default)]
    pub weighted_average_life: f64,

    #[serde(default)]
    pub weighted_average_fico: Option<f64>,

    #[serde(default)]
    pub weighted_average_ltv: Option<f64>,

    // Performance to date (percent of current balance for delinquencies)
    #[serde(default)]
    pub delinquency_30: f64,
    #[serde(default)]
    pub delinquency_60: f64,
    #[serde(default)]
    pub delinquency_90: f64,

    #[serde(default)]
    pub cumulative_net_loss: f64,
    #[serde(default)]
    pub cumulative_gross_loss: f64,
    #[serde(default)]
    pub cumulative_recoveries: f64,
}

impl CollateralPool {
    /// Create a fresh pool at closing (current == original, no losses)
    pub fn new(
        original_balance: f64,
        collateral_type: CollateralType,
        wac: f64,
        wam_months: f64,
        wal_years: f64,
    ) -> Self {
        Self {
            original_balance,
            current_balance: original_balance,
            collateral_type,
            weighted_average_coupon: wac,
            weighted_average_maturity: wam_months,
            weighted_average_life: wal_years,
            weighted_average_fico: None,
            weighted_average_ltv: None,
            delinquency_30: 0.0,
            delinquency_60: 0.0,
            delinquency_90: 0.0,
            cumulative_net_loss: 0.0,
            cumulative_gross_loss: 0.0,
            cumulative_recoveries: 0.0,
        }
    }

    /// Set credit characteristics (consumer and auto pools)
    pub fn with_credit(mut self, fico: f64, ltv: f64) -> Self {
        self.weighted_average_fico = Some(fico);
        self.weighted_average_ltv = Some(ltv);
        self
    }

    /// Pool factor = current / original
    pub fn factor(&self) -> f64 {
        if self.original_balance > 0.0 {
            self.current_balance / self.original_balance
        } else {
            0.0
        }
    }

    /// Cumulative net loss as a percentage of original balance
    pub fn cnl_rate(&self) -> f64 {
        if self.original_balance > 0.0 {
            self.cumulative_net_loss / self.original_balance * 100.0
        } else {
            0.0
        }
    }

    /// Monthly interest income on the current balance
    pub fn monthly_interest(&self, balance: f64) -> f64 {
        balance * self.weighted_average_coupon / 12.0
    }
}
