//! Waterfall fees and reserve accounts

use serde::{Deserialize, Serialize};

fn default_fee_priority() -> u32 {
    1
}

fn default_replenishment_priority() -> u32 {
    99
}

fn default_true() -> bool {
    true
}

/// Balance a fee accrues on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeBasis {
    /// Annual rate on collateral balance
    Collateral,
    /// Annual rate on total note balance
    Notes,
    /// Annual fixed amount
    Fixed,
}

/// Fee paid out of interest collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub name: String,
    /// Annual rate, decimal
    pub rate: f64,
    pub basis: FeeBasis,
    /// Annual amount when basis is Fixed
    #[serde(default)]
    pub fixed_amount: f64,
    /// Lower is paid first
    #[serde(default = "default_fee_priority")]
    pub priority: u32,
    /// Subordinated fees are carried as data only, the period loop never pays them
    #[serde(default)]
    pub is_subordinated: bool,
}

impl Fee {
    /// Senior fee accruing on `basis`
    pub fn senior(name: &str, rate: f64, basis: FeeBasis, priority: u32) -> Self {
        Self {
            name: name.to_string(),
            rate,
            basis,
            fixed_amount: 0.0,
            priority,
            is_subordinated: false,
        }
    }

    /// Subordinated fee accruing on `basis`
    pub fn subordinated(name: &str, rate: f64, basis: FeeBasis, priority: u32) -> Self {
        Self {
            is_subordinated: true,
            ..Self::senior(name, rate, basis, priority)
        }
    }

    /// Fee due for one period
    pub fn calculate(&self, collateral_balance: f64, notes_balance: f64, periods_per_year: u32) -> f64 {
        if periods_per_year == 0 {
            return 0.0;
        }
        let periods = periods_per_year as f64;
        match self.basis {
            FeeBasis::Collateral => collateral_balance * self.rate / periods,
            FeeBasis::Notes => notes_balance * self.rate / periods,
            FeeBasis::Fixed => self.fixed_amount / periods,
        }
    }
}

/// Reserve/liquidity account. Structural data only; not drawn or replenished by the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveAccount {
    pub name: String,
    pub target_balance: f64,
    pub current_balance: f64,
    #[serde(default)]
    pub floor: f64,
    #[serde(default = "default_true")]
    pub funded_at_close: bool,
    #[serde(default = "default_replenishment_priority")]
    pub replenishment_priority: u32,
}

impl ReserveAccount {
    /// Account funded to target at closing
    pub fn funded(name: &str, target_balance: f64) -> Self {
        Self {
            name: name.to_string(),
            target_balance,
            current_balance: target_balance,
            floor: 0.0,
            funded_at_close: true,
            replenishment_priority: default_replenishment_priority(),
        }
    }

    pub fn is_at_target(&self) -> bool {
        self.current_balance >= self.target_balance
    }

    /// Amount needed to bring the account back to target
    pub fn shortfall(&self) -> f64 {
        (self.target_balance - self.current_balance).max(0.0)
    }
}
