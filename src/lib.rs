//! ABS Waterfall - Cash flow projection and payment waterfall engine for ABS/CLO deals
//!
//! This library provides:
//! - Deal structures: collateral pools, tranches, triggers, fees, reserve accounts
//! - Prepayment (CPR) and default (CDR) curve models
//! - Monthly collateral roll-forward with fee, interest and principal waterfall
//! - Tranche analytics (WAL, yield) and break-even CDR search
//! - Multi-scenario batch runs

pub mod error;
pub mod deal;
pub mod assumptions;
pub mod projection;
pub mod scenario;
pub mod breakeven;

// Re-export commonly used types
pub use error::{AbsError, Result};
pub use deal::{CollateralPool, DealStructure, Fee, PaymentPriority, Tranche, TriggerTest};
pub use assumptions::{DefaultAssumption, PrepaymentAssumption, ScenarioAssumptions};
pub use projection::{CashFlowEngine, PeriodCashFlow, ProjectionResult, TrancheSummary};
pub use scenario::ScenarioRunner;
pub use breakeven::{breakeven_cdr, BreakevenConfig, BreakevenResult};
