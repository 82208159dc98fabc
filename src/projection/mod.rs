//! Cash flow projection engine and waterfall output

mod state;
mod engine;
mod cashflows;
pub mod irr;

pub use state::{PendingRecovery, ProjectionState};
pub use engine::CashFlowEngine;
pub use cashflows::{
    DistributionMode, PeriodCashFlow, ProjectionResult, ProjectionSummary, TrancheCashFlow,
    TrancheFlow, TrancheOpening, TrancheSummary,
};
pub use irr::{calculate_irr, cash_flow_yield};
