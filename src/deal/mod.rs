//! Deal structure: collateral, tranches, triggers, fees and reserve accounts

mod collateral;
mod fee;
mod structure;
mod tranche;
mod trigger;
pub mod loader;
pub mod templates;

pub use collateral::{CollateralPool, CollateralType};
pub use fee::{Fee, FeeBasis, ReserveAccount};
pub use structure::{DealStructure, PaymentPriority};
pub use tranche::{CouponType, Rating, RatingAgency, Tranche, NOT_RATED};
pub use trigger::{Comparison, TestType, TriggerResult, TriggerTest};
pub use loader::{deal_to_json, load_deal, load_deal_from_reader};
