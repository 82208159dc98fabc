//! Scenario assumptions: prepayment and default curves, index rates and horizon

mod default;
mod prepayment;
pub mod loader;

pub use default::{DefaultAssumption, DefaultCurve};
pub use prepayment::{annual_to_monthly, PrepaymentAssumption, PrepaymentCurve};
pub use loader::{load_rate_vector, load_scenario};

use serde::{Deserialize, Serialize};

use crate::error::{AbsError, Result};

/// Complete configuration for one projection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumptions {
    pub name: String,
    pub prepayment: PrepaymentAssumption,
    pub default: DefaultAssumption,

    /// Index rate (e.g. SOFR) used when no path entry exists for a period
    pub index_rate: f64,

    /// Per-period index rates, indexed by period number; overrides `index_rate`
    #[serde(default)]
    pub index_path: Vec<f64>,

    /// Number of monthly periods to project
    pub projection_months: u32,

    /// Pool age in months at the start of the projection
    #[serde(default)]
    pub seasoning: u32,
}

impl ScenarioAssumptions {
    /// Constant CPR/CDR scenario
    pub fn base_case(
        cpr: f64,
        cdr: f64,
        recovery_rate: f64,
        index_rate: f64,
        projection_months: u32,
    ) -> Self {
        Self {
            name: "Base Case".to_string(),
            prepayment: PrepaymentAssumption::constant(cpr),
            default: DefaultAssumption::constant(cdr, recovery_rate),
            index_rate,
            index_path: Vec::new(),
            projection_months,
            seasoning: 0,
        }
    }

    /// Slow prepayments with front-loaded defaults peaking at month 18
    pub fn stress_case(
        cpr: f64,
        cdr: f64,
        recovery_rate: f64,
        index_rate: f64,
        projection_months: u32,
    ) -> Self {
        Self {
            name: "Stress Case".to_string(),
            prepayment: PrepaymentAssumption::constant(cpr),
            default: DefaultAssumption::constant(cdr, recovery_rate)
                .with_curve(DefaultCurve::FrontLoaded { peak_month: 18 }),
            index_rate,
            index_path: Vec::new(),
            projection_months,
            seasoning: 0,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_index_path(mut self, path: Vec<f64>) -> Self {
        self.index_path = path;
        self
    }

    pub fn with_seasoning(mut self, months: u32) -> Self {
        self.seasoning = months;
        self
    }

    /// Index rate in effect for a period
    pub fn index_rate_for(&self, period: u32) -> f64 {
        self.index_path
            .get(period as usize)
            .copied()
            .unwrap_or(self.index_rate)
    }

    pub fn monthly_smm(&self, period: u32) -> f64 {
        self.prepayment.monthly_smm(period, self.seasoning)
    }

    pub fn monthly_mdr(&self, period: u32) -> f64 {
        self.default.monthly_mdr(period, self.seasoning)
    }

    /// Reject horizons and rates the engine cannot use
    pub fn validate(&self) -> Result<()> {
        if self.projection_months == 0 {
            return Err(AbsError::invalid_scenario(
                &self.name,
                "projection horizon must be positive",
            ));
        }

        let unit_rates = [
            ("base CPR", self.prepayment.base_cpr),
            ("base CDR", self.default.base_cdr),
            ("recovery rate", self.default.recovery_rate),
            ("loss severity", self.default.loss_severity()),
        ];
        for (label, rate) in unit_rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(AbsError::invalid_scenario(
                    &self.name,
                    format!("{} {} outside [0, 1]", label, rate),
                ));
            }
        }

        let prepay_vector: &[f64] = match &self.prepayment.curve {
            PrepaymentCurve::Vector { rates } => rates,
            _ => &[],
        };
        let default_vector: &[f64] = match &self.default.curve {
            DefaultCurve::Vector { rates } => rates,
            _ => &[],
        };
        if prepay_vector
            .iter()
            .chain(default_vector)
            .any(|r| !(0.0..=1.0).contains(r))
        {
            return Err(AbsError::invalid_scenario(
                &self.name,
                "curve vector rates must lie in [0, 1]",
            ));
        }

        if !self.index_rate.is_finite() || self.index_path.iter().any(|r| !r.is_finite()) {
            return Err(AbsError::invalid_scenario(&self.name, "index rate must be finite"));
        }

        Ok(())
    }
}

impl Default for ScenarioAssumptions {
    fn default() -> Self {
        Self::base_case(0.15, 0.03, 0.40, 0.0433, 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_case_defaults() {
        let scenario = ScenarioAssumptions::default();
        assert_eq!(scenario.name, "Base Case");
        assert_eq!(scenario.prepayment.curve, PrepaymentCurve::Constant);
        assert_eq!(scenario.default.curve, DefaultCurve::Constant);
        assert_eq!(scenario.default.recovery_lag, 6);
        assert_eq!(scenario.projection_months, 60);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_stress_case_is_front_loaded() {
        let scenario = ScenarioAssumptions::stress_case(0.08, 0.10, 0.30, 0.055, 60);
        assert_eq!(scenario.name, "Stress Case");
        assert_eq!(
            scenario.default.curve,
            DefaultCurve::FrontLoaded { peak_month: 18 }
        );
        assert!(scenario.monthly_mdr(18) > scenario.monthly_mdr(1));
    }

    #[test]
    fn test_index_path_overrides_scalar() {
        let scenario = ScenarioAssumptions::default().with_index_path(vec![0.04, 0.045, 0.05]);
        assert_eq!(scenario.index_rate_for(1), 0.045);
        assert_eq!(scenario.index_rate_for(2), 0.05);
        assert_eq!(scenario.index_rate_for(3), 0.0433);
    }

    #[test]
    fn test_seasoning_feeds_curves() {
        let mut scenario = ScenarioAssumptions::default();
        scenario.prepayment = PrepaymentAssumption::ramp(0.24, 24);
        let fresh = scenario.monthly_smm(6);
        let seasoned = scenario.clone().with_seasoning(12).monthly_smm(6);
        assert!(seasoned > fresh);
    }

    #[test]
    fn test_validate_rejects_zero_horizon() {
        let scenario = ScenarioAssumptions::base_case(0.1, 0.02, 0.4, 0.04, 0);
        assert!(matches!(
            scenario.validate(),
            Err(AbsError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_rates_out_of_range() {
        let scenario = ScenarioAssumptions::base_case(1.2, 0.02, 0.4, 0.04, 12);
        assert!(scenario.validate().is_err());

        let scenario = ScenarioAssumptions::base_case(0.1, 0.02, -0.1, 0.04, 12);
        assert!(scenario.validate().is_err());

        let mut scenario = ScenarioAssumptions::default();
        scenario.default.curve = DefaultCurve::Vector { rates: vec![0.02, 1.5] };
        assert!(scenario.validate().is_err());
    }
}
