//! Prepayment speed curves (CPR → SMM)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_ramp_months() -> u32 {
    24
}

/// Convert an annual conditional rate to its monthly equivalent:
/// monthly = 1 - (1 - annual)^(1/12)
///
/// Annual rates are clamped to [0, 1] so curve multipliers above 100% stay finite.
pub fn annual_to_monthly(annual_rate: f64) -> f64 {
    let annual = annual_rate.clamp(0.0, 1.0);
    1.0 - (1.0 - annual).powf(1.0 / 12.0)
}

/// Value of a per-period vector, repeating the last entry past the end.
/// Falls back to `base` when the vector is empty.
pub(crate) fn vector_rate(rates: &[f64], period: u32, base: f64) -> f64 {
    rates
        .get(period as usize)
        .or_else(|| rates.last())
        .copied()
        .unwrap_or(base)
}

/// Shape of the prepayment curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepaymentCurve {
    /// Flat annual CPR
    Constant,
    /// PSA-style linear ramp from 0 to base CPR, flat afterwards
    Ramp {
        #[serde(default = "default_ramp_months")]
        ramp_months: u32,
    },
    /// Explicit annual CPR per period (indexed by period number)
    Vector { rates: Vec<f64> },
    /// Base CPR scaled by a month-of-year factor (1-12, missing months = 1.0)
    Seasonal {
        #[serde(default)]
        factors: BTreeMap<u32, f64>,
    },
}

impl Default for PrepaymentCurve {
    fn default() -> Self {
        PrepaymentCurve::Constant
    }
}

/// Prepayment speed assumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentAssumption {
    /// Annual CPR as decimal (0.15 = 15%)
    pub base_cpr: f64,
    #[serde(default)]
    pub curve: PrepaymentCurve,
}

impl PrepaymentAssumption {
    pub fn constant(base_cpr: f64) -> Self {
        Self {
            base_cpr,
            curve: PrepaymentCurve::Constant,
        }
    }

    pub fn ramp(base_cpr: f64, ramp_months: u32) -> Self {
        Self {
            base_cpr,
            curve: PrepaymentCurve::Ramp { ramp_months },
        }
    }

    pub fn vector(base_cpr: f64, rates: Vec<f64>) -> Self {
        Self {
            base_cpr,
            curve: PrepaymentCurve::Vector { rates },
        }
    }

    pub fn seasonal(base_cpr: f64, factors: BTreeMap<u32, f64>) -> Self {
        Self {
            base_cpr,
            curve: PrepaymentCurve::Seasonal { factors },
        }
    }

    /// Annual CPR for a projection period given pool seasoning in months
    pub fn annual_cpr(&self, period: u32, seasoning: u32) -> f64 {
        let effective_month = seasoning + period;
        match &self.curve {
            PrepaymentCurve::Constant => self.base_cpr,
            PrepaymentCurve::Ramp { ramp_months } => {
                if *ramp_months > 0 && effective_month <= *ramp_months {
                    self.base_cpr * effective_month as f64 / *ramp_months as f64
                } else {
                    self.base_cpr
                }
            }
            PrepaymentCurve::Vector { rates } => vector_rate(rates, period, self.base_cpr),
            PrepaymentCurve::Seasonal { factors } => {
                let month_of_year = effective_month % 12 + 1;
                let factor = factors.get(&month_of_year).copied().unwrap_or(1.0);
                self.base_cpr * factor
            }
        }
    }

    /// Single monthly mortality for a projection period
    pub fn monthly_smm(&self, period: u32, seasoning: u32) -> f64 {
        annual_to_monthly(self.annual_cpr(period, seasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_constant_conversion_is_exact() {
        for cpr in [0.0, 0.05, 0.15, 0.30] {
            let assumption = PrepaymentAssumption::constant(cpr);
            let expected = 1.0 - (1.0 - cpr).powf(1.0 / 12.0);
            assert_eq!(assumption.monthly_smm(1, 0), expected);
            assert_eq!(assumption.monthly_smm(37, 12), expected);
        }
        assert_eq!(PrepaymentAssumption::constant(0.0).monthly_smm(5, 0), 0.0);
    }

    #[test]
    fn test_conversion_is_not_linear() {
        let smm = annual_to_monthly(0.15);
        assert!(smm > 0.15 / 12.0);
        assert_abs_diff_eq!(smm, 0.013451947, epsilon = 1e-8);
    }

    #[test]
    fn test_full_annual_rate_gives_full_monthly_rate() {
        assert_eq!(annual_to_monthly(1.0), 1.0);
        assert_eq!(annual_to_monthly(1.5), 1.0);
        assert_eq!(annual_to_monthly(-0.1), 0.0);
    }

    #[test]
    fn test_ramp() {
        let ramp = PrepaymentAssumption::ramp(0.24, 24);
        assert_abs_diff_eq!(ramp.annual_cpr(6, 0), 0.06, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp.annual_cpr(24, 0), 0.24, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp.annual_cpr(40, 0), 0.24, epsilon = 1e-12);
        // Seasoning moves the pool along the ramp
        assert_abs_diff_eq!(ramp.annual_cpr(6, 6), 0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_ramp_is_flat() {
        let ramp = PrepaymentAssumption::ramp(0.10, 0);
        assert_eq!(ramp.annual_cpr(1, 0), 0.10);
    }

    #[test]
    fn test_vector_repeats_last_value() {
        let vector = PrepaymentAssumption::vector(0.20, vec![0.0, 0.05, 0.10]);
        assert_eq!(vector.annual_cpr(1, 0), 0.05);
        assert_eq!(vector.annual_cpr(2, 0), 0.10);
        assert_eq!(vector.annual_cpr(50, 0), 0.10);

        let empty = PrepaymentAssumption::vector(0.20, vec![]);
        assert_eq!(empty.annual_cpr(3, 0), 0.20);
    }

    #[test]
    fn test_seasonal_factors() {
        let mut factors = BTreeMap::new();
        factors.insert(3, 1.5);
        let seasonal = PrepaymentAssumption::seasonal(0.10, factors);

        // period 2, no seasoning → month-of-year 3
        assert_abs_diff_eq!(seasonal.annual_cpr(2, 0), 0.15, epsilon = 1e-12);
        // month-of-year 4 has no factor
        assert_abs_diff_eq!(seasonal.annual_cpr(3, 0), 0.10, epsilon = 1e-12);
        // wraps around the year
        assert_abs_diff_eq!(seasonal.annual_cpr(14, 0), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_curve_deserializes_from_json() {
        let json = r#"{"base_cpr": 0.12, "curve": {"ramp": {}}}"#;
        let assumption: PrepaymentAssumption = serde_json::from_str(json).unwrap();
        assert_eq!(assumption.curve, PrepaymentCurve::Ramp { ramp_months: 24 });

        let json = r#"{"base_cpr": 0.12}"#;
        let assumption: PrepaymentAssumption = serde_json::from_str(json).unwrap();
        assert_eq!(assumption.curve, PrepaymentCurve::Constant);
    }
}
