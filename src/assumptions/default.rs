//! Default rate curves (CDR → MDR) and recovery assumptions

use serde::{Deserialize, Serialize};

use super::prepayment::{annual_to_monthly, vector_rate};

fn default_recovery_lag() -> u32 {
    6
}

fn default_peak_month() -> u32 {
    24
}

/// Monthly decay after the front-loaded peak
const FRONT_LOADED_DECAY: f64 = 0.03;

/// Peak multiple of base CDR for the front-loaded curve
const FRONT_LOADED_PEAK_MULTIPLE: f64 = 1.5;

/// Monthly growth constant of the back-loaded curve
const BACK_LOADED_GROWTH: f64 = 0.05;

/// Shape of the default curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultCurve {
    /// Flat annual CDR
    Constant,
    /// Ramps to 1.5x base CDR at `peak_month`, then decays at 3%/month from base
    FrontLoaded {
        #[serde(default = "default_peak_month")]
        peak_month: u32,
    },
    /// base * (1 - e^(-0.05 m)), approaches base from below
    BackLoaded,
    /// Ramp to 100% by month 30, flat to 60, linear to 50% at 120, flat after
    Sda,
    /// Explicit annual CDR per period (indexed by period number)
    Vector { rates: Vec<f64> },
}

impl Default for DefaultCurve {
    fn default() -> Self {
        DefaultCurve::Constant
    }
}

impl DefaultCurve {
    /// Multiple of base CDR on the SDA curve at a given pool age
    pub fn sda_factor(effective_month: u32) -> f64 {
        let m = effective_month as f64;
        if effective_month <= 30 {
            m / 30.0
        } else if effective_month <= 60 {
            1.0
        } else if effective_month <= 120 {
            1.0 - (m - 60.0) / 120.0
        } else {
            0.5
        }
    }
}

/// Default and loss assumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultAssumption {
    /// Annual CDR as decimal
    pub base_cdr: f64,
    /// Recovery rate as decimal (0.40 = 40%)
    pub recovery_rate: f64,
    /// Months between default and cash recovery
    #[serde(default = "default_recovery_lag")]
    pub recovery_lag: u32,
    /// Overrides 1 - recovery_rate when set
    #[serde(default)]
    pub loss_severity: Option<f64>,
    #[serde(default)]
    pub curve: DefaultCurve,
}

impl DefaultAssumption {
    pub fn constant(base_cdr: f64, recovery_rate: f64) -> Self {
        Self {
            base_cdr,
            recovery_rate,
            recovery_lag: default_recovery_lag(),
            loss_severity: None,
            curve: DefaultCurve::Constant,
        }
    }

    pub fn with_curve(mut self, curve: DefaultCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_recovery_lag(mut self, months: u32) -> Self {
        self.recovery_lag = months;
        self
    }

    /// Loss severity: explicit override or 1 - recovery rate
    pub fn loss_severity(&self) -> f64 {
        self.loss_severity.unwrap_or(1.0 - self.recovery_rate)
    }

    /// Annual CDR for a projection period given pool seasoning in months
    pub fn annual_cdr(&self, period: u32, seasoning: u32) -> f64 {
        let effective_month = seasoning + period;
        match &self.curve {
            DefaultCurve::Constant => self.base_cdr,
            DefaultCurve::FrontLoaded { peak_month } => {
                if *peak_month > 0 && effective_month <= *peak_month {
                    self.base_cdr
                        * (effective_month as f64 / *peak_month as f64)
                        * FRONT_LOADED_PEAK_MULTIPLE
                } else {
                    let months_past_peak = effective_month.saturating_sub(*peak_month) as f64;
                    self.base_cdr * (-FRONT_LOADED_DECAY * months_past_peak).exp()
                }
            }
            DefaultCurve::BackLoaded => {
                self.base_cdr * (1.0 - (-BACK_LOADED_GROWTH * effective_month as f64).exp())
            }
            DefaultCurve::Sda => self.base_cdr * DefaultCurve::sda_factor(effective_month),
            DefaultCurve::Vector { rates } => vector_rate(rates, period, self.base_cdr),
        }
    }

    /// Monthly default rate for a projection period
    pub fn monthly_mdr(&self, period: u32, seasoning: u32) -> f64 {
        annual_to_monthly(self.annual_cdr(period, seasoning))
    }
}
