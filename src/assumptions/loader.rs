//! CSV curve vectors and JSON scenario files
//!
//! Rate vectors are stored as `period,rate` rows with a header. Periods may
//! arrive in any order; gaps carry the previous period's rate forward.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use super::ScenarioAssumptions;
use crate::error::{AbsError, Result};

#[derive(Debug, Deserialize)]
struct RateRow {
    period: u32,
    rate: f64,
}

/// Load a per-period annual rate vector from a CSV file
pub fn load_rate_vector(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path)?;
    load_rate_vector_from_reader(file)
}

/// Load a per-period annual rate vector from any CSV reader.
///
/// The result is indexed by period number, suitable for a `Vector` curve or
/// an index-rate path.
pub fn load_rate_vector_from_reader<R: Read>(reader: R) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: RateRow = result?;
        if !row.rate.is_finite() {
            return Err(AbsError::invalid_input(
                format!("rate[{}]", row.period),
                "rate must be finite",
            ));
        }
        rows.push(row);
    }
    rows.sort_by_key(|row| row.period);

    let mut rates: Vec<f64> = Vec::new();
    for row in rows {
        let period = row.period as usize;
        let carried = rates.last().copied().unwrap_or(0.0);
        if period >= rates.len() {
            rates.resize(period, carried);
            rates.push(row.rate);
        } else {
            rates[period] = row.rate;
        }
    }

    Ok(rates)
}

/// Load and validate a scenario from a JSON file
pub fn load_scenario(path: &Path) -> Result<ScenarioAssumptions> {
    let file = File::open(path)?;
    load_scenario_from_reader(BufReader::new(file))
}

/// Load and validate a scenario from any JSON reader
pub fn load_scenario_from_reader<R: Read>(reader: R) -> Result<ScenarioAssumptions> {
    let scenario: ScenarioAssumptions = serde_json::from_reader(reader)?;
    scenario.validate()?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{DefaultCurve, PrepaymentCurve};

    #[test]
    fn test_rate_vector_indexed_by_period() {
        let csv = "period,rate\n0,0.00\n1,0.02\n2,0.04\n3,0.06\n";
        let rates = load_rate_vector_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rates, vec![0.0, 0.02, 0.04, 0.06]);
    }

    #[test]
    fn test_rate_vector_fills_gaps() {
        let csv = "period, rate\n3, 0.05\n1, 0.02\n";
        let rates = load_rate_vector_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rates, vec![0.0, 0.02, 0.02, 0.05]);
    }

    #[test]
    fn test_rate_vector_rejects_bad_rows() {
        let csv = "period,rate\n1,fast\n";
        assert!(matches!(
            load_rate_vector_from_reader(csv.as_bytes()),
            Err(AbsError::Csv(_))
        ));
    }

    #[test]
    fn test_scenario_from_json() {
        let json = r#"{
            "name": "Ramp Stress",
            "prepayment": {"base_cpr": 0.10, "curve": {"ramp": {"ramp_months": 12}}},
            "default": {"base_cdr": 0.08, "recovery_rate": 0.35, "curve": "sda"},
            "index_rate": 0.05,
            "projection_months": 48
        }"#;
        let scenario = load_scenario_from_reader(json.as_bytes()).unwrap();
        assert_eq!(scenario.prepayment.curve, PrepaymentCurve::Ramp { ramp_months: 12 });
        assert_eq!(scenario.default.curve, DefaultCurve::Sda);
        assert_eq!(scenario.default.recovery_lag, 6);
        assert_eq!(scenario.seasoning, 0);
        assert!(scenario.index_path.is_empty());
    }

    #[test]
    fn test_scenario_validation_applies() {
        let json = r#"{
            "name": "Broken",
            "prepayment": {"base_cpr": 0.10},
            "default": {"base_cdr": 0.02, "recovery_rate": 0.4},
            "index_rate": 0.05,
            "projection_months": 0
        }"#;
        assert!(matches!(
            load_scenario_from_reader(json.as_bytes()),
            Err(AbsError::InvalidScenario { .. })
        ));
    }
}
