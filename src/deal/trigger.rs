//! Structural trigger tests

use serde::{Deserialize, Serialize};

/// Metric a trigger is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    /// Overcollateralization, percent
    Oc,
    /// Interest coverage, ratio
    Ic,
    /// Cumulative net loss, percent of original pool
    Cnl,
    /// Debt service coverage, ratio
    Dscr,
    /// 60+ day delinquency, percent
    Delinquency,
    /// Approximate excess spread, percent
    ExcessSpread,
}

/// Comparison a metric must satisfy to pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Above => ">",
            Comparison::Below => "<",
        }
    }
}

/// Structural test definition.
///
/// `cure_periods` is stored configuration only: a single failing period
/// forces sequential pay in the projection with no grace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerTest {
    pub name: String,
    pub test_type: TestType,
    pub threshold: f64,
    pub comparison: Comparison,
    /// What happens on breach (informational)
    #[serde(default)]
    pub consequence: String,
    #[serde(default)]
    pub cure_periods: u32,
}

impl TriggerTest {
    pub fn new(
        name: &str,
        test_type: TestType,
        threshold: f64,
        comparison: Comparison,
        consequence: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            test_type,
            threshold,
            comparison,
            consequence: consequence.to_string(),
            cure_periods: 0,
        }
    }

    /// True if the test passes for `value`
    pub fn evaluate(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::AtLeast => value >= self.threshold,
            Comparison::AtMost => value <= self.threshold,
            Comparison::Above => value > self.threshold,
            Comparison::Below => value < self.threshold,
        }
    }
}

/// Point-in-time evaluation of one trigger against deal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    pub name: String,
    pub test_type: TestType,
    pub passed: bool,
    pub current_value: f64,
    pub threshold: f64,
    pub comparison: Comparison,
    /// Present only when the test failed
    pub consequence: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        let mut trigger = TriggerTest::new("OC", TestType::Oc, 110.0, Comparison::AtLeast, "trap cash");
        assert!(trigger.evaluate(110.0));
        assert!(!trigger.evaluate(109.99));

        trigger.comparison = Comparison::Above;
        assert!(!trigger.evaluate(110.0));

        trigger.comparison = Comparison::AtMost;
        assert!(trigger.evaluate(110.0));
        assert!(!trigger.evaluate(110.01));

        trigger.comparison = Comparison::Below;
        assert!(!trigger.evaluate(110.0));
        assert!(trigger.evaluate(5.0));
    }

    #[test]
    fn test_deserialize_symbolic_comparison() {
        let json = r#"{"name":"CNL Trigger","test_type":"cnl","threshold":12.0,"comparison":"<="}"#;
        let trigger: TriggerTest = serde_json::from_str(json).unwrap();
        assert_eq!(trigger.test_type, TestType::Cnl);
        assert_eq!(trigger.comparison, Comparison::AtMost);
        assert_eq!(trigger.cure_periods, 0);
        assert!(trigger.consequence.is_empty());
    }
}
