//! JSON deal files
//!
//! The persistence layer stores deals as JSON documents; these helpers are the
//! only file access the deal model has.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::structure::DealStructure;
use crate::error::Result;

/// Load and validate a deal from a JSON file
pub fn load_deal(path: &Path) -> Result<DealStructure> {
    let file = File::open(path)?;
    load_deal_from_reader(BufReader::new(file))
}

/// Load and validate a deal from any JSON reader
pub fn load_deal_from_reader<R: Read>(reader: R) -> Result<DealStructure> {
    let deal: DealStructure = serde_json::from_reader(reader)?;
    deal.validate()?;
    Ok(deal)
}

/// Serialize a deal to pretty JSON
pub fn deal_to_json(deal: &DealStructure) -> Result<String> {
    Ok(serde_json::to_string_pretty(deal)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::templates;
    use crate::deal::{PaymentPriority, TestType};
    use crate::error::AbsError;

    #[test]
    fn test_json_round_trip_preserves_structure() {
        let deal = templates::acmat_2025_4();
        let json = deal_to_json(&deal).unwrap();
        let loaded = load_deal_from_reader(json.as_bytes()).unwrap();
        assert_eq!(loaded, deal);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let json = r#"{
            "deal_name": "Minimal",
            "collateral": {
                "original_balance": 10000000.0,
                "current_balance": 10000000.0,
                "weighted_average_coupon": 0.10,
                "weighted_average_maturity": 36
            },
            "tranches": [
                {"name": "A", "original_balance": 9000000.0, "current_balance": 9000000.0,
                 "coupon_type": "floating", "spread": 0.02,
                 "ratings": [{"agency": "S&P", "rating": "AA"}]}
            ],
            "triggers": [
                {"name": "OC", "test_type": "oc", "threshold": 105.0, "comparison": ">="}
            ]
        }"#;

        let deal = load_deal_from_reader(json.as_bytes()).unwrap();
        assert_eq!(deal.payment_frequency, 12);
        assert_eq!(deal.payment_priority, PaymentPriority::Sequential);
        assert_eq!(deal.tranches[0].index, "SOFR");
        assert_eq!(deal.tranches[0].payment_frequency, 12);
        assert_eq!(deal.triggers[0].test_type, TestType::Oc);
        assert_eq!(deal.format, "144A");
    }

    #[test]
    fn test_invalid_document_rejected() {
        let json = r#"{
            "deal_name": "Empty",
            "collateral": {
                "original_balance": 1.0, "current_balance": 1.0,
                "weighted_average_coupon": 0.1, "weighted_average_maturity": 12
            },
            "tranches": []
        }"#;
        assert!(matches!(
            load_deal_from_reader(json.as_bytes()),
            Err(AbsError::EmptyTranches(_))
        ));
    }
}
