//! Pre-built deal templates
//!
//! Each call returns a fresh structure at closing balances.

use chrono::NaiveDate;

use super::collateral::{CollateralPool, CollateralType};
use super::fee::{Fee, FeeBasis, ReserveAccount};
use super::structure::{DealStructure, PaymentPriority};
use super::tranche::{Rating, RatingAgency, Tranche};
use super::trigger::{Comparison, TestType, TriggerTest};
use crate::error::{AbsError, Result};

/// Names accepted by [`by_name`]
pub const TEMPLATE_NAMES: [&str; 3] = ["ACMAT 2025-4", "Subprime Auto", "CLO"];

/// Look up a template by display name (case-insensitive)
pub fn by_name(name: &str) -> Result<DealStructure> {
    match name.to_ascii_lowercase().as_str() {
        "acmat 2025-4" | "acmat" => Ok(acmat_2025_4()),
        "subprime auto" | "subprime" => Ok(subprime_auto()),
        "clo" => Ok(clo()),
        _ => Err(AbsError::UnknownTemplate(name.to_string())),
    }
}

fn sp(rating: &str) -> Vec<Rating> {
    vec![Rating::new(RatingAgency::SP, rating)]
}

fn at_least(name: &str, test_type: TestType, threshold: f64, consequence: &str) -> TriggerTest {
    TriggerTest::new(name, test_type, threshold, Comparison::AtLeast, consequence)
}

fn at_most(name: &str, test_type: TestType, threshold: f64, consequence: &str) -> TriggerTest {
    TriggerTest::new(name, test_type, threshold, Comparison::AtMost, consequence)
}

/// America's Car-Mart 2025-4, buy-here-pay-here subprime auto
pub fn acmat_2025_4() -> DealStructure {
    let collateral = CollateralPool::new(161_300_000.0, CollateralType::SubprimeAuto, 0.24, 42.0, 2.5)
        .with_credit(550.0, 1.15);

    let tranches = vec![
        Tranche::floating("Class A", 128_200_000.0, 0.0240, sp("A")),
        Tranche::floating("Class B", 33_100_000.0, 0.0600, sp("BBB")),
    ];

    let triggers = vec![
        at_least("OC Test", TestType::Oc, 110.0, "Trap cash to pay down Class A"),
        at_most("CNL Trigger", TestType::Cnl, 25.0, "Switch to sequential pay, turbo Class A"),
        at_most("Delinquency Trigger", TestType::Delinquency, 10.0, "Increase reserve account target"),
    ];

    let fees = vec![
        Fee::senior("Servicer Fee", 0.04, FeeBasis::Collateral, 1),
        Fee::senior("Trustee Fee", 0.0002, FeeBasis::Collateral, 2),
        Fee::senior("Admin Fee", 0.0005, FeeBasis::Collateral, 3),
    ];

    let mut deal = DealStructure::new("ACMAT 2025-4", collateral, tranches)
        .with_triggers(triggers)
        .with_fees(fees)
        .with_payment_priority(PaymentPriority::Sequential);
    deal.issuer = "America's Car-Mart".to_string();
    deal.pricing_date = NaiveDate::from_ymd_opt(2025, 12, 10);
    deal.closing_date = NaiveDate::from_ymd_opt(2025, 12, 17);
    deal.reserve_accounts = vec![ReserveAccount::funded("Reserve Account", 1_613_000.0)];
    deal.bookrunner = "Deutsche Bank".to_string();
    deal.shelf = "ACM Auto Trust".to_string();
    deal.series = "2025-4".to_string();
    deal
}

/// Generic subprime auto ABS with a residual class
pub fn subprime_auto() -> DealStructure {
    let collateral = CollateralPool::new(500_000_000.0, CollateralType::SubprimeAuto, 0.18, 48.0, 2.8)
        .with_credit(580.0, 1.05);

    let tranches = vec![
        Tranche::floating("Class A-1", 100_000_000.0, 0.0065, sp("AAA")),
        Tranche::floating("Class A-2", 200_000_000.0, 0.0085, sp("AAA")),
        Tranche::floating("Class B", 75_000_000.0, 0.0150, sp("AA")),
        Tranche::floating("Class C", 50_000_000.0, 0.0225, sp("A")),
        Tranche::floating("Class D", 37_500_000.0, 0.0350, sp("BBB")),
        Tranche::floating("Class E", 25_000_000.0, 0.0550, sp("BB")),
        Tranche::floating("Residual", 12_500_000.0, 0.0, sp("NR")),
    ];

    let triggers = vec![
        at_least("Senior OC Test", TestType::Oc, 115.0, "Trap cash, pay down senior"),
        at_least("Mezz OC Test", TestType::Oc, 108.0, "Trap cash, pay down through Class D"),
        at_least("IC Test", TestType::Ic, 1.50, "Redirect interest to senior"),
        at_most("CNL Trigger - Step 1", TestType::Cnl, 12.0, "Switch to sequential pay"),
        at_most("CNL Trigger - Step 2", TestType::Cnl, 18.0, "Turbo senior amortization"),
        at_most("60+ Day Delinquency", TestType::Delinquency, 8.0, "Increase reserve target"),
    ];

    let fees = vec![
        Fee::senior("Servicer Fee", 0.0100, FeeBasis::Collateral, 1),
        Fee::senior("Backup Servicer Fee", 0.0005, FeeBasis::Collateral, 2),
        Fee::senior("Trustee Fee", 0.0002, FeeBasis::Notes, 3),
        Fee::senior("Admin Fee", 0.0003, FeeBasis::Notes, 4),
    ];

    let mut deal = DealStructure::new("Subprime Auto Template", collateral, tranches)
        .with_triggers(triggers)
        .with_fees(fees);
    deal.issuer = "[Issuer]".to_string();
    deal
}

/// Generic broadly syndicated CLO with an equity class
pub fn clo() -> DealStructure {
    let collateral = CollateralPool::new(400_000_000.0, CollateralType::Clo, 0.0950, 60.0, 4.5);

    let tranches = vec![
        Tranche::floating(
            "Class A",
            248_000_000.0,
            0.0138,
            vec![
                Rating::new(RatingAgency::SP, "AAA"),
                Rating::new(RatingAgency::Moodys, "Aaa"),
            ],
        ),
        Tranche::floating("Class B", 40_000_000.0, 0.0190, sp("AA")),
        Tranche::floating("Class C", 28_000_000.0, 0.0260, sp("A")),
        Tranche::floating("Class D", 24_000_000.0, 0.0385, sp("BBB")),
        Tranche::floating("Class E", 20_000_000.0, 0.0675, sp("BB")),
        Tranche::floating("Equity", 40_000_000.0, 0.0, sp("NR")),
    ];

    let triggers = vec![
        at_least("Class A/B OC Test", TestType::Oc, 120.0, "Trap excess interest, pay down Class A"),
        at_least("Class C OC Test", TestType::Oc, 112.0, "Trap excess interest"),
        at_least("Class D OC Test", TestType::Oc, 107.0, "Trap excess interest"),
        at_least("Class A/B IC Test", TestType::Ic, 1.20, "Redirect interest to senior"),
        at_least("Class C IC Test", TestType::Ic, 1.15, "Redirect interest"),
        at_least("Class D IC Test", TestType::Ic, 1.10, "Redirect interest"),
    ];

    let fees = vec![
        Fee::senior("Senior Management Fee", 0.0015, FeeBasis::Collateral, 1),
        Fee::senior("Trustee Fee", 0.0002, FeeBasis::Collateral, 2),
        Fee::senior("Admin Fee", 0.0003, FeeBasis::Collateral, 3),
        Fee::subordinated("Subordinated Management Fee", 0.0035, FeeBasis::Collateral, 99),
    ];

    let mut deal = DealStructure::new("CLO Template", collateral, tranches)
        .with_triggers(triggers)
        .with_fees(fees);
    deal.issuer = "[Manager]".to_string();
    deal.reinvestment_period = 48;
    deal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_validate() {
        for name in TEMPLATE_NAMES {
            let deal = by_name(name).unwrap();
            assert!(deal.validate().is_ok(), "{} failed validation", name);
        }
    }

    #[test]
    fn test_unknown_template() {
        assert!(matches!(by_name("RMBS"), Err(AbsError::UnknownTemplate(_))));
    }

    #[test]
    fn test_template_shapes() {
        let clo = clo();
        assert_eq!(clo.tranches.len(), 6);
        assert!(clo.tranches.last().unwrap().is_residual());
        assert_eq!(clo.fees.iter().filter(|f| f.is_subordinated).count(), 1);
        assert_eq!(clo.reinvestment_period, 48);

        let auto = subprime_auto();
        assert_eq!(auto.total_notes(), 500_000_000.0);

        let acmat = acmat_2025_4();
        assert_eq!(acmat.closing_date, NaiveDate::from_ymd_opt(2025, 12, 17));
        assert_eq!(acmat.reserve_accounts.len(), 1);
    }
}
