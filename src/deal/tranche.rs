//! Bond classes and credit ratings

use serde::{Deserialize, Serialize};

/// Rating label used for unrated (residual/equity) classes
pub const NOT_RATED: &str = "NR";

fn default_index() -> String {
    "SOFR".to_string()
}

fn default_payment_frequency() -> u32 {
    12
}

/// Rating agency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingAgency {
    #[serde(rename = "S&P")]
    SP,
    #[serde(rename = "Moody's")]
    Moodys,
    Fitch,
    #[serde(rename = "KBRA")]
    Kbra,
    #[serde(rename = "DBRS")]
    Dbrs,
}

/// Credit rating with agency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub agency: RatingAgency,
    /// AAA, Aa1, BBB+, NR, ...
    pub rating: String,
}

impl Rating {
    pub fn new(agency: RatingAgency, rating: &str) -> Self {
        Self {
            agency,
            rating: rating.to_string(),
        }
    }

    /// Numeric score on the S&P scale (higher = better, NR or unknown = -1)
    pub fn numeric_score(&self) -> i32 {
        match self.rating.as_str() {
            "AAA" => 21,
            "AA+" => 20,
            "AA" => 19,
            "AA-" => 18,
            "A+" => 17,
            "A" => 16,
            "A-" => 15,
            "BBB+" => 14,
            "BBB" => 13,
            "BBB-" => 12,
            "BB+" => 11,
            "BB" => 10,
            "BB-" => 9,
            "B+" => 8,
            "B" => 7,
            "B-" => 6,
            "CCC+" => 5,
            "CCC" => 4,
            "CCC-" => 3,
            "CC" => 2,
            "C" => 1,
            "D" => 0,
            _ => -1,
        }
    }
}

/// Coupon type of a tranche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    /// `spread` is the fixed coupon
    Fixed,
    /// `spread` is added to max(index, floor)
    Floating,
}

/// One bond class. Array position within a deal is payment priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    /// Unique within a deal (Class A-1, Class B, ...)
    pub name: String,

    pub original_balance: f64,

    /// Outstanding balance as of the projection start
    pub current_balance: f64,

    pub coupon_type: CouponType,

    /// Spread over index (floating) or fixed coupon (fixed), annual decimal
    pub spread: f64,

    /// Reference rate name
    #[serde(default = "default_index")]
    pub index: String,

    /// Index floor
    #[serde(default)]
    pub floor: f64,

    /// Ratings, first entry is the top rating
    #[serde(default)]
    pub ratings: Vec<Rating>,

    /// Payments per year
    #[serde(default = "default_payment_frequency")]
    pub payment_frequency: u32,

    #[serde(default)]
    pub is_io: bool,

    #[serde(default)]
    pub is_po: bool,
}

impl Tranche {
    /// Create a floating-rate tranche at closing (current == original)
    pub fn floating(name: &str, balance: f64, spread: f64, ratings: Vec<Rating>) -> Self {
        Self {
            name: name.to_string(),
            original_balance: balance,
            current_balance: balance,
            coupon_type: CouponType::Floating,
            spread,
            index: default_index(),
            floor: 0.0,
            ratings,
            payment_frequency: default_payment_frequency(),
            is_io: false,
            is_po: false,
        }
    }

    /// Create a fixed-rate tranche at closing
    pub fn fixed(name: &str, balance: f64, coupon: f64, ratings: Vec<Rating>) -> Self {
        Self {
            coupon_type: CouponType::Fixed,
            ..Self::floating(name, balance, coupon, ratings)
        }
    }

    /// Current factor (current / original)
    pub fn factor(&self) -> f64 {
        if self.original_balance > 0.0 {
            self.current_balance / self.original_balance
        } else {
            0.0
        }
    }

    /// Top rating label, if any
    pub fn top_rating(&self) -> Option<&str> {
        self.ratings.first().map(|r| r.rating.as_str())
    }

    /// Unrated or "NR" classes are residual/equity: no interest priority,
    /// excluded from rated-note totals
    pub fn is_residual(&self) -> bool {
        match self.top_rating() {
            None => true,
            Some(rating) => rating == NOT_RATED,
        }
    }

    /// All-in annual coupon for a given index rate
    pub fn all_in_rate(&self, index_rate: f64) -> f64 {
        match self.coupon_type {
            CouponType::Fixed => self.spread,
            CouponType::Floating => index_rate.max(self.floor) + self.spread,
        }
    }

    /// Interest due for one period on an arbitrary balance
    pub fn interest_on(&self, balance: f64, index_rate: f64) -> f64 {
        if self.payment_frequency == 0 {
            return 0.0;
        }
        balance * self.all_in_rate(index_rate) / self.payment_frequency as f64
    }

    /// Interest due for one period on the declared current balance
    pub fn period_interest(&self, index_rate: f64) -> f64 {
        self.interest_on(self.current_balance, index_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_floating_all_in_rate_with_floor() {
        let mut tranche = Tranche::floating(
            "Class A",
            100_000_000.0,
            0.0150,
            vec![Rating::new(RatingAgency::SP, "AAA")],
        );
        assert_abs_diff_eq!(tranche.all_in_rate(0.0433), 0.0583, epsilon = 1e-12);

        tranche.floor = 0.01;
        assert_abs_diff_eq!(tranche.all_in_rate(0.005), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_ignores_index() {
        let tranche = Tranche::fixed("Class B", 50_000_000.0, 0.065, vec![]);
        assert_eq!(tranche.all_in_rate(0.10), 0.065);
        assert_abs_diff_eq!(tranche.period_interest(0.10), 50_000_000.0 * 0.065 / 12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_residual_detection() {
        let rated = Tranche::floating("A", 1.0, 0.01, vec![Rating::new(RatingAgency::Fitch, "AA")]);
        let nr = Tranche::floating("Resid", 1.0, 0.0, vec![Rating::new(RatingAgency::SP, "NR")]);
        let unrated = Tranche::floating("Equity", 1.0, 0.0, vec![]);

        assert!(!rated.is_residual());
        assert!(nr.is_residual());
        assert!(unrated.is_residual());
    }

    #[test]
    fn test_rating_scores() {
        assert_eq!(Rating::new(RatingAgency::SP, "AAA").numeric_score(), 21);
        assert_eq!(Rating::new(RatingAgency::SP, "BBB-").numeric_score(), 12);
        assert_eq!(Rating::new(RatingAgency::SP, "NR").numeric_score(), -1);
        assert_eq!(Rating::new(RatingAgency::Moodys, "Aaa").numeric_score(), -1);
    }

    #[test]
    fn test_factor() {
        let mut tranche = Tranche::floating("A", 200.0, 0.01, vec![]);
        tranche.current_balance = 50.0;
        assert_abs_diff_eq!(tranche.factor(), 0.25, epsilon = 1e-12);
    }
}
