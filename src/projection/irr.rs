//! Internal rate of return for tranche cash flows
//!
//! Used to compute the cash-flow yield of a tranche bought at a given price.

const TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: usize = 1000;

/// Periodic rate bounds searched by the bisection fallback
const MIN_PERIODIC_RATE: f64 = -0.99;
const MAX_PERIODIC_RATE: f64 = 10.0;

/// Annualized IRR of a periodic cash-flow series using Newton-Raphson,
/// falling back to bisection when the derivative vanishes or iteration stalls.
///
/// `cashflows[0]` is at time zero; negative values are outlays.
/// Returns `None` when the series has no sign change.
pub fn calculate_irr(cashflows: &[f64], periods_per_year: u32) -> Option<f64> {
    if cashflows.is_empty() || periods_per_year == 0 {
        return None;
    }
    if cashflows.iter().all(|cf| cf.abs() < TOLERANCE) {
        return Some(0.0);
    }

    let has_inflow = cashflows.iter().any(|&cf| cf > TOLERANCE);
    let has_outflow = cashflows.iter().any(|&cf| cf < -TOLERANCE);
    if !has_inflow || !has_outflow {
        return None;
    }

    let mut rate = 0.05 / periods_per_year as f64;
    for _ in 0..MAX_ITERATIONS {
        let (npv, dnpv) = npv_and_derivative(cashflows, rate);
        if dnpv.abs() < 1e-20 {
            break;
        }

        let next = (rate - npv / dnpv).clamp(MIN_PERIODIC_RATE, MAX_PERIODIC_RATE);
        if (next - rate).abs() < TOLERANCE {
            return Some(annualize(next, periods_per_year));
        }
        rate = next;
    }

    irr_bisection(cashflows).map(|periodic| annualize(periodic, periods_per_year))
}

/// Cash-flow yield of a tranche bought at `price` (percent of par) against
/// its projected periodic interest + principal receipts
pub fn cash_flow_yield(
    original_balance: f64,
    price: f64,
    receipts: &[f64],
    periods_per_year: u32,
) -> Option<f64> {
    if original_balance <= 0.0 || price <= 0.0 {
        return None;
    }
    let mut cashflows = Vec::with_capacity(receipts.len() + 1);
    cashflows.push(-original_balance * price / 100.0);
    cashflows.extend_from_slice(receipts);
    calculate_irr(&cashflows, periods_per_year)
}

fn annualize(periodic_rate: f64, periods_per_year: u32) -> f64 {
    (1.0 + periodic_rate).powi(periods_per_year as i32) - 1.0
}

/// NPV and dNPV/drate at a periodic rate
fn npv_and_derivative(cashflows: &[f64], rate: f64) -> (f64, f64) {
    cashflows
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(npv, dnpv), (t, &cf)| {
            let discount = (1.0 + rate).powi(t as i32);
            (
                npv + cf / discount,
                dnpv - t as f64 * cf / (discount * (1.0 + rate)),
            )
        })
}

fn npv_at_rate(cashflows: &[f64], rate: f64) -> f64 {
    npv_and_derivative(cashflows, rate).0
}

/// Periodic IRR by bisection over [MIN_PERIODIC_RATE, MAX_PERIODIC_RATE]
fn irr_bisection(cashflows: &[f64]) -> Option<f64> {
    let mut low = MIN_PERIODIC_RATE;
    let mut high = MAX_PERIODIC_RATE;
    let mut npv_low = npv_at_rate(cashflows, low);

    if npv_low * npv_at_rate(cashflows, high) > 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (low + high) / 2.0;
        let npv_mid = npv_at_rate(cashflows, mid);

        if npv_mid.abs() < TOLERANCE || (high - low) / 2.0 < TOLERANCE {
            return Some(mid);
        }

        if npv_mid * npv_low < 0.0 {
            high = mid;
        } else {
            low = mid;
            npv_low = npv_mid;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_simple_irr() {
        // 1000 out, 1100 back after twelve months
        let mut cashflows = vec![-1000.0];
        cashflows.extend(vec![0.0; 11]);
        cashflows.push(1100.0);

        let irr = calculate_irr(&cashflows, 12).unwrap();
        assert_abs_diff_eq!(irr, 0.10, epsilon = 1e-6);
    }

    #[test]
    fn test_no_sign_change() {
        assert_eq!(calculate_irr(&[100.0, 50.0], 12), None);
        assert_eq!(calculate_irr(&[], 12), None);
        assert_eq!(calculate_irr(&[0.0, 0.0], 12), Some(0.0));
    }

    #[test]
    fn test_par_bond_yields_coupon() {
        // 1% per month coupon, principal back at month 24, bought at par
        let mut receipts = vec![10.0; 24];
        receipts[23] += 1000.0;

        let y = cash_flow_yield(1000.0, 100.0, &receipts, 12).unwrap();
        assert_abs_diff_eq!(y, 1.01_f64.powi(12) - 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_discount_price_raises_yield() {
        let mut receipts = vec![5.0; 36];
        receipts[35] += 1000.0;

        let at_par = cash_flow_yield(1000.0, 100.0, &receipts, 12).unwrap();
        let at_discount = cash_flow_yield(1000.0, 95.0, &receipts, 12).unwrap();
        assert!(at_discount > at_par);
        assert_eq!(cash_flow_yield(0.0, 100.0, &receipts, 12), None);
    }
}
