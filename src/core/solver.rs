use serde::Serialize;

use super::amortization::{annuity_payment, monthly_rate};

pub const RATE_SEARCH_MIN_PCT: f64 = 0.0;
pub const RATE_SEARCH_MAX_PCT: f64 = 100.0;
const RATE_TOLERANCE_PCT: f64 = 1e-7;
const MAX_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSolveResult {
    pub annual_rate_pct: f64,
    pub iterations: u32,
    pub converged: bool,
    /// The answer was clamped to one end of the search range, so the true
    /// rate may lie outside it.
    pub hit_search_bound: bool,
}

impl RateSolveResult {
    fn at_bound(annual_rate_pct: f64, converged: bool) -> Self {
        Self {
            annual_rate_pct,
            iterations: 0,
            converged,
            hit_search_bound: true,
        }
    }
}

pub fn reverse_emi_rate(principal: f64, emi: f64, tenure_months: u32) -> f64 {
    solve_emi_rate(principal, emi, tenure_months).annual_rate_pct
}

/// Bisection over `[RATE_SEARCH_MIN_PCT, RATE_SEARCH_MAX_PCT]` for the annual
/// rate whose annuity payment equals `emi`.
///
/// The payment is strictly increasing in the rate, so the bracket always
/// holds the answer once both ends are checked. Inputs that cannot describe a
/// loan collapse to a zero rate with `converged == false`.
pub fn solve_emi_rate(principal: f64, emi: f64, tenure_months: u32) -> RateSolveResult {
    if !principal.is_finite()
        || !emi.is_finite()
        || principal <= 0.0
        || emi <= 0.0
        || tenure_months == 0
    {
        return RateSolveResult::at_bound(RATE_SEARCH_MIN_PCT, false);
    }

    let payment_at = |annual_rate_pct: f64| {
        annuity_payment(principal, monthly_rate(annual_rate_pct), tenure_months)
    };

    if emi <= payment_at(RATE_SEARCH_MIN_PCT) {
        return RateSolveResult::at_bound(RATE_SEARCH_MIN_PCT, true);
    }
    if emi >= payment_at(RATE_SEARCH_MAX_PCT) {
        return RateSolveResult::at_bound(RATE_SEARCH_MAX_PCT, false);
    }

    let mut lo = RATE_SEARCH_MIN_PCT;
    let mut hi = RATE_SEARCH_MAX_PCT;
    let mut it = 0;
    let mut converged = false;
    while it < MAX_ITERATIONS {
        it += 1;
        let mid = (lo + hi) * 0.5;
        if payment_at(mid) < emi {
            lo = mid;
        } else {
            hi = mid;
        }

        if (hi - lo).abs() <= RATE_TOLERANCE_PCT {
            converged = true;
            break;
        }
    }

    RateSolveResult {
        annual_rate_pct: ((lo + hi) * 0.5).max(0.0),
        iterations: it,
        converged,
        hit_search_bound: false,
    }
}

/// Largest principal an `emi` can service at the given rate and tenure.
pub fn calculate_affordability(emi: f64, annual_rate_pct: f64, tenure_months: u32) -> f64 {
    if !emi.is_finite() || emi <= 0.0 || tenure_months == 0 {
        return 0.0;
    }

    let rate = monthly_rate(annual_rate_pct);
    if rate == 0.0 {
        return emi * tenure_months as f64;
    }

    let periods = tenure_months.min(i32::MAX as u32) as i32;
    let discount = (1.0 + rate).powi(-periods);
    emi * (1.0 - discount) / rate
}
