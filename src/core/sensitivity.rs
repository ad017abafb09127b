use super::engine::{compute_baseline, simulate_strategy};
use super::types::{Loan, PlanConfig, SensitivityPoint, SensitivityResult, Strategy};

pub const DEFAULT_RATE_DELTAS: [f64; 3] = [-1.0, 0.0, 1.0];

/// Re-runs `strategy` with every loan's rate shifted by each delta.
///
/// Deltas are sorted and de-duplicated; an empty or all-invalid list falls
/// back to [`DEFAULT_RATE_DELTAS`]. Shifted rates are floored at zero and each
/// point is measured against the baseline at the same shifted rates.
pub fn analyze_sensitivity(
    loans: &[Loan],
    config: &PlanConfig,
    strategy: Strategy,
    rate_deltas: &[f64],
) -> SensitivityResult {
    // `+ 0.0` turns -0.0 into 0.0.
    let mut deltas: Vec<f64> = rate_deltas
        .iter()
        .filter(|d| d.is_finite())
        .map(|d| d + 0.0)
        .collect();
    if deltas.is_empty() {
        deltas = DEFAULT_RATE_DELTAS.to_vec();
    }
    deltas.sort_by(f64::total_cmp);
    deltas.dedup();

    let points = deltas
        .into_iter()
        .map(|rate_delta_pct| {
            let shifted = shift_rates(loans, rate_delta_pct);
            let baseline = compute_baseline(&shifted);
            let result = simulate_strategy(&shifted, config, strategy, &baseline);
            SensitivityPoint {
                rate_delta_pct,
                total_interest_paid: result.total_interest_paid,
                total_months: result.total_months,
                interest_saved_vs_baseline: result.interest_saved_vs_baseline,
            }
        })
        .collect();

    SensitivityResult {
        strategy_name: strategy,
        points,
    }
}

fn shift_rates(loans: &[Loan], rate_delta_pct: f64) -> Vec<Loan> {
    loans
        .iter()
        .map(|loan| Loan {
            annual_rate_pct: (loan.annual_rate_pct + rate_delta_pct).max(0.0),
            ..loan.clone()
        })
        .collect()
}
