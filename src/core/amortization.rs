use super::types::{AmortizationEntry, InterestSaved};

/// Monthly rate as a fraction. Negative or non-finite annual rates are treated as zero.
pub(crate) fn monthly_rate(annual_rate_pct: f64) -> f64 {
    if !annual_rate_pct.is_finite() || annual_rate_pct <= 0.0 {
        0.0
    } else {
        annual_rate_pct / 12.0 / 100.0
    }
}

fn periods(tenure_months: u32) -> i32 {
    tenure_months.min(i32::MAX as u32) as i32
}

/// Unrounded reducing-balance annuity payment.
pub(crate) fn annuity_payment(principal: f64, monthly_rate: f64, tenure_months: u32) -> f64 {
    if !principal.is_finite() || principal <= 0.0 || tenure_months == 0 {
        return 0.0;
    }
    if monthly_rate <= 0.0 {
        return principal / tenure_months as f64;
    }

    let factor = (1.0 + monthly_rate).powi(periods(tenure_months));
    if !factor.is_finite() {
        return principal * monthly_rate;
    }
    principal * monthly_rate * factor / (factor - 1.0)
}

pub fn calculate_emi(principal: f64, annual_rate_pct: f64, tenure_months: u32) -> f64 {
    annuity_payment(principal, monthly_rate(annual_rate_pct), tenure_months).round()
}

pub fn calculate_total_interest(principal: f64, annual_rate_pct: f64, tenure_months: u32) -> f64 {
    let emi = calculate_emi(principal, annual_rate_pct, tenure_months);
    if emi <= 0.0 || monthly_rate(annual_rate_pct) == 0.0 {
        return 0.0;
    }
    emi * tenure_months as f64 - principal
}

/// Month-by-month schedule at the loan's own EMI plus a constant prepayment.
///
/// Interest is rounded to whole currency units every month, so the final
/// balance may carry a small residual when the schedule runs to full tenure.
pub fn generate_amortization(
    principal: f64,
    annual_rate_pct: f64,
    tenure_months: u32,
    monthly_prepayment: f64,
) -> Vec<AmortizationEntry> {
    let emi = calculate_emi(principal, annual_rate_pct, tenure_months);
    if emi <= 0.0 {
        return Vec::new();
    }

    let rate = monthly_rate(annual_rate_pct);
    let prepayment = if monthly_prepayment.is_finite() {
        monthly_prepayment.max(0.0)
    } else {
        0.0
    };

    let mut schedule = Vec::with_capacity(tenure_months.min(1_200) as usize);
    let mut balance = principal;
    let mut cumulative_interest = 0.0;
    for month in 1..=tenure_months {
        if balance <= 0.0 {
            break;
        }
        let interest = (balance * rate).round();
        let principal_paid = (emi + prepayment - interest).min(balance).max(0.0);
        balance -= principal_paid;
        cumulative_interest += interest;
        schedule.push(AmortizationEntry {
            month,
            principal: principal_paid,
            interest,
            balance,
            cumulative_interest,
        });
    }
    schedule
}

pub fn calculate_interest_saved(
    principal: f64,
    annual_rate_pct: f64,
    tenure_months: u32,
    monthly_prepayment: f64,
) -> InterestSaved {
    if calculate_emi(principal, annual_rate_pct, tenure_months) <= 0.0 {
        return InterestSaved {
            interest_saved: 0.0,
            months_saved: 0,
        };
    }

    let baseline_interest = calculate_total_interest(principal, annual_rate_pct, tenure_months);
    let schedule = generate_amortization(
        principal,
        annual_rate_pct,
        tenure_months,
        monthly_prepayment,
    );
    let prepaid_interest = schedule.last().map_or(0.0, |e| e.cumulative_interest);

    InterestSaved {
        interest_saved: baseline_interest - prepaid_interest,
        months_saved: tenure_months.saturating_sub(schedule.len() as u32),
    }
}
