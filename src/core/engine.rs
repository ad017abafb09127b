use std::cmp::Ordering;

use super::amortization::{calculate_emi, generate_amortization, monthly_rate};
use super::types::{Loan, LoanResult, OptimizationResult, PlanConfig, Strategy, StrategyResult};

/// Hard stop for any simulation, in months.
pub const MAX_SIMULATION_MONTHS: u32 = 1_200;

/// Smart hybrid treats a loan as a quick win when the current extra pool
/// can clear it within this many months.
const QUICK_WIN_MONTHS: f64 = 3.0;

/// No-extra-payment reference: each loan amortized on its own EMI.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub total_interest: f64,
    pub total_months: u32,
    /// Indexed like the loans slice the baseline was built from.
    pub payoff_months: Vec<u32>,
}

pub fn compute_baseline(loans: &[Loan]) -> Baseline {
    let mut total_interest = 0.0;
    let mut total_months = 0;
    let mut payoff_months = Vec::with_capacity(loans.len());
    for loan in loans {
        let schedule = generate_amortization(
            loan.principal,
            loan.annual_rate_pct,
            loan.tenure_months,
            0.0,
        );
        let payoff_month = schedule.len() as u32;
        total_interest += schedule.last().map_or(0.0, |e| e.cumulative_interest);
        total_months = total_months.max(payoff_month);
        payoff_months.push(payoff_month);
    }

    Baseline {
        total_interest,
        total_months,
        payoff_months,
    }
}

#[derive(Debug)]
struct LoanState<'a> {
    loan: &'a Loan,
    monthly_rate: f64,
    emi: f64,
    balance: f64,
    payoff_month: Option<u32>,
}

impl LoanState<'_> {
    fn is_open(&self) -> bool {
        self.payoff_month.is_none()
    }
}

type Priority = fn(&LoanState<'_>, &LoanState<'_>, f64) -> Ordering;

/// How a strategy spends the month's extra pool.
enum Allocation {
    /// Fill loans one at a time in priority order, spilling leftovers forward.
    Cascade(Priority),
    /// Split across every open loan in proportion to its balance.
    ProRata,
}

fn allocation_for(strategy: Strategy) -> Allocation {
    match strategy {
        Strategy::Avalanche => Allocation::Cascade(avalanche_priority),
        Strategy::Snowball => Allocation::Cascade(snowball_priority),
        Strategy::SmartHybrid => Allocation::Cascade(hybrid_priority),
        Strategy::Proportional => Allocation::ProRata,
    }
}

fn by_id(a: &LoanState<'_>, b: &LoanState<'_>) -> Ordering {
    a.loan.id.cmp(&b.loan.id)
}

fn avalanche_priority(a: &LoanState<'_>, b: &LoanState<'_>, _pool: f64) -> Ordering {
    b.loan
        .annual_rate_pct
        .total_cmp(&a.loan.annual_rate_pct)
        .then_with(|| a.balance.total_cmp(&b.balance))
        .then_with(|| by_id(a, b))
}

fn snowball_priority(a: &LoanState<'_>, b: &LoanState<'_>, _pool: f64) -> Ordering {
    a.balance
        .total_cmp(&b.balance)
        .then_with(|| b.loan.annual_rate_pct.total_cmp(&a.loan.annual_rate_pct))
        .then_with(|| by_id(a, b))
}

fn hybrid_priority(a: &LoanState<'_>, b: &LoanState<'_>, pool: f64) -> Ordering {
    let quick_win = |s: &LoanState<'_>| pool > 0.0 && s.balance <= pool * QUICK_WIN_MONTHS;
    match (quick_win(a), quick_win(b)) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => snowball_priority(a, b, pool),
        (false, false) => avalanche_priority(a, b, pool),
    }
}

fn allocate_extra(allocation: &Allocation, states: &mut [LoanState<'_>], pool: f64) {
    if pool <= 0.0 {
        return;
    }
    match allocation {
        Allocation::Cascade(priority) => {
            let mut order: Vec<usize> = (0..states.len())
                .filter(|&idx| states[idx].is_open() && states[idx].balance > 0.0)
                .collect();
            order.sort_by(|&a, &b| priority(&states[a], &states[b], pool));

            let mut remaining = pool;
            for idx in order {
                if remaining <= 0.0 {
                    break;
                }
                let payment = remaining.min(states[idx].balance);
                states[idx].balance -= payment;
                remaining -= payment;
            }
        }
        Allocation::ProRata => {
            let open_balance: f64 = states
                .iter()
                .filter(|s| s.is_open())
                .map(|s| s.balance.max(0.0))
                .sum();
            if open_balance <= 0.0 {
                return;
            }
            // Shares stay below each balance unless the pool covers everything.
            let clear_all = pool >= open_balance;
            for state in states.iter_mut().filter(|s| s.is_open()) {
                if clear_all {
                    state.balance = 0.0;
                } else {
                    let share = pool * state.balance.max(0.0) / open_balance;
                    state.balance -= share.min(state.balance);
                }
            }
        }
    }
}

struct Simulation {
    total_interest: f64,
    payoff_months: Vec<u32>,
    payoff_order: Vec<usize>,
}

/// Steps every loan month by month until all are closed.
///
/// Each month every open loan pays its own EMI, then the extra pool (grown
/// budget plus that month's lump sums) is spent according to the strategy.
/// A closed loan's EMI is not added to the pool. A loan closes when its
/// balance reaches zero or its own tenure elapses.
fn simulate(loans: &[Loan], config: &PlanConfig, strategy: Strategy) -> Simulation {
    let allocation = allocation_for(strategy);
    let mut payoff_order = Vec::with_capacity(loans.len());
    let mut states: Vec<LoanState<'_>> = loans
        .iter()
        .enumerate()
        .map(|(idx, loan)| {
            let emi = calculate_emi(loan.principal, loan.annual_rate_pct, loan.tenure_months);
            let payoff_month = if emi <= 0.0 {
                payoff_order.push(idx);
                Some(0)
            } else {
                None
            };
            LoanState {
                loan,
                monthly_rate: monthly_rate(loan.annual_rate_pct),
                emi,
                balance: loan.principal,
                payoff_month,
            }
        })
        .collect();

    let mut total_interest = 0.0;
    let mut month = 0;
    while month < MAX_SIMULATION_MONTHS && states.iter().any(|s| s.is_open()) {
        month += 1;

        for state in states.iter_mut().filter(|s| s.is_open()) {
            let interest = (state.balance * state.monthly_rate).round();
            let principal_paid = (state.emi - interest).min(state.balance).max(0.0);
            state.balance -= principal_paid;
            total_interest += interest;
        }

        let pool = config.extra_budget_for_month(month) + config.lump_sum_for_month(month);
        allocate_extra(&allocation, &mut states, pool);

        for (idx, state) in states.iter_mut().enumerate() {
            if state.is_open() && (state.balance <= 0.0 || month >= state.loan.tenure_months) {
                state.payoff_month = Some(month);
                payoff_order.push(idx);
            }
        }
    }

    for (idx, state) in states.iter_mut().enumerate() {
        if state.is_open() {
            state.payoff_month = Some(month);
            payoff_order.push(idx);
        }
    }

    Simulation {
        total_interest,
        payoff_months: states
            .iter()
            .map(|s| s.payoff_month.unwrap_or(month))
            .collect(),
        payoff_order,
    }
}

/// Runs one strategy and reports it against `baseline`, which must have been
/// computed from the same `loans`.
pub fn simulate_strategy(
    loans: &[Loan],
    config: &PlanConfig,
    strategy: Strategy,
    baseline: &Baseline,
) -> StrategyResult {
    let simulation = simulate(loans, config, strategy);
    let total_months = simulation.payoff_months.iter().copied().max().unwrap_or(0);

    let loan_results = loans
        .iter()
        .zip(&simulation.payoff_months)
        .enumerate()
        .map(|(idx, (loan, &payoff_month))| {
            let baseline_month = baseline.payoff_months.get(idx).copied().unwrap_or(0);
            LoanResult {
                loan_id: loan.id.clone(),
                bank_name: loan.bank_label.clone(),
                loan_type: loan.loan_type_label.clone(),
                original_balance: loan.principal,
                payoff_month,
                months_saved: baseline_month.saturating_sub(payoff_month),
            }
        })
        .collect();

    StrategyResult {
        strategy_name: strategy,
        description: strategy.description().to_string(),
        total_interest_paid: simulation.total_interest,
        total_months,
        interest_saved_vs_baseline: baseline.total_interest - simulation.total_interest,
        months_saved_vs_baseline: baseline.total_months.saturating_sub(total_months),
        payoff_order: simulation
            .payoff_order
            .iter()
            .map(|&idx| loans[idx].id.clone())
            .collect(),
        debt_free_date_months: total_months,
        loan_results,
    }
}

/// Lowest total interest wins; ties go to fewer months, then to list order.
pub fn recommend_strategy(results: &[StrategyResult]) -> Option<Strategy> {
    results
        .iter()
        .min_by(|a, b| {
            a.total_interest_paid
                .total_cmp(&b.total_interest_paid)
                .then_with(|| a.total_months.cmp(&b.total_months))
        })
        .map(|r| r.strategy_name)
}

/// Simulates each requested strategy (all of them when `strategies` is
/// empty) and picks a recommendation.
pub fn optimize(
    loans: &[Loan],
    config: &PlanConfig,
    strategies: &[Strategy],
) -> OptimizationResult {
    let candidates: &[Strategy] = if strategies.is_empty() {
        &Strategy::ALL
    } else {
        strategies
    };
    let mut requested: Vec<Strategy> = Vec::with_capacity(candidates.len());
    for &strategy in candidates {
        if !requested.contains(&strategy) {
            requested.push(strategy);
        }
    }

    let baseline = compute_baseline(loans);
    let results: Vec<StrategyResult> = requested
        .iter()
        .map(|&strategy| simulate_strategy(loans, config, strategy, &baseline))
        .collect();
    let recommended_strategy = recommend_strategy(&results).unwrap_or(requested[0]);

    tracing::debug!(
        loans = loans.len(),
        strategies = results.len(),
        baseline_interest = baseline.total_interest,
        baseline_months = baseline.total_months,
        recommended = %recommended_strategy,
        "optimization complete"
    );

    OptimizationResult {
        baseline_total_interest: baseline.total_interest,
        baseline_total_months: baseline.total_months,
        recommended_strategy,
        strategies: results,
    }
}
