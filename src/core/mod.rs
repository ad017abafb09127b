mod amortization;
mod engine;
mod sensitivity;
mod solver;
mod types;

pub use amortization::{
    calculate_emi, calculate_interest_saved, calculate_total_interest, generate_amortization,
};
pub use engine::{
    Baseline, MAX_SIMULATION_MONTHS, compute_baseline, optimize, recommend_strategy,
    simulate_strategy,
};
pub use sensitivity::{DEFAULT_RATE_DELTAS, analyze_sensitivity};
pub use solver::{
    RATE_SEARCH_MAX_PCT, RATE_SEARCH_MIN_PCT, RateSolveResult, calculate_affordability,
    reverse_emi_rate, solve_emi_rate,
};
pub use types::{
    AmortizationEntry, InterestSaved, Loan, LoanResult, LumpSum, OptimizationResult, PlanConfig,
    SensitivityPoint, SensitivityResult, Strategy, StrategyResult,
};
