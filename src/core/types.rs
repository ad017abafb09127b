use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single loan as captured at intake. Read-only input to every engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub principal: f64,
    pub annual_rate_pct: f64,
    pub tenure_months: u32,
    #[serde(default)]
    pub bank_label: String,
    #[serde(default)]
    pub loan_type_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmortizationEntry {
    pub month: u32,
    pub principal: f64,
    pub interest: f64,
    pub balance: f64,
    pub cumulative_interest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InterestSaved {
    pub interest_saved: f64,
    pub months_saved: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Avalanche,
    Snowball,
    SmartHybrid,
    Proportional,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Avalanche,
        Strategy::Snowball,
        Strategy::SmartHybrid,
        Strategy::Proportional,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Avalanche => "avalanche",
            Strategy::Snowball => "snowball",
            Strategy::SmartHybrid => "smart_hybrid",
            Strategy::Proportional => "proportional",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Strategy::Avalanche => "Pay extra toward the highest interest rate loan first.",
            Strategy::Snowball => "Pay extra toward the smallest outstanding balance first.",
            Strategy::SmartHybrid => {
                "Clear loans that are a few months from payoff first, then follow the avalanche order."
            }
            Strategy::Proportional => {
                "Split extra payments across all open loans in proportion to their balances."
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "avalanche" => Ok(Strategy::Avalanche),
            "snowball" => Ok(Strategy::Snowball),
            "smart_hybrid" | "hybrid" => Ok(Strategy::SmartHybrid),
            "proportional" => Ok(Strategy::Proportional),
            _ => Err(format!(
                "unknown strategy '{s}'; expected one of avalanche, snowball, smart_hybrid, proportional"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LumpSum {
    pub month: u32,
    pub amount: f64,
}

/// Budget inputs shared by every strategy run of one optimization request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanConfig {
    pub monthly_extra: f64,
    pub lump_sums: Vec<LumpSum>,
    pub annual_growth_pct: f64,
}

impl PlanConfig {
    /// Extra budget available in `month` (1-based) before lump sums.
    pub fn extra_budget_for_month(&self, month: u32) -> f64 {
        let base = self.monthly_extra.max(0.0);
        if base == 0.0 || self.annual_growth_pct == 0.0 {
            return base;
        }
        let monthly_growth = 1.0 + self.annual_growth_pct / 1200.0;
        (base * monthly_growth.powi(month.saturating_sub(1) as i32))
            .round()
            .max(0.0)
    }

    pub fn lump_sum_for_month(&self, month: u32) -> f64 {
        self.lump_sums
            .iter()
            .filter(|lump| lump.month == month)
            .map(|lump| lump.amount.max(0.0))
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanResult {
    pub loan_id: String,
    pub bank_name: String,
    pub loan_type: String,
    pub original_balance: f64,
    pub payoff_month: u32,
    pub months_saved: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyResult {
    pub strategy_name: Strategy,
    #[serde(rename = "strategy_description")]
    pub description: String,
    pub total_interest_paid: f64,
    pub total_months: u32,
    pub interest_saved_vs_baseline: f64,
    pub months_saved_vs_baseline: u32,
    pub payoff_order: Vec<String>,
    pub debt_free_date_months: u32,
    pub loan_results: Vec<LoanResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub baseline_total_interest: f64,
    pub baseline_total_months: u32,
    pub recommended_strategy: Strategy,
    pub strategies: Vec<StrategyResult>,
}

impl OptimizationResult {
    /// Looks up `name`, falling back to the recommended strategy when absent.
    pub fn strategy_or_recommended(&self, name: Option<Strategy>) -> Option<&StrategyResult> {
        name.and_then(|wanted| self.strategies.iter().find(|s| s.strategy_name == wanted))
            .or_else(|| {
                self.strategies
                    .iter()
                    .find(|s| s.strategy_name == self.recommended_strategy)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub rate_delta_pct: f64,
    pub total_interest_paid: f64,
    pub total_months: u32,
    pub interest_saved_vs_baseline: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityResult {
    pub strategy_name: Strategy,
    pub points: Vec<SensitivityPoint>,
}
