use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::api::{self, AppState};
use crate::core::{
    Loan, LumpSum, OptimizationResult, Strategy, calculate_emi, generate_amortization, optimize,
};
use crate::error::{Error, Result};
use crate::telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "payoff", version, about = "Multi-loan prepayment planner")]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "PAYOFF_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value = "0.0.0.0", env = "PAYOFF_HOST")]
        host: IpAddr,

        #[arg(long, default_value_t = 8080, env = "PAYOFF_PORT")]
        port: u16,

        /// JSON array of loans to seed the loan book with.
        #[arg(long, env = "PAYOFF_LOANS_FILE")]
        loans_file: Option<PathBuf>,
    },

    /// Compare strategies for a plan file and print the result as JSON.
    Analyze {
        #[arg(long)]
        input: PathBuf,

        /// Restrict to these strategies; defaults to all of them.
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<Strategy>,
    },

    /// Print the amortization schedule of a single loan as JSON.
    Schedule {
        #[arg(long)]
        principal: f64,

        #[arg(long)]
        rate: f64,

        #[arg(long)]
        tenure: u32,

        #[arg(long, default_value_t = 0.0)]
        prepayment: f64,
    },
}

/// Input for `payoff analyze`.
#[derive(Debug, Deserialize)]
pub struct PlanFile {
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub monthly_extra: f64,
    #[serde(default)]
    pub lump_sums: Vec<LumpSum>,
    #[serde(default)]
    pub annual_growth_pct: f64,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve {
            host,
            port,
            loans_file,
        } => {
            let state = match loans_file {
                Some(path) => {
                    let loans = load_loans(&path)?;
                    tracing::info!(path = %path.display(), loans = loans.len(), "seeded loan book");
                    AppState::with_loans(loans).map_err(|e| Error::InvalidLoan {
                        path,
                        reason: e.to_string(),
                    })?
                }
                None => AppState::new(),
            };
            api::run_http_server(host, port, state).await?;
        }
        Command::Analyze { input, strategies } => {
            let result = analyze_file(&input, &strategies)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Schedule {
            principal,
            rate,
            tenure,
            prepayment,
        } => {
            if !principal.is_finite() || principal <= 0.0 || tenure == 0 {
                return Err(Error::InvalidInput(
                    "principal must be > 0 and tenure must be >= 1".to_string(),
                ));
            }
            let emi = calculate_emi(principal, rate, tenure);
            tracing::debug!(principal, rate, tenure, prepayment, emi, "generating schedule");
            let schedule = generate_amortization(principal, rate, tenure, prepayment);
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
    }
    Ok(())
}

pub fn load_loans(path: &Path) -> Result<Vec<Loan>> {
    let raw = read_file(path)?;
    let loans: Vec<Loan> = serde_json::from_str(&raw).map_err(|source| Error::ParseFile {
        path: path.to_path_buf(),
        source,
    })?;
    validate_loans(path, &loans)?;
    Ok(loans)
}

pub fn load_plan(path: &Path) -> Result<PlanFile> {
    let raw = read_file(path)?;
    let plan: PlanFile = serde_json::from_str(&raw).map_err(|source| Error::ParseFile {
        path: path.to_path_buf(),
        source,
    })?;
    validate_loans(path, &plan.loans)?;
    Ok(plan)
}

pub fn analyze_file(path: &Path, strategies: &[Strategy]) -> Result<OptimizationResult> {
    let plan = load_plan(path)?;
    if plan.loans.is_empty() {
        return Err(Error::InvalidLoan {
            path: path.to_path_buf(),
            reason: "no loans".to_string(),
        });
    }
    let config = api::build_plan_config(plan.monthly_extra, plan.lump_sums, plan.annual_growth_pct)
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    Ok(optimize(&plan.loans, &config, strategies))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_loans(path: &Path, loans: &[Loan]) -> Result<()> {
    for (idx, loan) in loans.iter().enumerate() {
        api::validate_loan(loan).map_err(|e| Error::InvalidLoan {
            path: path.to_path_buf(),
            reason: format!("loan #{idx}: {e}"),
        })?;
        if loans[..idx].iter().any(|other| other.id == loan.id) {
            return Err(Error::InvalidLoan {
                path: path.to_path_buf(),
                reason: format!("duplicate loan id '{}'", loan.id),
            });
        }
    }
    Ok(())
}
