//! In-memory loan book and saved plans shared by the HTTP handlers.
//!
//! Engine calls never touch this state; handlers resolve loans up front and
//! pass owned copies into the pure core.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use super::ApiError;
use crate::core::{Loan, MAX_SIMULATION_MONTHS, RATE_SEARCH_MAX_PCT, Strategy};

#[derive(Debug, Default)]
pub struct LoanBook {
    loans: Vec<Loan>,
}

impl LoanBook {
    pub fn list(&self) -> &[Loan] {
        &self.loans
    }

    pub fn get(&self, id: &str) -> Option<&Loan> {
        self.loans.iter().find(|loan| loan.id == id)
    }

    pub fn insert(&mut self, loan: Loan) -> Result<(), ApiError> {
        validate_loan(&loan)?;
        if self.get(&loan.id).is_some() {
            return Err(ApiError::DuplicateLoan(loan.id));
        }
        self.loans.push(loan);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Loan, ApiError> {
        let idx = self
            .loans
            .iter()
            .position(|loan| loan.id == id)
            .ok_or_else(|| ApiError::LoanNotFound(id.to_string()))?;
        Ok(self.loans.remove(idx))
    }

    /// Looks up `ids` in request order.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<Loan>, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::bad_request("loan_ids must not be empty"));
        }
        let mut resolved: Vec<Loan> = Vec::with_capacity(ids.len());
        for id in ids {
            if resolved.iter().any(|loan| &loan.id == id) {
                return Err(ApiError::bad_request(format!(
                    "loan_ids contains '{id}' more than once"
                )));
            }
            let loan = self
                .get(id)
                .ok_or_else(|| ApiError::LoanNotFound(id.clone()))?;
            resolved.push(loan.clone());
        }
        Ok(resolved)
    }
}

pub fn validate_loan(loan: &Loan) -> Result<(), ApiError> {
    if loan.id.trim().is_empty() {
        return Err(ApiError::bad_request("loan id must not be empty"));
    }
    if !loan.principal.is_finite() || loan.principal <= 0.0 {
        return Err(ApiError::bad_request("principal must be > 0"));
    }
    if !loan.annual_rate_pct.is_finite()
        || !(0.0..=RATE_SEARCH_MAX_PCT).contains(&loan.annual_rate_pct)
    {
        return Err(ApiError::bad_request(format!(
            "annual_rate_pct must be between 0 and {RATE_SEARCH_MAX_PCT}"
        )));
    }
    if loan.tenure_months == 0 || loan.tenure_months > MAX_SIMULATION_MONTHS {
        return Err(ApiError::bad_request(format!(
            "tenure_months must be between 1 and {MAX_SIMULATION_MONTHS}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedPlan {
    pub id: Uuid,
    pub name: String,
    pub strategy: Strategy,
    pub monthly_extra: f64,
    pub interest_saved: f64,
    pub months_saved: u32,
}

#[derive(Clone, Default)]
pub struct AppState {
    pub loans: Arc<RwLock<LoanBook>>,
    pub plans: Arc<RwLock<Vec<SavedPlan>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the loan book, rejecting the first invalid or duplicate loan.
    pub fn with_loans(loans: impl IntoIterator<Item = Loan>) -> Result<Self, ApiError> {
        let state = Self::new();
        {
            let mut book = state.loans.write();
            for loan in loans {
                book.insert(loan)?;
            }
        }
        Ok(state)
    }
}
