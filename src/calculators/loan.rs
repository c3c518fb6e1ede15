//! Loan amortization

use super::horizon_months;
use crate::error::AdvisorError;
use crate::models::{CalculatorResult, LoanParameters};
use crate::Result;
use serde::Serialize;

pub const OPERATION: &str = "calculate loan payment";

/// Upper bound on schedule rows returned to the caller.
const MAX_SCHEDULE_ENTRIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanSummary {
    pub monthly_payment: f64,
    pub total_payments: i64,
    pub total_cost: f64,
    pub total_interest: f64,
    pub interest_rate_monthly: f64,
    /// Trimmed: months 1-12, every 12th month after, and the final month.
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub payment_number: i64,
    pub payment_amount: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    /// Clamped at zero.
    pub remaining_balance: f64,
}

/// Level payment for `periods` months at `monthly_rate`.
pub fn monthly_payment(principal: f64, monthly_rate: f64, periods: i64) -> f64 {
    let n = periods as f64;
    if monthly_rate == 0.0 {
        return principal / n;
    }

    let growth = (1.0 + monthly_rate).powf(n);
    principal * monthly_rate * growth / (growth - 1.0)
}

/// Every month of the loan, in order.
pub fn amortization_schedule(params: &LoanParameters) -> Result<Vec<ScheduleEntry>> {
    let periods = validate(params)?;

    let monthly_rate = params.interest_rate / 1200.0;
    let payment = monthly_payment(params.principal, monthly_rate, periods);

    let mut balance = params.principal;
    let mut schedule = Vec::with_capacity(periods as usize);

    for payment_number in 1..=periods {
        let interest_paid = balance * monthly_rate;
        let principal_paid = payment - interest_paid;
        balance -= principal_paid;

        schedule.push(ScheduleEntry {
            payment_number,
            payment_amount: payment,
            principal_paid,
            interest_paid,
            remaining_balance: balance.max(0.0),
        });
    }

    Ok(schedule)
}

pub fn summarize(params: &LoanParameters) -> Result<LoanSummary> {
    let schedule = amortization_schedule(params)?;

    let periods = validate(params)?;
    let monthly_rate = params.interest_rate / 1200.0;
    let payment = monthly_payment(params.principal, monthly_rate, periods);
    let total_cost = payment * periods as f64;

    let schedule = schedule
        .into_iter()
        .filter(|entry| {
            let month = entry.payment_number;
            month <= 12 || month % 12 == 0 || month == periods
        })
        .take(MAX_SCHEDULE_ENTRIES)
        .collect();

    Ok(LoanSummary {
        monthly_payment: payment,
        total_payments: periods,
        total_cost,
        total_interest: total_cost - params.principal,
        interest_rate_monthly: monthly_rate,
        schedule,
    })
}

pub fn calculate_loan_payment(params: &LoanParameters) -> CalculatorResult {
    CalculatorResult::from_outcome(OPERATION, summarize(params))
}

/// Number of monthly payments for a well-formed loan.
fn validate(params: &LoanParameters) -> Result<i64> {
    if params.years < 1 {
        return Err(AdvisorError::Calculation(format!(
            "loan term must be at least one year, got {}",
            params.years
        )));
    }
    if params.principal <= 0.0 {
        return Err(AdvisorError::Calculation(format!(
            "principal must be positive, got {}",
            params.principal
        )));
    }
    horizon_months("loan term", params.years)
}
