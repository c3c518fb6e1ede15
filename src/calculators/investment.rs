//! Investment growth simulation
//!
//! Month by month: the contribution lands first, then the month's interest
//! compounds on the new balance. Year-end snapshots are `(year, value)` pairs.

use super::horizon_months;
use crate::models::{CalculatorResult, InvestmentParameters};
use crate::Result;
use serde::Serialize;

pub const OPERATION: &str = "calculate investment growth";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentProjection {
    pub final_balance: f64,
    /// Includes the initial investment.
    pub total_contributions: f64,
    pub total_interest: f64,
    pub yearly_balances: Vec<(i64, f64)>,
    pub yearly_contributions: Vec<(i64, f64)>,
    pub yearly_interests: Vec<(i64, f64)>,
}

pub fn project(params: &InvestmentParameters) -> Result<InvestmentProjection> {
    let months = horizon_months("investment horizon", params.years)?;
    let monthly_rate = params.annual_return / 1200.0;
    let years = params.years as usize;

    let mut balance = params.initial_investment;
    let mut contributed = params.initial_investment;
    let mut interest_earned = 0.0;

    let mut yearly_balances = Vec::with_capacity(years);
    let mut yearly_contributions = Vec::with_capacity(years);
    let mut yearly_interests = Vec::with_capacity(years);

    for month in 1..=months {
        balance += params.monthly_contribution;
        contributed += params.monthly_contribution;

        let interest = balance * monthly_rate;
        balance += interest;
        interest_earned += interest;

        if month % 12 == 0 {
            let year = month / 12;
            yearly_balances.push((year, balance));
            yearly_contributions.push((year, contributed));
            yearly_interests.push((year, interest_earned));
        }
    }

    Ok(InvestmentProjection {
        final_balance: balance,
        total_contributions: contributed,
        total_interest: interest_earned,
        yearly_balances,
        yearly_contributions,
        yearly_interests,
    })
}

pub fn calculate_investment_growth(params: &InvestmentParameters) -> CalculatorResult {
    CalculatorResult::from_outcome(OPERATION, project(params))
}
