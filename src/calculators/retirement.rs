//! Retirement corpus projection
//!
//! Inflates today's expenses to the retirement date, sizes the corpus with
//! the 25x (4% withdrawal) heuristic and compares it with the projected value
//! of current savings plus monthly contributions.

use super::{horizon_months, MAX_HORIZON_YEARS};
use crate::error::AdvisorError;
use crate::models::{CalculatorResult, RetirementParameters};
use crate::Result;
use serde::Serialize;

pub const OPERATION: &str = "calculate retirement needs";

const CORPUS_MULTIPLIER: f64 = 25.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetirementProjection {
    pub years_to_retirement: i64,
    pub years_in_retirement: i64,
    pub future_annual_expenses: f64,
    pub retirement_corpus_needed: f64,
    pub future_value_current_savings: f64,
    pub future_value_contributions: f64,
    pub total_future_value: f64,
    /// Magnitude only; see `is_surplus` for the sign.
    pub shortfall_or_surplus: f64,
    pub is_surplus: bool,
    pub required_monthly_contribution: f64,
}

pub fn project(params: &RetirementParameters) -> Result<RetirementProjection> {
    let years_to_retirement = params
        .retirement_age
        .checked_sub(params.current_age)
        .filter(|years| *years > 0)
        .ok_or_else(|| {
            AdvisorError::Calculation(format!(
                "retirement age {} must be after current age {}",
                params.retirement_age, params.current_age
            ))
        })?;
    let months = horizon_months("time to retirement", years_to_retirement)?;

    let years_in_retirement = params
        .life_expectancy
        .checked_sub(params.retirement_age)
        .filter(|years| years.abs() <= MAX_HORIZON_YEARS)
        .ok_or_else(|| {
            AdvisorError::Calculation(format!(
                "life expectancy {} is implausible for retirement at {}",
                params.life_expectancy, params.retirement_age
            ))
        })?;

    let future_annual_expenses = params.annual_expenses
        * (1.0 + params.inflation_rate / 100.0).powf(years_to_retirement as f64);
    let retirement_corpus_needed = future_annual_expenses * CORPUS_MULTIPLIER;

    let monthly_rate = params.expected_return / 1200.0;
    let months = months as f64;
    let growth = (1.0 + monthly_rate).powf(months);

    let future_value_current_savings = params.current_savings * growth;
    // Annuity due: each deposit earns one extra month.
    let future_value_contributions = if monthly_rate == 0.0 {
        params.monthly_contribution * months
    } else {
        params.monthly_contribution * (growth - 1.0) / monthly_rate * (1.0 + monthly_rate)
    };
    let total_future_value = future_value_current_savings + future_value_contributions;

    let shortfall = retirement_corpus_needed - total_future_value;
    let required_monthly_contribution = if shortfall > 0.0 {
        let top_up = if monthly_rate == 0.0 {
            shortfall / months
        } else {
            shortfall * monthly_rate / (growth - 1.0)
        };
        params.monthly_contribution + top_up
    } else {
        params.monthly_contribution
    };

    Ok(RetirementProjection {
        years_to_retirement,
        years_in_retirement,
        future_annual_expenses,
        retirement_corpus_needed,
        future_value_current_savings,
        future_value_contributions,
        total_future_value,
        shortfall_or_surplus: shortfall.abs(),
        is_surplus: shortfall < 0.0,
        required_monthly_contribution,
    })
}

pub fn calculate_retirement_needs(params: &RetirementParameters) -> CalculatorResult {
    CalculatorResult::from_outcome(OPERATION, project(params))
}
