//! Deterministic financial calculators
//!
//! The language model never runs here. Each calculator reports through
//! `CalculatorResult`, so failures stay inside a successful reply.

pub mod budget;
pub mod investment;
pub mod loan;
pub mod retirement;

pub use budget::{analyze_budget, BudgetReport, RuleAssessment, RuleBucket};
pub use investment::{calculate_investment_growth, InvestmentProjection};
pub use loan::{amortization_schedule, calculate_loan_payment, LoanSummary, ScheduleEntry};
pub use retirement::{calculate_retirement_needs, RetirementProjection};

use crate::error::AdvisorError;
use crate::market::{self, MarketDataProvider};
use crate::models::{CalculatorResult, FunctionCall};
use crate::Result;
use tracing::{debug, warn};

/// Longest horizon any calculator will simulate.
pub const MAX_HORIZON_YEARS: i64 = 100;

/// Months in a horizon of `years`, which must lie in `0..=MAX_HORIZON_YEARS`.
pub(crate) fn horizon_months(label: &str, years: i64) -> Result<i64> {
    if !(0..=MAX_HORIZON_YEARS).contains(&years) {
        return Err(AdvisorError::Calculation(format!(
            "{} must be between 0 and {} years, got {}",
            label, MAX_HORIZON_YEARS, years
        )));
    }
    years
        .checked_mul(12)
        .ok_or_else(|| AdvisorError::Calculation(format!("{} overflows: {} years", label, years)))
}

/// Run the function a call names. Only the stock lookup touches the network.
pub async fn execute(call: &FunctionCall, provider: &dyn MarketDataProvider) -> CalculatorResult {
    debug!(function = %call, "Executing function call");

    let result = match call {
        FunctionCall::StockData(params) => market::get_stock_data(provider, params).await,
        FunctionCall::LoanPayment(params) => calculate_loan_payment(params),
        FunctionCall::InvestmentGrowth(params) => calculate_investment_growth(params),
        FunctionCall::RetirementNeeds(params) => calculate_retirement_needs(params),
        FunctionCall::BudgetAnalysis(params) => analyze_budget(params),
    };

    if let CalculatorResult::Error { message } = &result {
        warn!(function = %call, error = %message, "Function returned an error result");
    }

    result
}
