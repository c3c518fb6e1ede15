//! Core data models for the advisor pipeline

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

//
// ================= Function Calls =================
//

/// A deterministic function selected by the router, with validated parameters.
///
/// Serializes as `{"function": <name>, "parameters": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "function", content = "parameters")]
pub enum FunctionCall {
    #[serde(rename = "get_stock_data")]
    StockData(StockParameters),
    #[serde(rename = "calculate_loan_payment")]
    LoanPayment(LoanParameters),
    #[serde(rename = "calculate_investment_growth")]
    InvestmentGrowth(InvestmentParameters),
    #[serde(rename = "calculate_retirement_needs")]
    RetirementNeeds(RetirementParameters),
    #[serde(rename = "analyze_budget")]
    BudgetAnalysis(BudgetParameters),
}

impl FunctionCall {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionCall::StockData(_) => "get_stock_data",
            FunctionCall::LoanPayment(_) => "calculate_loan_payment",
            FunctionCall::InvestmentGrowth(_) => "calculate_investment_growth",
            FunctionCall::RetirementNeeds(_) => "calculate_retirement_needs",
            FunctionCall::BudgetAnalysis(_) => "analyze_budget",
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockParameters {
    pub ticker: String,
    pub period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    pub principal: f64,
    /// Annual rate, in percent.
    pub interest_rate: f64,
    pub years: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentParameters {
    pub initial_investment: f64,
    pub monthly_contribution: f64,
    /// Expected annual return, in percent.
    pub annual_return: f64,
    pub years: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetirementParameters {
    pub current_age: i64,
    pub retirement_age: i64,
    pub life_expectancy: i64,
    pub annual_expenses: f64,
    /// Percent per year.
    pub inflation_rate: f64,
    pub current_savings: f64,
    pub monthly_contribution: f64,
    /// Expected annual return, in percent.
    pub expected_return: f64,
}

impl Default for RetirementParameters {
    fn default() -> Self {
        Self {
            current_age: 30,
            retirement_age: 65,
            life_expectancy: 90,
            annual_expenses: 50_000.0,
            inflation_rate: 2.5,
            current_savings: 0.0,
            monthly_contribution: 500.0,
            expected_return: 7.0,
        }
    }
}

/// Expense categories are open-ended, case-sensitive, and keep the order given.
pub type CategoryAmounts = IndexMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetParameters {
    /// Monthly income.
    pub income: f64,
    #[serde(rename = "expenses_dict")]
    pub expenses: CategoryAmounts,
}

//
// ================= Calculator Results =================
//

/// Outcome of a calculator: `{status: success, data}` or `{status: error, message}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CalculatorResult {
    Success { data: Value },
    Error { message: String },
}

impl CalculatorResult {
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => CalculatorResult::Success { data },
            Err(e) => CalculatorResult::Error {
                message: format!("Failed to serialize result: {}", e),
            },
        }
    }

    /// Failure of `operation` (e.g. "calculate loan payment") with a short diagnostic.
    pub fn failure(operation: &str, diagnostic: impl fmt::Display) -> Self {
        CalculatorResult::Error {
            message: format!("Failed to {}: {}", operation, diagnostic),
        }
    }

    pub fn from_outcome<T: Serialize>(operation: &str, outcome: crate::Result<T>) -> Self {
        match outcome {
            Ok(data) => Self::success(&data),
            Err(e) => Self::failure(operation, e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CalculatorResult::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            CalculatorResult::Success { data } => Some(data),
            CalculatorResult::Error { .. } => None,
        }
    }
}

//
// ================= Pipeline I/O =================
//

/// Primary reply plus the routed function call, before execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    pub query: String,
    pub response: String,
    pub function_call: Option<FunctionCall>,
}

/// Structured reply handed back to whatever transport embeds the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AdvisorReply {
    Success {
        query: String,
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_result: Option<CalculatorResult>,
    },
    Error {
        message: String,
    },
}

impl AdvisorReply {
    pub fn error(message: impl Into<String>) -> Self {
        AdvisorReply::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AdvisorReply::Success { .. })
    }

    pub fn response(&self) -> Option<&str> {
        match self {
            AdvisorReply::Success { response, .. } => Some(response),
            AdvisorReply::Error { .. } => None,
        }
    }

    pub fn function_result(&self) -> Option<&CalculatorResult> {
        match self {
            AdvisorReply::Success {
                function_result, ..
            } => function_result.as_ref(),
            AdvisorReply::Error { .. } => None,
        }
    }
}
