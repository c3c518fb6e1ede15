//! Parameter extraction
//!
//! Asks the language model to turn a free-form query into the numeric inputs
//! of one calculator. The model's text is untrusted: the first `{` .. last `}`
//! span is isolated before parsing, and every failure (transport, malformed
//! JSON, unconvertible field) degrades to "no parameters".

use crate::error::AdvisorError;
use crate::llm::{CompletionOptions, LanguageModel};
use crate::memory::ConversationTurn;
use crate::models::{
    BudgetParameters, CategoryAmounts, InvestmentParameters, LoanParameters, RetirementParameters,
};
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const EXTRACTION_SYSTEM_PROMPT: &str =
    "You extract structured data from text. Respond with JSON only.";

const LOAN_MAX_TOKENS: u32 = 200;
const INVESTMENT_MAX_TOKENS: u32 = 200;
const RETIREMENT_MAX_TOKENS: u32 = 300;
const BUDGET_MAX_TOKENS: u32 = 400;

type JsonObject = Map<String, Value>;

/// LLM-backed extractor shared by the four calculator domains.
pub struct ParameterExtractor {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl ParameterExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Principal, annual rate and term; all three are required.
    pub async fn extract_loan(&self, query: &str) -> Option<LoanParameters> {
        let outcome = match self.request_object(&loan_prompt(query), LOAN_MAX_TOKENS).await {
            Ok(object) => parse_loan_parameters(&object),
            Err(e) => Err(e),
        };
        settle("loan", outcome)
    }

    /// Initial amount, monthly contribution, annual return and horizon; all required.
    pub async fn extract_investment(&self, query: &str) -> Option<InvestmentParameters> {
        let outcome = match self
            .request_object(&investment_prompt(query), INVESTMENT_MAX_TOKENS)
            .await
        {
            Ok(object) => parse_investment_parameters(&object),
            Err(e) => Err(e),
        };
        settle("investment", outcome)
    }

    /// Retirement inputs; missing fields fall back to defaults.
    pub async fn extract_retirement(&self, query: &str) -> Option<RetirementParameters> {
        let outcome = match self
            .request_object(&retirement_prompt(query), RETIREMENT_MAX_TOKENS)
            .await
        {
            Ok(object) => parse_retirement_parameters(&object).map(Some),
            Err(e) => Err(e),
        };
        settle("retirement", outcome)
    }

    /// Income plus a non-empty category → amount mapping.
    pub async fn extract_budget(&self, query: &str) -> Option<BudgetParameters> {
        let outcome = match self.request_object(&budget_prompt(query), BUDGET_MAX_TOKENS).await {
            Ok(object) => parse_budget_parameters(&object),
            Err(e) => Err(e),
        };
        settle("budget", outcome)
    }

    async fn request_object(&self, prompt: &str, max_tokens: u32) -> Result<JsonObject> {
        let messages = [
            ConversationTurn::system(EXTRACTION_SYSTEM_PROMPT),
            ConversationTurn::user(prompt),
        ];
        let options = CompletionOptions {
            temperature: self.temperature,
            max_tokens,
        };

        let reply = self.model.complete(&messages, options).await?;
        parse_json_object(&reply)
    }
}

fn settle<T>(domain: &str, outcome: Result<Option<T>>) -> Option<T> {
    match outcome {
        Ok(Some(params)) => {
            debug!(domain, "Parameters extracted");
            Some(params)
        }
        Ok(None) => {
            debug!(domain, "Required parameters missing from query");
            None
        }
        Err(e) => {
            warn!(domain, error = %e, "Parameter extraction failed");
            None
        }
    }
}

//
// ================= Prompts =================
//

fn loan_prompt(query: &str) -> String {
    format!(
        r#"Extract loan calculation parameters from this query: "{}"

Return ONLY a JSON object with these fields (use null if not found):
- principal: (numeric loan amount)
- interest_rate: (annual interest rate as a percentage)
- years: (loan term in years)

JSON object:"#,
        query
    )
}

fn investment_prompt(query: &str) -> String {
    format!(
        r#"Extract investment growth parameters from this query: "{}"

Return ONLY a JSON object with these fields (use null if not found):
- initial_investment: (numeric initial amount)
- monthly_contribution: (numeric monthly amount)
- annual_return: (expected annual return percentage)
- years: (investment horizon in years)

JSON object:"#,
        query
    )
}

fn retirement_prompt(query: &str) -> String {
    format!(
        r#"Extract retirement planning parameters from this query: "{}"

Return ONLY a JSON object with these fields (use null if not found):
- current_age: (numeric current age)
- retirement_age: (numeric retirement age)
- life_expectancy: (numeric life expectancy)
- annual_expenses: (numeric annual expenses)
- inflation_rate: (numeric inflation rate percentage)
- current_savings: (numeric current retirement savings)
- monthly_contribution: (numeric monthly contribution)
- expected_return: (numeric expected annual return percentage)

JSON object:"#,
        query
    )
}

fn budget_prompt(query: &str) -> String {
    format!(
        r#"Extract budget analysis parameters from this query: "{}"

Return ONLY a JSON object with these fields:
- income: (numeric monthly income)
- expenses: (object with expense categories as keys and amounts as values)

Example:
{{
    "income": 5000,
    "expenses": {{
        "housing": 1500,
        "utilities": 200,
        "groceries": 500,
        "transportation": 300,
        "entertainment": 300,
        "dining": 200,
        "savings": 500
    }}
}}

JSON object:"#,
        query
    )
}

//
// ================= Parsing =================
//

/// Slice from the first `{` to the last `}` inclusive.
pub fn isolate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Parse model output into a JSON object, tolerating surrounding prose.
pub fn parse_json_object(text: &str) -> Result<JsonObject> {
    let span = isolate_json_object(text).ok_or_else(|| {
        AdvisorError::Extraction("no JSON object in model response".to_string())
    })?;

    match serde_json::from_str::<Value>(span)? {
        Value::Object(object) => Ok(object),
        other => Err(AdvisorError::Extraction(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

pub fn parse_loan_parameters(object: &JsonObject) -> Result<Option<LoanParameters>> {
    let principal = number_field(object, "principal")?;
    let interest_rate = number_field(object, "interest_rate")?;
    let years = integer_field(object, "years")?;

    Ok(match (principal, interest_rate, years) {
        (Some(principal), Some(interest_rate), Some(years)) => Some(LoanParameters {
            principal,
            interest_rate,
            years,
        }),
        _ => None,
    })
}

pub fn parse_investment_parameters(object: &JsonObject) -> Result<Option<InvestmentParameters>> {
    let initial_investment = number_field(object, "initial_investment")?;
    let monthly_contribution = number_field(object, "monthly_contribution")?;
    let annual_return = number_field(object, "annual_return")?;
    let years = integer_field(object, "years")?;

    Ok(
        match (initial_investment, monthly_contribution, annual_return, years) {
            (Some(initial_investment), Some(monthly_contribution), Some(annual_return), Some(years)) => {
                Some(InvestmentParameters {
                    initial_investment,
                    monthly_contribution,
                    annual_return,
                    years,
                })
            }
            _ => None,
        },
    )
}

/// Never rejects for missing data; only unconvertible values fail.
pub fn parse_retirement_parameters(object: &JsonObject) -> Result<RetirementParameters> {
    let defaults = RetirementParameters::default();

    Ok(RetirementParameters {
        current_age: integer_field(object, "current_age")?.unwrap_or(defaults.current_age),
        retirement_age: integer_field(object, "retirement_age")?
            .unwrap_or(defaults.retirement_age),
        life_expectancy: integer_field(object, "life_expectancy")?
            .unwrap_or(defaults.life_expectancy),
        annual_expenses: number_field(object, "annual_expenses")?
            .unwrap_or(defaults.annual_expenses),
        inflation_rate: number_field(object, "inflation_rate")?.unwrap_or(defaults.inflation_rate),
        current_savings: number_field(object, "current_savings")?
            .unwrap_or(defaults.current_savings),
        monthly_contribution: number_field(object, "monthly_contribution")?
            .unwrap_or(defaults.monthly_contribution),
        expected_return: number_field(object, "expected_return")?
            .unwrap_or(defaults.expected_return),
    })
}

pub fn parse_budget_parameters(object: &JsonObject) -> Result<Option<BudgetParameters>> {
    let income = match number_field(object, "income")? {
        Some(income) if income != 0.0 => income,
        _ => return Ok(None),
    };

    let categories = match object.get("expenses") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(categories)) => categories,
        Some(other) => {
            return Err(AdvisorError::Extraction(format!(
                "expenses must be an object, got {}",
                other
            )))
        }
    };

    if categories.is_empty() {
        return Ok(None);
    }

    let mut expenses = CategoryAmounts::new();
    for (category, amount) in categories {
        let amount = to_number(amount)?.ok_or_else(|| {
            AdvisorError::Extraction(format!("expense '{}' has no amount", category))
        })?;
        expenses.insert(category.clone(), amount);
    }

    Ok(Some(BudgetParameters { income, expenses }))
}

/// `None` for a missing or null field; error for anything non-numeric.
fn number_field(object: &JsonObject, key: &str) -> Result<Option<f64>> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => to_number(value)
            .map_err(|_| AdvisorError::Extraction(format!("{} is not numeric: {}", key, value))),
    }
}

/// Whole-number field; magnitudes beyond `i32::MAX` are rejected rather than saturated.
fn integer_field(object: &JsonObject, key: &str) -> Result<Option<i64>> {
    match number_field(object, key)? {
        Some(n) if n.abs() > f64::from(i32::MAX) => Err(AdvisorError::Extraction(format!(
            "{} is out of range: {}",
            key, n
        ))),
        other => Ok(other.map(|n| n.trunc() as i64)),
    }
}

fn to_number(value: &Value) -> Result<Option<f64>> {
    let number = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(AdvisorError::Extraction(format!("not a number: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedModel;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            _ => panic!("test fixture must be an object"),
        }
    }

    fn extractor(model: &Arc<ScriptedModel>) -> ParameterExtractor {
        ParameterExtractor::new(model.clone(), 0.1)
    }

    #[test]
    fn test_isolate_json_object() {
        let text = "Sure! Here you go:\n```json\n{\"principal\": 1000, \"x\": {\"y\": 1}}\n```\nAnything else?";
        assert_eq!(
            isolate_json_object(text),
            Some("{\"principal\": 1000, \"x\": {\"y\": 1}}")
        );
        assert_eq!(isolate_json_object("no json here"), None);
        assert_eq!(isolate_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_json_object_rejects_garbage() {
        assert!(parse_json_object("{not json}").is_err());
        assert!(parse_json_object("[1, 2, 3]").is_err());
        assert!(parse_json_object("{\"a\": 1}").is_ok());
    }

    #[test]
    fn test_loan_requires_every_field() {
        let full = object(json!({"principal": 250000, "interest_rate": "6.5", "years": 30}));
        assert_eq!(
            parse_loan_parameters(&full).unwrap(),
            Some(LoanParameters {
                principal: 250_000.0,
                interest_rate: 6.5,
                years: 30
            })
        );

        let missing = object(json!({"principal": 250000, "interest_rate": null, "years": 30}));
        assert_eq!(parse_loan_parameters(&missing).unwrap(), None);

        let zero_rate = object(json!({"principal": 12000, "interest_rate": 0, "years": 2}));
        assert!(parse_loan_parameters(&zero_rate).unwrap().is_some());

        let garbage = object(json!({"principal": "a lot", "interest_rate": 5, "years": 30}));
        assert!(parse_loan_parameters(&garbage).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_integers() {
        let huge = object(json!({"principal": 1000, "interest_rate": 5, "years": 1e19}));
        assert!(parse_loan_parameters(&huge).is_err());

        let negative = object(json!({"current_age": -1e19}));
        assert!(parse_retirement_parameters(&negative).is_err());

        let edge = object(json!({"principal": 1000, "interest_rate": 5, "years": 2147483647}));
        assert_eq!(parse_loan_parameters(&edge).unwrap().unwrap().years, 2_147_483_647);
    }

    #[test]
    fn test_investment_truncates_years() {
        let params = object(json!({
            "initial_investment": 10000,
            "monthly_contribution": 0,
            "annual_return": 7,
            "years": 10.9
        }));
        let parsed = parse_investment_parameters(&params).unwrap().unwrap();
        assert_eq!(parsed.years, 10);
        assert_eq!(parsed.monthly_contribution, 0.0);

        let partial = object(json!({"initial_investment": 10000, "annual_return": 7, "years": 10}));
        assert_eq!(parse_investment_parameters(&partial).unwrap(), None);
    }

    #[test]
    fn test_retirement_defaults() {
        let parsed = parse_retirement_parameters(&object(json!({}))).unwrap();
        assert_eq!(parsed, RetirementParameters::default());

        let parsed = parse_retirement_parameters(&object(json!({
            "current_age": 45,
            "monthly_contribution": null,
            "expected_return": "6"
        })))
        .unwrap();
        assert_eq!(parsed.current_age, 45);
        assert_eq!(parsed.monthly_contribution, 500.0);
        assert_eq!(parsed.expected_return, 6.0);
        assert_eq!(parsed.retirement_age, 65);

        assert!(parse_retirement_parameters(&object(json!({"current_age": "forty"}))).is_err());
    }

    #[test]
    fn test_budget_validation() {
        let parsed = parse_budget_parameters(&object(json!({
            "income": 5000,
            "expenses": {"housing": 1500, "dining": "200", "Gym": 50}
        })))
        .unwrap()
        .unwrap();
        let categories: Vec<&str> = parsed.expenses.keys().map(String::as_str).collect();
        assert_eq!(categories, vec!["housing", "dining", "Gym"]);
        assert_eq!(parsed.expenses.get("dining"), Some(&200.0));

        let no_expenses = object(json!({"income": 5000, "expenses": {}}));
        assert_eq!(parse_budget_parameters(&no_expenses).unwrap(), None);

        let no_income = object(json!({"expenses": {"housing": 1500}}));
        assert_eq!(parse_budget_parameters(&no_income).unwrap(), None);

        let bad_amount = object(json!({"income": 5000, "expenses": {"housing": "lots"}}));
        assert!(parse_budget_parameters(&bad_amount).is_err());
    }

    #[test]
    fn test_extract_loan_through_model() {
        let model = Arc::new(ScriptedModel::replying(&[
            "Here is the JSON: {\"principal\": 300000, \"interest_rate\": 6, \"years\": 30} Hope that helps.",
        ]));

        let params = tokio_test::block_on(
            extractor(&model).extract_loan("Mortgage of $300k at 6% for 30 years?"),
        );

        assert_eq!(
            params,
            Some(LoanParameters {
                principal: 300_000.0,
                interest_rate: 6.0,
                years: 30
            })
        );

        let (messages, options) = model.request(0);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, EXTRACTION_SYSTEM_PROMPT);
        assert!(messages[1].content.contains("Mortgage of $300k at 6% for 30 years?"));
        assert_eq!(options.max_tokens, LOAN_MAX_TOKENS);
        assert!((options.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extraction_failures_become_none() {
        let model = Arc::new(ScriptedModel::new(vec![
            Some("I could not find any numbers."),
            None,
            Some("{\"income\": 4000, \"expenses\": [1, 2]}"),
        ]));
        let extractor = extractor(&model);

        assert_eq!(tokio_test::block_on(extractor.extract_loan("loan?")), None);
        assert_eq!(tokio_test::block_on(extractor.extract_investment("invest?")), None);
        assert_eq!(tokio_test::block_on(extractor.extract_budget("budget?")), None);
        assert_eq!(model.request_count(), 3);
    }

    #[tokio::test]
    async fn test_extract_retirement_uses_larger_budget() {
        let model = Arc::new(ScriptedModel::replying(&["{\"current_age\": 40}"]));

        let params = extractor(&model)
            .extract_retirement("I'm 40, can I retire at 60?")
            .await
            .unwrap();

        assert_eq!(params.current_age, 40);
        assert_eq!(params.life_expectancy, 90);
        assert_eq!(model.request(0).1.max_tokens, RETIREMENT_MAX_TOKENS);
    }
}
