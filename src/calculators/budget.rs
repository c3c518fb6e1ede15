//! Budget analysis against the 50/30/20 rule
//!
//! Category names are matched case-sensitively against three fixed buckets.
//! Categories outside every bucket still get a percentage but do not count
//! toward the rule totals.

use crate::models::{BudgetParameters, CalculatorResult, CategoryAmounts};
use crate::Result;
use serde::Serialize;

pub const OPERATION: &str = "analyze budget";

const NEEDS_CATEGORIES: &[&str] = &[
    "housing",
    "utilities",
    "groceries",
    "healthcare",
    "insurance",
    "transportation",
];

const WANTS_CATEGORIES: &[&str] = &[
    "entertainment",
    "dining",
    "shopping",
    "hobbies",
    "subscriptions",
    "travel",
];

const SAVINGS_CATEGORIES: &[&str] = &["savings", "investments", "debt_payment"];

const NEEDS_TARGET: u32 = 50;
const WANTS_TARGET: u32 = 30;
const SAVINGS_TARGET: u32 = 20;

const TOP_EXPENSE_COUNT: usize = 3;

pub const OVERSPENDING_SUGGESTION: &str =
    "Your expenses exceed your income. Consider reducing expenses or increasing income.";
pub const NEEDS_SUGGESTION: &str = "Your essential expenses are higher than recommended. Consider finding ways to reduce housing, transportation, or other necessary costs.";
pub const WANTS_SUGGESTION: &str = "Your discretionary spending is higher than recommended. Consider cutting back on entertainment, dining out, or other non-essential expenses.";
pub const SAVINGS_SUGGESTION: &str = "You're saving less than recommended. Aim to increase your savings rate to at least 20% of your income.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    pub income: f64,
    pub total_expenses: f64,
    /// Income minus expenses; negative when overspending.
    pub savings: f64,
    pub savings_rate: f64,
    pub category_percentages: CategoryAmounts,
    pub rule_assessment: RuleAssessment,
    pub top_expenses: Vec<(String, f64)>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAssessment {
    pub needs: RuleBucket,
    pub wants: RuleBucket,
    pub savings_debt: RuleBucket,
}

/// Actual share of income vs. the recommended share, both in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleBucket {
    pub actual: f64,
    pub recommended: u32,
    pub difference: f64,
}

impl RuleBucket {
    fn new(actual: f64, recommended: u32) -> Self {
        Self {
            actual,
            recommended,
            difference: actual - f64::from(recommended),
        }
    }
}

pub fn analyze(params: &BudgetParameters) -> Result<BudgetReport> {
    let income = params.income;
    let expenses = &params.expenses;

    let share = |amount: f64| if income > 0.0 { amount / income * 100.0 } else { 0.0 };

    let total_expenses = total(expenses);
    let savings = income - total_expenses;

    let category_percentages = expenses
        .iter()
        .map(|(category, amount)| (category.clone(), share(*amount)))
        .collect();

    // Unspent income counts toward the savings bucket.
    let needs = RuleBucket::new(share(bucket_total(expenses, NEEDS_CATEGORIES)), NEEDS_TARGET);
    let wants = RuleBucket::new(share(bucket_total(expenses, WANTS_CATEGORIES)), WANTS_TARGET);
    let savings_debt = RuleBucket::new(
        share(bucket_total(expenses, SAVINGS_CATEGORIES) + savings),
        SAVINGS_TARGET,
    );

    let mut suggestions = Vec::new();
    if savings < 0.0 {
        suggestions.push(OVERSPENDING_SUGGESTION.to_string());
    }
    if needs.actual > f64::from(NEEDS_TARGET) {
        suggestions.push(NEEDS_SUGGESTION.to_string());
    }
    if wants.actual > f64::from(WANTS_TARGET) {
        suggestions.push(WANTS_SUGGESTION.to_string());
    }
    if savings_debt.actual < f64::from(SAVINGS_TARGET) {
        suggestions.push(SAVINGS_SUGGESTION.to_string());
    }

    Ok(BudgetReport {
        income,
        total_expenses,
        savings,
        savings_rate: share(savings),
        category_percentages,
        rule_assessment: RuleAssessment {
            needs,
            wants,
            savings_debt,
        },
        top_expenses: top_expenses(expenses, TOP_EXPENSE_COUNT),
        suggestions,
    })
}

pub fn analyze_budget(params: &BudgetParameters) -> CalculatorResult {
    CalculatorResult::from_outcome(OPERATION, analyze(params))
}

pub fn total(expenses: &CategoryAmounts) -> f64 {
    expenses.values().sum()
}

fn bucket_total(expenses: &CategoryAmounts, bucket: &[&str]) -> f64 {
    expenses
        .iter()
        .filter(|(category, _)| bucket.contains(&category.as_str()))
        .map(|(_, amount)| amount)
        .sum()
}

/// Largest categories first; equal amounts keep their original order.
pub fn top_expenses(expenses: &CategoryAmounts, count: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = expenses
        .iter()
        .map(|(category, amount)| (category.clone(), *amount))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    fn budget(income: f64, expenses: &[(&str, f64)]) -> BudgetParameters {
        BudgetParameters {
            income,
            expenses: expenses
                .iter()
                .map(|(name, amount)| (name.to_string(), *amount))
                .collect(),
        }
    }

    #[test]
    fn test_balanced_budget() {
        let report = analyze(&budget(
            5_000.0,
            &[
                ("housing", 1_500.0),
                ("utilities", 200.0),
                ("groceries", 500.0),
                ("transportation", 300.0),
                ("entertainment", 300.0),
                ("dining", 200.0),
                ("savings", 500.0),
            ],
        ))
        .unwrap();

        assert_eq!(report.total_expenses, 3_500.0);
        assert_eq!(report.savings, 1_500.0);
        assert_close(report.savings_rate, 30.0);
        assert_close(report.rule_assessment.needs.actual, 50.0);
        assert_close(report.rule_assessment.wants.actual, 10.0);
        assert_close(report.rule_assessment.savings_debt.actual, 40.0);
        assert_close(report.rule_assessment.wants.difference, -20.0);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_overspending_suggestions() {
        let report = analyze(&budget(
            3_000.0,
            &[("housing", 2_000.0), ("shopping", 1_200.0)],
        ))
        .unwrap();

        assert_eq!(report.savings, -200.0);
        assert_eq!(
            report.suggestions,
            vec![
                OVERSPENDING_SUGGESTION,
                NEEDS_SUGGESTION,
                WANTS_SUGGESTION,
                SAVINGS_SUGGESTION
            ]
        );
    }

    #[test]
    fn test_overspending_iff_negative_savings() {
        let cases = [
            (4_000.0, vec![("rent", 4_000.0)]),
            (4_000.0, vec![("rent", 4_000.5)]),
            (4_000.0, vec![("rent", 100.0)]),
        ];

        for (income, expenses) in cases {
            let report = analyze(&budget(income, &expenses)).unwrap();
            let flagged = report
                .suggestions
                .iter()
                .any(|s| s == OVERSPENDING_SUGGESTION);
            assert_eq!(flagged, report.savings < 0.0);
        }
    }

    #[test]
    fn test_unbucketed_categories() {
        let report = analyze(&budget(
            2_000.0,
            &[("Housing", 500.0), ("pets", 250.0), ("housing", 1_000.0)],
        ))
        .unwrap();

        // "Housing" is not "housing"; neither it nor "pets" enters a bucket.
        assert_eq!(report.rule_assessment.needs.actual, 50.0);
        assert_eq!(
            serde_json::to_value(&report.category_percentages).unwrap(),
            json!({"Housing": 25.0, "pets": 12.5, "housing": 50.0})
        );
    }

    #[test]
    fn test_top_expenses_stable() {
        let report = analyze(&budget(
            10_000.0,
            &[
                ("dining", 300.0),
                ("travel", 800.0),
                ("hobbies", 300.0),
                ("housing", 800.0),
                ("insurance", 300.0),
            ],
        ))
        .unwrap();

        assert_eq!(
            report.top_expenses,
            vec![
                ("travel".to_string(), 800.0),
                ("housing".to_string(), 800.0),
                ("dining".to_string(), 300.0)
            ]
        );
    }

    #[test]
    fn test_non_positive_income() {
        let report = analyze(&budget(-1_000.0, &[("housing", 500.0)])).unwrap();
        assert_eq!(report.savings_rate, 0.0);
        assert_eq!(report.category_percentages.get("housing"), Some(&0.0));
        assert_eq!(report.rule_assessment.needs.actual, 0.0);
    }

    #[test]
    fn test_result_fields() {
        let result = analyze_budget(&budget(4_000.0, &[("housing", 1_000.0)]));
        let data = result.data().unwrap();

        let keys: Vec<&str> = data.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "income",
                "total_expenses",
                "savings",
                "savings_rate",
                "category_percentages",
                "rule_assessment",
                "top_expenses",
                "suggestions"
            ]
        );
        assert_eq!(
            data["rule_assessment"]["needs"],
            json!({"actual": 25.0, "recommended": 50, "difference": -25.0})
        );
        assert_eq!(data["top_expenses"], json!([["housing", 1000.0]]));
    }
}
