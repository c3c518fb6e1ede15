//! Intent Router
//!
//! Decides which deterministic function (if any) a free-form query should
//! trigger. Keyword sets are checked in a fixed priority order and the first
//! match wins:
//! - Stock lookup (also needs a plausible ticker token)
//! - Loan / mortgage
//! - Investment growth
//! - Retirement
//! - Budget

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    StockLookup,
    Loan,
    Investment,
    Retirement,
    Budget,
    /// No calculator applies; answer conversationally.
    Conversational,
}

/// Static keyword lists, matched as substrings
const STOCK_KEYWORDS: &[&str] = &["stock", "ticker", "share price", "stock price"];

const LOAN_KEYWORDS: &[&str] = &["loan", "mortgage", "payment", "interest"];

const INVESTMENT_KEYWORDS: &[&str] = &["invest", "compound", "growth", "return"];

const RETIREMENT_KEYWORDS: &[&str] = &["retire", "retirement", "401k", "pension"];

const BUDGET_KEYWORDS: &[&str] = &["budget", "spending", "expense", "income"];

/// Priority order for the keyword scan.
const ROUTES: &[(Intent, &[&str])] = &[
    (Intent::StockLookup, STOCK_KEYWORDS),
    (Intent::Loan, LOAN_KEYWORDS),
    (Intent::Investment, INVESTMENT_KEYWORDS),
    (Intent::Retirement, RETIREMENT_KEYWORDS),
    (Intent::Budget, BUDGET_KEYWORDS),
];

const MAX_TICKER_LEN: usize = 5;

/// Keyword-driven intent router
pub struct IntentRouter;

impl IntentRouter {
    /// First domain whose keywords appear in `query`.
    ///
    /// Only one domain fires per query. A stock match without any ticker
    /// candidate falls through to `Conversational` rather than the next domain.
    pub fn classify(query: &str) -> Intent {
        let lowered = query.to_lowercase();

        let matched = ROUTES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(intent, _)| *intent);

        match matched {
            Some(Intent::StockLookup) if extract_ticker_symbols(query).is_empty() => {
                Intent::Conversational
            }
            Some(intent) => intent,
            None => Intent::Conversational,
        }
    }
}

/// Candidate ticker symbols in order of appearance.
///
/// A whitespace token qualifies once stripped of non-alphanumerics if it is
/// purely alphabetic, fully uppercase and at most five characters long.
pub fn extract_ticker_symbols(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| {
            !word.is_empty()
                && word.chars().count() <= MAX_TICKER_LEN
                && word.chars().all(|c| c.is_alphabetic() && c.is_uppercase())
        })
        .collect()
}
