//! Financial Advisor Bot
//!
//! A conversational financial advisor that:
//! - Answers free-form questions through a chat-completion model
//! - Routes calculable questions to deterministic calculators (LLM excluded from the math)
//! - Extracts calculator inputs from natural language, degrading quietly when it cannot
//! - Looks up live stock quotes from a market-data provider
//! - Narrates calculator results back into the conversation
//!
//! PIPELINE:
//! QUERY → PRIMARY REPLY → ROUTE → EXTRACT → CALCULATE → NARRATE

pub mod advisor;
pub mod calculators;
pub mod config;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod market;
pub mod memory;
pub mod models;
pub mod router;

pub use error::Result;

// Re-export common types
pub use advisor::FinancialAdvisor;
pub use config::AdvisorConfig;
pub use error::AdvisorError;
pub use models::*;
pub use router::{extract_ticker_symbols, Intent, IntentRouter};
