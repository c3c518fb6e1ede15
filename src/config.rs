//! Advisor configuration
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file by the binary). Only the API key is mandatory.

use crate::error::AdvisorError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_HISTORY_PERIOD: &str = "1d";

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Chat-completion endpoint (OpenAI-compatible).
    pub api_url: String,

    /// Bearer token for the chat-completion endpoint.
    pub api_key: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Sampling temperature for the conversational calls.
    pub chat_temperature: f32,

    /// Token budget for the conversational calls.
    pub chat_max_tokens: u32,

    /// Sampling temperature for parameter extraction.
    pub extraction_temperature: f32,

    /// Base URL of the market-data provider.
    pub market_data_url: String,

    /// Historical period requested for stock lookups.
    pub history_period: String,

    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl AdvisorConfig {
    /// Defaults for everything except the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            chat_temperature: 0.2,
            chat_max_tokens: 1000,
            extraction_temperature: 0.1,
            market_data_url: DEFAULT_MARKET_DATA_URL.to_string(),
            history_period: DEFAULT_HISTORY_PERIOD.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GROQ_API_KEY")
            .or_else(|_| env::var("LLM_API_KEY"))
            .unwrap_or_default();

        if api_key.trim().is_empty() {
            return Err(AdvisorError::Config(
                "No API key found. Please set the GROQ_API_KEY environment variable.".to_string(),
            ));
        }

        let mut config = Self::new(api_key.trim());

        if let Some(url) = non_empty_var("LLM_API_URL") {
            config.api_url = url;
        }
        if let Some(model) = non_empty_var("LLM_MODEL") {
            config.model = model;
        }
        if let Some(temperature) = parse_var::<f32>("LLM_TEMPERATURE")? {
            config.chat_temperature = temperature;
        }
        if let Some(max_tokens) = parse_var::<u32>("LLM_MAX_TOKENS")? {
            config.chat_max_tokens = max_tokens;
        }
        if let Some(url) = non_empty_var("MARKET_DATA_BASE_URL") {
            config.market_data_url = url.trim_end_matches('/').to_string();
        }
        if let Some(period) = non_empty_var("STOCK_HISTORY_PERIOD") {
            config.history_period = period;
        }
        if let Some(secs) = parse_var::<u64>("HTTP_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AdvisorError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}
