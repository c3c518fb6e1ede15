//! Advisor pipeline
//!
//! One query runs start to finish:
//! USER TURN → PRIMARY REPLY → ROUTE → EXTRACT → CALCULATE → NARRATE
//!
//! The language model only talks; every number comes from a calculator.
//! Each `FinancialAdvisor` owns one conversation and `&mut self` keeps a
//! session from being driven by two queries at once.

use crate::calculators;
use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::extraction::ParameterExtractor;
use crate::llm::{ChatClient, CompletionOptions, LanguageModel};
use crate::market::{MarketDataProvider, YahooFinanceClient};
use crate::memory::Conversation;
use crate::models::{AdvisorReply, CalculatorResult, FunctionCall, ParsedQuery, StockParameters};
use crate::router::{extract_ticker_symbols, Intent, IntentRouter};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const SYSTEM_PROMPT: &str = "You are a knowledgeable financial advisor chatbot with access to real-time financial data. \
Your goal is to provide helpful, accurate, and ethical financial advice. You can:

- Explain financial concepts in simple terms
- Provide general investment strategies and principles
- Offer budgeting and saving tips
- Explain tax concepts at a high level
- Discuss retirement planning approaches
- Calculate loan payments, interest, and investment returns
- Analyze real-time stock market data

Remember to:
- Clarify that you're providing general advice, not personalized financial recommendations
- Suggest consulting with a licensed financial advisor for specific investment decisions
- Never recommend specific stocks, funds, or investment products
- Be transparent about the limitations of your knowledge
- Ask clarifying questions when needed to provide better advice

For numeric data, showcase calculations step-by-step to help users understand the reasoning.";

pub struct FinancialAdvisor {
    llm: Arc<dyn LanguageModel>,
    extractor: ParameterExtractor,
    market: Arc<dyn MarketDataProvider>,
    conversation: Conversation,
    chat_options: CompletionOptions,
    history_period: String,
}

impl FinancialAdvisor {
    /// Advisor backed by the configured chat endpoint and Yahoo Finance.
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let llm: Arc<dyn LanguageModel> = Arc::new(ChatClient::new(&config)?);
        let market: Arc<dyn MarketDataProvider> = Arc::new(YahooFinanceClient::new(&config)?);

        info!(model = %config.model, "Financial advisor initialized");

        Ok(Self::with_components(llm, market, &config))
    }

    pub fn with_components(
        llm: Arc<dyn LanguageModel>,
        market: Arc<dyn MarketDataProvider>,
        config: &AdvisorConfig,
    ) -> Self {
        Self {
            extractor: ParameterExtractor::new(llm.clone(), config.extraction_temperature),
            llm,
            market,
            conversation: Conversation::new(SYSTEM_PROMPT),
            chat_options: CompletionOptions {
                temperature: config.chat_temperature,
                max_tokens: config.chat_max_tokens,
            },
            history_period: config.history_period.clone(),
        }
    }

    /// Record the query, get the primary reply, and decide on a function call.
    ///
    /// Errors only when the primary call fails, in which case the transcript is
    /// left as it was. Extraction problems just mean `function_call` is `None`.
    pub async fn parse_financial_query(&mut self, query: &str) -> Result<ParsedQuery> {
        let checkpoint = self.conversation.len();
        self.conversation.push_user(query);

        let response = match self
            .llm
            .complete(self.conversation.turns(), self.chat_options)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.conversation.truncate(checkpoint);
                return Err(e);
            }
        };
        self.conversation.push_assistant(response.clone());

        let intent = IntentRouter::classify(query);
        debug!(?intent, "Query classified");

        let function_call = self.function_call_for(intent, query).await;
        if let Some(call) = &function_call {
            info!(function = %call, "Function call identified");
        }

        Ok(ParsedQuery {
            query: query.to_string(),
            response,
            function_call,
        })
    }

    async fn function_call_for(&self, intent: Intent, query: &str) -> Option<FunctionCall> {
        match intent {
            Intent::StockLookup => {
                let ticker = extract_ticker_symbols(query).into_iter().next()?;
                Some(FunctionCall::StockData(StockParameters {
                    ticker,
                    period: self.history_period.clone(),
                }))
            }
            Intent::Loan => self
                .extractor
                .extract_loan(query)
                .await
                .map(FunctionCall::LoanPayment),
            Intent::Investment => self
                .extractor
                .extract_investment(query)
                .await
                .map(FunctionCall::InvestmentGrowth),
            Intent::Retirement => self
                .extractor
                .extract_retirement(query)
                .await
                .map(FunctionCall::RetirementNeeds),
            Intent::Budget => self
                .extractor
                .extract_budget(query)
                .await
                .map(FunctionCall::BudgetAnalysis),
            Intent::Conversational => None,
        }
    }

    pub async fn execute(&self, call: &FunctionCall) -> CalculatorResult {
        calculators::execute(call, self.market.as_ref()).await
    }

    /// Full pipeline for one query. Only a failed LLM call yields `AdvisorReply::Error`,
    /// and then none of the query's turns are kept.
    pub async fn process_query(&mut self, query: &str) -> AdvisorReply {
        let checkpoint = self.conversation.len();
        let parsed = match self.parse_financial_query(query).await {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "Primary completion failed");
                return AdvisorReply::error(reply_message("Failed to parse financial query", e));
            }
        };

        let Some(call) = parsed.function_call else {
            return AdvisorReply::Success {
                query: parsed.query,
                response: parsed.response,
                function_result: None,
            };
        };

        let result = self.execute(&call).await;

        match self.narrate(&call, &result).await {
            Ok(response) => AdvisorReply::Success {
                query: parsed.query,
                response,
                function_result: Some(result),
            },
            Err(e) => {
                error!(function = %call, error = %e, "Follow-up completion failed");
                self.conversation.truncate(checkpoint);
                AdvisorReply::error(reply_message("Failed to narrate function result", e))
            }
        }
    }

    /// Feed the function result back and let the narration replace the draft reply.
    async fn narrate(&mut self, call: &FunctionCall, result: &CalculatorResult) -> Result<String> {
        let payload = serde_json::to_string(result)?;
        self.conversation
            .push_system(format!("Function {} returned: {}", call.name(), payload));

        let narration = self
            .llm
            .complete(self.conversation.turns(), self.chat_options)
            .await?;

        let update = self.conversation.replace_last_assistant(narration.clone());
        debug!(?update, "Assistant turn updated with narration");

        Ok(narration)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Forget everything but the system prompt; the session id is kept.
    pub fn reset(&mut self) {
        self.conversation.reset();
        info!(session_id = %self.conversation.session_id, "Conversation reset");
    }
}

fn reply_message(context: &str, error: AdvisorError) -> String {
    if matches!(error, AdvisorError::EmptyCompletion) {
        error.to_string()
    } else {
        format!("{}: {}", context, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedModel;
    use crate::market::mock::StubProvider;
    use crate::memory::{ConversationTurn, MessageRole};

    fn advisor(model: &Arc<ScriptedModel>, provider: StubProvider) -> FinancialAdvisor {
        FinancialAdvisor::with_components(
            model.clone(),
            Arc::new(provider),
            &AdvisorConfig::new("test-key"),
        )
    }

    #[tokio::test]
    async fn test_conversational_query() {
        let model = Arc::new(ScriptedModel::replying(&["An index fund tracks a market index."]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor.process_query("What is an index fund?").await;

        assert_eq!(
            reply,
            AdvisorReply::Success {
                query: "What is an index fund?".to_string(),
                response: "An index fund tracks a market index.".to_string(),
                function_result: None,
            }
        );
        assert_eq!(model.request_count(), 1);
        assert_eq!(advisor.conversation().len(), 3);

        let (messages, options) = model.request(0);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(options.max_tokens, 1000);
    }

    #[tokio::test]
    async fn test_loan_query_runs_calculator_and_narrates() {
        let model = Arc::new(ScriptedModel::replying(&[
            "Let me work that out.",
            r#"{"principal": 200000, "interest_rate": 6, "years": 30}"#,
            "Your monthly payment is about $1,199.10.",
        ]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor
            .process_query("What's the monthly payment on a $200,000 mortgage at 6% for 30 years?")
            .await;

        assert_eq!(reply.response(), Some("Your monthly payment is about $1,199.10."));
        let result = reply.function_result().unwrap();
        let payment = result.data().unwrap()["monthly_payment"].as_f64().unwrap();
        assert!((payment - 1199.10).abs() < 0.01);

        // system, user, assistant (replaced in place), function result
        let turns = advisor.conversation().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2], ConversationTurn::assistant("Your monthly payment is about $1,199.10."));
        assert_eq!(turns[3].role, MessageRole::System);
        assert!(turns[3]
            .content
            .starts_with("Function calculate_loan_payment returned: {\"status\":\"success\""));

        // The narration request sees the function result as its last turn.
        let (narration_request, _) = model.request(2);
        assert_eq!(narration_request.last(), turns.last());
    }

    #[tokio::test]
    async fn test_stock_query_skips_extraction() {
        let model = Arc::new(ScriptedModel::replying(&[
            "Checking the latest quote.",
            "Apple is trading at $190.",
        ]));
        let mut advisor = advisor(&model, StubProvider::with_price("Apple Inc.", 190.0));

        let parsed = advisor
            .parse_financial_query("What's the stock price of AAPL?")
            .await
            .unwrap();

        assert_eq!(
            parsed.function_call,
            Some(FunctionCall::StockData(StockParameters {
                ticker: "AAPL".to_string(),
                period: "1d".to_string(),
            }))
        );
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_stock_query_uses_first_candidate() {
        let model = Arc::new(ScriptedModel::replying(&["Let me pull up Apple."]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let parsed = advisor
            .parse_financial_query("Should I buy AAPL stock?")
            .await
            .unwrap();

        match parsed.function_call {
            // "I" precedes AAPL and is taken as-is.
            Some(FunctionCall::StockData(params)) => assert_eq!(params.ticker, "I"),
            other => panic!("unexpected function call: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_calculator_error_stays_inside_success() {
        let model = Arc::new(ScriptedModel::replying(&[
            "Let me look that up.",
            "I couldn't find that ticker.",
        ]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor.process_query("Show me the stock ZZZZ").await;

        assert!(reply.is_success());
        assert!(!reply.function_result().unwrap().is_success());
    }

    #[tokio::test]
    async fn test_failed_extraction_degrades_to_conversation() {
        let model = Arc::new(ScriptedModel::replying(&[
            "Budgets help you plan.",
            "Sorry, I can't produce JSON for that.",
        ]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor.process_query("How do I make a budget?").await;

        assert_eq!(reply.response(), Some("Budgets help you plan."));
        assert!(reply.function_result().is_none());
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_completion_is_top_level_error() {
        let model = Arc::new(ScriptedModel::new(vec![None::<&str>]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor.process_query("Hello").await;

        assert_eq!(
            reply,
            AdvisorReply::error("Failed to get response from language model")
        );
        // Only the system prompt remains.
        assert_eq!(advisor.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_failure_is_top_level_error() {
        let model = Arc::new(ScriptedModel::new(vec![
            Some("Let me check."),
            Some(r#"{"current_age": 40}"#),
        ]));
        let mut advisor = advisor(&model, StubProvider::failing());

        let reply = advisor.process_query("Can I retire at 60?").await;

        match reply {
            AdvisorReply::Error { message } => {
                assert!(message.starts_with("Failed to narrate function result:"))
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        assert_eq!(advisor.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_query_leaves_transcript_consistent() {
        let model = Arc::new(ScriptedModel::new(vec![
            None,
            Some("A Roth IRA is funded with after-tax money."),
        ]));
        let mut advisor = advisor(&model, StubProvider::failing());

        assert!(!advisor.process_query("Hello?").await.is_success());
        let reply = advisor.process_query("What is a Roth IRA?").await;
        assert!(reply.is_success());

        // The second request must not carry the unanswered first question.
        let (messages, _) = model.request(1);
        let roles: Vec<MessageRole> = messages.iter().map(|turn| turn.role).collect();
        assert_eq!(roles, vec![MessageRole::System, MessageRole::User]);
        assert_eq!(messages[1].content, "What is a Roth IRA?");
        assert_eq!(advisor.conversation().len(), 3);
    }

    #[tokio::test]
    async fn test_reset_keeps_session() {
        let model = Arc::new(ScriptedModel::replying(&["Hi there."]));
        let mut advisor = advisor(&model, StubProvider::failing());
        let session_id = advisor.conversation().session_id;

        advisor.process_query("Hello").await;
        advisor.reset();

        assert_eq!(advisor.conversation().len(), 1);
        assert_eq!(advisor.conversation().session_id, session_id);
    }
}
