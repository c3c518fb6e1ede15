use financial_advisor_bot::{AdvisorConfig, AdvisorReply, FinancialAdvisor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Logs go to stderr so the conversation on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match AdvisorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Create a .env file with GROQ_API_KEY=<your key> or export it.");
            return Err(Box::new(e) as Box<dyn std::error::Error>);
        }
    };

    let mut advisor = FinancialAdvisor::new(config)?;
    info!(session_id = %advisor.conversation().session_id, "Session started");

    println!("Financial Advisor Bot");
    println!("Ask about loans, investments, retirement, budgets or stock prices.");
    println!("Type 'reset' to start over, 'exit' or 'quit' to leave.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_prompt();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.eq_ignore_ascii_case("reset") {
            advisor.reset();
            println!("Bot: Conversation cleared.\n");
            continue;
        }

        match advisor.process_query(query).await {
            AdvisorReply::Success {
                response,
                function_result,
                ..
            } => {
                println!("\nBot: {}", response);

                if let Some(result) = function_result {
                    println!("\n[Function Output]");
                    let rendered = serde_json::to_string_pretty(&result)?;
                    for line in rendered.lines() {
                        println!("  {}", line);
                    }
                }
                println!();
            }
            AdvisorReply::Error { message } => {
                error!(error = %message, "Query failed");
                println!("\nBot: Sorry, I couldn't process your request.\n");
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_prompt() {
    use std::io::Write;

    print!("You: ");
    let _ = std::io::stdout().flush();
}
