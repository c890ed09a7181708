// ABOUTME: Interactive hydrology assistant on top of hydro-agent.
// ABOUTME: Reads questions from the terminal and streams the model's answers.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hydro_agent::prelude::*;

const SYSTEM_PROMPT: &str = "从现在起请你扮演一位水利专家与我对话";

async fn run_chat_loop(orchestrator: &Orchestrator, streaming: bool) -> Result<()> {
    let mut history = vec![Message::system(SYSTEM_PROMPT)];
    let mut rl = DefaultEditor::new()?;

    println!("Hydro Chat - Type 'quit' to exit.\n");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(_) => break,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        let _ = rl.add_history_entry(line);

        // On failure the turn is dropped and history stays as it was.
        match orchestrator.run(line, history.clone()).await {
            Ok(conv) => {
                let reply = conv.reply_or_apology().to_string();
                if streaming && conv.is_complete() {
                    println!("\n");
                } else {
                    println!("\n{}\n", reply);
                }
                let complete = conv.is_complete();
                history = conv.into_messages();
                if !complete {
                    tracing::warn!("turn ended without a reply");
                    history.push(Message::assistant(reply));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("\nError: {}\n", e);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydro_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let api = Arc::new(HydroApi::from_config(&config));
    let registry = Arc::new(hydro_registry(api)?);
    let client = Arc::new(OpenAIClient::from_config(&config));

    println!("Tools: {}\n", registry.names().join(", "));

    let orchestrator = Orchestrator::from_config(&config, client, registry).on_delta(|text| {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    });

    run_chat_loop(&orchestrator, config.stream).await
}
