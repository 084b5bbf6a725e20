//! Simple test for DeepSeekGateway chat completion.
//!
//! Run with: cargo run -p deepseek-brain --example test_chat
//! Or with a custom message: cargo run -p deepseek-brain --example test_chat -- "Tu mensaje"
//!
//! Make sure to set environment variables in .env:
//!   DEEPSEEK_API_KEY - DeepSeek API key for authentication

use deepseek_brain::{ChatGateway, ChatMessage, CompletionRequest, DeepSeekGateway};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Get message from command line args or use default
    let args: Vec<String> = env::args().collect();
    let message_text = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        "Hola, responde con un saludo breve.".to_string()
    };

    println!("Initializing DeepSeekGateway...");
    let gateway = DeepSeekGateway::from_env()?;

    println!("Gateway initialized: {}", gateway.name());
    println!("API URL: {}", gateway.config().api_url);
    println!("Model: {}", gateway.config().model);
    println!("Timeout: {:?}", gateway.config().timeout);
    println!();

    let request = CompletionRequest::new(vec![
        ChatMessage::system("Eres la recepcionista de una clínica dental. Responde en español."),
        ChatMessage::user(&message_text),
    ]);

    println!("Sending: \"{}\"", message_text);
    println!("Waiting for response...\n");

    let completion = gateway.complete(request).await?;

    println!("=== Response ===");
    println!("{}", completion.text_content().unwrap_or("(empty)"));
    println!("================");

    Ok(())
}
