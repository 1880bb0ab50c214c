//! Streaming chat demo
//!
//! Streams one turn against the configured OpenAI-compatible endpoint and
//! prints text as it arrives.
//!
//! Run with: OPENAI_ACCESS_TOKEN=sk-... cargo run --example stream_chat -- "How much did I spend on coffee?"
//!
//! Set `AI_BASE_URL` to point at an OpenAI-compatible server such as Ollama,
//! and `RUST_LOG=tallyai_core=debug` to see transport logs.

use std::io::Write;
use tallyai_core::{config, ChatStreamChunk, ChatTurn, OpenAIProvider};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Give me one tip for sticking to a monthly budget.".to_string());
    let model = std::env::var("TALLYAI_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string());

    let config = config::from_env()?;
    let provider = OpenAIProvider::from_config(&config)?;

    let mut sink = |chunk: ChatStreamChunk| match chunk {
        ChatStreamChunk::OutputText(text) => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        ChatStreamChunk::Response(response) => {
            println!("\n\n[response {} from {}]", response.id, response.model);
        }
    };

    provider
        .chat_response(&ChatTurn::new(model, prompt), Some(&mut sink))
        .await?;

    Ok(())
}
