pub mod api_types;
pub mod client;
pub mod engine;
pub mod filter;
pub mod openrouter;
pub mod prompts;

pub use client::{CompletionClient, CompletionError, MockClient};
pub use engine::{ReplyEngine, TurnContext};
pub use openrouter::OpenRouterClient;
