//! Oracle adapters backed by a chat completions API

pub mod openai;
pub mod prompt;

pub use openai::{OpenAiConfig, OpenAiOracle};
pub use prompt::PromptBuilder;
