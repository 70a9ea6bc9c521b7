pub mod assistant;
pub mod openai;
pub mod provider;

pub use assistant::{Assistant, ChatReply, Suggestions};
pub use openai::OpenAiProvider;
pub use provider::{
    ChatMessage, ChatRequest, ChatResponse, LlmProvider, ProviderError, Role, UnconfiguredProvider,
};
