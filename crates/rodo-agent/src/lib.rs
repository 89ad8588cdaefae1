//! Agent side of the relay: the generation provider, prompt assembly,
//! market context and the per-message turn pipeline.

pub mod gemini;
pub mod market;
pub mod pipeline;
pub mod prompt;
pub mod provider;

pub use gemini::GeminiProvider;
pub use market::{MarketContextSource, MarketError, StaticMarketContext, StoreMarketContext};
pub use pipeline::{TurnError, TurnOrchestrator, TurnOutcome};
pub use prompt::PromptTemplate;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};
