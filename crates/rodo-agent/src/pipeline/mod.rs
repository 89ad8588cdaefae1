//! Per-message turn pipeline.
//!
//! Channel handlers call `TurnOrchestrator::process_message` and only relay
//! the returned text through their own transport.

pub mod context;
pub mod process;

pub use context::{conversation_history, producer_context};
pub use process::{TurnError, TurnOrchestrator, TurnOutcome};
