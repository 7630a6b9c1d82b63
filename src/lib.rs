pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod mode;
pub mod rag;
pub mod recording;
pub mod sentences;
pub mod session;
pub mod streaming;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::{ResponseConfig, Settings};
pub use error::ChatError;
pub use session::{ChatSession, TurnOutcome};
