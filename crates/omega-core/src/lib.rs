//! omega-core — Omega AI Task API core library.
//! Shared pieces for the gateway: config, errors, bearer tokens, the answer
//! store, the generation client, and the task dispatcher.

pub mod answer_store;
pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod tasks;
pub mod tool;

pub use answer_store::{AnswerRow, AnswerStore};
pub use auth::TokenSigner;
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use generation::{GenerationBackend, MockBackend, OpenAiBackend};
pub use tasks::{TaskDispatcher, TaskOutcome, TaskRequest};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
