// Library surface for headless/integration tests and reuse.
// Terminal rendering lives with the binary in main.rs.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod highlight;
pub mod runtime;
pub mod sample;
pub mod session;
pub mod stats;

pub use engine::{EngineError, InputOutcome, TypingTestEngine};
