//! LLM provider abstraction layer
//!
//! Provider-agnostic request/response types, the shared retry policy, and
//! the Gemini and OpenAI-compatible backends.

pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::*;
pub use providers::*;
pub use retry::RetryPolicy;
