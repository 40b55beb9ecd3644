//! LLM provider gateway for oitiva
//!
//! Normalizes calls across Claude, Gemini, OpenAI and Grok behind one
//! [`Gateway`], with a shared retry policy and token usage reporting.

pub mod claude;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod grok;
pub mod message;
pub mod models;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod settings;
pub mod transport;
pub mod usage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::LlmError;
pub use gateway::Gateway;
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use provider::{Adapter, CallOptions, Completion, ProviderAdapter, ProviderId};
pub use retry::RetryPolicy;
pub use settings::{ProviderConfig, ProviderSettings, Thinking, ThinkingLevel};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use usage::{TokenUsage, UsageSink};
