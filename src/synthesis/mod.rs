//! Natural-language to SQL synthesis.
//!
//! [`SqlSynthesizer`] validates a [`SynthesisRequest`](crate::models::SynthesisRequest),
//! renders the schema into a prompt, asks a [`CompletionProvider`] for SQL,
//! and screens the answer against a [`Denylist`] before returning it.

pub mod denylist;
pub mod prompt;
pub mod provider;
pub mod service;

pub use denylist::{DENIED_PATTERNS, Denylist};
pub use prompt::{build_prompt, describe_schema};
pub use provider::{CompletionProvider, OpenAiCompletionProvider};
pub use service::SqlSynthesizer;
