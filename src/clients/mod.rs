//! HTTP clients for the external model services.

pub mod completion;
pub mod embedding;

pub use completion::{CompletionClient, OpenAiCompletion};
pub use embedding::{embed_with_retries, Embedder, OpenAiEmbedder, RetryPolicy};
