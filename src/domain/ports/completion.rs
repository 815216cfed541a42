//! Text completion provider port.

use anyhow::Result;
use async_trait::async_trait;

/// A natural-language synthesis backend used by handlers that need it.
///
/// The engine never interprets the returned text; provider errors surface
/// only as "handler returned an error" and follow the normal retry path.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce a completion for the given prompt.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
