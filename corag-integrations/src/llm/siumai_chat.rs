//! Siumai-backed chat completion.

use async_trait::async_trait;

use corag_core::{
    traits::{ChatModel, CompletionOptions},
    CoragError, Result,
};

use siumai::prelude::*;

/// A chat model client backed by the siumai provider interface.
///
/// One instance wraps one configured model; the failover pool in
/// `corag-query` composes several of these. Sampling parameters are
/// applied where the provider supports them at client construction
/// (`.temperature(..)`, `.max_tokens(..)` on the siumai builder); the
/// per-call [`CompletionOptions`] are advisory for this adapter.
///
/// # Examples
///
/// ```rust,no_run
/// use corag_integrations::llm::SiumaiChatModel;
/// use siumai::prelude::*;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Siumai::builder()
///     .openai()
///     .api_key("your-api-key")
///     .model("gpt-4o-mini")
///     .temperature(0.3)
///     .build()
///     .await?;
///
/// let model = SiumaiChatModel::new(client, "gpt-4o-mini");
/// # Ok(())
/// # }
/// ```
pub struct SiumaiChatModel {
    client: Siumai,
    model: String,
}

impl std::fmt::Debug for SiumaiChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiumaiChatModel")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl SiumaiChatModel {
    /// Create an adapter over a configured siumai client.
    pub fn new<S: Into<String>>(client: Siumai, model: S) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatModel for SiumaiChatModel {
    async fn complete(&self, prompt: &str, _options: &CompletionOptions) -> Result<String> {
        let messages = vec![ChatMessage::user(prompt).build()];

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| CoragError::llm(format!("siumai chat failed: {e}")))?;

        match &response.content {
            siumai::MessageContent::Text(text) => Ok(text.clone()),
            _ => Err(CoragError::llm(
                "unsupported content type in LLM response",
            )),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
