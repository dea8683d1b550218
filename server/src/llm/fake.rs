//! Scripted provider for tests: canned replies keyed on prompt fragments.

use super::{CompletionRequest, LlmError, LlmProvider};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Replies to a request with the first rule whose fragment appears in the prompt
/// (case-insensitive), else the fallback. Keeps a log of every request it saw.
#[derive(Debug, Default)]
pub struct FakeProvider {
    rules: Mutex<Vec<(String, String)>>,
    fallback: Option<String>,
    seen: Mutex<Vec<CompletionRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(prompt_contains, response);
        provider
    }

    /// Rules are tried in insertion order.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        lock(&self.rules).push((prompt_contains.to_lowercase(), response.to_string()));
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.fallback = Some(response.to_string());
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        lock(&self.seen).push(request.clone());

        let prompt = request.prompt_text().to_lowercase();
        let matched = lock(&self.rules)
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());

        matched.or_else(|| self.fallback.clone()).ok_or_else(|| {
            let preview: String = prompt.chars().take(80).collect();
            LlmError::RequestFailed(format!("no scripted reply for prompt: {}", preview))
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user_text(text)],
            max_tokens: 100,
            response_schema: None,
            parse_pdfs: false,
        }
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let provider = FakeProvider::with_response("TARTE", "tarte");
        provider.add_response("tarte aux pommes", "pommes");
        let reply = provider
            .complete(&request("Une tarte aux pommes"))
            .await
            .unwrap();
        assert_eq!(reply, "tarte");
    }

    #[tokio::test]
    async fn test_unscripted_prompt_fails() {
        let provider = FakeProvider::new();
        assert!(provider.complete(&request("Risotto")).await.is_err());
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_reply() {
        let provider = FakeProvider::new().with_default_response("{}");
        let reply = provider.complete(&request("Risotto")).await.unwrap();
        assert_eq!(reply, "{}");
        assert_eq!(provider.requests()[0].prompt_text(), "Risotto");
    }
}
