//! Turning brain-dump text into individual task contents.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Split `text` into task contents. Never fails: when in doubt the whole
    /// text becomes one task.
    async fn decompose(&self, text: &str) -> Vec<String>;
}

/// Splits on line breaks and semicolons, dropping list bullets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitDecomposer;

#[async_trait]
impl Decomposer for SplitDecomposer {
    async fn decompose(&self, text: &str) -> Vec<String> {
        split_items(text)
    }
}

fn split_items(text: &str) -> Vec<String> {
    text.split(|c: char| c == '\n' || c == ';')
        .map(|item| {
            item.trim()
                .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'))
                .trim()
        })
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

const SYSTEM_PROMPT: &str = "Split the user's notes into short, concrete to-do items. \
Reply with a JSON array of strings and nothing else.";

/// Asks an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatDecomposer {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl ChatDecomposer {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = client_or_fallback(
            reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build(),
        );
        Self {
            url: url.into(),
            model: model.into(),
            client,
        }
    }

    async fn ask(&self, text: &str) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": text },
                ],
                "temperature": 0.3,
                "stream": false,
            }))
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion has no choices"))?;

        parse_item_list(&content)
    }
}

/// Use the configured client, or a default one without the request timeout.
fn client_or_fallback<E: std::fmt::Display>(built: Result<reqwest::Client, E>) -> reqwest::Client {
    built.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "decomposer client build failed, requests have no timeout");
        reqwest::Client::new()
    })
}

#[async_trait]
impl Decomposer for ChatDecomposer {
    async fn decompose(&self, text: &str) -> Vec<String> {
        match self.ask(text).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => vec![text.trim().to_string()],
            Err(e) => {
                tracing::warn!(error = %e, "decomposer failed, keeping text as one task");
                vec![text.trim().to_string()]
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Parse a JSON array of items, tolerating a surrounding markdown code fence.
fn parse_item_list(raw: &str) -> anyhow::Result<Vec<String>> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let values: Vec<serde_json::Value> = serde_json::from_str(cleaned.trim())?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn split_on_semicolons_and_lines() {
        let items = SplitDecomposer
            .decompose("buy milk; call bank\n- book dentist\n\n")
            .await;
        assert_eq!(items, vec!["buy milk", "call bank", "book dentist"]);
    }

    #[tokio::test]
    async fn blank_text_yields_nothing() {
        assert!(SplitDecomposer.decompose(" ;\n ").await.is_empty());
    }

    #[test]
    fn parses_fenced_json() {
        let items = parse_item_list("```json\n[\"Buy milk\", \"Call bank\"]\n```").unwrap();
        assert_eq!(items, vec!["Buy milk", "Call bank"]);
    }

    #[test]
    fn rejects_prose() {
        assert!(parse_item_list("Here is your list: buy milk").is_err());
    }

    #[test]
    fn failed_client_build_falls_back_to_a_default_client() {
        let client = client_or_fallback(Err::<reqwest::Client, _>("no TLS backend"));
        assert!(client.get("http://127.0.0.1:9/").build().is_ok());
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_whole_text() {
        let decomposer = ChatDecomposer::new("http://127.0.0.1:9/v1/chat/completions", "test");
        let items = decomposer.decompose("  buy milk and call bank ").await;
        assert_eq!(items, vec!["buy milk and call bank"]);
    }
}
