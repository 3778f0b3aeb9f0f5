//! Recap generation through the Anthropic Messages API.

use async_trait::async_trait;
use rinkside_core::recap::{parse_recap_answer, Recap, RecapRequest, RecapWriter};
use rinkside_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{read_json, transport};

const SERVICE: &str = "Anthropic API";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1500;
const TEMPERATURE: f32 = 0.7;

pub struct AnthropicRecapWriter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicRecapWriter {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl RecapWriter for AnthropicRecapWriter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn write(&self, request: &RecapRequest) -> Result<Recap> {
        let prompt = request.prompt();
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.model, "Requesting recap");
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let answer: MessagesResponse = read_json(SERVICE, response).await?;

        let text: String = answer
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(Error::Malformed(format!("{}: answer has no text", SERVICE)));
        }

        parse_recap_answer(&text)
    }
}
