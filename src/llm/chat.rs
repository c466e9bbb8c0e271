//! Single-shot, JSON-mode chat completions with an optional inline image.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// An image attached to the user message.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    fn base64(&self) -> String {
        BASE64.encode(&self.data)
    }

    fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// Send a system instruction and a user message, asking the model to answer
/// with a JSON object. Returns the raw text of the reply.
pub async fn complete_json(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    image: Option<&InlineImage>,
) -> Result<String> {
    match config.provider.as_str() {
        "ollama" => call_ollama(client, config, system, user, image).await,
        "openai" => call_openai(client, config, system, user, image).await,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    format: &'static str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

fn ollama_request(
    config: &LlmConfig,
    system: &str,
    user: &str,
    image: Option<&InlineImage>,
) -> OllamaChatRequest {
    OllamaChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            OllamaMessage {
                role: "system".to_string(),
                content: system.to_string(),
                images: Vec::new(),
            },
            OllamaMessage {
                role: "user".to_string(),
                content: user.to_string(),
                images: image.map(|i| vec![i.base64()]).unwrap_or_default(),
            },
        ],
        format: "json",
        stream: false,
        options: OllamaOptions { temperature: 0.0 },
    }
}

async fn call_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    image: Option<&InlineImage>,
) -> Result<String> {
    let url = format!("{}/api/chat", config.base_url);
    let req = ollama_request(config, system, user, image);

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama chat API returned {status}: {body}");
    }

    let body: OllamaChatResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama chat response")?;
    Ok(body.message.content)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn openai_request(
    config: &LlmConfig,
    system: &str,
    user: &str,
    image: Option<&InlineImage>,
) -> OpenAiChatRequest {
    let user_content = match image {
        Some(image) => OpenAiContent::Parts(vec![
            OpenAiPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                },
            },
            OpenAiPart::Text {
                text: user.to_string(),
            },
        ]),
        None => OpenAiContent::Text(user.to_string()),
    };

    OpenAiChatRequest {
        model: config.chat_model.clone(),
        messages: vec![
            OpenAiMessage {
                role: "system".to_string(),
                content: OpenAiContent::Text(system.to_string()),
            },
            OpenAiMessage {
                role: "user".to_string(),
                content: user_content,
            },
        ],
        temperature: 0.0,
        response_format: ResponseFormat {
            kind: "json_object",
        },
    }
}

async fn call_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    system: &str,
    user: &str,
    image: Option<&InlineImage>,
) -> Result<String> {
    let url = format!("{}/v1/chat/completions", config.base_url);
    let api_key = config.api_key.as_deref().unwrap_or_default();
    let req = openai_request(config, system, user, image);

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI chat API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI chat API returned {status}: {body}");
    }

    let body: OpenAiChatResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI chat response")?;
    Ok(body
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> InlineImage {
        InlineImage {
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_openai_request_inlines_image_as_data_url() {
        let req = openai_request(&LlmConfig::default(), "sys", "look", Some(&image()));
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["content"], "sys");
        let parts = &json["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,AQID");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "look");
    }

    #[test]
    fn test_openai_request_text_only() {
        let req = openai_request(&LlmConfig::default(), "sys", "chat", None);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][1]["content"], "chat");
    }

    #[test]
    fn test_ollama_request_attaches_base64_image() {
        let req = ollama_request(&LlmConfig::default(), "sys", "look", Some(&image()));
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["format"], "json");
        assert_eq!(json["stream"], false);
        assert!(json["messages"][0].get("images").is_none());
        assert_eq!(json["messages"][1]["images"][0], "AQID");
    }
}
