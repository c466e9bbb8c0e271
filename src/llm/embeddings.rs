use std::future::Future;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Maximum bytes to send per text to the embedding API. Flashcard content is
/// a term and its translation, so this only trims pathological model output.
const MAX_EMBED_CHARS: usize = 2_000;

/// Turns flashcard content into vectors for the store.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

/// [`Embedder`] backed by the configured LLM provider.
pub struct LlmEmbedder {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmEmbedder {
    pub fn new(client: reqwest::Client, config: LlmConfig) -> Self {
        Self { client, config }
    }
}

impl Embedder for LlmEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embed_batch(&self.client, &self.config, texts).await
    }
}

/// Truncate `text` to at most `MAX_EMBED_CHARS` bytes, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    // Find the last char boundary at or before the limit
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Embed `texts` in one request to the configured provider.
///
/// Flashcard batches are small, so there is no chunking. The reply must hold
/// exactly one vector per input, in input order.
pub async fn embed_batch(
    client: &reqwest::Client,
    config: &LlmConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let inputs: Vec<&str> = texts.iter().map(|t| truncate_for_embedding(t)).collect();
    let vectors = match config.provider.as_str() {
        "ollama" => embed_ollama(client, config, &inputs).await?,
        "openai" => embed_openai(client, config, &inputs).await?,
        other => anyhow::bail!("Unknown LLM provider: {other}"),
    };

    if vectors.len() != texts.len() {
        anyhow::bail!(
            "Embedding API returned {} vectors for {} inputs",
            vectors.len(),
            texts.len()
        );
    }
    Ok(vectors)
}

/// Generate embedding for a single text.
pub async fn embed_single(
    client: &reqwest::Client,
    config: &LlmConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let results = embed_batch(client, config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .context("No embedding returned")
}

/// Request body shared by both providers.
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    /// Ollama only: trim over-long inputs instead of answering 400
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

/// Check the status and decode the JSON body of a provider reply.
async fn read_reply<T: DeserializeOwned>(resp: reqwest::Response, provider: &str) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("{provider} embed API returned {status}: {body}");
    }
    resp.json()
        .await
        .with_context(|| format!("Failed to parse {provider} embed response"))
}

// Ollama: POST /api/embed -> {"embeddings": [[..], ..]}

#[derive(Deserialize)]
struct OllamaEmbedReply {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &LlmConfig,
    inputs: &[&str],
) -> Result<Vec<Vec<f32>>> {
    let body = EmbedRequest {
        model: &config.embedding_model,
        input: inputs,
        truncate: Some(true),
    };
    let resp = client
        .post(format!("{}/api/embed", config.base_url))
        .json(&body)
        .send()
        .await
        .context("Failed to call Ollama embed API")?;

    let reply: OllamaEmbedReply = read_reply(resp, "Ollama").await?;
    Ok(reply.embeddings)
}

// OpenAI-compatible: POST /v1/embeddings -> {"data": [{"index", "embedding"}, ..]}

#[derive(Deserialize)]
struct OpenAiEmbedReply {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &LlmConfig,
    inputs: &[&str],
) -> Result<Vec<Vec<f32>>> {
    let body = EmbedRequest {
        model: &config.embedding_model,
        input: inputs,
        truncate: None,
    };
    let resp = client
        .post(format!("{}/v1/embeddings", config.base_url))
        .bearer_auth(config.api_key.as_deref().unwrap_or_default())
        .json(&body)
        .send()
        .await
        .context("Failed to call OpenAI embed API")?;

    let mut reply: OpenAiEmbedReply = read_reply(resp, "OpenAI").await?;
    // Entries carry their input position; order is not guaranteed
    reply.data.sort_by_key(|d| d.index);
    Ok(reply.data.into_iter().map(|d| d.embedding).collect())
}
