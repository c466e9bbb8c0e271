use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use crate::config::{Config, LlmConfig};
use crate::llm::embeddings::LlmEmbedder;
use crate::session::SessionStore;
use crate::store::VectorStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<VectorStore>,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub http_client: reqwest::Client,
    pub llm_config: Arc<RwLock<LlmConfig>>,
    pub model_semaphore: Arc<tokio::sync::Semaphore>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = VectorStore::open_or_create(&config.collection_dir())?;

        let llm_config = config.llm.clone();
        let max_sessions = config.max_sessions;

        Ok(Self {
            config,
            store: Arc::new(store),
            sessions: Arc::new(Mutex::new(SessionStore::new(max_sessions))),
            http_client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            llm_config: Arc::new(RwLock::new(llm_config)),
            model_semaphore: Arc::new(tokio::sync::Semaphore::new(3)),
        })
    }

    /// Embedder for the LLM config currently in effect.
    pub fn embedder(&self) -> LlmEmbedder {
        LlmEmbedder::new(self.http_client.clone(), self.llm_config.read().clone())
    }
}
