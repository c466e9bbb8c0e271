//! # flashcards
//!
//! A Rust web application that turns photographed book pages into
//! vocabulary flashcards and serves a small study UI.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐        ┌──────────────┐
//!   │  Page photo  │        │  Typed term  │
//!   └──────┬───────┘        └──────┬───────┘
//!          ▼                       ▼
//!   ┌─────────────────────────────────────┐
//!   │   LLM (JSON mode, vision for pages) │
//!   │   → {"flashcards": [...]}           │
//!   └──────────────────┬──────────────────┘
//!                      │ candidate batch
//!                      ▼
//!   ┌─────────────────────────────────────┐
//!   │   Ingestion                         │
//!   │   normalize → UUIDv5 → exists?      │
//!   │   stage new → embed → single insert │
//!   └──────────────────┬──────────────────┘
//!                      ▼
//!   ┌─────────────────────────────────────┐
//!   │   Vector store (one collection dir) │
//!   │   list / delete / similarity search │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dir, LLM and languages
//! - [`models`] - Shared data types: `Flashcard`, `CandidateBatch`, `StoredFlashcard`, reports
//! - [`ingest`] - Normalization, deterministic ids and the deduplicating ingestion pipeline
//! - [`store`] - `RecordStore` capability and the on-disk `VectorStore`
//! - [`llm::chat`] - JSON-mode chat calls with an inline image (Ollama or OpenAI-compatible)
//! - [`llm::extract`] - Page extraction and term generation with response validation
//! - [`llm::embeddings`] - Batch embedding generation for stored flashcards
//! - [`session`] - Study UI state machine
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod session;
pub mod state;
pub mod store;
