use std::path::PathBuf;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::Router;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flashcards::api;
use flashcards::config::Config;
use flashcards::ingest;
use flashcards::llm::embeddings::embed_single;
use flashcards::llm::extract::{extract_from_image, generate_for_term, ModelError};
use flashcards::models::CandidateBatch;
use flashcards::state::AppState;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the study UI and HTTP API (default).
    Serve,
    /// Extract flashcards for the highlighted words in a photo.
    Extract {
        image: PathBuf,
        /// Save the extracted flashcards
        #[clap(short, long)]
        save: bool,
    },
    /// Generate a flashcard for a term.
    Generate {
        term: String,
        /// Save the generated flashcard
        #[clap(short, long)]
        save: bool,
    },
    /// List saved flashcards.
    List,
    /// Delete the flashcard for a term.
    Delete { term: String },
    /// Find saved flashcards closest in meaning to a query.
    Search {
        query: String,
        #[clap(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    tracing::info!("Collection: {}", config.collection_dir().display());

    let state = AppState::new(config)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::Extract { image, save } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let llm_config = state.llm_config.read().clone();
            let result = extract_from_image(
                &state.http_client,
                &llm_config,
                &state.config.languages,
                &bytes,
            )
            .await;
            print_and_save(&state, result, save).await
        }
        Command::Generate { term, save } => {
            let llm_config = state.llm_config.read().clone();
            let result =
                generate_for_term(&state.http_client, &llm_config, &state.config.languages, &term)
                    .await;
            print_and_save(&state, result, save).await
        }
        Command::List => {
            let cards = ingest::list_all(state.store.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&cards)?);
            Ok(())
        }
        Command::Delete { term } => {
            if ingest::delete(state.store.as_ref(), &term)? {
                println!("Deleted flashcard: {term}");
            } else {
                println!("No flashcard for: {term}");
            }
            Ok(())
        }
        Command::Search { query, limit } => {
            let llm_config = state.llm_config.read().clone();
            let embedding =
                embed_single(&state.http_client, &llm_config, &ingest::normalize(&query)).await?;
            let hits = state.store.search(&embedding, limit);
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }
    }
}

async fn print_and_save(
    state: &AppState,
    result: Result<CandidateBatch, ModelError>,
    save: bool,
) -> anyhow::Result<()> {
    let batch = match result {
        Ok(batch) => batch,
        Err(err) => {
            if let Some(raw) = err.raw() {
                eprintln!("Raw model reply:\n{raw}");
            }
            anyhow::bail!(err);
        }
    };
    println!("{}", serde_json::to_string_pretty(&batch)?);

    if save {
        let report = ingest::ingest(state.store.as_ref(), &state.embedder(), &batch).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let body_limit = state.config.max_image_bytes();
    {
        let llm = state.llm_config.read();
        tracing::info!("LLM provider: {} ({})", llm.provider, llm.base_url);
    }

    let app = Router::new()
        // Serve frontend
        .route("/", get(serve_index))
        // API routes
        .route("/api/extract", post(api::model::extract))
        .route("/api/generate", post(api::model::generate))
        .route("/api/flashcards", get(api::flashcards::list_flashcards))
        .route("/api/flashcards", post(api::flashcards::save_flashcards))
        .route("/api/flashcards/search", post(api::flashcards::search_flashcards))
        .route("/api/flashcards/{term}", delete(api::flashcards::delete_flashcard))
        .route("/api/sessions", post(api::sessions::create_session))
        .route("/api/sessions/{id}", get(api::sessions::get_session))
        .route("/api/sessions/{id}/actions", post(api::sessions::apply_action))
        .route("/api/sessions/{id}/save", post(api::sessions::save_pending))
        .route(
            "/api/config",
            get(api::config::get_config).put(api::config::update_config),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .fallback(get(serve_index));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}
