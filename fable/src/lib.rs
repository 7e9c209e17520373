//! # fable: voice-to-storybook web service
//!
//! `fable` is a small web application that turns a voice recording or a
//! handful of story parameters into an illustrated children's story. A user
//! enters two hosted-API keys once per browser session, then submits either
//! an audio file or four free-text fields (hero, villain, theme, side
//! characters). The input becomes a natural-language prompt - by local
//! speech-to-text transcription or by filling a fixed sentence template -
//! which is sent to a hosted chat-completion API for the story text and to a
//! hosted image API for an illustration. Both artifacts land in a flat books
//! directory for later viewing and download.
//!
//! ## Request flow
//!
//! `POST /generate` is the one orchestration flow: the [`session::Credentials`]
//! extractor pulls the two API keys out of the signed session cookie
//! (redirecting to the credential-entry page when absent), the prompt is
//! built, the story is generated and persisted, the illustration is attempted
//! (failure tolerated), and the book page is rendered. Everything else is a
//! plain page render or a file lookup in the artifact directory.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. External calls go through two thin reqwest clients
//! ([`generation::StoryClient`], [`illustration::IllustrationClient`]) that
//! share one connection pool with a configured timeout. Speech-to-text runs
//! locally through whisper.cpp behind the [`transcribe::Transcriber`] trait,
//! gated on the default-on `local-stt` cargo feature. Pages render through
//! minijinja templates embedded at compile time. There is no database:
//! artifact existence is implied solely by presence in the books directory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use fable::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = fable::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     fable::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod generation;
pub mod illustration;
pub mod prompt;
pub mod session;
pub mod telemetry;
mod templates;
pub mod transcribe;

#[cfg(test)]
mod test;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

use crate::artifacts::ArtifactStore;
use crate::generation::StoryClient;
use crate::illustration::IllustrationClient;
use crate::transcribe::Transcriber;
pub use config::Config;

/// Application state shared across all request handlers.
///
/// Everything in here is cheap to clone: configuration, the artifact
/// directory handles, the two API clients (sharing one reqwest pool), the
/// transcriber, and the compiled template environment.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub artifacts: ArtifactStore,
    pub story: StoryClient,
    pub illustration: IllustrationClient,
    pub transcriber: Arc<dyn Transcriber>,
    pub templates: Arc<minijinja::Environment<'static>>,
}

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    // Voice recordings routinely exceed axum's 2MB default body cap
    let upload_limit = state.config.storage.max_upload_size;
    Router::new()
        .route(
            "/",
            get(api::handlers::keys::enter_keys_page).post(api::handlers::keys::submit_keys),
        )
        .route("/home", get(api::handlers::stories::home))
        .route(
            "/generate",
            post(api::handlers::stories::generate).layer(DefaultBodyLimit::max(upload_limit as usize)),
        )
        .route("/books/view", get(api::handlers::stories::view_saved))
        .route("/books/image/{filename}", get(api::handlers::stories::book_image))
        .route("/books/download/{filename}", get(api::handlers::stories::download))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the HTTP clients, prepares the
///    artifact directories, and assembles the router
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles requests
///    until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting fable with configuration: {:#?}", config);

        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;

        let artifacts = ArtifactStore::new(&config.storage);
        artifacts.ensure_dirs().await?;

        let story = StoryClient::new(http.clone(), &config.story);
        let illustration = IllustrationClient::new(http, &config.illustration);
        let transcriber = transcribe::create_transcriber(&config.transcription);
        let templates = Arc::new(templates::environment()?);

        let state = AppState::builder()
            .config(config.clone())
            .artifacts(artifacts)
            .story(story)
            .illustration(illustration)
            .transcriber(transcriber)
            .templates(templates)
            .build();

        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        let config = axum_test::TestServerConfig {
            save_cookies: true,
            ..Default::default()
        };
        axum_test::TestServer::new_with_config(self.router, config).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "fable listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
