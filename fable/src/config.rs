//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FABLE_CONFIG`
//! environment variable. A missing config file is fine; every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FABLE_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FABLE_STORY__MODEL=llama3-70b-8192` sets the `story.model` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! FABLE_PORT=8080
//!
//! # Point the story generator at a different chat-completion endpoint
//! FABLE_STORY__API_URL="http://localhost:9000/v1/chat/completions"
//!
//! # Use a different whisper model file
//! FABLE_TRANSCRIPTION__MODEL_PATH="models/ggml-small.bin"
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FABLE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Secret key for signing session cookies. Override in production.
    pub secret_key: String,
    /// Timeout applied to outbound requests to the hosted generation APIs
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Session cookie settings
    pub session: SessionConfig,
    /// Artifact and upload directory layout
    pub storage: StorageConfig,
    /// Story generation (chat-completion) API settings
    pub story: StoryConfig,
    /// Illustration (image generation) API settings
    pub illustration: IllustrationConfig,
    /// Local speech-to-text settings
    pub transcription: TranscriptionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            secret_key: "fable-dev-secret-change-me".to_string(),
            request_timeout: Duration::from_secs(120),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            story: StoryConfig::default(),
            illustration: IllustrationConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Name of the session cookie holding the signed credential token
    pub cookie_name: String,
    /// How long a credential session stays valid
    #[serde(with = "humantime_serde")]
    pub expiry: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "fable_session".to_string(),
            expiry: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Filesystem layout for artifacts.
///
/// `books_dir` is the flat directory holding both generated story text files
/// and generated image files. `upload_dir` holds transient voice recordings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub books_dir: PathBuf,
    /// Maximum accepted size of a generate request body in bytes. Uncompressed
    /// WAV runs around 10 MB per minute, so the default allows a few minutes
    /// of recording.
    pub max_upload_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            books_dir: PathBuf::from("books"),
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Chat-completion API settings for story generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoryConfig {
    /// Full URL of the chat-completion endpoint
    pub api_url: Url,
    /// Model identifier sent with every request
    pub model: String,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions"
                .parse()
                .expect("default story api_url is valid"),
            model: "llama3-8b-8192".to_string(),
        }
    }
}

/// Image generation API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IllustrationConfig {
    /// Full URL of the image generation endpoint
    pub api_url: Url,
    /// Requested output format, sent as a multipart field
    pub output_format: String,
}

impl Default for IllustrationConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.stability.ai/v2beta/stable-image/generate/core"
                .parse()
                .expect("default illustration api_url is valid"),
            output_format: "png".to_string(),
        }
    }
}

/// Local speech-to-text settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscriptionConfig {
    /// Path to the whisper GGML model file
    pub model_path: PathBuf,
    /// Spoken language hint ("en", "de", ...). None lets the model detect it.
    pub language: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: None,
        }
    }
}

impl Config {
    /// Load configuration from the YAML file named in `args`, with `FABLE_`
    /// environment variable overrides applied on top.
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("FABLE_").split("__"))
            .extract()
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
