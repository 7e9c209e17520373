//! Speech-to-text transcription.
//!
//! Provides local transcription using whisper.cpp via the `whisper-rs` crate,
//! behind the [`Transcriber`] trait. The whisper implementation is gated on
//! the default-on `local-stt` feature; without it, voice uploads fail with a
//! descriptive error while the rest of the application works normally.

#[cfg(feature = "local-stt")]
pub mod whisper;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error as ThisError;

use crate::config::TranscriptionConfig;

#[derive(ThisError, Debug)]
pub enum TranscribeError {
    #[error("local speech-to-text is not compiled in (enable the `local-stt` feature)")]
    Disabled,

    #[error("failed to load speech model: {message}")]
    Model { message: String },

    #[error("failed to decode audio: {message}")]
    Audio { message: String },

    #[error("transcription failed: {message}")]
    Inference { message: String },
}

/// Trait for speech-to-text implementations.
///
/// Transcription is synchronous and CPU-bound; callers on the async runtime
/// run it via `spawn_blocking`.
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio_path` to text
    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscribeError>;
}

/// Factory function to create the configured transcriber
pub fn create_transcriber(config: &TranscriptionConfig) -> Arc<dyn Transcriber> {
    #[cfg(feature = "local-stt")]
    {
        Arc::new(whisper::WhisperTranscriber::new(config))
    }
    #[cfg(not(feature = "local-stt"))]
    {
        let _ = config;
        Arc::new(DisabledTranscriber)
    }
}

#[cfg(not(feature = "local-stt"))]
struct DisabledTranscriber;

#[cfg(not(feature = "local-stt"))]
impl Transcriber for DisabledTranscriber {
    fn transcribe(&self, _audio_path: &Path) -> Result<String, TranscribeError> {
        Err(TranscribeError::Disabled)
    }
}

/// Transcriber returning a canned string, for handler tests.
#[cfg(test)]
pub(crate) struct FixedTranscriber(pub String);

#[cfg(test)]
impl Transcriber for FixedTranscriber {
    fn transcribe(&self, _audio_path: &Path) -> Result<String, TranscribeError> {
        Ok(self.0.clone())
    }
}
