//! whisper.cpp transcription backend.
//!
//! Decodes WAV input via `hound`, converts to 16kHz mono f32 samples, and
//! runs whisper.cpp through `whisper-rs`. The model is loaded per call, so
//! the server starts without the model file present; the first voice upload
//! pays the load cost.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{TranscribeError, Transcriber};
use crate::config::TranscriptionConfig;

/// Sample rate whisper.cpp expects
const WHISPER_SAMPLE_RATE: u32 = 16_000;

pub struct WhisperTranscriber {
    model_path: PathBuf,
    language: Option<String>,
}

impl WhisperTranscriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            model_path: config.model_path.clone(),
            language: config.language.clone(),
        }
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, TranscribeError> {
        let samples = decode_wav(audio_path)?;
        debug!(
            samples = samples.len(),
            path = %audio_path.display(),
            "Decoded voice recording"
        );

        let model_path = self.model_path.to_str().ok_or_else(|| TranscribeError::Model {
            message: format!("model path is not valid UTF-8: {}", self.model_path.display()),
        })?;
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default()).map_err(|e| {
            TranscribeError::Model {
                message: format!("{} ({})", e, self.model_path.display()),
            }
        })?;
        let mut state = ctx.create_state().map_err(|e| TranscribeError::Inference {
            message: format!("create state: {e}"),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if let Some(language) = &self.language {
            params.set_language(Some(language));
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state.full(params, &samples).map_err(|e| TranscribeError::Inference {
            message: format!("run model: {e}"),
        })?;

        let num_segments = state.full_n_segments().map_err(|e| TranscribeError::Inference {
            message: format!("read segment count: {e}"),
        })?;
        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state.full_get_segment_text(i).map_err(|e| TranscribeError::Inference {
                message: format!("read segment {i}: {e}"),
            })?;
            text.push_str(&segment);
        }

        let text = text.trim().to_string();
        info!(segments = num_segments, chars = text.len(), "Transcription complete");
        Ok(text)
    }
}

/// Decode a WAV file into 16kHz mono f32 samples.
fn decode_wav(path: &Path) -> Result<Vec<f32>, TranscribeError> {
    let audio_error = |e: hound::Error| TranscribeError::Audio { message: e.to_string() };

    let mut reader = hound::WavReader::open(path).map_err(audio_error)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>().map_err(audio_error)?,
        hound::SampleFormat::Int => {
            let ints: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>().map_err(audio_error)?;
            let mut floats = vec![0.0f32; ints.len()];
            whisper_rs::convert_integer_to_float_audio(&ints, &mut floats).map_err(|e| TranscribeError::Audio {
                message: format!("integer conversion: {e}"),
            })?;
            floats
        }
    };

    let mono = match spec.channels {
        1 => samples,
        2 => whisper_rs::convert_stereo_to_mono_audio(&samples).map_err(|e| TranscribeError::Audio {
            message: format!("stereo downmix: {e}"),
        })?,
        n => {
            return Err(TranscribeError::Audio {
                message: format!("unsupported channel count: {n}"),
            });
        }
    };

    Ok(resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE))
}

/// Linear-interpolation resample. Identity when rates already match.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;
        let a = samples[idx];
        let b = samples.get(idx + 1).copied().unwrap_or(a);
        out.push(a + (b - a) * frac);
    }
    out
}
