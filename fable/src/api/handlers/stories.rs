//! The story pipeline: generate form, the generate action itself, and
//! artifact viewing/download.
//!
//! `generate` is the one orchestration flow in the application:
//! prompt (voice transcription or template fill) → story generation →
//! story artifact → illustration (failure tolerated) → rendered book page.

use axum::{
    extract::{Multipart, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use bytes::Bytes;
use minijinja::context;
use tracing::{error, info, instrument};

use crate::errors::{Error, Result};
use crate::generation::STORY_ERROR_SENTINEL;
use crate::prompt::{self, StoryFields};
use crate::session::Credentials;
use crate::{AppState, templates};

/// `GET /home` - render the generate form
pub async fn home(State(state): State<AppState>) -> Result<impl IntoResponse> {
    templates::render(&state.templates, "index.html", context! {})
}

/// The parsed generate form: an optional voice recording plus the four
/// optional template fields.
#[derive(Default)]
struct GenerateForm {
    voice: Option<(String, Bytes)>,
    fields: StoryFields,
}

/// Collect the multipart fields of a generate request.
///
/// Unknown fields are ignored. The voice part only counts when the browser
/// sent an actual file (non-empty filename).
async fn parse_generate_form(mut multipart: Multipart) -> Result<GenerateForm> {
    let mut form = GenerateForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to parse multipart data: {e}"),
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "voice" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(|e| Error::BadRequest {
                    message: format!("Failed to read voice upload: {e}"),
                })?;
                if !filename.is_empty() {
                    form.voice = Some((filename, data));
                }
            }
            "hero" => form.fields.hero = Some(read_text(field).await?),
            "villain" => form.fields.villain = Some(read_text(field).await?),
            "nature" => form.fields.nature = Some(read_text(field).await?),
            "side" => form.fields.side = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field.text().await.map_err(|e| Error::BadRequest {
        message: format!("Failed to read form field: {e}"),
    })
}

/// `POST /generate` - run the full request-to-artifact pipeline.
///
/// Requires session credentials; the [`Credentials`] extractor redirects to
/// the credential-entry page otherwise. Illustration failure degrades to a
/// story-only page; a story API failure degrades to the sentinel story text.
/// Transcription and filesystem failures propagate as server errors.
#[instrument(skip_all)]
pub async fn generate(
    State(state): State<AppState>,
    credentials: Credentials,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = parse_generate_form(multipart).await?;

    // 1. Build the prompt: transcribed voice wins over the template fields
    let prompt = if let Some((filename, data)) = form.voice {
        let path = state.artifacts.save_upload(&filename, &data).await?;
        info!(upload = %path.display(), "Transcribing voice recording");
        let transcriber = state.transcriber.clone();
        tokio::task::spawn_blocking(move || transcriber.transcribe(&path))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join transcription task: {e}"),
            })??
    } else {
        prompt::build_prompt(&form.fields)
    };

    // 2. Generate the story. Upstream failures degrade to the sentinel text
    //    so the page still renders; the error detail is already logged.
    let story = match state.story.generate(&prompt, &credentials.story_key).await {
        Ok(story) => story,
        Err(e @ Error::Upstream { .. }) => {
            error!("Story generation failed, rendering sentinel text: {:#}", e);
            STORY_ERROR_SENTINEL.to_string()
        }
        Err(e) => return Err(e),
    };

    // 3. Persist the story artifact
    let story_filename = state.artifacts.save_story(&story).await?;

    // 4. Generate the illustration; a refusal means no image, not a failure
    let image = match state.illustration.generate(&prompt, &credentials.image_key).await? {
        Some(bytes) => {
            let name = state
                .artifacts
                .save_image(&bytes, &state.config.illustration.output_format)
                .await?;
            Some(name)
        }
        None => None,
    };

    info!(
        story = %story_filename,
        image = image.as_deref().unwrap_or("<none>"),
        "Storybook generated"
    );

    let image_url = image.map(|name| format!("/books/image/{name}"));
    templates::render(
        &state.templates,
        "book.html",
        context! {
            story => story,
            story_filename => story_filename,
            image_url => image_url,
        },
    )
}

/// `GET /books/view` - gallery page listing saved stories
pub async fn view_saved(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let books = state.artifacts.list_stories().await?;
    templates::render(&state.templates, "saved.html", context! { books => books })
}

/// `GET /books/image/{filename}` - serve an artifact inline
pub async fn book_image(State(state): State<AppState>, Path(filename): Path<String>) -> Result<impl IntoResponse> {
    let data = state.artifacts.read_book(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok(([(CONTENT_TYPE, mime.to_string())], data))
}

/// `GET /books/download/{filename}` - serve an artifact as a download
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Result<impl IntoResponse> {
    let data = state.artifacts.read_book(&filename).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok((
        [
            (CONTENT_TYPE, mime.to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        data,
    ))
}
