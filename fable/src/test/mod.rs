//! Handler-level tests over the full router, with wiremock standing in for
//! the two hosted APIs and a fixed transcriber standing in for whisper.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestServer, TestServerConfig};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::artifacts::ArtifactStore;
use crate::config::{Config, IllustrationConfig, StorageConfig, StoryConfig};
use crate::generation::{STORY_ERROR_SENTINEL, StoryClient};
use crate::illustration::IllustrationClient;
use crate::transcribe::FixedTranscriber;
use crate::{AppState, build_router, templates};

const TRANSCRIBED_PROMPT: &str = "a story about a fox told aloud";

/// reqwest's `rustls-no-provider` feature leaves installing the crypto
/// provider to the binary; `main` does it on startup, tests do it here.
#[ctor::ctor]
fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

struct TestApp {
    server: TestServer,
    story_api: MockServer,
    image_api: MockServer,
    books_dir: PathBuf,
    _tmp: TempDir,
}

async fn spawn_app() -> TestApp {
    let story_api = MockServer::start().await;
    let image_api = MockServer::start().await;
    let tmp = TempDir::new().expect("tempdir");

    let config = Config {
        secret_key: "integration-test-secret".to_string(),
        storage: StorageConfig {
            upload_dir: tmp.path().join("uploads"),
            books_dir: tmp.path().join("books"),
            ..Default::default()
        },
        story: StoryConfig {
            api_url: format!("{}/v1/chat/completions", story_api.uri()).parse().unwrap(),
            model: "llama3-8b-8192".to_string(),
        },
        illustration: IllustrationConfig {
            api_url: image_api.uri().parse().unwrap(),
            output_format: "png".to_string(),
        },
        ..Default::default()
    };

    let artifacts = ArtifactStore::new(&config.storage);
    artifacts.ensure_dirs().await.expect("artifact dirs");

    let http = reqwest::Client::new();
    let state = AppState::builder()
        .config(config.clone())
        .artifacts(artifacts)
        .story(StoryClient::new(http.clone(), &config.story))
        .illustration(IllustrationClient::new(http, &config.illustration))
        .transcriber(Arc::new(FixedTranscriber(TRANSCRIBED_PROMPT.to_string())))
        .templates(Arc::new(templates::environment().expect("templates")))
        .build();

    let server_config = TestServerConfig {
        save_cookies: true,
        ..Default::default()
    };
    let server = TestServer::new_with_config(build_router(state), server_config).expect("test server");

    TestApp {
        server,
        story_api,
        image_api,
        books_dir: tmp.path().join("books"),
        _tmp: tmp,
    }
}

/// Submit the credential form so the session cookie is saved on the server
async fn enter_keys(app: &TestApp) {
    let response = app
        .server
        .post("/")
        .form(&[("story_key", "gsk_test"), ("image_key", "sk_test")])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/home");
}

async fn mount_story_success(app: &TestApp, story: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": story}}]
        })))
        .mount(&app.story_api)
        .await;
}

async fn mount_image_success(app: &TestApp) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fake image bytes".to_vec()))
        .mount(&app.image_api)
        .await;
}

fn story_files(app: &TestApp) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(&app.books_dir)
        .unwrap()
        .filter_map(|e| e.unwrap().file_name().into_string().ok())
        .filter(|n| n.ends_with(".txt"))
        .collect();
    names.sort();
    names
}

fn image_files(app: &TestApp) -> Vec<String> {
    std::fs::read_dir(&app.books_dir)
        .unwrap()
        .filter_map(|e| e.unwrap().file_name().into_string().ok())
        .filter(|n| n.ends_with(".png"))
        .collect()
}

/// Boot through `Application::new` so the production wiring is covered too.
async fn spawn_full_application() -> (TestServer, TempDir) {
    let tmp = TempDir::new().expect("tempdir");
    let config = Config {
        storage: StorageConfig {
            upload_dir: tmp.path().join("uploads"),
            books_dir: tmp.path().join("books"),
            ..Default::default()
        },
        ..Default::default()
    };
    let app = crate::Application::new(config).await.expect("application boots");
    (app.into_test_server(), tmp)
}

#[test_log::test(tokio::test)]
async fn test_credential_page_renders() {
    let (server, _tmp) = spawn_full_application().await;

    let response = server.get("/").await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("story_key"));
    assert!(body.contains("image_key"));
}

#[test_log::test(tokio::test)]
async fn test_key_entry_sets_session_and_unlocks_home() {
    let app = spawn_app().await;
    enter_keys(&app).await;

    let response = app.server.get("/home").await;
    response.assert_status_ok();
    assert!(response.text().contains("/generate"));
}

#[test_log::test(tokio::test)]
async fn test_generate_without_credentials_redirects_to_key_entry() {
    let app = spawn_app().await;

    let form = MultipartForm::new().add_text("hero", "Mia");
    let response = app.server.post("/generate").multipart(form).await;

    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/");
    // No story or image work happened
    assert!(story_files(&app).is_empty());
    assert_eq!(app.story_api.received_requests().await.unwrap().len(), 0);
}

#[test_log::test(tokio::test)]
async fn test_generate_from_fields_produces_story_and_image() {
    let app = spawn_app().await;
    mount_story_success(&app, "The Brave Fox!\nOnce upon a time, a fox found her courage.").await;
    mount_image_success(&app).await;
    enter_keys(&app).await;

    let form = MultipartForm::new()
        .add_text("hero", "Mia")
        .add_text("villain", "Shadow")
        .add_text("nature", "courage")
        .add_text("side", "two mice");
    let response = app.server.post("/generate").multipart(form).await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("Once upon a time, a fox found her courage."));
    assert!(body.contains(r#"src="/books/image/"#));

    // The prompt was the literal template fill
    let requests = app.story_api.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let chat_body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        chat_body["messages"][0]["content"],
        "Write a children's story with hero: Mia, villain: Shadow, theme: courage, side characters: two mice."
    );

    // Both artifacts are on disk
    assert_eq!(story_files(&app), vec!["The_Brave_Fox.txt".to_string()]);
    assert_eq!(image_files(&app).len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_generate_from_voice_uses_transcription_as_prompt() {
    let app = spawn_app().await;
    mount_story_success(&app, "A Fox Abroad\nThe fox packed her bag.").await;
    mount_image_success(&app).await;
    enter_keys(&app).await;

    let voice = Part::bytes(b"RIFF fake wav bytes".to_vec())
        .file_name("recording.wav")
        .mime_type("audio/wav");
    let form = MultipartForm::new()
        .add_part("voice", voice)
        // The recording wins even when fields are also present
        .add_text("hero", "ignored");
    let response = app.server.post("/generate").multipart(form).await;
    response.assert_status_ok();

    let requests = app.story_api.received_requests().await.unwrap();
    let chat_body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(chat_body["messages"][0]["content"], TRANSCRIBED_PROMPT);
}

#[test_log::test(tokio::test)]
async fn test_generate_accepts_multi_megabyte_voice_upload() {
    let app = spawn_app().await;
    mount_story_success(&app, "The Long Tale\nIt went on and on.").await;
    mount_image_success(&app).await;
    enter_keys(&app).await;

    // A few minutes of uncompressed WAV; well past the 2MB axum default
    let voice = Part::bytes(vec![0u8; 3 * 1024 * 1024])
        .file_name("long-recording.wav")
        .mime_type("audio/wav");
    let form = MultipartForm::new().add_part("voice", voice);
    let response = app.server.post("/generate").multipart(form).await;
    response.assert_status_ok();

    let requests = app.story_api.received_requests().await.unwrap();
    let chat_body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(chat_body["messages"][0]["content"], TRANSCRIBED_PROMPT);
}

#[test_log::test(tokio::test)]
async fn test_image_refusal_still_renders_story() {
    let app = spawn_app().await;
    mount_story_success(&app, "The Lonely Page\nNo picture today.").await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(402).set_body_string("payment required"))
        .mount(&app.image_api)
        .await;
    enter_keys(&app).await;

    let form = MultipartForm::new().add_text("hero", "Mia");
    let response = app.server.post("/generate").multipart(form).await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("No picture today."));
    assert!(!body.contains("<img"));
    assert!(image_files(&app).is_empty());
    // The story artifact still exists
    assert_eq!(story_files(&app), vec!["The_Lonely_Page.txt".to_string()]);
}

#[test_log::test(tokio::test)]
async fn test_story_api_failure_degrades_to_sentinel_text() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&app.story_api)
        .await;
    mount_image_success(&app).await;
    enter_keys(&app).await;

    let form = MultipartForm::new().add_text("hero", "Mia");
    let response = app.server.post("/generate").multipart(form).await;
    response.assert_status_ok();

    assert!(response.text().contains(STORY_ERROR_SENTINEL));
}

#[test_log::test(tokio::test)]
async fn test_gallery_and_download_roundtrip() {
    let app = spawn_app().await;
    mount_story_success(&app, "The Brave Fox!\nOnce upon a time.").await;
    mount_image_success(&app).await;
    enter_keys(&app).await;

    let form = MultipartForm::new().add_text("hero", "Mia");
    app.server.post("/generate").multipart(form).await.assert_status_ok();

    // Gallery lists the story but not the image artifact
    let gallery = app.server.get("/books/view").await;
    gallery.assert_status_ok();
    let gallery_body = gallery.text();
    assert!(gallery_body.contains("The_Brave_Fox.txt"));
    assert!(!gallery_body.contains(".png"));

    // Download returns the full story text as an attachment
    let download = app.server.get("/books/download/The_Brave_Fox.txt").await;
    download.assert_status_ok();
    assert!(download.header("content-disposition").to_str().unwrap().contains("attachment"));
    assert_eq!(download.text(), "The Brave Fox!\nOnce upon a time.");

    // The image serves inline with an image content type
    let image_name = image_files(&app).pop().unwrap();
    let image = app.server.get(&format!("/books/image/{image_name}")).await;
    image.assert_status_ok();
    assert_eq!(image.header("content-type"), "image/png");
}

#[test_log::test(tokio::test)]
async fn test_download_rejects_missing_and_unsafe_names() {
    let app = spawn_app().await;

    let missing = app.server.get("/books/download/no-such-book.txt").await;
    missing.assert_status(StatusCode::NOT_FOUND);

    let unsafe_name = app.server.get("/books/download/..%2Fsecret.txt").await;
    assert!(
        unsafe_name.status_code() == StatusCode::BAD_REQUEST || unsafe_name.status_code() == StatusCode::NOT_FOUND,
        "unexpected status {}",
        unsafe_name.status_code()
    );
}

#[test_log::test(tokio::test)]
async fn test_healthz() {
    let (server, _tmp) = spawn_full_application().await;
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}
