use serde::Deserialize;

/// Credential-entry form body (`POST /`)
#[derive(Debug, Deserialize)]
pub struct KeyEntryForm {
    /// Key for the chat-completion (story generation) API
    pub story_key: String,
    /// Key for the image generation API
    pub image_key: String,
}
