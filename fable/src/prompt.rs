//! Prompt construction from the story parameter form.
//!
//! When no voice recording is uploaded, the four optional form fields are
//! interpolated into a fixed sentence template. Field content is taken
//! verbatim; there is no validation or length enforcement.

use serde::Deserialize;

/// The four optional story parameters from the generate form.
///
/// The form field for the theme is named `nature` for historical reasons;
/// it maps onto the template's "theme" slot.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoryFields {
    pub hero: Option<String>,
    pub villain: Option<String>,
    /// Theme of the story ("nature" form field)
    pub nature: Option<String>,
    /// Side characters
    pub side: Option<String>,
}

/// Fill the fixed story template with the supplied fields.
///
/// Missing fields substitute as empty strings.
pub fn build_prompt(fields: &StoryFields) -> String {
    format!(
        "Write a children's story with hero: {}, villain: {}, theme: {}, side characters: {}.",
        fields.hero.as_deref().unwrap_or(""),
        fields.villain.as_deref().unwrap_or(""),
        fields.nature.as_deref().unwrap_or(""),
        fields.side.as_deref().unwrap_or(""),
    )
}
