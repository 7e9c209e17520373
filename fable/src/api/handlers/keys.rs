//! Credential entry: the landing page and the key-submission handler.

use axum::{
    Form,
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect},
};
use minijinja::context;

use crate::api::models::KeyEntryForm;
use crate::errors::Result;
use crate::session::{self, Credentials};
use crate::{AppState, templates};

/// `GET /` - render the credential entry form
pub async fn enter_keys_page(State(state): State<AppState>) -> Result<impl IntoResponse> {
    templates::render(&state.templates, "enter_keys.html", context! {})
}

/// `POST /` - store the two API keys in a signed session cookie and move on
/// to the generate page. Keys never touch disk.
pub async fn submit_keys(
    State(state): State<AppState>,
    Form(form): Form<KeyEntryForm>,
) -> Result<impl IntoResponse> {
    let credentials = Credentials {
        story_key: form.story_key,
        image_key: form.image_key,
    };
    let token = session::create_session_token(&credentials, &state.config)?;
    let cookie = session::create_session_cookie(&token, &state.config);

    tracing::info!("Session credentials stored");
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/home")))
}
