//! Illustration generation via a hosted image API.
//!
//! Single multipart POST with `prompt` and `output_format` fields and
//! `Accept: image/*`. A 200 yields the raw image bytes; any other status is
//! logged with its body and yields no image, so the story still renders.
//! Network failures are returned as errors and propagate.

use bytes::Bytes;
use reqwest::{
    Client, StatusCode,
    header::ACCEPT,
    multipart::Form,
};
use tracing::error;
use url::Url;

use crate::config::IllustrationConfig;
use crate::errors::Error;

#[derive(Clone)]
pub struct IllustrationClient {
    http: Client,
    api_url: Url,
    output_format: String,
}

impl IllustrationClient {
    pub fn new(http: Client, config: &IllustrationConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            output_format: config.output_format.clone(),
        }
    }

    /// Generate an illustration for `prompt`.
    ///
    /// `Ok(None)` means the API refused the request (non-200); the caller
    /// proceeds without an image. `Err` means the request never completed.
    pub async fn generate(&self, prompt: &str, api_key: &str) -> Result<Option<Bytes>, Error> {
        let form = Form::new()
            .text("prompt", prompt.to_string())
            .text("output_format", self.output_format.clone());

        let response = self
            .http
            .post(self.api_url.clone())
            .bearer_auth(api_key)
            .header(ACCEPT, "image/*")
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                service: "illustration",
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Image generation failed");
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| Error::Upstream {
            service: "illustration",
            status: Some(status.as_u16()),
            detail: format!("reading image body: {e}"),
        })?;
        Ok(Some(bytes))
    }
}
