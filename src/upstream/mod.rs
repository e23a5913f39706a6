use actix_web::web::Bytes;
use futures_util::{Stream, StreamExt};
use log::{debug, error, info};
use reqwest::Client;
use uuid::Uuid;

use crate::credential::Credential;
use crate::error::ProxyError;
use crate::web::models::{ChatRequest, UpstreamChatRequest};

// A wrapper for the upstream chat API
pub struct UpstreamClient {
    url: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(url: &str) -> Self {
        info!("Using upstream chat API at: {}", url);

        Self {
            url: url.to_string(),
            client: Client::new(),
        }
    }

    /// Sends the chat request with `stream: true` and returns the response once
    /// upstream has answered with a success status.
    pub async fn open_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
        relay_id: Uuid,
    ) -> Result<reqwest::Response, ProxyError> {
        let payload = UpstreamChatRequest {
            messages: &request.messages,
            context: request.context.as_ref(),
            session_id: request.session_id.as_deref(),
            stream: true,
        };

        info!(
            "[{}] Forwarding {} message(s) upstream (session: {})",
            relay_id,
            request.messages.len(),
            request.session_id.as_deref().unwrap_or("new")
        );

        let response = self
            .client
            .post(&self.url)
            .header(credential.header, &credential.value)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("[{}] Upstream request failed: {}", relay_id, e);
                ProxyError::Internal(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| {
                error!("[{}] Failed to read upstream error body: {}", relay_id, e);
                ProxyError::Internal(e.to_string())
            })?;
            error!("[{}] Upstream returned {}: {}", relay_id, status, body);
            return Err(ProxyError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// The upstream body, chunk for chunk. Errors end the stream on the caller's side.
pub fn relay(
    response: reqwest::Response,
    relay_id: Uuid,
) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + 'static {
    let mut relayed = 0usize;

    response.bytes_stream().inspect(move |chunk| match chunk {
        Ok(bytes) => {
            relayed += bytes.len();
            debug!(
                "[{}] Relayed {} bytes ({} total)",
                relay_id,
                bytes.len(),
                relayed
            );
        }
        Err(e) => error!(
            "[{}] Upstream stream failed after {} bytes: {}",
            relay_id, relayed, e
        ),
    })
}
