//! Chat session state for a single conversation with the proxy.

pub mod sse;

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use log::{debug, error, info};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

pub use sse::{SseDecoder, StreamUpdate};

use crate::error::ClientError;
use crate::web::models::{ChatRequest, Message};

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Empty input, or another request is still loading.
    Ignored,
    Completed,
    /// Cancelled through a [`Canceller`]; the transcript is left as it was.
    Aborted,
    /// The reply placeholder now reads `Error: <message>`.
    Failed(ClientError),
}

/// Aborts whichever request the owning session has in flight.
#[derive(Debug, Clone, Default)]
pub struct Canceller {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl Canceller {
    /// Returns whether a request was in flight.
    pub fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.slot().replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    fn disarm(&self) {
        self.slot().take();
    }

    fn is_armed(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Marks a request in flight until dropped, including when the `submit`
/// future itself is dropped before finishing.
struct InFlight {
    canceller: Canceller,
    token: CancellationToken,
}

impl InFlight {
    fn start(canceller: &Canceller) -> Self {
        Self {
            token: canceller.arm(),
            canceller: canceller.clone(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.canceller.disarm();
    }
}

/// Transcript, upstream session id and in-flight request of one conversation.
///
/// A request is aborted either through [`ChatSession::canceller`] or by dropping
/// the `submit` future; both leave the session ready for the next submission.
pub struct ChatSession {
    http: Client,
    endpoint: String,
    messages: Vec<Message>,
    session_id: Option<String>,
    canceller: Canceller,
}

impl ChatSession {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            messages: Vec::new(),
            session_id: None,
            canceller: Canceller::default(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.canceller.is_armed()
    }

    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    pub async fn submit(&mut self, input: &str) -> SubmitOutcome {
        self.submit_with(input, |_| {}).await
    }

    /// Like [`submit`](Self::submit), calling `on_delta` with each text fragment as it arrives.
    pub async fn submit_with<F>(&mut self, input: &str, mut on_delta: F) -> SubmitOutcome
    where
        F: FnMut(&str),
    {
        let text = input.trim();
        if text.is_empty() || self.is_loading() {
            return SubmitOutcome::Ignored;
        }

        self.messages.push(Message::user(text));

        let outgoing = ChatRequest {
            messages: self.messages.clone(),
            context: None,
            session_id: self.session_id.clone(),
        };

        let reply_index = self.messages.len();
        self.messages.push(Message::assistant(""));

        let in_flight = InFlight::start(&self.canceller);
        let result = self
            .stream_reply(&outgoing, reply_index, &in_flight.token, &mut on_delta)
            .await;
        drop(in_flight);

        match result {
            Ok(()) => SubmitOutcome::Completed,
            Err(ClientError::Aborted) => {
                info!("Request aborted");
                SubmitOutcome::Aborted
            }
            Err(e) => {
                error!("Chat error: {}", e);
                self.messages[reply_index] = Message::assistant(format!("Error: {}", e));
                SubmitOutcome::Failed(e)
            }
        }
    }

    async fn stream_reply(
        &mut self,
        outgoing: &ChatRequest,
        reply_index: usize,
        token: &CancellationToken,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<(), ClientError> {
        let send = self.http.post(&self.endpoint).json(outgoing).send();

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ClientError::Aborted),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ClientError::Aborted),
                next = body.next() => next,
            };

            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;

            for update in decoder.feed(&chunk) {
                match update {
                    StreamUpdate::Delta(text) => {
                        self.messages[reply_index].content.push_str(&text);
                        on_delta(&text);
                    }
                    StreamUpdate::Session(id) => {
                        debug!("Upstream session: {}", id);
                        self.session_id = Some(id);
                    }
                    StreamUpdate::Done => debug!("Upstream signalled done"),
                    StreamUpdate::Failed(message) => return Err(ClientError::Upstream(message)),
                }
            }
        }

        Ok(())
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.canceller.cancel();
    }
}
