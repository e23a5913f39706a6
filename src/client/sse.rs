use log::debug;
use serde_json::Value;

/// One decoded effect of an upstream SSE record on the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Text to append to the assistant reply.
    Delta(String),
    /// Session identifier assigned by upstream.
    Session(String),
    Done,
    /// An `error` event; terminal for the request.
    Failed(String),
}

/// Incremental decoder for the relayed event stream.
///
/// Holds the bytes of the trailing incomplete line and the last `event:` name
/// seen, which stays in effect until another `event:` line replaces it. A
/// payload's own `event` field wins over that name.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    current_event: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_event(&self) -> &str {
        &self.current_event
    }

    /// Feeds one network chunk and returns the updates of every line it completed.
    ///
    /// Processing of the chunk stops at the first `done` or `error` event; the
    /// remaining complete lines of that chunk are dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamUpdate> {
        self.pending.extend_from_slice(chunk);

        // Split on the raw byte so multi-byte characters cut across chunks survive
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();

        let mut updates = Vec::new();
        for raw in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(raw);
            let Some(update) = self.process_line(line.trim()) else {
                continue;
            };

            let terminal = matches!(update, StreamUpdate::Done | StreamUpdate::Failed(_));
            updates.push(update);
            if terminal {
                break;
            }
        }

        updates
    }

    fn process_line(&mut self, line: &str) -> Option<StreamUpdate> {
        if line.is_empty() {
            return None;
        }

        if let Some(name) = line.strip_prefix("event: ") {
            self.current_event = name.trim().to_string();
            return None;
        }

        let data = line.strip_prefix("data: ")?.trim();
        if data.is_empty() || data == "[DONE]" {
            return None;
        }

        let payload: Value = match serde_json::from_str(data) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Skipping undecodable data line ({}): {}", e, data);
                return None;
            }
        };

        let kind = payload
            .get("event")
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty())
            .unwrap_or(self.current_event.as_str());

        match kind {
            "delta" => delta_text(&payload).map(StreamUpdate::Delta),
            "init" => payload
                .get("session_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(|id| StreamUpdate::Session(id.to_string())),
            "done" => Some(StreamUpdate::Done),
            "error" => Some(StreamUpdate::Failed(error_message(&payload))),
            _ => None,
        }
    }
}

fn delta_text(payload: &Value) -> Option<String> {
    payload
        .get("v")
        .and_then(Value::as_str)
        .or_else(|| payload.as_str())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn error_message(payload: &Value) -> String {
    ["message", "error", "data"]
        .iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| is_present(value))
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "Unknown error".to_string())
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
