//! Server-sent event ingestion of new operations
//!
//! Opens the query service's streaming endpoint starting at the current
//! ledger, decodes each event as an operation record and publishes it on
//! the emitter. When the stream ends or fails it is not reopened.

use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use types::ids::PagingToken;
use types::operation::OperationRecord;

use crate::emitter::EventEmitter;
use crate::error::FeedError;
use crate::horizon::HorizonClient;
use crate::source::Scope;

/// Incremental decoder for the `text/event-stream` framing.
///
/// Only `data` fields matter here; `id` is remembered as the last event id,
/// everything else is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: Vec<String>,
    last_event_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payload of every completed event.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(&['\n', '\r'][..]);

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "data" => self.data.push(value.to_string()),
                "id" => self.last_event_id = Some(value.to_string()),
                _ => {}
            }
        }
        events
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }
}

/// Streams new operations from the query service into an emitter.
pub struct OperationStream {
    client: HorizonClient,
    scope: Scope,
    emitter: EventEmitter,
    event_name: String,
}

impl OperationStream {
    pub fn new(
        client: HorizonClient,
        scope: Scope,
        emitter: EventEmitter,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            scope,
            emitter,
            event_name: event_name.into(),
        }
    }

    pub fn url(&self) -> String {
        format!(
            "{}?cursor={}",
            self.client.operations_url(&self.scope),
            PagingToken::now()
        )
    }

    /// Publish one event payload. Returns whether a record was emitted.
    pub fn dispatch(&self, payload: &str) -> bool {
        let value: Value = match serde_json::from_str(payload) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                trace!(payload, "Skipping non-record stream message");
                return false;
            }
        };

        match serde_json::from_value::<OperationRecord>(value) {
            Ok(record) => {
                let listeners = self.emitter.emit(&self.event_name, Arc::new(record));
                trace!(listeners, "Live operation emitted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Stream message is not an operation record");
                false
            }
        }
    }

    /// Consume the stream until it ends. Returns the number of records emitted.
    pub async fn run(self) -> Result<u64, FeedError> {
        let url = self.url();
        let response = self
            .client
            .http()
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| FeedError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Http {
                url,
                status: status.as_u16(),
            });
        }

        info!(%url, event = %self.event_name, "Live operation stream opened");

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut emitted = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| FeedError::Subscription(e.to_string()))?;
            for payload in decoder.push(&chunk) {
                if self.dispatch(&payload) {
                    emitted += 1;
                }
            }
        }

        debug!(
            emitted,
            last_event_id = decoder.last_event_id().unwrap_or(""),
            "Live operation stream ended"
        );
        Ok(emitted)
    }

    /// Run in the background, logging how the stream ended.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.run().await {
                Ok(emitted) => warn!(emitted, "Live operation stream closed; not reopening"),
                Err(e) => error!(error = %e, "Live operation stream failed; not reopening"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LiveSource;

    #[test]
    fn test_decoder_splits_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"retry: 1000\nevent: open\ndata: \"hello\"\n\nid: 42\ndata: {\"a\":1}\n\n");
        assert_eq!(events, vec!["\"hello\"".to_string(), "{\"a\":1}".to_string()]);
        assert_eq!(decoder.last_event_id(), Some("42"));
    }

    #[test]
    fn test_decoder_handles_partial_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        assert!(decoder.push(b":1}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec!["{\"a\":1}".to_string()]);
    }

    #[test]
    fn test_decoder_joins_multiline_data_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keepalive\ndata: first\ndata:second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_emits_records_only() {
        let emitter = EventEmitter::new();
        let mut sub = emitter.subscribe("newOperation").unwrap();
        let stream = OperationStream::new(
            HorizonClient::new("https://horizon.example"),
            Scope::Global,
            emitter.clone(),
            "newOperation",
        );

        assert!(!stream.dispatch("\"hello\""));
        assert!(!stream.dispatch("{\"unexpected\":true}"));
        assert!(stream.dispatch(
            r#"{"id":"5","paging_token":"5","source_account":"GA","type":"manage_data","name":"k"}"#
        ));

        assert_eq!(sub.next().await.unwrap().id.as_str(), "5");
    }

    #[test]
    fn test_stream_url() {
        let stream = OperationStream::new(
            HorizonClient::new("https://horizon.example"),
            Scope::Account(types::ids::AccountId::new("GWATCHED")),
            EventEmitter::new(),
            "newOperation",
        );
        assert_eq!(
            stream.url(),
            "https://horizon.example/accounts/GWATCHED/operations?cursor=now"
        );
    }
}
