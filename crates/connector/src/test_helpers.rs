//! Test doubles for the feed connection and the broker.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use pricefeed_middleware::{Subscription, Transport, TransportError};
use tokio_tungstenite::tungstenite;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::error::ConnectorError;
use crate::traits::FrameSink;

/// Broker double: records every publish; publishes whose payload contains
/// `fail_on` are rejected.
#[derive(Default)]
pub struct RecordingTransport {
    pub published: Mutex<Vec<(String, Bytes)>>,
    pub flushes: Mutex<u32>,
    fail_on: Option<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            fail_on: Some(needle.into()),
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    pub fn flush_count(&self) -> u32 {
        *self.flushes.lock().unwrap()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.published
            .lock()
            .unwrap()
            .push((subject.to_string(), payload.clone()));
        if let Some(ref needle) = self.fail_on {
            if String::from_utf8_lossy(&payload).contains(needle.as_str()) {
                return Err(TransportError::PublishFailed(
                    "Test broker exception".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), TransportError> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }

    async fn subscribe(&self, _subject: &str) -> Result<Box<dyn Subscription>, TransportError> {
        Err(TransportError::SubscribeFailed("not supported".to_string()))
    }
}

/// Connection double: records every send attempt. Sends containing a key of
/// `failures` fail with a transport error until that key's budget runs out.
#[derive(Default)]
pub struct RecordingSink {
    pub attempts: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u32>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` sends whose text contains `needle`
    pub fn fail(self, needle: impl Into<String>, times: u32) -> Self {
        self.failures.lock().unwrap().insert(needle.into(), times);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_containing(&self, needle: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.contains(needle))
            .count()
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_text(&self, text: String) -> Result<(), ConnectorError> {
        self.attempts.lock().unwrap().push(text.clone());

        let mut failures = self.failures.lock().unwrap();
        for (needle, remaining) in failures.iter_mut() {
            if *remaining > 0 && text.contains(needle.as_str()) {
                *remaining -= 1;
                return Err(ConnectorError::Transport(
                    tungstenite::Error::ConnectionClosed,
                ));
            }
        }
        Ok(())
    }
}

/// One log event with its fields rendered as text
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn message(&self) -> &str {
        self.field("message").unwrap_or("")
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Layer that keeps every event emitted while its guard is alive on this thread
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Install as the thread's default subscriber until the guard drops.
    /// Pair with a current-thread runtime so spawned work logs here too.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events at `level` whose message starts with `message`
    pub fn matching(&self, level: Level, message: &str) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level && e.message().starts_with(message))
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}
