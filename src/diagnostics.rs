//! 诊断通道：后端调试日志与传输失败详情（永不进入会话历史）。
//!
//! Diagnostic channel.
//!
//! Backend debug logs and raw transport errors are never shown to the
//! visitor. The session reports them here instead. The default sink drops
//! everything; applications opt in.
//!
//! | Sink | Description |
//! |------|-------------|
//! | [`NoopDiagnosticSink`] | Default, discards events |
//! | [`TracingDiagnosticSink`] | Forwards events to `tracing` |
//! | [`InMemoryDiagnosticSink`] | Bounded buffer for tests |

use crate::classify::ReplyKind;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// `debug_log` lines attached to a backend reply.
    DebugLog {
        user_id: String,
        lines: Vec<String>,
        timestamp: f64,
    },
    /// A send failed and the fallback message was shown instead.
    TransportFailure {
        user_id: String,
        error: String,
        status: Option<u16>,
        timestamp: f64,
    },
    /// A reply was classified and appended.
    ReplyClassified {
        user_id: String,
        kind: &'static str,
        entries: usize,
        timestamp: f64,
    },
}

impl DiagnosticEvent {
    pub fn debug_log(user_id: impl Into<String>, lines: Vec<String>) -> Self {
        DiagnosticEvent::DebugLog {
            user_id: user_id.into(),
            lines,
            timestamp: timestamp(),
        }
    }

    pub fn transport_failure(
        user_id: impl Into<String>,
        error: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        DiagnosticEvent::TransportFailure {
            user_id: user_id.into(),
            error: error.into(),
            status,
            timestamp: timestamp(),
        }
    }

    pub fn reply_classified(user_id: impl Into<String>, kind: ReplyKind, entries: usize) -> Self {
        DiagnosticEvent::ReplyClassified {
            user_id: user_id.into(),
            kind: kind.as_str(),
            entries,
            timestamp: timestamp(),
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            DiagnosticEvent::DebugLog { user_id, .. }
            | DiagnosticEvent::TransportFailure { user_id, .. }
            | DiagnosticEvent::ReplyClassified { user_id, .. } => user_id,
        }
    }
}

#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn report(&self, event: DiagnosticEvent);
}

pub struct NoopDiagnosticSink;

#[async_trait]
impl DiagnosticSink for NoopDiagnosticSink {
    async fn report(&self, _event: DiagnosticEvent) {}
}

pub fn noop_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(NoopDiagnosticSink)
}

/// Forwards events to `tracing` under the `recruit_chat::diagnostics` target.
pub struct TracingDiagnosticSink;

#[async_trait]
impl DiagnosticSink for TracingDiagnosticSink {
    async fn report(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::DebugLog { user_id, lines, .. } => {
                for line in lines {
                    tracing::debug!(target: "recruit_chat::diagnostics", %user_id, "backend: {line}");
                }
            }
            DiagnosticEvent::TransportFailure {
                user_id,
                error,
                status,
                ..
            } => {
                tracing::warn!(target: "recruit_chat::diagnostics", %user_id, ?status, "send failed: {error}");
            }
            DiagnosticEvent::ReplyClassified {
                user_id,
                kind,
                entries,
                ..
            } => {
                tracing::debug!(target: "recruit_chat::diagnostics", %user_id, kind, entries, "reply classified");
            }
        }
    }
}

/// In-memory sink for testing.
pub struct InMemoryDiagnosticSink {
    events: RwLock<Vec<DiagnosticEvent>>,
    max_events: usize,
}

impl InMemoryDiagnosticSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max.max(1),
        }
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DiagnosticSink for InMemoryDiagnosticSink {
    async fn report(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(event);
            if events.len() > self.max_events {
                events.remove(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_sink_is_bounded() {
        let sink = InMemoryDiagnosticSink::new(2);
        for i in 0..3 {
            sink.report(DiagnosticEvent::debug_log("u", vec![format!("line {i}")]))
                .await;
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            DiagnosticEvent::DebugLog { lines, .. } => assert_eq!(lines, &vec!["line 1".to_string()]),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DiagnosticEvent::reply_classified("u", ReplyKind::Faq, 1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reply_classified");
        assert_eq!(json["kind"], "faq");
        assert_eq!(event.user_id(), "u");
    }
}
