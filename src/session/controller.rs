use super::state::{Phase, SendOutcome, SessionState};
use crate::classify::classify_with_kind;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::transport::{ChatTransport, TransportError};
use crate::types::{ChatRequest, Message, ReplyPayload};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Greeting seeded once the session has finished initializing.
pub const GREETING: &str = "こんにちは！私は採用活動をお手伝いするチャットボットです。\n以下のことができます。 \n 1. 面接の日程調整 \n 2. 採用活動に関する質問 \nどちらを希望しますか？ (番号で返答ください。)";

/// Shown in place of a reply when the exchange fails.
pub const FALLBACK_REPLY: &str = "申し訳ありませんが、エラーが発生しました。";

/// Snapshots buffered per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Owns one conversation: history, loading phase and the send cycle.
///
/// Every state change is published as a full snapshot on a `broadcast`
/// channel; see [`subscribe`](Self::subscribe) and
/// [`spawn_listener`](Self::spawn_listener).
pub struct SessionController {
    shared: Arc<Shared>,
    greeting_delay: Duration,
}

/// State and collaborators shared with in-flight exchanges.
struct Shared {
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionState>,
    transport: Arc<dyn ChatTransport>,
    diagnostics: Arc<dyn DiagnosticSink>,
    reply_timeout: Option<Duration>,
}

impl SessionController {
    pub(crate) fn new(
        identity: String,
        transport: Arc<dyn ChatTransport>,
        diagnostics: Arc<dyn DiagnosticSink>,
        greeting_delay: Duration,
        reply_timeout: Option<Duration>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(SessionState::new(identity)),
                events,
                transport,
                diagnostics,
                reply_timeout,
            }),
            greeting_delay,
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.read().clone()
    }

    pub fn phase(&self) -> Phase {
        self.shared.read().phase
    }

    pub fn history(&self) -> Vec<Message> {
        self.shared.read().history.clone()
    }

    pub fn identity(&self) -> String {
        self.shared.read().identity.clone()
    }

    /// Receiver of every state transition, in order, as full snapshots.
    ///
    /// A receiver that falls more than a bounded number of snapshots behind
    /// gets `RecvError::Lagged` and resumes from the oldest one still buffered.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.shared.events.subscribe()
    }

    /// Run `listener` on every state change until the controller and any
    /// in-flight exchange are dropped.
    pub fn spawn_listener<F>(&self, mut listener: F) -> JoinHandle<()>
    where
        F: FnMut(&SessionState) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(snapshot) => listener(&snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Wait out the greeting delay, seed the greeting and become ready.
    ///
    /// Does nothing once the session has left `Initializing`.
    pub async fn initialize(&self) {
        if self.phase() != Phase::Initializing {
            return;
        }
        if !self.greeting_delay.is_zero() {
            tokio::time::sleep(self.greeting_delay).await;
        }
        let seeded = self.shared.update(|s| {
            if s.phase != Phase::Initializing {
                return false;
            }
            s.history.push(Message::bot(GREETING));
            s.phase = Phase::Ready;
            true
        });
        if seeded {
            debug!("session ready");
        }
    }

    /// Send `text` to the backend and append the outcome to history.
    ///
    /// The user entry is appended before the exchange starts. Only one send is
    /// in flight per session; others are rejected with [`SendOutcome::Busy`].
    ///
    /// The exchange runs on its own task. Dropping the returned future does
    /// not cancel it: the reply (or the fallback entry) is still appended and
    /// the session still returns to `Ready`.
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        let mut request = None;
        let mut rejected = None;
        self.shared.update(|s| {
            if !s.phase.can_send() {
                rejected = Some(s.phase);
                return false;
            }
            request = Some(ChatRequest::new(text, &s.history, s.identity.clone()));
            s.history.push(Message::user(text));
            s.phase = Phase::AwaitingReply;
            true
        });

        if let Some(phase) = rejected {
            debug!(?phase, "send rejected, session busy");
            return SendOutcome::Busy(phase);
        }
        let Some(request) = request else {
            return SendOutcome::Busy(self.phase());
        };

        let user_id = request.user_id.clone();
        let shared = Arc::clone(&self.shared);
        let exchange = tokio::spawn(async move { shared.complete(request).await });
        match exchange.await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.shared
                    .on_failure(&user_id, TransportError::Other(format!("exchange task failed: {e}")))
                    .await
            }
        }
    }
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` and publish the new snapshot if it reports a change.
    ///
    /// Publishing happens under the write lock so subscribers see snapshots
    /// in the order they were produced.
    fn update<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let modified = change(&mut *state);
        if modified {
            // No receivers is fine.
            let _ = self.events.send(state.clone());
        }
        modified
    }

    async fn complete(&self, request: ChatRequest) -> SendOutcome {
        match self.exchange(&request).await {
            Ok(payload) => self.on_reply(&request.user_id, payload).await,
            Err(e) => self.on_failure(&request.user_id, e).await,
        }
    }

    async fn exchange(&self, request: &ChatRequest) -> Result<ReplyPayload, TransportError> {
        let call = self.transport.send_chat_message(request);
        match self.reply_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(TransportError::Timeout(limit))),
            None => call.await,
        }
    }

    async fn on_reply(&self, user_id: &str, payload: ReplyPayload) -> SendOutcome {
        if let Some(lines) = payload.debug_log.filter(|l| !l.is_empty()) {
            for line in &lines {
                debug!(target: "recruit_chat::backend", "{line}");
            }
            self.diagnostics
                .report(DiagnosticEvent::debug_log(user_id, lines))
                .await;
        }

        let classified = classify_with_kind(&payload.reply);
        let appended = classified.messages.len();
        self.update(|s| {
            s.history.extend(classified.messages);
            s.phase = Phase::Ready;
            true
        });
        self.diagnostics
            .report(DiagnosticEvent::reply_classified(user_id, classified.kind, appended))
            .await;

        SendOutcome::Replied {
            kind: classified.kind,
            appended,
        }
    }

    async fn on_failure(&self, user_id: &str, error: TransportError) -> SendOutcome {
        warn!(transport = self.transport.name(), error = %error, "chat exchange failed");
        self.update(|s| {
            s.history.push(Message::bot(FALLBACK_REPLY));
            s.phase = Phase::Ready;
            true
        });
        self.diagnostics
            .report(DiagnosticEvent::transport_failure(
                user_id,
                error.to_string(),
                error.status(),
            ))
            .await;
        SendOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ReplyKind, SCHEDULE_LEAD_IN};
    use crate::diagnostics::InMemoryDiagnosticSink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    type Scripted = Result<ReplyPayload, TransportError>;

    /// Replays scripted results and records every request it sees.
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<ChatRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Scripted>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(replies: Vec<Scripted>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(replies)
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_chat_message(&self, request: &ChatRequest) -> Scripted {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct Fixture {
        controller: Arc<SessionController>,
        transport: Arc<ScriptedTransport>,
        sink: Arc<InMemoryDiagnosticSink>,
    }

    async fn ready(transport: ScriptedTransport) -> Fixture {
        let transport = Arc::new(transport);
        let sink = Arc::new(InMemoryDiagnosticSink::new(32));
        let controller = Arc::new(SessionController::new(
            "device-1".into(),
            transport.clone(),
            sink.clone(),
            Duration::ZERO,
            None,
        ));
        controller.initialize().await;
        Fixture {
            controller,
            transport,
            sink,
        }
    }

    #[tokio::test]
    async fn initialize_seeds_single_greeting() {
        let f = ready(ScriptedTransport::new(vec![])).await;
        let state = f.controller.state();
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.history, vec![Message::bot(GREETING)]);

        f.controller.initialize().await;
        assert_eq!(f.controller.history().len(), 1);
    }

    #[tokio::test]
    async fn send_before_initialize_is_rejected() {
        let controller = SessionController::new(
            "device-1".into(),
            Arc::new(ScriptedTransport::new(vec![])),
            crate::diagnostics::noop_sink(),
            Duration::ZERO,
            None,
        );
        assert_eq!(controller.send("1").await, SendOutcome::Busy(Phase::Initializing));
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let f = ready(ScriptedTransport::new(vec![])).await;
        let before = f.controller.state();
        for blank in ["", "   ", "\n\t"] {
            assert_eq!(f.controller.send(blank).await, SendOutcome::Ignored);
        }
        assert_eq!(f.controller.state(), before);
        assert!(f.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn reply_is_classified_and_appended() {
        let f = ready(ScriptedTransport::new(vec![Ok(ReplyPayload::text(
            "次の候補日程はいかがでしょうか？\n12/25 10:00\n12/26 14:00",
        ))]))
        .await;

        let outcome = f.controller.send("1").await;
        assert_eq!(
            outcome,
            SendOutcome::Replied {
                kind: ReplyKind::Schedule,
                appended: 3
            }
        );

        let history = f.controller.history();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![GREETING, "1", SCHEDULE_LEAD_IN, "12/25 10:00", "12/26 14:00"]
        );
        assert!(history[1].is_user());
        assert_eq!(f.controller.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn request_carries_prior_context_and_identity() {
        let f = ready(ScriptedTransport::new(vec![
            Ok(ReplyPayload::text("承知しました。")),
            Ok(ReplyPayload::text("ありがとうございます。")),
        ]))
        .await;

        f.controller.send("2").await;
        f.controller.send(" 入社日は？ ").await;

        let requests = f.transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].message, "2");
        assert_eq!(requests[0].context.len(), 1);
        assert_eq!(requests[0].user_id, "device-1");
        // Second request sees greeting, first exchange, but not itself.
        assert_eq!(requests[1].message, " 入社日は？ ");
        assert_eq!(requests[1].context.len(), 3);
        assert_eq!(requests[1].context[2].content, "承知しました。");
        // Content is stored verbatim.
        assert_eq!(f.controller.history()[3].content, " 入社日は？ ");
    }

    #[tokio::test]
    async fn user_entry_is_visible_before_reply_resolves() {
        let gate = Arc::new(Notify::new());
        let f = ready(ScriptedTransport::gated(
            vec![Ok(ReplyPayload::text("ok"))],
            gate.clone(),
        ))
        .await;
        let mut rx = f.controller.subscribe();

        let controller = f.controller.clone();
        let pending = tokio::spawn(async move { controller.send("面接希望").await });

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.phase, Phase::AwaitingReply);
        assert_eq!(snapshot.history.last(), Some(&Message::user("面接希望")));
        assert!(snapshot.display_messages().last().unwrap().is_loading);

        gate.notify_one();
        let outcome = pending.await.unwrap();
        assert!(matches!(outcome, SendOutcome::Replied { appended: 1, .. }));
        assert_eq!(f.controller.history().len(), 3);
    }

    #[tokio::test]
    async fn overlapping_send_is_rejected() {
        let gate = Arc::new(Notify::new());
        let f = ready(ScriptedTransport::gated(
            vec![Ok(ReplyPayload::text("ok"))],
            gate.clone(),
        ))
        .await;
        let mut rx = f.controller.subscribe();

        let controller = f.controller.clone();
        let first = tokio::spawn(async move { controller.send("first").await });
        assert_eq!(rx.recv().await.unwrap().phase, Phase::AwaitingReply);

        assert_eq!(
            f.controller.send("second").await,
            SendOutcome::Busy(Phase::AwaitingReply)
        );
        gate.notify_one();
        first.await.unwrap();

        let contents: Vec<String> = f
            .controller
            .history()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec![GREETING.to_string(), "first".into(), "ok".into()]);
        assert_eq!(f.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn failure_appends_fallback_and_reports_detail() {
        let f = ready(ScriptedTransport::new(vec![Err(TransportError::Status {
            status: 500,
            body: "サーバーエラー: boom".into(),
        })]))
        .await;

        assert_eq!(f.controller.send("1").await, SendOutcome::Failed);
        let state = f.controller.state();
        assert_eq!(state.phase, Phase::Ready);
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[2], Message::bot(FALLBACK_REPLY));
        assert!(state.history.iter().all(|m| !m.content.contains("boom")));

        let events = f.sink.events();
        assert!(events.iter().any(|e| matches!(
            e,
            DiagnosticEvent::TransportFailure { status: Some(500), error, .. } if error.contains("boom")
        )));
    }

    #[tokio::test]
    async fn session_recovers_after_failure() {
        let f = ready(ScriptedTransport::new(vec![
            Err(TransportError::Other("offline".into())),
            Ok(ReplyPayload::text("FAQ: 服装は自由です。")),
        ]))
        .await;

        assert_eq!(f.controller.send("1").await, SendOutcome::Failed);
        assert_eq!(
            f.controller.send("1").await,
            SendOutcome::Replied {
                kind: ReplyKind::Faq,
                appended: 1
            }
        );
        assert_eq!(f.controller.history().len(), 5);
    }

    #[tokio::test]
    async fn debug_log_goes_to_diagnostics_only() {
        let f = ready(ScriptedTransport::new(vec![Ok(ReplyPayload::text("承知しました。")
            .with_debug_log(vec!["prompt built".into(), "model replied".into()]))]))
        .await;

        f.controller.send("2").await;
        assert!(f
            .controller
            .history()
            .iter()
            .all(|m| !m.content.contains("prompt built")));
        let events = f.sink.events();
        assert!(matches!(
            &events[0],
            DiagnosticEvent::DebugLog { lines, user_id, .. }
                if lines.len() == 2 && user_id == "device-1"
        ));
        assert!(matches!(
            &events[1],
            DiagnosticEvent::ReplyClassified { kind: "text", entries: 1, .. }
        ));
    }

    #[tokio::test]
    async fn stalled_transport_times_out_into_fallback() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(vec![], gate));
        let controller = SessionController::new(
            "device-1".into(),
            transport,
            crate::diagnostics::noop_sink(),
            Duration::ZERO,
            Some(Duration::from_millis(20)),
        );
        controller.initialize().await;

        assert_eq!(controller.send("1").await, SendOutcome::Failed);
        assert_eq!(controller.history().last(), Some(&Message::bot(FALLBACK_REPLY)));
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn listener_sees_every_transition() {
        let f = ready(ScriptedTransport::new(vec![Ok(ReplyPayload::text("ok"))])).await;
        let (tx, mut seen) = tokio::sync::mpsc::unbounded_channel();
        let handle = f.controller.spawn_listener(move |s| {
            let _ = tx.send((s.phase, s.history.len(), s.display_messages().len()));
        });

        f.controller.send("1").await;

        // Instant replies still publish the pending snapshot with its placeholder.
        assert_eq!(seen.recv().await, Some((Phase::AwaitingReply, 2, 3)));
        assert_eq!(seen.recv().await, Some((Phase::Ready, 3, 3)));
        handle.abort();
    }

    #[tokio::test]
    async fn dropped_send_still_completes() {
        let gate = Arc::new(Notify::new());
        let f = ready(ScriptedTransport::gated(
            vec![Ok(ReplyPayload::text("ok")), Ok(ReplyPayload::text("承知しました。"))],
            gate.clone(),
        ))
        .await;
        let mut rx = f.controller.subscribe();

        let abandoned = tokio::time::timeout(Duration::from_millis(20), f.controller.send("1")).await;
        assert!(abandoned.is_err());
        assert_eq!(rx.recv().await.unwrap().phase, Phase::AwaitingReply);

        gate.notify_one();
        let settled = rx.recv().await.unwrap();
        assert_eq!(settled.phase, Phase::Ready);
        assert_eq!(settled.history.last(), Some(&Message::bot("ok")));

        gate.notify_one();
        assert!(matches!(
            f.controller.send("2").await,
            SendOutcome::Replied { appended: 1, .. }
        ));
        let contents: Vec<String> = f
            .controller
            .history()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(
            contents,
            vec![
                GREETING.to_string(),
                "1".into(),
                "ok".into(),
                "2".into(),
                "承知しました。".into()
            ]
        );
    }
}
