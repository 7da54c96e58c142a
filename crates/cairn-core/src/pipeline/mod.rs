//! Per-request orchestration of the streaming chat pipeline.
//!
//! One [`ChatPipeline::run`] call handles one user message end to
//! end: quota gate, context assembly, prompt build, provider stream,
//! tag scanning, and the completion handoff. The request moves
//! through `Authorizing -> ContextLoading -> Streaming -> Completing
//! -> Done`; failures before the stream opens are returned as values,
//! failures during streaming fold into a single terminal error frame.
//!
//! Ordering contract: token frames preserve upstream delta order, a
//! successful stream ends with exactly one `Done`, a failed one with
//! exactly one `Error`, and nothing follows either.

use std::sync::{Arc, Mutex};

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use cairn_types::chat::{Conversation, StoredMessage};
use cairn_types::event::ChatEvent;
use cairn_types::llm::{ChatTurn, CompletionRequest, MessageRole, StreamDelta, Usage};
use cairn_types::usage::{BillingPeriod, QuotaDecision, SubscriptionTier};

use crate::completion::{CompletedStream, CompletionSink};
use crate::context::ContextAssembler;
use crate::ledger::{GateVerdict, QuotaGate, UsageLedger};
use crate::llm::SharedProvider;
use crate::prompt::PromptBuilder;
use crate::repository::{ContextRepository, ConversationRepository, MessageRepository};
use crate::scanner::TagScanner;

/// Messages of the current conversation replayed into the prompt.
const PRIOR_TURN_WINDOW: u32 = 20;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub core_instructions: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// One inbound user message, already authenticated.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub conversation: Conversation,
    pub message: String,
}

/// Pre-stream rejection: quota exhausted. Carries the structured
/// metadata the HTTP layer turns into a 429 body.
#[derive(Debug, Clone)]
pub struct GateRejection {
    pub decision: QuotaDecision,
    pub period: BillingPeriod,
}

/// The request-scoped orchestrator.
pub struct ChatPipeline<L, C, M, X, S>
where
    L: UsageLedger,
    C: ConversationRepository,
    M: MessageRepository,
    X: ContextRepository,
    S: CompletionSink,
{
    gate: QuotaGate<L>,
    assembler: ContextAssembler<C, Arc<M>, X>,
    messages: Arc<M>,
    provider: SharedProvider,
    sink: Arc<S>,
    tracker: TaskTracker,
    config: PipelineConfig,
}

impl<L, C, M, X, S> ChatPipeline<L, C, M, X, S>
where
    L: UsageLedger,
    C: ConversationRepository,
    M: MessageRepository + 'static,
    X: ContextRepository,
    S: CompletionSink + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gate: QuotaGate<L>,
        assembler: ContextAssembler<C, Arc<M>, X>,
        messages: Arc<M>,
        provider: SharedProvider,
        sink: Arc<S>,
        tracker: TaskTracker,
        config: PipelineConfig,
    ) -> Self {
        Self {
            gate,
            assembler,
            messages,
            provider,
            sink,
            tracker,
            config,
        }
    }

    /// Supervisor handle for the pipeline's detached writes.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Handle one user message.
    ///
    /// Returns the outbound event stream, or a [`GateRejection`]
    /// before any stream is opened. The returned stream persists the
    /// partial transcript (marked interrupted) if it is dropped
    /// before its terminal event.
    pub async fn run(
        &self,
        request: ChatRequest,
    ) -> Result<impl Stream<Item = ChatEvent> + Send + use<L, C, M, X, S>, GateRejection> {
        // Authorizing.
        let verdict = self
            .gate
            .admit(request.user_id, request.tier, request.conversation.kind)
            .await;
        if let GateVerdict::Rejected { decision, period } = verdict {
            info!(user_id = %request.user_id, count = decision.current_count, "quota exhausted, rejecting");
            return Err(GateRejection { decision, period });
        }

        // ContextLoading. Degradation inside the assembler is never
        // an error, so this stage has no failure edge.
        let conversation = &request.conversation;
        let (bundle, prior) = tokio::join!(
            self.assembler.assemble(
                &request.user_id,
                &conversation.id,
                conversation.domain.as_deref(),
            ),
            self.messages.tail(&conversation.id, PRIOR_TURN_WINDOW),
        );
        let prior_turns: Vec<ChatTurn> = prior
            .unwrap_or_default()
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content,
            })
            .collect();

        let system_prompt =
            PromptBuilder::build(&self.config.core_instructions, &bundle, &prior_turns);

        // The inbound user message is persisted before streaming so an
        // interrupted response still has its question on record.
        let user_message = StoredMessage {
            id: Uuid::now_v7(),
            conversation_id: conversation.id,
            role: MessageRole::User,
            content: request.message.clone(),
            token_count: (request.message.len() / 4) as u32,
            interrupted: false,
            created_at: chrono::Utc::now(),
        };
        if let Err(e) = self.messages.save(&user_message).await {
            warn!(error = %e, "failed to persist user message, continuing");
        }

        let completion_request = CompletionRequest {
            model: self.provider.model().to_string(),
            messages: vec![ChatTurn::user(request.message)],
            system: Some(system_prompt),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
        };

        // Streaming.
        let deltas = self.provider.stream(completion_request);
        Ok(event_stream(
            deltas,
            Arc::clone(&self.sink),
            self.tracker.clone(),
            self.provider.model().to_string(),
            request.user_id,
            user_message.conversation_id,
        ))
    }
}

/// Turn the provider delta stream into the outbound event stream.
fn event_stream<S>(
    mut deltas: crate::llm::DeltaStream,
    sink: Arc<S>,
    tracker: TaskTracker,
    model: String,
    user_id: Uuid,
    conversation_id: Uuid,
) -> impl Stream<Item = ChatEvent> + Send + 'static
where
    S: CompletionSink + Send + Sync + 'static,
{
    let message_id = Uuid::now_v7();

    // Raw transcript shared with the drop guard so a client
    // disconnect can persist what was already streamed.
    let raw_text = Arc::new(Mutex::new(String::new()));
    let mut guard = StreamGuard {
        sink: Arc::clone(&sink),
        tracker: tracker.clone(),
        raw_text: Arc::clone(&raw_text),
        base: Some(CompletedStream {
            message_id,
            conversation_id,
            user_id,
            model,
            full_text: String::new(),
            usage: Usage::default(),
            interrupted: true,
        }),
    };

    stream! {
        let mut scanner = TagScanner::new();
        let mut terminal: Option<ChatEvent> = None;

        while let Some(delta) = deltas.next().await {
            match delta {
                StreamDelta::Text(text) => {
                    if let Ok(mut raw) = raw_text.lock() {
                        raw.push_str(&text);
                    }
                    let fragment = scanner.push(&text);
                    if !fragment.is_empty() || fragment.memory_moment || fragment.pattern_insight {
                        yield ChatEvent::Token {
                            content: fragment.clean_text,
                            memory_moment: fragment.memory_moment,
                            pattern_insight: fragment.pattern_insight,
                        };
                    }
                }
                StreamDelta::Complete(usage) => {
                    // Flush any buffered partial tag as plain text
                    // before the terminal event.
                    let tail = scanner.finish();
                    if !tail.is_empty() {
                        yield ChatEvent::Token {
                            content: tail.clean_text,
                            memory_moment: tail.memory_moment,
                            pattern_insight: tail.pattern_insight,
                        };
                    }

                    let mut record = guard.disarm();
                    record.usage = usage;
                    record.interrupted = false;
                    record.full_text = raw_text
                        .lock()
                        .map(|t| t.clone())
                        .unwrap_or_default();

                    // Persistence is attempted before `done` is
                    // emitted; its failure stays server-side.
                    if let Err(e) = sink.persist_message(&record).await {
                        error!(%message_id, error = %e, "failed to persist assistant message");
                    }
                    let log_sink = Arc::clone(&sink);
                    let log_record = record.clone();
                    tracker.spawn(async move {
                        if let Err(e) = log_sink.record_usage(&log_record).await {
                            error!(message_id = %log_record.message_id, error = %e, "failed to record usage log");
                        }
                    });

                    terminal = Some(ChatEvent::Done {
                        message_id: message_id.to_string(),
                        usage: usage.into(),
                    });
                    break;
                }
                StreamDelta::Failed(reason) => {
                    // Detail is logged server-side; the client gets
                    // one constant, user-safe message.
                    error!(%message_id, error = %reason, "upstream stream failed");
                    terminal = Some(ChatEvent::error());
                    break;
                }
            }
        }

        // An upstream stream that ends without a terminal delta is a
        // protocol violation; treat it as a failure.
        let terminal = terminal.unwrap_or_else(|| {
            error!(%message_id, "upstream stream ended without terminal delta");
            ChatEvent::error()
        });
        yield terminal;

        // Keep the guard alive until here: an early drop of this
        // generator (client disconnect or failure) persists the
        // partial transcript as interrupted.
        drop(guard);
    }
}

/// Drop guard that persists a partial transcript when the event
/// stream is dropped before its natural end.
struct StreamGuard<S: CompletionSink + Send + Sync + 'static> {
    sink: Arc<S>,
    tracker: TaskTracker,
    raw_text: Arc<Mutex<String>>,
    base: Option<CompletedStream>,
}

impl<S: CompletionSink + Send + Sync + 'static> StreamGuard<S> {
    /// Take the record template and disable the drop behavior.
    fn disarm(&mut self) -> CompletedStream {
        self.base.take().expect("stream guard disarmed twice")
    }
}

impl<S: CompletionSink + Send + Sync + 'static> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        let Some(mut record) = self.base.take() else {
            return;
        };
        let text = self
            .raw_text
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default();
        if text.is_empty() {
            return;
        }
        record.full_text = text;
        warn!(message_id = %record.message_id, "stream interrupted, persisting partial transcript");
        let sink = Arc::clone(&self.sink);
        self.tracker.spawn(async move {
            if let Err(e) = sink.persist_message(&record).await {
                error!(message_id = %record.message_id, error = %e, "failed to persist interrupted message");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_types::chat::ConversationKind;
    use cairn_types::context::{DomainConfig, Insight, UserProfile};
    use cairn_types::error::{LedgerError, RepositoryError};
    use cairn_types::event::STREAM_ERROR_MESSAGE;
    use cairn_types::llm::StreamFailure;
    use cairn_types::usage::QuotaDecision;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::ledger::QuotaLimits;
    use crate::llm::StreamingProvider;

    // --- fakes -----------------------------------------------------

    struct ScriptedProvider {
        deltas: Vec<StreamDelta>,
    }

    impl StreamingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn stream(&self, _request: CompletionRequest) -> crate::llm::DeltaStream {
            Box::pin(futures_util::stream::iter(self.deltas.clone()))
        }
    }

    struct CountingLedger {
        count: AtomicU32,
        broken: bool,
    }

    impl UsageLedger for CountingLedger {
        async fn check_and_increment(
            &self,
            _user_id: Uuid,
            _period: &BillingPeriod,
            limit: u32,
        ) -> Result<QuotaDecision, LedgerError> {
            if self.broken {
                return Err(LedgerError::Storage("down".to_string()));
            }
            let current = self.count.load(Ordering::SeqCst);
            if current >= limit {
                return Ok(QuotaDecision::rejected(current, limit));
            }
            let next = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(QuotaDecision::allowed(next, limit))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        persisted: Mutex<Vec<CompletedStream>>,
        usage_logs: Mutex<Vec<CompletedStream>>,
    }

    impl CompletionSink for RecordingSink {
        async fn persist_message(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
            self.persisted.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn record_usage(&self, record: &CompletedStream) -> Result<(), RepositoryError> {
            self.usage_logs.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryMessages {
        saved: Mutex<Vec<StoredMessage>>,
    }

    impl MessageRepository for MemoryMessages {
        async fn save(&self, message: &StoredMessage) -> Result<(), RepositoryError> {
            self.saved.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn for_conversation(
            &self,
            conversation_id: &Uuid,
        ) -> Result<Vec<StoredMessage>, RepositoryError> {
            Ok(self
                .saved
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.conversation_id == *conversation_id)
                .cloned()
                .collect())
        }

        async fn tail(
            &self,
            conversation_id: &Uuid,
            limit: u32,
        ) -> Result<Vec<StoredMessage>, RepositoryError> {
            let mut all = self.for_conversation(conversation_id).await?;
            let skip = all.len().saturating_sub(limit as usize);
            Ok(all.split_off(skip))
        }
    }

    struct EmptyConversations;

    impl ConversationRepository for EmptyConversations {
        async fn get(&self, _id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
            Ok(None)
        }

        async fn recent_for_user(
            &self,
            _user_id: &Uuid,
            _exclude: &Uuid,
            _limit: u32,
        ) -> Result<Vec<Conversation>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    struct EmptyContext;

    impl ContextRepository for EmptyContext {
        async fn profile(&self, _user_id: &Uuid) -> Result<Option<UserProfile>, RepositoryError> {
            Ok(None)
        }

        async fn confirmed_insights(&self, _user_id: &Uuid) -> Result<Vec<Insight>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn domain(&self, _domain_id: &str) -> Result<Option<DomainConfig>, RepositoryError> {
            Ok(None)
        }
    }

    // --- helpers ---------------------------------------------------

    type TestPipeline = ChatPipeline<
        CountingLedger,
        EmptyConversations,
        MemoryMessages,
        EmptyContext,
        RecordingSink,
    >;

    fn pipeline(
        deltas: Vec<StreamDelta>,
        ledger: CountingLedger,
    ) -> (TestPipeline, Arc<RecordingSink>, Arc<MemoryMessages>) {
        let sink = Arc::new(RecordingSink::default());
        let messages = Arc::new(MemoryMessages::default());
        let assembler = ContextAssembler::new(
            EmptyConversations,
            Arc::clone(&messages),
            EmptyContext,
            Duration::from_millis(200),
            500,
        );
        let pipeline = ChatPipeline::new(
            QuotaGate::new(
                ledger,
                QuotaLimits {
                    trial_messages: 100,
                    monthly_messages: 1500,
                },
            ),
            assembler,
            Arc::clone(&messages),
            Arc::new(ScriptedProvider { deltas }),
            Arc::clone(&sink),
            TaskTracker::new(),
            PipelineConfig {
                core_instructions: "You are a coach.".to_string(),
                max_tokens: 1024,
                temperature: 0.7,
            },
        );
        (pipeline, sink, messages)
    }

    fn request(kind: ConversationKind, tier: SubscriptionTier) -> ChatRequest {
        let user_id = Uuid::now_v7();
        ChatRequest {
            user_id,
            tier,
            conversation: Conversation {
                id: Uuid::now_v7(),
                user_id,
                domain: None,
                kind,
                created_at: Utc::now(),
            },
            message: "What should I focus on?".to_string(),
        }
    }

    fn fresh_ledger() -> CountingLedger {
        CountingLedger {
            count: AtomicU32::new(0),
            broken: false,
        }
    }

    // --- tests -----------------------------------------------------

    #[tokio::test]
    async fn happy_path_emits_tokens_then_exactly_one_done() {
        let usage = Usage {
            input_tokens: 50,
            output_tokens: 12,
        };
        let (pipeline, sink, _messages) = pipeline(
            vec![
                StreamDelta::Text("Hi [MEM".to_string()),
                StreamDelta::Text("ORY: your goals] there".to_string()),
                StreamDelta::Complete(usage),
            ],
            fresh_ledger(),
        );

        let stream = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await
            .expect("should be admitted");
        let events: Vec<ChatEvent> = stream.collect().await;

        let dones = events
            .iter()
            .filter(|e| matches!(e, ChatEvent::Done { .. }))
            .count();
        let errors = events
            .iter()
            .filter(|e| matches!(e, ChatEvent::Error { .. }))
            .count();
        assert_eq!(dones, 1);
        assert_eq!(errors, 0);
        assert!(events.last().unwrap().is_terminal());

        // Token order preserved; tag delimiters stripped, flag set.
        match &events[0] {
            ChatEvent::Token { content, memory_moment, .. } => {
                assert_eq!(content, "Hi ");
                assert!(!memory_moment);
            }
            other => panic!("expected token, got {other:?}"),
        }
        match &events[1] {
            ChatEvent::Token { content, memory_moment, .. } => {
                assert_eq!(content, "your goals there");
                assert!(memory_moment);
            }
            other => panic!("expected token, got {other:?}"),
        }

        // Persisted with tags intact, not interrupted.
        let persisted = sink.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].full_text, "Hi [MEMORY: your goals] there");
        assert!(!persisted[0].interrupted);
        assert_eq!(persisted[0].usage, usage);

        // Usage log on the supervised tracker.
        pipeline.tracker().close();
        pipeline.tracker().wait().await;
        assert_eq!(sink.usage_logs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_stream_emits_exactly_one_constant_error() {
        let (pipeline, sink, _messages) = pipeline(
            vec![
                StreamDelta::Text("partial".to_string()),
                StreamDelta::Failed(StreamFailure::Timeout),
            ],
            fresh_ledger(),
        );

        let stream = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await
            .unwrap();
        let events: Vec<ChatEvent> = stream.collect().await;

        assert!(matches!(events[0], ChatEvent::Token { .. }));
        match &events[1] {
            ChatEvent::Error { message } => assert_eq!(message, STREAM_ERROR_MESSAGE),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(events.len(), 2);
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::Done { .. })));

        // Partial transcript persisted as interrupted.
        pipeline.tracker().close();
        pipeline.tracker().wait().await;
        let persisted = sink.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].interrupted);
        assert_eq!(persisted[0].full_text, "partial");
    }

    #[tokio::test]
    async fn exhausted_quota_rejects_before_opening_stream() {
        let (pipeline, sink, messages) = pipeline(
            vec![StreamDelta::Complete(Usage::default())],
            CountingLedger {
                count: AtomicU32::new(100),
                broken: false,
            },
        );

        let result = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Trial))
            .await;
        let rejection = match result {
            Err(r) => r,
            Ok(_) => panic!("expected rejection"),
        };
        assert_eq!(rejection.decision.current_count, 100);
        assert_eq!(rejection.decision.limit, 100);
        assert_eq!(rejection.period, BillingPeriod::Trial);

        // No partial work: no stream, no messages, no persistence.
        assert!(sink.persisted.lock().unwrap().is_empty());
        assert!(messages.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn discovery_requests_bypass_the_ledger() {
        let ledger = CountingLedger {
            count: AtomicU32::new(100),
            broken: false,
        };
        let (pipeline, _sink, _messages) = pipeline(
            vec![
                StreamDelta::Text("ok".to_string()),
                StreamDelta::Complete(Usage::default()),
            ],
            ledger,
        );

        let stream = pipeline
            .run(request(ConversationKind::Discovery, SubscriptionTier::Trial))
            .await
            .expect("discovery must be admitted even at the limit");
        let events: Vec<ChatEvent> = stream.collect().await;
        assert!(matches!(events.last().unwrap(), ChatEvent::Done { .. }));
    }

    #[tokio::test]
    async fn broken_ledger_fails_open() {
        let (pipeline, _sink, _messages) = pipeline(
            vec![StreamDelta::Complete(Usage::default())],
            CountingLedger {
                count: AtomicU32::new(0),
                broken: true,
            },
        );

        let result = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn dropped_stream_persists_partial_as_interrupted() {
        let (pipeline, sink, _messages) = pipeline(
            vec![
                StreamDelta::Text("seen ".to_string()),
                StreamDelta::Text("unseen".to_string()),
                StreamDelta::Complete(Usage::default()),
            ],
            fresh_ledger(),
        );

        let stream = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await
            .unwrap();
        let mut stream = Box::pin(stream);
        let first = stream.next().await;
        assert!(matches!(first, Some(ChatEvent::Token { .. })));
        // Client disconnects here.
        drop(stream);

        pipeline.tracker().close();
        pipeline.tracker().wait().await;
        let persisted = sink.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].interrupted);
        assert_eq!(persisted[0].full_text, "seen ");
    }

    #[tokio::test]
    async fn stream_without_terminal_delta_becomes_an_error() {
        let (pipeline, _sink, _messages) = pipeline(
            vec![StreamDelta::Text("dangling".to_string())],
            fresh_ledger(),
        );

        let stream = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await
            .unwrap();
        let events: Vec<ChatEvent> = stream.collect().await;
        assert!(matches!(events.last().unwrap(), ChatEvent::Error { .. }));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.is_terminal())
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn truncated_tag_is_flushed_before_done() {
        let (pipeline, _sink, _messages) = pipeline(
            vec![
                StreamDelta::Text("note [MEMORY: cut".to_string()),
                StreamDelta::Complete(Usage::default()),
            ],
            fresh_ledger(),
        );

        let stream = pipeline
            .run(request(ConversationKind::Standard, SubscriptionTier::Paid))
            .await
            .unwrap();
        let events: Vec<ChatEvent> = stream.collect().await;

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Token { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "note [MEMORY: cut");
    }

    #[tokio::test]
    async fn user_message_is_persisted_before_streaming() {
        let (pipeline, _sink, messages) = pipeline(
            vec![StreamDelta::Complete(Usage::default())],
            fresh_ledger(),
        );

        let req = request(ConversationKind::Standard, SubscriptionTier::Paid);
        let conversation_id = req.conversation.id;
        let stream = pipeline.run(req).await.unwrap();
        let _events: Vec<ChatEvent> = stream.collect().await;

        let saved = messages.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].role, MessageRole::User);
        assert_eq!(saved[0].conversation_id, conversation_id);
    }
}
