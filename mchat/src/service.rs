//! Chat orchestration: conversation bookkeeping and assistant stream workers.
//!
//! An assistant stream is driven by a detached worker task. For every chunk
//! the worker persists first and publishes second, so a consumer that has
//! seen an event can always read the matching state back from the store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures_util::StreamExt;
use mcommon::{ConversationId, MessageId, MetadataMap};
use mprovider::{GenerationConfig, GenerationManager, GenerationRequest, Message, Role, StreamChunk, TokenUsage};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    ChatError, ChatEventStream, ChatMessage, ChatStreamHooks, ConversationStore, GenerateOptions,
    MODEL_METADATA_KEY, NoopChatStreamHooks, StreamEvent, StreamEventKind,
};

pub const DEFAULT_EVENT_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct ChatService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    manager: Arc<GenerationManager>,
    store: Arc<dyn ConversationStore>,
    hooks: Arc<dyn ChatStreamHooks>,
    event_capacity: usize,
    in_flight: Mutex<HashSet<ConversationId>>,
}

pub struct ChatServiceBuilder {
    manager: Arc<GenerationManager>,
    store: Arc<dyn ConversationStore>,
    hooks: Arc<dyn ChatStreamHooks>,
    event_capacity: usize,
}

impl ChatServiceBuilder {
    pub fn new(manager: Arc<GenerationManager>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            manager,
            store,
            hooks: Arc::new(NoopChatStreamHooks),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ChatStreamHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Bounded event channel size; values below one are raised to one.
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity.max(1);
        self
    }

    pub fn build(self) -> ChatService {
        ChatService {
            inner: Arc::new(ServiceInner {
                manager: self.manager,
                store: self.store,
                hooks: self.hooks,
                event_capacity: self.event_capacity,
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }
}

impl ChatService {
    pub fn new(manager: Arc<GenerationManager>, store: Arc<dyn ConversationStore>) -> Self {
        Self::builder(manager, store).build()
    }

    pub fn builder(
        manager: Arc<GenerationManager>,
        store: Arc<dyn ConversationStore>,
    ) -> ChatServiceBuilder {
        ChatServiceBuilder::new(manager, store)
    }

    pub fn provider_name(&self) -> &str {
        self.inner.manager.provider_name()
    }

    pub fn manager(&self) -> &Arc<GenerationManager> {
        &self.inner.manager
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.inner.store
    }

    pub async fn new_conversation(&self, metadata: MetadataMap) -> Result<ConversationId, ChatError> {
        self.inner.store.create_conversation(metadata).await
    }

    pub async fn add_user_message(
        &self,
        conversation_id: &ConversationId,
        content: impl Into<String>,
        metadata: MetadataMap,
    ) -> Result<MessageId, ChatError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ChatError::invalid_request("user message must not be empty"));
        }

        self.inner
            .store
            .append_user_message(conversation_id, content, metadata)
            .await
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.inner.store.get_conversation(conversation_id).await
    }

    pub async fn conversation_metadata(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<MetadataMap, ChatError> {
        self.inner.store.conversation_metadata(conversation_id).await
    }

    /// Conversation ids, newest first. A `limit` of zero lists all of them.
    pub async fn list(&self, limit: usize) -> Result<Vec<ConversationId>, ChatError> {
        self.inner.store.list_conversations(limit).await
    }

    pub fn is_streaming(&self, conversation_id: &ConversationId) -> bool {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.contains(conversation_id))
            .unwrap_or(false)
    }

    pub async fn start_assistant_stream(
        &self,
        conversation_id: &ConversationId,
        options: GenerateOptions,
    ) -> Result<AssistantStream, ChatError> {
        self.start(conversation_id, options, CancellationToken::new())
            .await
    }

    /// Like [`ChatService::start_assistant_stream`], but cancelling `parent`
    /// also cancels this stream.
    pub async fn start_assistant_stream_with_parent(
        &self,
        conversation_id: &ConversationId,
        options: GenerateOptions,
        parent: &CancellationToken,
    ) -> Result<AssistantStream, ChatError> {
        self.start(conversation_id, options, parent.child_token())
            .await
    }

    async fn start(
        &self,
        conversation_id: &ConversationId,
        options: GenerateOptions,
        cancel: CancellationToken,
    ) -> Result<AssistantStream, ChatError> {
        let guard = InFlightGuard::acquire(&self.inner, conversation_id)?;
        let store = &self.inner.store;
        let provider = self.inner.manager.provider_name().to_string();
        let config = GenerationConfig::from(options);

        let mut metadata = MetadataMap::new();
        if let Some(model) = config.model_override() {
            metadata.insert(MODEL_METADATA_KEY.to_string(), model.to_string());
        }

        let message_id = store
            .create_assistant_message(conversation_id, &provider, metadata)
            .await?;

        let history = match self.history(conversation_id, &message_id).await {
            Ok(history) => history,
            Err(error) => {
                // Best effort; the load error is the one worth reporting.
                let _ = store
                    .fail_assistant_message(conversation_id, &message_id, &error.to_string())
                    .await;
                return Err(error);
            }
        };

        let request = GenerationRequest::new(history)
            .with_config(config)
            .with_resolved_system_prompt();

        let (sender, receiver) = mpsc::channel(self.inner.event_capacity);
        let worker = StreamWorker {
            manager: Arc::clone(&self.inner.manager),
            store: Arc::clone(store),
            hooks: Arc::clone(&self.inner.hooks),
            provider,
            conversation_id: conversation_id.clone(),
            message_id: message_id.clone(),
            events: sender,
            cancel: cancel.clone(),
            started: Instant::now(),
            in_flight: Mutex::new(Some(guard)),
        };

        self.inner
            .hooks
            .on_stream_start(&worker.provider, conversation_id, &message_id);
        tokio::spawn(worker.run(request));

        Ok(AssistantStream {
            conversation_id: conversation_id.clone(),
            message_id,
            events: receiver,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
        })
    }

    /// Provider history for a new reply: everything except the placeholder
    /// and assistant messages that never completed.
    async fn history(
        &self,
        conversation_id: &ConversationId,
        placeholder: &MessageId,
    ) -> Result<Vec<Message>, ChatError> {
        let messages = self.inner.store.get_conversation(conversation_id).await?;

        Ok(messages
            .iter()
            .filter(|message| &message.id != placeholder)
            .filter(|message| message.role != Role::Assistant || message.is_completed())
            .map(ChatMessage::to_provider_message)
            .collect())
    }
}

/// Marks a conversation as having a stream in flight until dropped.
struct InFlightGuard {
    inner: Arc<ServiceInner>,
    conversation_id: ConversationId,
}

impl InFlightGuard {
    fn acquire(inner: &Arc<ServiceInner>, conversation_id: &ConversationId) -> Result<Self, ChatError> {
        let mut in_flight = inner
            .in_flight
            .lock()
            .map_err(|_| ChatError::store("in-flight registry lock poisoned"))?;

        if !in_flight.insert(conversation_id.clone()) {
            return Err(ChatError::conflict(format!(
                "conversation {conversation_id} already has an assistant stream in flight"
            )));
        }

        Ok(Self {
            inner: Arc::clone(inner),
            conversation_id: conversation_id.clone(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = match self.inner.in_flight.lock() {
            Ok(in_flight) => in_flight,
            Err(poisoned) => poisoned.into_inner(),
        };
        in_flight.remove(&self.conversation_id);
    }
}

#[derive(Debug)]
enum StreamOutcome {
    Completed(Option<TokenUsage>),
    Failed(ChatError),
    Cancelled,
}

struct StreamWorker {
    manager: Arc<GenerationManager>,
    store: Arc<dyn ConversationStore>,
    hooks: Arc<dyn ChatStreamHooks>,
    provider: String,
    conversation_id: ConversationId,
    message_id: MessageId,
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    started: Instant,
    in_flight: Mutex<Option<InFlightGuard>>,
}

impl StreamWorker {
    async fn run(self, request: GenerationRequest) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => StreamOutcome::Cancelled,
            outcome = self.drive(request) => outcome,
        };

        self.report(&outcome);
        // Cancelled streams never reach a terminal write.
        self.release();
    }

    /// Frees the conversation for the next stream. Called once the terminal
    /// state is stored and before the terminal event is published.
    fn release(&self) {
        let guard = match self.in_flight.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(guard);
    }

    async fn drive(&self, request: GenerationRequest) -> StreamOutcome {
        let mut stream = match self.manager.generate_stream(request).await {
            Ok(stream) => stream,
            Err(error) => return self.fail(error.into()).await,
        };

        let mut usage = None;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(StreamChunk::Delta(text)) => {
                    if text.is_empty() {
                        continue;
                    }

                    if let Err(error) = self
                        .store
                        .append_assistant_delta(&self.conversation_id, &self.message_id, &text)
                        .await
                    {
                        return self.fail(error).await;
                    }

                    self.hooks
                        .on_delta(&self.conversation_id, &self.message_id, text.len());
                    if !self.publish(StreamEventKind::Delta(text)).await {
                        return StreamOutcome::Cancelled;
                    }
                }
                Ok(StreamChunk::Done {
                    usage: reported, ..
                }) => {
                    usage = reported;
                    break;
                }
                Err(error) => return self.fail(error.into()).await,
            }
        }

        self.complete(usage).await
    }

    async fn complete(&self, usage: Option<TokenUsage>) -> StreamOutcome {
        if let Err(error) = self
            .store
            .complete_assistant_message(&self.conversation_id, &self.message_id, usage)
            .await
        {
            return self.fail(error).await;
        }

        self.release();
        self.publish(StreamEventKind::Done { usage }).await;
        StreamOutcome::Completed(usage)
    }

    async fn fail(&self, error: ChatError) -> StreamOutcome {
        // A store failure here leaves the original error as the one reported.
        let _ = self
            .store
            .fail_assistant_message(&self.conversation_id, &self.message_id, &error.to_string())
            .await;

        self.release();
        self.publish(StreamEventKind::Error(error.clone())).await;
        StreamOutcome::Failed(error)
    }

    async fn publish(&self, kind: StreamEventKind) -> bool {
        self.events
            .send(StreamEvent::new(
                self.conversation_id.clone(),
                self.message_id.clone(),
                kind,
            ))
            .await
            .is_ok()
    }

    fn report(&self, outcome: &StreamOutcome) {
        let elapsed = self.started.elapsed();
        match outcome {
            StreamOutcome::Completed(usage) => self.hooks.on_stream_complete(
                &self.provider,
                &self.conversation_id,
                &self.message_id,
                usage.as_ref(),
                elapsed,
            ),
            StreamOutcome::Failed(error) => self.hooks.on_stream_failed(
                &self.provider,
                &self.conversation_id,
                &self.message_id,
                error,
                elapsed,
            ),
            StreamOutcome::Cancelled => self.hooks.on_stream_cancelled(
                &self.provider,
                &self.conversation_id,
                &self.message_id,
                elapsed,
            ),
        }
    }
}

/// Consumer handle for one assistant reply.
///
/// Events arrive in order and at most one terminal event (`Done` or `Error`)
/// is delivered, after which the channel closes. A cancelled stream closes
/// without a terminal event. Dropping the handle cancels the worker.
#[derive(Debug)]
pub struct AssistantStream {
    conversation_id: ConversationId,
    message_id: MessageId,
    events: mpsc::Receiver<StreamEvent>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl AssistantStream {
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Next event, or `None` once the worker has finished.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drains every remaining event.
    pub async fn collect_events(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    pub fn into_event_stream(self) -> ChatEventStream {
        Box::pin(async_stream::stream! {
            let mut stream = self;
            while let Some(event) = stream.next_event().await {
                yield event;
            }
        })
    }
}
