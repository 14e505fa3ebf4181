use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mchat::prelude::*;
use mmemory::{SqliteConversationStore, StoreConfig, create_conversation_store};
use mprovider::{
    BoxedChunkStream, ChatProvider, GeneratedMessage, GenerationManager, GenerationRequest,
    ProviderAdapter, ProviderError, ProviderFuture, StreamChunk, StreamingProvider, TokenUsage,
    VecChunkStream,
};

struct HelloProvider;

impl ChatProvider for HelloProvider {
    fn name(&self) -> &str {
        "hello"
    }

    fn generate<'a>(
        &'a self,
        _request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GeneratedMessage, ProviderError>> {
        Box::pin(async { Err(ProviderError::transport("generate should not be called")) })
    }

    fn list_models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<String>, ProviderError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

impl StreamingProvider for HelloProvider {
    fn generate_stream<'a>(
        &'a self,
        _request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            Ok(Box::pin(VecChunkStream::new(vec![
                Ok(StreamChunk::Delta("He".to_string())),
                Ok(StreamChunk::Delta("llo".to_string())),
                Ok(StreamChunk::Done {
                    finish_reason: Some("stop".to_string()),
                    usage: Some(TokenUsage::new(4, 2)),
                }),
            ])) as BoxedChunkStream<'a>)
        })
    }
}

fn temp_path(prefix: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("mmemory-{prefix}-{unique}"))
        .join("conversations.sqlite3")
}

fn service(store: Arc<dyn ConversationStore>) -> ChatService {
    ChatService::new(
        Arc::new(GenerationManager::from_adapter(ProviderAdapter::streaming(
            HelloProvider,
        ))),
        store,
    )
}

#[tokio::test]
async fn streamed_reply_is_durable() {
    let path = temp_path("service");
    let conversation = {
        let service = service(Arc::new(
            SqliteConversationStore::new(&path).expect("store should open"),
        ));
        let conversation = service
            .new_conversation(MetadataMap::new())
            .await
            .expect("conversation should be created");
        service
            .add_user_message(&conversation, "Say hello", MetadataMap::new())
            .await
            .expect("user message should append");

        let events = service
            .start_assistant_stream(&conversation, GenerateOptions::new())
            .await
            .expect("stream should start")
            .collect_events()
            .await;
        assert_eq!(events.len(), 3);
        conversation
    };

    let store = SqliteConversationStore::new(&path).expect("store should reopen");
    let messages = store
        .get_conversation(&conversation)
        .await
        .expect("conversation should load");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hello");
    assert_eq!(messages[1].state(), MessageState::Completed);
    assert_eq!(messages[1].usage, Some(TokenUsage::new(4, 2)));
    assert_eq!(messages[1].provider.as_deref(), Some("hello"));

    drop(store);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[tokio::test]
async fn factory_builds_both_store_kinds() {
    let memory = create_conversation_store(StoreConfig::InMemory).expect("memory store");
    let conversation = memory
        .create_conversation(MetadataMap::new())
        .await
        .expect("conversation should be created");
    assert_eq!(memory.list_conversations(0).await.expect("list"), vec![conversation]);

    let path = temp_path("factory");
    let sqlite = create_conversation_store(StoreConfig::Sqlite { path: path.clone() })
        .expect("sqlite store");
    assert!(sqlite.list_conversations(0).await.expect("list").is_empty());
    assert!(path.exists());

    drop(sqlite);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
