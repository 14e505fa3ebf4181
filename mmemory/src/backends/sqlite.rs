use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mchat::{ChatError, ChatFuture, ChatMessage, ConversationStore, ERROR_METADATA_KEY};
use mcommon::{ConversationId, IdGenerator, MessageId, MetadataMap};
use mprovider::{Role, TokenUsage};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::MemoryError;

/// Conversation store persisted in a single SQLite database.
///
/// Every delta is one `UPDATE` appending to the stored content, so a crash
/// mid-stream leaves the partial reply on disk.
#[derive(Debug)]
pub struct SqliteConversationStore {
    connection: Mutex<Connection>,
    ids: IdGenerator,
}

const MESSAGE_COLUMNS: &str = "
    id, conversation_id, role, content, provider,
    created_at_secs, created_at_nanos,
    completed_at_secs, completed_at_nanos,
    failed_at_secs, failed_at_nanos,
    prompt_tokens, completion_tokens, total_tokens,
    metadata_json
";

impl SqliteConversationStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                MemoryError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            MemoryError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, MemoryError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            MemoryError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, MemoryError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                MemoryError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;

        let store = Self {
            connection: Mutex::new(connection),
            ids: IdGenerator::new(),
        };
        store.initialize_schema()?;
        store.observe_existing_ids()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.connection
            .lock()
            .map_err(|_| MemoryError::storage("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                metadata_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                provider TEXT,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                completed_at_secs INTEGER,
                completed_at_nanos INTEGER,
                failed_at_secs INTEGER,
                failed_at_nanos INTEGER,
                prompt_tokens INTEGER,
                completion_tokens INTEGER,
                total_tokens INTEGER,
                metadata_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation_seq
            ON messages(conversation_id, seq);
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    /// Keeps freshly minted ids ordered after ids written by earlier processes.
    fn observe_existing_ids(&self) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        for query in [
            "SELECT MAX(id) FROM conversations",
            "SELECT MAX(id) FROM messages",
        ] {
            let latest = conn
                .query_row(query, [], |row| row.get::<_, Option<String>>(0))
                .map_err(|error| {
                    MemoryError::storage(format!("failed to read latest id: {error}"))
                })?;
            if let Some(sequence) = latest.as_deref().and_then(IdGenerator::sequence_of) {
                self.ids.observe(sequence);
            }
        }

        Ok(())
    }

    fn insert_message(
        &self,
        conversation_id: &ConversationId,
        role: Role,
        content: &str,
        provider: Option<&str>,
        metadata: &MetadataMap,
    ) -> Result<MessageId, MemoryError> {
        let conn = self.connection()?;
        require_conversation(&conn, conversation_id)?;

        let id = self.ids.message_id();
        let created_at = SystemTime::now();
        let (secs, nanos) = encode_system_time(created_at)?;
        let (completed_secs, completed_nanos) = if role == Role::Assistant {
            (None, None)
        } else {
            (Some(secs), Some(nanos))
        };

        conn.execute(
            "
            INSERT INTO messages (
                id, conversation_id, role, content, provider,
                created_at_secs, created_at_nanos,
                completed_at_secs, completed_at_nanos,
                metadata_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                id.as_str(),
                conversation_id.as_str(),
                role.as_str(),
                content,
                provider,
                secs,
                nanos,
                completed_secs,
                completed_nanos,
                encode_metadata(metadata)?,
            ],
        )
        .map_err(|error| MemoryError::storage(format!("failed to insert message: {error}")))?;

        Ok(id)
    }

    fn append_delta(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        delta: &str,
    ) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        let status = assistant_status(&conn, conversation_id, message_id)?;
        if status.is_terminal() {
            return Err(MemoryError::invalid_request(format!(
                "message {message_id} is no longer streaming"
            )));
        }
        if delta.is_empty() {
            return Ok(());
        }

        conn.execute(
            "UPDATE messages SET content = content || ?1 WHERE id = ?2",
            params![delta, message_id.as_str()],
        )
        .map_err(|error| MemoryError::storage(format!("failed to append delta: {error}")))?;

        Ok(())
    }

    fn complete(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        usage: Option<TokenUsage>,
    ) -> Result<(), MemoryError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(|error| {
            MemoryError::storage(format!("failed to begin transaction: {error}"))
        })?;

        let status = assistant_status(&tx, conversation_id, message_id)?;
        if status.completed {
            return Ok(());
        }
        if status.failed {
            return Err(MemoryError::invalid_request(format!(
                "message {message_id} already failed"
            )));
        }

        let (secs, nanos) = encode_system_time(SystemTime::now())?;
        tx.execute(
            "
            UPDATE messages SET
                completed_at_secs = ?1,
                completed_at_nanos = ?2,
                prompt_tokens = ?3,
                completion_tokens = ?4,
                total_tokens = ?5
            WHERE id = ?6
            ",
            params![
                secs,
                nanos,
                usage.map(|usage| usage.prompt_tokens),
                usage.map(|usage| usage.completion_tokens),
                usage.map(|usage| usage.total_tokens),
                message_id.as_str(),
            ],
        )
        .map_err(|error| MemoryError::storage(format!("failed to complete message: {error}")))?;

        tx.commit().map_err(|error| {
            MemoryError::storage(format!("failed to commit completion: {error}"))
        })
    }

    fn fail(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        reason: &str,
    ) -> Result<(), MemoryError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction().map_err(|error| {
            MemoryError::storage(format!("failed to begin transaction: {error}"))
        })?;

        let status = assistant_status(&tx, conversation_id, message_id)?;
        if status.is_terminal() {
            return Ok(());
        }

        let mut metadata = decode_metadata(&status.metadata_json)?;
        metadata.insert(ERROR_METADATA_KEY.to_string(), reason.to_string());
        let (secs, nanos) = encode_system_time(SystemTime::now())?;
        tx.execute(
            "
            UPDATE messages SET
                failed_at_secs = ?1,
                failed_at_nanos = ?2,
                metadata_json = ?3
            WHERE id = ?4
            ",
            params![secs, nanos, encode_metadata(&metadata)?, message_id.as_str()],
        )
        .map_err(|error| MemoryError::storage(format!("failed to fail message: {error}")))?;

        tx.commit()
            .map_err(|error| MemoryError::storage(format!("failed to commit failure: {error}")))
    }

    fn list(&self, limit: usize) -> Result<Vec<ConversationId>, MemoryError> {
        let conn = self.connection()?;
        // SQLite treats a negative limit as unbounded.
        let limit = match limit {
            0 => -1,
            limit => i64::try_from(limit).unwrap_or(i64::MAX),
        };

        let mut stmt = conn
            .prepare("SELECT id FROM conversations ORDER BY rowid DESC LIMIT ?1")
            .map_err(|error| {
                MemoryError::storage(format!("failed to prepare conversation query: {error}"))
            })?;
        let rows = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))
            .map_err(|error| {
                MemoryError::storage(format!("failed to query conversations: {error}"))
            })?;

        rows.map(|row| {
            row.map(ConversationId::from).map_err(|error| {
                MemoryError::storage(format!("failed to read conversation row: {error}"))
            })
        })
        .collect()
    }

    fn messages(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>, MemoryError> {
        let conn = self.connection()?;
        require_conversation(&conn, conversation_id)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY seq ASC"
            ))
            .map_err(|error| {
                MemoryError::storage(format!("failed to prepare message query: {error}"))
            })?;
        let rows = stmt
            .query_map(params![conversation_id.as_str()], MessageRow::read)
            .map_err(|error| MemoryError::storage(format!("failed to query messages: {error}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let row = row.map_err(|error| {
                MemoryError::storage(format!("failed to read message row: {error}"))
            })?;
            messages.push(row.into_message()?);
        }
        Ok(messages)
    }

    fn metadata(&self, conversation_id: &ConversationId) -> Result<MetadataMap, MemoryError> {
        let conn = self.connection()?;
        let metadata_json = conn
            .query_row(
                "SELECT metadata_json FROM conversations WHERE id = ?1",
                params![conversation_id.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| {
                MemoryError::storage(format!("failed to query conversation: {error}"))
            })?
            .ok_or_else(|| conversation_not_found(conversation_id))?;

        decode_metadata(&metadata_json)
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create_conversation<'a>(
        &'a self,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<ConversationId, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let id = self.ids.conversation_id();
            let (secs, nanos) = encode_system_time(SystemTime::now())?;

            conn.execute(
                "
                INSERT INTO conversations (id, created_at_secs, created_at_nanos, metadata_json)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![id.as_str(), secs, nanos, encode_metadata(&metadata)?],
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to insert conversation: {error}"))
            })?;

            Ok(id)
        })
    }

    fn append_user_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        content: String,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            Ok(self.insert_message(conversation_id, Role::User, &content, None, &metadata)?)
        })
    }

    fn create_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        provider: &'a str,
        metadata: MetadataMap,
    ) -> ChatFuture<'a, Result<MessageId, ChatError>> {
        Box::pin(async move {
            Ok(self.insert_message(
                conversation_id,
                Role::Assistant,
                "",
                Some(provider),
                &metadata,
            )?)
        })
    }

    fn append_assistant_delta<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        delta: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.append_delta(conversation_id, message_id, delta)?) })
    }

    fn complete_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        usage: Option<TokenUsage>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.complete(conversation_id, message_id, usage)?) })
    }

    fn fail_assistant_message<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message_id: &'a MessageId,
        reason: &'a str,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.fail(conversation_id, message_id, reason)?) })
    }

    fn list_conversations<'a>(
        &'a self,
        limit: usize,
    ) -> ChatFuture<'a, Result<Vec<ConversationId>, ChatError>> {
        Box::pin(async move { Ok(self.list(limit)?) })
    }

    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move { Ok(self.messages(conversation_id)?) })
    }

    fn conversation_metadata<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<MetadataMap, ChatError>> {
        Box::pin(async move { Ok(self.metadata(conversation_id)?) })
    }
}

struct AssistantStatus {
    completed: bool,
    failed: bool,
    metadata_json: String,
}

impl AssistantStatus {
    fn is_terminal(&self) -> bool {
        self.completed || self.failed
    }
}

fn assistant_status(
    conn: &Connection,
    conversation_id: &ConversationId,
    message_id: &MessageId,
) -> Result<AssistantStatus, MemoryError> {
    require_conversation(conn, conversation_id)?;

    let (role, status) = conn
        .query_row(
            "
            SELECT role, completed_at_secs IS NOT NULL, failed_at_secs IS NOT NULL, metadata_json
            FROM messages
            WHERE id = ?1 AND conversation_id = ?2
            ",
            params![message_id.as_str(), conversation_id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    AssistantStatus {
                        completed: row.get(1)?,
                        failed: row.get(2)?,
                        metadata_json: row.get(3)?,
                    },
                ))
            },
        )
        .optional()
        .map_err(|error| MemoryError::storage(format!("failed to query message: {error}")))?
        .ok_or_else(|| {
            MemoryError::not_found(format!(
                "message {message_id} not found in conversation {conversation_id}"
            ))
        })?;

    if role != Role::Assistant.as_str() {
        return Err(MemoryError::invalid_request(format!(
            "message {message_id} is not an assistant message"
        )));
    }

    Ok(status)
}

fn require_conversation(conn: &Connection, conversation_id: &ConversationId) -> Result<(), MemoryError> {
    conn.query_row(
        "SELECT 1 FROM conversations WHERE id = ?1",
        params![conversation_id.as_str()],
        |_| Ok(()),
    )
    .optional()
    .map_err(|error| MemoryError::storage(format!("failed to query conversation: {error}")))?
    .ok_or_else(|| conversation_not_found(conversation_id))
}

fn conversation_not_found(conversation_id: &ConversationId) -> MemoryError {
    MemoryError::not_found(format!("conversation {conversation_id} not found"))
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    provider: Option<String>,
    created_at: (i64, i64),
    completed_at: (Option<i64>, Option<i64>),
    failed_at: (Option<i64>, Option<i64>),
    usage: (Option<u32>, Option<u32>, Option<u32>),
    metadata_json: String,
}

impl MessageRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            provider: row.get(4)?,
            created_at: (row.get(5)?, row.get(6)?),
            completed_at: (row.get(7)?, row.get(8)?),
            failed_at: (row.get(9)?, row.get(10)?),
            usage: (row.get(11)?, row.get(12)?, row.get(13)?),
            metadata_json: row.get(14)?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, MemoryError> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            MemoryError::storage(format!("unknown message role value '{}'", self.role))
        })?;
        let usage = match self.usage {
            (Some(prompt_tokens), Some(completion_tokens), Some(total_tokens)) => Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            }),
            _ => None,
        };

        Ok(ChatMessage {
            id: MessageId::from(self.id),
            conversation_id: ConversationId::from(self.conversation_id),
            role,
            content: self.content,
            provider: self.provider,
            created_at: decode_system_time(self.created_at.0, self.created_at.1)?,
            completed_at: decode_optional_time(self.completed_at)?,
            failed_at: decode_optional_time(self.failed_at)?,
            usage,
            metadata: decode_metadata(&self.metadata_json)?,
        })
    }
}

fn encode_metadata(metadata: &MetadataMap) -> Result<String, MemoryError> {
    serde_json::to_string(metadata)
        .map_err(|error| MemoryError::storage(format!("failed to encode metadata: {error}")))
}

fn decode_metadata(value: &str) -> Result<MetadataMap, MemoryError> {
    serde_json::from_str(value)
        .map_err(|error| MemoryError::storage(format!("failed to decode metadata: {error}")))
}

fn encode_system_time(value: SystemTime) -> Result<(i64, i64), MemoryError> {
    let duration = value.duration_since(UNIX_EPOCH).map_err(|error| {
        MemoryError::invalid_request(format!("timestamp predates unix epoch: {error}"))
    })?;
    let seconds = i64::try_from(duration.as_secs())
        .map_err(|_| MemoryError::invalid_request("timestamp is too far in the future"))?;
    Ok((seconds, i64::from(duration.subsec_nanos())))
}

fn decode_system_time(seconds: i64, nanos: i64) -> Result<SystemTime, MemoryError> {
    let (Ok(seconds), Ok(nanos)) = (u64::try_from(seconds), u32::try_from(nanos)) else {
        return Err(MemoryError::storage(format!(
            "invalid timestamp {seconds}s {nanos}ns"
        )));
    };
    if nanos >= 1_000_000_000 {
        return Err(MemoryError::storage(format!(
            "timestamp nanos must be in [0, 1_000_000_000), got {nanos}"
        )));
    }
    Ok(UNIX_EPOCH + Duration::new(seconds, nanos))
}

fn decode_optional_time(value: (Option<i64>, Option<i64>)) -> Result<Option<SystemTime>, MemoryError> {
    match value {
        (Some(seconds), Some(nanos)) => decode_system_time(seconds, nanos).map(Some),
        (None, None) => Ok(None),
        _ => Err(MemoryError::storage(
            "timestamp must include both seconds and nanos",
        )),
    }
}
