//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use mcommon::{ConversationId, IdGenerator, MetadataMap};
//!
//! let ids = IdGenerator::new();
//! let first = ids.conversation_id();
//! let second = ids.conversation_id();
//! let mut metadata = MetadataMap::new();
//! metadata.insert("title".to_string(), "scratch".to_string());
//!
//! assert!(first < second);
//! assert!(first.as_str().starts_with("conv-"));
//! assert_eq!(ConversationId::from("conv-1").to_string(), "conv-1");
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use mcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Shared metadata and conversation identifier newtypes.
    //!
    //! ```rust
    //! use mcommon::{ConversationId, MessageId, MetadataMap};
    //!
    //! let conversation = ConversationId::new("conv-42");
    //! let message = MessageId::from("msg-7");
    //! let mut metadata = MetadataMap::new();
    //! metadata.insert("model".to_string(), "m".to_string());
    //!
    //! assert_eq!(conversation.to_string(), "conv-42");
    //! assert_eq!(message.as_str(), "msg-7");
    //! ```

    use std::collections::HashMap;
    use std::fmt::{Display, Formatter};

    pub type MetadataMap = HashMap<String, String>;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ConversationId(String);

    impl ConversationId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for ConversationId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for ConversationId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for ConversationId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct MessageId(String);

    impl MessageId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for MessageId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for MessageId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for MessageId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod ids {
    //! Time-derived, strictly increasing identifier minting.
    //!
    //! Every id is `<prefix>-<20 digit sequence>`, where the sequence is the
    //! larger of the current unix time in nanoseconds and the previous value
    //! plus one. Zero padding keeps lexicographic order equal to mint order.
    //!
    //! ```rust
    //! use mcommon::IdGenerator;
    //!
    //! let ids = IdGenerator::new();
    //! let a = ids.message_id();
    //! let b = ids.message_id();
    //! assert!(a < b);
    //! assert!(IdGenerator::sequence_of(a.as_str()).is_some());
    //! ```

    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::context::{ConversationId, MessageId};

    pub const CONVERSATION_PREFIX: &str = "conv";
    pub const MESSAGE_PREFIX: &str = "msg";

    #[derive(Debug, Default)]
    pub struct IdGenerator {
        last: AtomicU64,
    }

    impl IdGenerator {
        pub const fn new() -> Self {
            Self {
                last: AtomicU64::new(0),
            }
        }

        /// Returns the next sequence value, never equal to or below a value
        /// previously returned or observed by this generator.
        pub fn next_sequence(&self) -> u64 {
            let now = unix_nanos();
            let mut last = self.last.load(Ordering::Acquire);
            loop {
                let candidate = now.max(last.saturating_add(1));
                match self.last.compare_exchange_weak(
                    last,
                    candidate,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return candidate,
                    Err(actual) => last = actual,
                }
            }
        }

        /// Raises the floor so later ids sort after `sequence`.
        pub fn observe(&self, sequence: u64) {
            self.last.fetch_max(sequence, Ordering::AcqRel);
        }

        pub fn conversation_id(&self) -> ConversationId {
            ConversationId::new(format_id(CONVERSATION_PREFIX, self.next_sequence()))
        }

        pub fn message_id(&self) -> MessageId {
            MessageId::new(format_id(MESSAGE_PREFIX, self.next_sequence()))
        }

        pub fn sequence_of(id: &str) -> Option<u64> {
            let (_, digits) = id.rsplit_once('-')?;
            digits.parse().ok()
        }
    }

    fn format_id(prefix: &str, sequence: u64) -> String {
        format!("{prefix}-{sequence:020}")
    }

    fn unix_nanos() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

pub mod registry {
    //! Generic write-once registry map used by runtime registries.
    //!
    //! ```rust
    //! use mcommon::Registry;
    //!
    //! let mut registry = Registry::new();
    //! assert!(registry.try_insert("alpha".to_string(), 1_u32).is_ok());
    //! assert_eq!(registry.try_insert("alpha".to_string(), 2_u32), Err(2));
    //!
    //! assert_eq!(registry.get("alpha"), Some(&1));
    //! assert!(registry.contains_key("alpha"));
    //! ```

    use std::borrow::Borrow;
    use std::collections::HashMap;
    use std::hash::Hash;

    #[derive(Debug, Clone)]
    pub struct Registry<K, V> {
        items: HashMap<K, V>,
    }

    impl<K, V> Default for Registry<K, V>
    where
        K: Eq + Hash,
    {
        fn default() -> Self {
            Self {
                items: HashMap::new(),
            }
        }
    }

    impl<K, V> Registry<K, V>
    where
        K: Eq + Hash,
    {
        pub fn new() -> Self {
            Self::default()
        }

        /// Inserts `value` unless `key` is already present, in which case the
        /// rejected value is handed back.
        pub fn try_insert(&mut self, key: K, value: V) -> Result<(), V> {
            if self.items.contains_key(&key) {
                return Err(value);
            }

            self.items.insert(key, value);
            Ok(())
        }

        pub fn get<Q>(&self, key: &Q) -> Option<&V>
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.get(key)
        }

        pub fn contains_key<Q>(&self, key: &Q) -> bool
        where
            K: Borrow<Q>,
            Q: Eq + Hash + ?Sized,
        {
            self.items.contains_key(key)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> {
            self.items.keys()
        }

        pub fn len(&self) -> usize {
            self.items.len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.is_empty()
        }
    }
}

pub use context::{ConversationId, MessageId, MetadataMap};
pub use future::BoxFuture;
pub use ids::IdGenerator;
pub use registry::Registry;
