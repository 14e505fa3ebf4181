//! Provider registry mapping names to adapter constructors.
//!
//! ```rust
//! use mprovider::{ProviderConfig, ProviderErrorKind, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.is_empty());
//!
//! let err = registry
//!     .create("acme", &ProviderConfig::new("key", "model"))
//!     .unwrap_err();
//! assert_eq!(err.kind, ProviderErrorKind::UnsupportedProvider);
//! ```

use std::sync::Arc;

use mcommon::Registry;

use crate::{ProviderAdapter, ProviderConfig, ProviderError};

pub type ProviderConstructor =
    Arc<dyn Fn(&ProviderConfig) -> Result<ProviderAdapter, ProviderError> + Send + Sync>;

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    constructors: Registry<String, ProviderConstructor>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`. Names are write-once.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), ProviderError>
    where
        F: Fn(&ProviderConfig) -> Result<ProviderAdapter, ProviderError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProviderError::configuration(
                "provider name must not be empty",
            ));
        }

        self.constructors
            .try_insert(name.clone(), Arc::new(constructor))
            .map_err(|_| {
                ProviderError::configuration(format!("provider '{name}' is already registered"))
            })
    }

    pub fn create(
        &self,
        name: &str,
        config: &ProviderConfig,
    ) -> Result<ProviderAdapter, ProviderError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ProviderError::unsupported_provider(name))?;

        constructor(config)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.constructors.keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
