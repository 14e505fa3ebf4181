//! Operational hook contracts for provider calls.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    Generate,
    GenerateStream,
    ListModels,
    Close,
}

impl ProviderOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::GenerateStream => "generate_stream",
            Self::ListModels => "list_models",
            Self::Close => "close",
        }
    }
}

impl Display for ProviderOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for manager-level provider calls. For `GenerateStream`, success
/// means the stream was opened.
pub trait ProviderOperationHooks: Send + Sync {
    fn on_operation_start(&self, _provider: &str, _operation: ProviderOperation) {}

    fn on_success(&self, _provider: &str, _operation: ProviderOperation, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _provider: &str,
        _operation: ProviderOperation,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}
