pub mod conversation;
pub mod matcher;
pub mod records;
pub mod reindex;
pub mod stats;

use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::CorpusStore;
use std::sync::Arc;

/// Run a blocking store call off the async executor.
pub(crate) async fn on_store<T, F>(store: &Arc<dyn CorpusStore>, f: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CorpusStore) -> Result<T, DomainError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| DomainError::StorageUnavailable(format!("Storage task failed: {e}")))?
}
