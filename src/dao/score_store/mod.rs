/// CouchDB-backed score store.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-memory score store.
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::ScoreEntity, storage::StorageResult};

/// Abstraction over the persistence layer for ranked scores.
pub trait ScoreStore: Send + Sync {
    /// Persist one score.
    fn put_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Best `limit` scores, highest first.
    fn top_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failure.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
