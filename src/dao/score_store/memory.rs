//! Process-local ranked index, used when no database is configured.

use std::{cmp::Reverse, collections::BTreeMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{ScoreEntity, rank_order},
    score_store::ScoreStore,
    storage::StorageResult,
};

type RankKey = (Reverse<u64>, Uuid);

/// Score store kept in process memory, ordered best-first.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    scores: Arc<RwLock<BTreeMap<RankKey, ScoreEntity>>>,
}

impl MemoryScoreStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn put_score(&self, score: ScoreEntity) -> BoxFuture<'static, StorageResult<()>> {
        let scores = Arc::clone(&self.scores);
        Box::pin(async move {
            scores
                .write()
                .await
                .insert((Reverse(rank_order(score.score)), score.id), score);
            Ok(())
        })
    }

    fn top_scores(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let scores = Arc::clone(&self.scores);
        Box::pin(async move {
            let guard = scores.read().await;
            Ok(guard.values().take(limit).cloned().collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, pairs: f64, seconds: f64) -> ScoreEntity {
        ScoreEntity::new(name.into(), pairs, seconds, "2025-06-01T10:00:00Z".into())
    }

    #[tokio::test]
    async fn top_scores_are_ordered_best_first() {
        let store = MemoryScoreStore::new();
        store.put_score(entity("slow", 16.0, 250.0)).await.unwrap();
        store.put_score(entity("partial", 9.0, 300.0)).await.unwrap();
        store.put_score(entity("fast", 16.0, 80.0)).await.unwrap();

        let names: Vec<_> = store
            .top_scores(10)
            .await
            .unwrap()
            .into_iter()
            .map(|score| score.name)
            .collect();
        assert_eq!(names, vec!["fast", "slow", "partial"]);
    }

    #[tokio::test]
    async fn equal_scores_are_all_kept() {
        let store = MemoryScoreStore::new();
        store.put_score(entity("a", 4.0, 10.0)).await.unwrap();
        store.put_score(entity("b", 4.0, 10.0)).await.unwrap();

        assert_eq!(store.top_scores(10).await.unwrap().len(), 2);
        assert_eq!(store.top_scores(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn negative_and_fractional_scores_are_ranked() {
        let store = MemoryScoreStore::new();
        store.put_score(entity("late", 0.0, 2.0)).await.unwrap();
        store.put_score(entity("odd", 0.0, -1.5)).await.unwrap();
        store.put_score(entity("zero", 0.0, 0.0)).await.unwrap();

        let names: Vec<_> = store
            .top_scores(10)
            .await
            .unwrap()
            .into_iter()
            .map(|score| score.name)
            .collect();
        assert_eq!(names, vec!["odd", "zero", "late"]);
    }
}
