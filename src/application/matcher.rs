use crate::application::on_store;
use crate::domain::entities::embedding_record::EmbeddingRecord;
use crate::domain::entities::match_result::MatchResult;
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::{CandidateFilter, CorpusStore};
use crate::domain::ports::embedding_port::{EmbeddingProvider, InputType};
use crate::domain::values::match_options::MatchOptions;
use crate::domain::values::similarity::{cosine_similarity, validate_query_vector};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Thresholded top-K cosine matching over the corpus.
///
/// Stateless between calls and cheap to clone; every operation is read-only
/// and therefore safe to retry after `Timeout` or `StorageUnavailable`.
#[derive(Clone)]
pub struct MatcherUseCase {
    store: Arc<dyn CorpusStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    default_timeout: Duration,
}

impl MatcherUseCase {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        dimension: usize,
        default_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embedder,
            dimension,
            default_timeout,
        }
    }

    pub async fn match_by_vector(
        &self,
        query: &[f32],
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        options.validate().map_err(DomainError::InvalidInput)?;
        validate_query_vector(query, self.dimension).map_err(DomainError::InvalidInput)?;

        let filter = CandidateFilter {
            exclude_group_key: None,
            near: Some(query.to_vec()),
        };
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let candidates = self
            .with_deadline(timeout, self.on_store(move |s| s.fetch_candidates(&filter)))
            .await?;

        let results = rank_candidates(query, candidates, options.threshold, options.limit, None);
        debug!(
            threshold = options.threshold,
            limit = options.limit,
            matched = results.len(),
            "Matched by vector"
        );
        Ok(results)
    }

    pub async fn match_by_group_history(
        &self,
        group_key: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        options.validate().map_err(DomainError::InvalidInput)?;
        if group_key.trim().is_empty() {
            return Err(DomainError::InvalidInput("group_key must not be empty".into()));
        }

        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let group = group_key.to_string();
        let dimension = self.dimension;
        let (query, candidates) = self
            .with_deadline(timeout, async {
                let lookup = group.clone();
                let latest = self
                    .on_store(move |s| s.fetch_latest_by_group(&lookup))
                    .await?
                    .and_then(|r| r.vector)
                    .ok_or_else(|| {
                        DomainError::NotFound(format!("No record with a vector in group '{group}'"))
                    })?;
                validate_query_vector(&latest, dimension).map_err(|e| {
                    DomainError::InvalidInput(format!("Latest vector of group '{group}': {e}"))
                })?;

                let filter = CandidateFilter {
                    exclude_group_key: Some(group.clone()),
                    near: Some(latest.clone()),
                };
                let candidates = self.on_store(move |s| s.fetch_candidates(&filter)).await?;
                Ok((latest, candidates))
            })
            .await?;

        let results = rank_candidates(
            &query,
            candidates,
            options.threshold,
            options.limit,
            Some(group_key),
        );
        debug!(
            group_key,
            threshold = options.threshold,
            matched = results.len(),
            "Matched by group history"
        );
        Ok(results)
    }

    /// Embed `text` as a query and match on the resulting vector.
    pub async fn match_by_text(
        &self,
        text: &str,
        options: MatchOptions,
    ) -> Result<Vec<MatchResult>, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::InvalidInput("Query text must not be empty".into()));
        }
        let vector = self
            .embedder
            .embed(&[text.to_string()], InputType::Query)
            .await
            .map_err(DomainError::Embedding)?
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DomainError::Embedding("Provider returned no vector for query".into()))?;
        self.match_by_vector(&vector, options).await
    }

    async fn on_store<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CorpusStore) -> Result<T, DomainError> + Send + 'static,
    {
        on_store(&self.store, f).await
    }

    async fn with_deadline<T>(
        &self,
        timeout: Duration,
        fut: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "Storage call exceeded deadline");
                Err(DomainError::Timeout(timeout))
            }
        }
    }
}

/// Score `candidates` against `query`, keep those strictly above `threshold`,
/// order by descending score then ascending id, and cap at `limit`.
///
/// Records without a vector, with an undefined score, belonging to
/// `exclude_group`, or seen twice are dropped.
pub fn rank_candidates(
    query: &[f32],
    candidates: Vec<EmbeddingRecord>,
    threshold: f64,
    limit: usize,
    exclude_group: Option<&str>,
) -> Vec<MatchResult> {
    if limit == 0 {
        return vec![];
    }
    let mut seen = HashSet::new();
    let mut scored: Vec<MatchResult> = candidates
        .into_iter()
        .filter(|r| Some(r.group_key.as_str()) != exclude_group)
        .filter_map(|record| {
            let score = cosine_similarity(query, record.vector.as_deref()?)?;
            (score > threshold).then_some((record, score))
        })
        .filter(|(record, _)| seen.insert(record.id.clone()))
        .map(|(record, similarity_score)| MatchResult {
            record,
            similarity_score,
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::embedding_record::Payload;

    fn record(id: &str, group: &str, vector: Option<Vec<f32>>) -> EmbeddingRecord {
        let mut r = EmbeddingRecord::new(group.into(), vector, Payload::new());
        r.id = id.into();
        r
    }

    #[test]
    fn test_ties_break_on_ascending_id() {
        let candidates = vec![
            record("c", "g", Some(vec![1.0, 0.0])),
            record("a", "g", Some(vec![2.0, 0.0])),
            record("b", "g", Some(vec![0.5, 0.0])),
        ];
        let ranked = rank_candidates(&[1.0, 0.0], candidates, 0.7, 10, None);
        let ids: Vec<&str> = ranked.iter().map(|m| m.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        // (3, 4) against (1, 0) scores exactly 0.6
        let candidates = vec![record("a", "g", Some(vec![3.0, 4.0]))];
        assert!(rank_candidates(&[1.0, 0.0], candidates.clone(), 0.6, 5, None).is_empty());
        assert_eq!(rank_candidates(&[1.0, 0.0], candidates, 0.59, 5, None).len(), 1);
    }

    #[test]
    fn test_drops_duplicates_nulls_zero_norm_and_excluded_group() {
        let candidates = vec![
            record("a", "g", Some(vec![1.0, 0.0])),
            record("a", "g", Some(vec![1.0, 0.0])),
            record("b", "g", None),
            record("c", "g", Some(vec![0.0, 0.0])),
            record("d", "self", Some(vec![1.0, 0.0])),
            record("e", "g", Some(vec![1.0, 0.0, 0.0])),
        ];
        let ranked = rank_candidates(&[1.0, 0.0], candidates, -1.0, 10, Some("self"));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.id, "a");
    }

    #[test]
    fn test_limit_zero_is_empty() {
        let candidates = vec![record("a", "g", Some(vec![1.0, 0.0]))];
        assert!(rank_candidates(&[1.0, 0.0], candidates, 0.0, 0, None).is_empty());
    }
}
