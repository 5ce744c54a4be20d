use crate::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::{CandidateFilter, CorpusStats, CorpusStore};
use crate::domain::ports::vector_index::VectorIndex;
use crate::infrastructure::index::flat::FlatIndex;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct StoredRecord {
    record: EmbeddingRecord,
    /// Insertion order, breaks `created_at` ties in favour of the later insert.
    seq: u64,
}

struct Corpus {
    records: HashMap<String, StoredRecord>,
    index: Box<dyn VectorIndex>,
    next_seq: u64,
}

/// Process-local corpus. Candidate pruning is delegated to a [`VectorIndex`].
///
/// All reads happen under one read lock, so a caller sees a consistent
/// snapshot of records and their vectors.
pub struct InMemoryCorpusStore {
    corpus: RwLock<Corpus>,
}

impl InMemoryCorpusStore {
    pub fn new() -> Self {
        Self::with_index(Box::new(FlatIndex::new()))
    }

    pub fn with_index(index: Box<dyn VectorIndex>) -> Self {
        Self {
            corpus: RwLock::new(Corpus {
                records: HashMap::new(),
                index,
                next_seq: 0,
            }),
        }
    }
}

impl Corpus {
    /// Apply `mutate` to the stored record. `mutate` reports whether it
    /// changed the vector, in which case the index entry is refreshed.
    fn modify(
        &mut self,
        id: &str,
        mutate: impl FnOnce(&mut EmbeddingRecord) -> bool,
    ) -> Option<(EmbeddingRecord, bool)> {
        let stored = self.records.get_mut(id)?;
        let changed = mutate(&mut stored.record);
        if changed {
            match &stored.record.vector {
                Some(v) => self.index.insert(id, v),
                None => {
                    self.index.remove(id);
                }
            }
        }
        Some((stored.record.clone(), changed))
    }
}

impl Default for InMemoryCorpusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CorpusStore for InMemoryCorpusStore {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let corpus = self.corpus.read();
        let excluded = filter.exclude_group_key.as_deref();
        let keep = |r: &EmbeddingRecord| r.has_vector() && Some(r.group_key.as_str()) != excluded;

        let records: Vec<EmbeddingRecord> = match &filter.near {
            Some(query) => {
                let ids: HashSet<String> = corpus.index.candidates(query).into_iter().collect();
                ids.iter()
                    .filter_map(|id| corpus.records.get(id))
                    .map(|s| &s.record)
                    .filter(|r| keep(r))
                    .cloned()
                    .collect()
            }
            None => corpus
                .records
                .values()
                .map(|s| &s.record)
                .filter(|r| keep(r))
                .cloned()
                .collect(),
        };
        debug!(
            candidates = records.len(),
            indexed = corpus.index.len(),
            index = corpus.index.name(),
            "Fetched candidates from memory"
        );
        Ok(records)
    }

    fn fetch_latest_by_group(&self, group_key: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        let corpus = self.corpus.read();
        Ok(corpus
            .records
            .values()
            .filter(|s| s.record.group_key == group_key && s.record.has_vector())
            .max_by(|a, b| {
                a.record
                    .created_at
                    .cmp(&b.record.created_at)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|s| s.record.clone()))
    }

    fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError> {
        let mut corpus = self.corpus.write();
        if corpus.records.contains_key(&record.id) {
            return Err(DomainError::InvalidInput(format!(
                "Record id already exists: {}",
                record.id
            )));
        }
        if let Some(v) = &record.vector {
            corpus.index.insert(&record.id, v);
        }
        let seq = corpus.next_seq;
        corpus.next_seq += 1;
        corpus.records.insert(
            record.id.clone(),
            StoredRecord {
                record: record.clone(),
                seq,
            },
        );
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        Ok(self.corpus.read().records.get(id).map(|s| s.record.clone()))
    }

    fn merge_payload(&self, id: &str, changes: Payload) -> Result<Option<EmbeddingRecord>, DomainError> {
        let mut corpus = self.corpus.write();
        Ok(corpus
            .modify(id, |r| {
                r.update_payload(changes);
                false
            })
            .map(|(record, _)| record))
    }

    fn set_vector(&self, id: &str, vector: Vec<f32>) -> Result<Option<EmbeddingRecord>, DomainError> {
        let mut corpus = self.corpus.write();
        Ok(corpus
            .modify(id, |r| {
                r.set_vector(vector);
                true
            })
            .map(|(record, _)| record))
    }

    fn set_vector_if_missing(&self, id: &str, vector: Vec<f32>) -> Result<bool, DomainError> {
        let mut corpus = self.corpus.write();
        let outcome = corpus.modify(id, |r| {
            if r.has_vector() {
                return false;
            }
            r.set_vector(vector);
            true
        });
        Ok(matches!(outcome, Some((_, true))))
    }

    fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut corpus = self.corpus.write();
        if corpus.records.remove(id).is_none() {
            return Ok(false);
        }
        corpus.index.remove(id);
        Ok(true)
    }

    fn records_missing_vectors(&self) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let corpus = self.corpus.read();
        let mut missing: Vec<&StoredRecord> = corpus
            .records
            .values()
            .filter(|s| !s.record.has_vector())
            .collect();
        missing.sort_by_key(|s| s.seq);
        Ok(missing.into_iter().map(|s| s.record.clone()).collect())
    }

    fn stats(&self) -> Result<CorpusStats, DomainError> {
        let corpus = self.corpus.read();
        let groups: HashSet<&str> = corpus
            .records
            .values()
            .map(|s| s.record.group_key.as_str())
            .collect();
        Ok(CorpusStats {
            total_records: corpus.records.len(),
            with_vector: corpus.records.values().filter(|s| s.record.has_vector()).count(),
            groups: groups.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::embedding_record::Payload;

    fn record(group: &str, vector: Option<Vec<f32>>) -> EmbeddingRecord {
        EmbeddingRecord::new(group.to_string(), vector, Payload::new())
    }

    #[test]
    fn test_candidates_exclude_null_vectors_and_group() {
        let store = InMemoryCorpusStore::new();
        store.insert(&record("a", Some(vec![1.0, 0.0]))).unwrap();
        store.insert(&record("a", None)).unwrap();
        store.insert(&record("b", Some(vec![0.0, 1.0]))).unwrap();

        let all = store.fetch_candidates(&CandidateFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let filter = CandidateFilter {
            exclude_group_key: Some("a".into()),
            near: Some(vec![1.0, 0.0]),
        };
        let others = store.fetch_candidates(&filter).unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].group_key, "b");
    }

    #[test]
    fn test_latest_tie_goes_to_later_insert() {
        let store = InMemoryCorpusStore::new();
        let first = record("g", Some(vec![1.0, 0.0]));
        let mut second = record("g", Some(vec![0.0, 1.0]));
        second.created_at = first.created_at;
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();
        let latest = store.fetch_latest_by_group("g").unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[test]
    fn test_set_vector_tracks_index() {
        let store = InMemoryCorpusStore::new();
        let r = record("g", None);
        store.insert(&r).unwrap();
        assert!(store.fetch_candidates(&CandidateFilter::default()).unwrap().is_empty());

        let updated = store.set_vector(&r.id, vec![1.0, 0.0]).unwrap().unwrap();
        assert_eq!(updated.created_at, r.created_at);
        assert!(updated.updated_at >= r.updated_at);
        let filter = CandidateFilter {
            near: Some(vec![1.0, 0.0]),
            ..Default::default()
        };
        assert_eq!(store.fetch_candidates(&filter).unwrap().len(), 1);
        assert!(store.set_vector("missing", vec![1.0, 0.0]).unwrap().is_none());
    }

    #[test]
    fn test_set_vector_if_missing_keeps_existing_vector() {
        let store = InMemoryCorpusStore::new();
        let r = record("g", Some(vec![1.0, 0.0]));
        store.insert(&r).unwrap();
        assert!(!store.set_vector_if_missing(&r.id, vec![0.0, 1.0]).unwrap());
        assert_eq!(store.get(&r.id).unwrap().unwrap().vector, Some(vec![1.0, 0.0]));

        let empty = record("g", None);
        store.insert(&empty).unwrap();
        assert!(store.set_vector_if_missing(&empty.id, vec![0.0, 1.0]).unwrap());
        assert!(!store.set_vector_if_missing("missing", vec![0.0, 1.0]).unwrap());
    }

    #[test]
    fn test_merge_payload_keeps_vector() {
        let store = InMemoryCorpusStore::new();
        let r = record("g", Some(vec![1.0, 0.0]));
        store.insert(&r).unwrap();
        let merged = store
            .merge_payload(&r.id, Payload::new().with_field("conversation_stage", "closing"))
            .unwrap()
            .unwrap();
        assert_eq!(merged.vector, Some(vec![1.0, 0.0]));
        assert_eq!(merged.payload.field("conversation_stage"), Some("closing"));
    }

    #[test]
    fn test_delete_and_stats() {
        let store = InMemoryCorpusStore::new();
        let r = record("g", Some(vec![1.0, 0.0]));
        store.insert(&r).unwrap();
        store.insert(&record("h", None)).unwrap();
        assert_eq!(
            store.stats().unwrap(),
            CorpusStats {
                total_records: 2,
                with_vector: 1,
                groups: 2
            }
        );
        assert!(store.delete(&r.id).unwrap());
        assert!(!store.delete(&r.id).unwrap());
        assert_eq!(store.records_missing_vectors().unwrap().len(), 1);
    }
}
