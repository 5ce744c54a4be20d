use crate::domain::entities::embedding_record::{EmbeddingRecord, Payload};
use crate::domain::error::DomainError;
use crate::domain::ports::corpus_store::{CandidateFilter, CorpusStats, CorpusStore};
use crate::infrastructure::sqlite::migrations::run_migrations;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const SELECT_COLS: &str = "id, group_key, vector, fields, metadata, created_at, updated_at";

/// Exact-scan corpus backed by a single SQLite connection.
pub struct SqliteCorpusStore {
    conn: Mutex<Connection>,
}

impl SqliteCorpusStore {
    /// Open (or create) the corpus at `db_path` and pin its dimensionality.
    ///
    /// A database created for one dimension refuses to open with another.
    pub fn open(db_path: &str, dimension: usize) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::StorageUnavailable(format!("DB error: {e}")))?;
        if db_path != ":memory:" {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| DomainError::StorageUnavailable(format!("WAL error: {e}")))?;
        }
        run_migrations(&conn)?;
        let store = Self::new(conn);
        store.pin_dimension(dimension)?;
        info!(path = db_path, dimension, "Opened SQLite corpus");
        Ok(store)
    }

    /// Wrap an already-migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn stored_dimension(&self) -> Result<Option<usize>, DomainError> {
        let conn = self.lock()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM corpus_meta WHERE key = 'dimension'",
                [],
                |r| r.get(0),
            )
            .optional()?;
        value
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|e| DomainError::Parse(format!("Stored dimension '{v}': {e}")))
            })
            .transpose()
    }

    fn pin_dimension(&self, dimension: usize) -> Result<(), DomainError> {
        match self.stored_dimension()? {
            Some(stored) if stored != dimension => Err(DomainError::InvalidInput(format!(
                "Corpus was created with dimension {stored} but {dimension} was requested"
            ))),
            Some(_) => Ok(()),
            None => {
                let conn = self.lock()?;
                conn.execute(
                    "INSERT INTO corpus_meta (key, value) VALUES ('dimension', ?1)",
                    params![dimension.to_string()],
                )?;
                Ok(())
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DomainError> {
        self.conn
            .lock()
            .map_err(|e| DomainError::StorageUnavailable(e.to_string()))
    }

    fn serialize_vector(v: &[f32]) -> Vec<u8> {
        v.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_vector(bytes: &[u8]) -> Option<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }

    /// Fixed-width UTC so that `ORDER BY created_at` sorts chronologically.
    fn format_time(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<EmbeddingRecord, rusqlite::Error> {
        let blob: Option<Vec<u8>> = row.get(2)?;
        let fields_str: String = row.get(3)?;
        let metadata_str: String = row.get(4)?;
        let created_str: String = row.get(5)?;
        let updated_str: String = row.get(6)?;

        let vector = match blob {
            Some(bytes) => Some(Self::deserialize_vector(&bytes).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    Type::Blob,
                    format!("vector blob of {} bytes is not a whole number of f32s", bytes.len())
                        .into(),
                )
            })?),
            None => None,
        };
        let json_err =
            |idx: usize, e: serde_json::Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e));

        Ok(EmbeddingRecord {
            id: row.get(0)?,
            group_key: row.get(1)?,
            vector,
            payload: Payload {
                fields: serde_json::from_str(&fields_str).map_err(|e| json_err(3, e))?,
                metadata: serde_json::from_str(&metadata_str).map_err(|e| json_err(4, e))?,
            },
            created_at: Self::parse_time(5, &created_str)?,
            updated_at: Self::parse_time(6, &updated_str)?,
        })
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::types::ToSql],
    ) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Read, mutate and write back one record inside an immediate
    /// transaction. `mutate` returns false to leave the row untouched.
    fn modify(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut EmbeddingRecord) -> bool,
    ) -> Result<Option<(EmbeddingRecord, bool)>, DomainError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sql = format!("SELECT {SELECT_COLS} FROM embedding_records WHERE id = ?1");
        let Some(mut record) = Self::query_records(&tx, &sql, params![id])?.into_iter().next() else {
            return Ok(None);
        };
        if !mutate(&mut record) {
            return Ok(Some((record, false)));
        }
        tx.execute(
            "UPDATE embedding_records
             SET vector = ?2, fields = ?3, metadata = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                record.id,
                record.vector.as_deref().map(Self::serialize_vector),
                serde_json::to_string(&record.payload.fields)?,
                serde_json::to_string(&record.payload.metadata)?,
                Self::format_time(&record.updated_at),
            ],
        )?;
        tx.commit()?;
        debug!(id, "Updated record");
        Ok(Some((record, true)))
    }
}

impl CorpusStore for SqliteCorpusStore {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let conn = self.lock()?;
        let records = match &filter.exclude_group_key {
            Some(group) => Self::query_records(
                &conn,
                &format!(
                    "SELECT {SELECT_COLS} FROM embedding_records WHERE vector IS NOT NULL AND group_key != ?1"
                ),
                params![group],
            )?,
            None => Self::query_records(
                &conn,
                &format!("SELECT {SELECT_COLS} FROM embedding_records WHERE vector IS NOT NULL"),
                params![],
            )?,
        };
        debug!(candidates = records.len(), "Fetched candidates from SQLite");
        Ok(records)
    }

    fn fetch_latest_by_group(&self, group_key: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLS} FROM embedding_records
             WHERE group_key = ?1 AND vector IS NOT NULL
             ORDER BY created_at DESC, seq DESC LIMIT 1"
        );
        Ok(Self::query_records(&conn, &sql, params![group_key])?.into_iter().next())
    }

    fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO embedding_records (id, group_key, vector, fields, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.group_key,
                record.vector.as_deref().map(Self::serialize_vector),
                serde_json::to_string(&record.payload.fields)?,
                serde_json::to_string(&record.payload.metadata)?,
                Self::format_time(&record.created_at),
                Self::format_time(&record.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(DomainError::InvalidInput(format!(
                    "Record id already exists: {}",
                    record.id
                )))
            }
            Err(e) => Err(DomainError::StorageUnavailable(format!(
                "Failed to insert record: {e}"
            ))),
        }
    }

    fn get(&self, id: &str) -> Result<Option<EmbeddingRecord>, DomainError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SELECT_COLS} FROM embedding_records WHERE id = ?1");
        Ok(Self::query_records(&conn, &sql, params![id])?.into_iter().next())
    }

    fn merge_payload(&self, id: &str, changes: Payload) -> Result<Option<EmbeddingRecord>, DomainError> {
        let outcome = self.modify(id, |r| {
            r.update_payload(changes);
            true
        })?;
        Ok(outcome.map(|(record, _)| record))
    }

    fn set_vector(&self, id: &str, vector: Vec<f32>) -> Result<Option<EmbeddingRecord>, DomainError> {
        let outcome = self.modify(id, |r| {
            r.set_vector(vector);
            true
        })?;
        Ok(outcome.map(|(record, _)| record))
    }

    fn set_vector_if_missing(&self, id: &str, vector: Vec<f32>) -> Result<bool, DomainError> {
        let outcome = self.modify(id, |r| {
            if r.has_vector() {
                return false;
            }
            r.set_vector(vector);
            true
        })?;
        Ok(matches!(outcome, Some((_, true))))
    }

    fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM embedding_records WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn records_missing_vectors(&self) -> Result<Vec<EmbeddingRecord>, DomainError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLS} FROM embedding_records WHERE vector IS NULL ORDER BY seq"
        );
        Self::query_records(&conn, &sql, params![])
    }

    fn stats(&self) -> Result<CorpusStats, DomainError> {
        let conn = self.lock()?;
        let (total, with_vector, groups): (usize, usize, usize) = conn.query_row(
            "SELECT COUNT(*), COUNT(vector), COUNT(DISTINCT group_key) FROM embedding_records",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        Ok(CorpusStats {
            total_records: total,
            with_vector,
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteCorpusStore {
        SqliteCorpusStore::open(":memory:", 2).unwrap()
    }

    #[test]
    fn test_vector_blob_layout() {
        let bytes = SqliteCorpusStore::serialize_vector(&[1.0, -0.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(
            SqliteCorpusStore::deserialize_vector(&bytes),
            Some(vec![1.0, -0.5])
        );
        assert_eq!(SqliteCorpusStore::deserialize_vector(&bytes[..7]), None);
    }

    #[test]
    fn test_dimension_is_pinned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.db");
        let path = path.to_str().unwrap();
        SqliteCorpusStore::open(path, 3).unwrap();
        let reopened = SqliteCorpusStore::open(path, 3).unwrap();
        assert_eq!(reopened.stored_dimension().unwrap(), Some(3));
        assert!(matches!(
            SqliteCorpusStore::open(path, 4),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let s = store();
        let r = EmbeddingRecord::new("g".into(), Some(vec![1.0, 0.0]), Payload::new());
        s.insert(&r).unwrap();
        assert!(matches!(s.insert(&r), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_roundtrip_preserves_record() {
        let s = store();
        let payload = Payload::new()
            .with_field("business_type", "agency")
            .with_metadata("source", serde_json::json!({"channel": "chat"}));
        let r = EmbeddingRecord::new("g".into(), None, payload);
        s.insert(&r).unwrap();
        let loaded = s.get(&r.id).unwrap().unwrap();
        assert_eq!(loaded.payload, r.payload);
        assert_eq!(loaded.vector, None);
        assert_eq!(
            loaded.created_at.timestamp_micros(),
            r.created_at.timestamp_micros()
        );
    }

    #[test]
    fn test_latest_by_group_skips_null_vectors() {
        let s = store();
        let mut older = EmbeddingRecord::new("g".into(), Some(vec![1.0, 0.0]), Payload::new());
        older.created_at -= chrono::Duration::minutes(5);
        older.updated_at = older.created_at;
        let newer = EmbeddingRecord::new("g".into(), None, Payload::new());
        s.insert(&older).unwrap();
        s.insert(&newer).unwrap();
        let latest = s.fetch_latest_by_group("g").unwrap().unwrap();
        assert_eq!(latest.id, older.id);
        assert!(s.fetch_latest_by_group("other").unwrap().is_none());
    }

    #[test]
    fn test_set_vector_if_missing_only_fills_empty_records() {
        let s = store();
        let filled = EmbeddingRecord::new("g".into(), Some(vec![1.0, 0.0]), Payload::new());
        let empty = EmbeddingRecord::new("g".into(), None, Payload::new());
        s.insert(&filled).unwrap();
        s.insert(&empty).unwrap();

        assert!(!s.set_vector_if_missing(&filled.id, vec![0.0, 1.0]).unwrap());
        assert!(s.set_vector_if_missing(&empty.id, vec![0.0, 1.0]).unwrap());
        assert!(!s.set_vector_if_missing("missing", vec![0.0, 1.0]).unwrap());

        assert_eq!(s.get(&filled.id).unwrap().unwrap().vector, Some(vec![1.0, 0.0]));
        assert_eq!(s.get(&empty.id).unwrap().unwrap().vector, Some(vec![0.0, 1.0]));
        assert!(s.records_missing_vectors().unwrap().is_empty());
    }

    #[test]
    fn test_merge_payload_keeps_vector_and_created_at() {
        let s = store();
        let r = EmbeddingRecord::new(
            "g".into(),
            Some(vec![1.0, 0.0]),
            Payload::new().with_field("conversation_stage", "greeting"),
        );
        s.insert(&r).unwrap();
        let merged = s
            .merge_payload(&r.id, Payload::new().with_field("conversation_stage", "closing"))
            .unwrap()
            .unwrap();
        let loaded = s.get(&r.id).unwrap().unwrap();
        assert_eq!(loaded, merged);
        assert_eq!(loaded.vector, Some(vec![1.0, 0.0]));
        assert_eq!(loaded.created_at, r.created_at);
        assert_eq!(loaded.payload.field("conversation_stage"), Some("closing"));
        assert!(s.merge_payload("missing", Payload::new()).unwrap().is_none());
    }
}
