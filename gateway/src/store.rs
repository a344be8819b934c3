//! Claim document store
//!
//! Claims are submitted form records: string fields plus uploaded files kept
//! as raw bytes. Lookups filter on exact field values; the reserved key
//! `_id` matches the record id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const ID_KEY: &str = "_id";

/// Failures of a store backend; callers answer 500
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing storage cannot be reached
    #[error("Claim store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, Vec<StoredFile>>,
    pub submitted_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(fields: BTreeMap<String, String>, files: BTreeMap<String, Vec<StoredFile>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            fields,
            files,
            submitted_at: Utc::now(),
        }
    }

    pub fn first_file(&self, field: &str) -> Option<&StoredFile> {
        self.files.get(field).and_then(|files| files.first())
    }

    fn matches(&self, filter: &[(String, String)]) -> bool {
        filter.iter().all(|(key, value)| {
            if key == ID_KEY {
                &self.id == value
            } else {
                self.fields.get(key) == Some(value)
            }
        })
    }
}

/// Claim as returned by the API: fields plus file metadata, no bytes
#[derive(Debug, Clone, Serialize)]
pub struct ClaimSummary {
    pub id: String,
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, Vec<FileSummary>>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: usize,
}

impl From<&ClaimRecord> for ClaimSummary {
    fn from(record: &ClaimRecord) -> Self {
        Self {
            id: record.id.clone(),
            fields: record.fields.clone(),
            files: record
                .files
                .iter()
                .map(|(field, files)| {
                    let summaries = files
                        .iter()
                        .map(|f| FileSummary {
                            filename: f.filename.clone(),
                            content_type: f.content_type.clone(),
                            size: f.bytes.len(),
                        })
                        .collect();
                    (field.clone(), summaries)
                })
                .collect(),
            submitted_at: record.submitted_at,
        }
    }
}

#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Store a claim, returning its id
    async fn insert(&self, record: ClaimRecord) -> Result<String>;

    /// All claims matching every `(field, value)` pair, in insertion order
    async fn find(&self, filter: &[(String, String)]) -> Result<Vec<ClaimRecord>>;

    async fn find_one(&self, filter: &[(String, String)]) -> Result<Option<ClaimRecord>> {
        Ok(self.find(filter).await?.into_iter().next())
    }
}

/// Process-local claim store
#[derive(Default)]
pub struct MemoryClaimStore {
    records: RwLock<Vec<ClaimRecord>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn insert(&self, record: ClaimRecord) -> Result<String> {
        let id = record.id.clone();
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn find(&self, filter: &[(String, String)]) -> Result<Vec<ClaimRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect())
    }
}

/// Find a claim by its business id field, falling back to the record id
pub async fn lookup_claim(
    store: &dyn ClaimStore,
    id_field: &str,
    claim_id: &str,
) -> Result<Option<ClaimRecord>> {
    let by_field = [(id_field.to_string(), claim_id.to_string())];
    if let Some(record) = store.find_one(&by_field).await? {
        return Ok(Some(record));
    }
    store
        .find_one(&[(ID_KEY.to_string(), claim_id.to_string())])
        .await
}
