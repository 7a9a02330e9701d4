//! Persistence seam for finished brainstorms and their diagrams.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{SessionMetadata, Transcript};
use crate::error::StoreError;
use crate::handoff::HandoffRecord;
use crate::synthesizer::DiagramSource;

/// Identifies a stored session record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an id issued by a store.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the id as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A session about to be stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSessionRecord {
    /// The app name and idea.
    pub metadata: SessionMetadata,
    /// The brainstorm transcript.
    pub transcript: Transcript,
    /// A diagram generated before the record was stored.
    pub diagram: Option<DiagramSource>,
}

impl NewSessionRecord {
    /// Builds a record from an ended brainstorm, without a diagram.
    #[inline]
    pub fn from_handoff(handoff: &HandoffRecord) -> Self {
        Self::from(handoff.clone())
    }

    /// Attaches a diagram to the record.
    #[inline]
    pub fn with_diagram(mut self, diagram: DiagramSource) -> Self {
        self.diagram = Some(diagram);
        self
    }
}

impl From<HandoffRecord> for NewSessionRecord {
    fn from(handoff: HandoffRecord) -> Self {
        let (transcript, metadata) = handoff.into_parts();
        Self {
            metadata,
            transcript,
            diagram: None,
        }
    }
}

/// A session as kept by a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The id issued on creation.
    pub id: RecordId,
    /// The app name and idea.
    pub metadata: SessionMetadata,
    /// The brainstorm transcript.
    pub transcript: Transcript,
    /// The latest diagram, if one was saved.
    pub diagram: Option<DiagramSource>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// Where session records are saved.
pub trait RecordStore: Send + Sync {
    /// Stores a new record and returns its id.
    fn create_record(
        &self,
        record: NewSessionRecord,
    ) -> impl Future<Output = Result<RecordId, StoreError>> + Send;

    /// Attaches a diagram to an existing record, replacing any previous
    /// one.
    fn update_diagram(
        &self,
        id: &RecordId,
        diagram: DiagramSource,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A [`RecordStore`] that keeps everything in memory.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RecordId, StoredRecord>>,
    next_id: AtomicU64,
}

impl MemoryRecordStore {
    /// Returns a copy of the record with the given id.
    pub fn get(&self, id: &RecordId) -> Option<StoredRecord> {
        self.lock().get(id).cloned()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RecordId, StoredRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryRecordStore {
    async fn create_record(
        &self,
        record: NewSessionRecord,
    ) -> Result<RecordId, StoreError> {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = RecordId(format!("session-{seq}"));
        let now = Utc::now();
        self.lock().insert(
            id.clone(),
            StoredRecord {
                id: id.clone(),
                metadata: record.metadata,
                transcript: record.transcript,
                diagram: record.diagram,
                created_at: now,
                updated_at: now,
            },
        );
        debug!("created record {id}");
        Ok(id)
    }

    async fn update_diagram(
        &self,
        id: &RecordId,
        diagram: DiagramSource,
    ) -> Result<(), StoreError> {
        let mut records = self.lock();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.diagram = Some(diagram);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ChatTurn;

    fn handoff() -> HandoffRecord {
        HandoffRecord::new(
            Transcript::from(vec![
                ChatTurn::user("App Name: TaskFlow\n\nApp Idea: to-dos"),
                ChatTurn::assistant("Who is it for?"),
            ]),
            SessionMetadata::new("TaskFlow", "to-dos"),
        )
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let store = MemoryRecordStore::default();
        assert!(store.is_empty());

        let first = store
            .create_record(NewSessionRecord::from_handoff(&handoff()))
            .await
            .unwrap();
        let second = store
            .create_record(NewSessionRecord::from_handoff(&handoff()))
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);

        let record = store.get(&first).unwrap();
        assert_eq!(record.metadata.app_name(), "TaskFlow");
        assert_eq!(record.transcript.len(), 2);
        assert_eq!(record.diagram, None);

        store
            .update_diagram(&first, DiagramSource::new("graph TD"))
            .await
            .unwrap();
        let record = store.get(&first).unwrap();
        assert_eq!(
            record.diagram.as_ref().map(DiagramSource::as_str),
            Some("graph TD")
        );
        assert!(record.updated_at >= record.created_at);
        assert_eq!(store.get(&second).unwrap().diagram, None);
    }

    #[tokio::test]
    async fn test_create_with_diagram() {
        let store = MemoryRecordStore::default();
        let record = NewSessionRecord::from(handoff())
            .with_diagram(DiagramSource::new("graph TD\n  A --> B"));
        let id = store.create_record(record).await.unwrap();

        let stored = store.get(&id).unwrap();
        assert_eq!(
            stored.diagram.as_ref().map(DiagramSource::as_str),
            Some("graph TD\n  A --> B")
        );
        assert_eq!(stored.metadata.app_idea(), "to-dos");
        assert_eq!(stored.transcript.len(), 2);
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_record() {
        let store = MemoryRecordStore::default();
        let result = store
            .update_diagram(&RecordId::new("nope"), DiagramSource::new("x"))
            .await;
        assert_eq!(result, Err(StoreError::NotFound("nope".to_owned())));
    }
}
