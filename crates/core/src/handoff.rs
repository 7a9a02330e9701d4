use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{SessionMetadata, Transcript};

/// The complete record of an ended brainstorm, passed on to the diagram
/// stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    transcript: Transcript,
    metadata: SessionMetadata,
    created_at: DateTime<Utc>,
}

impl HandoffRecord {
    /// Creates a record stamped with the current time.
    #[inline]
    pub fn new(transcript: Transcript, metadata: SessionMetadata) -> Self {
        Self {
            transcript,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Returns the full transcript, in order.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the app name and idea.
    #[inline]
    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Returns when the brainstorm ended.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Splits the record into its transcript and metadata.
    #[inline]
    pub fn into_parts(self) -> (Transcript, SessionMetadata) {
        (self.transcript, self.metadata)
    }
}
