//! Core logic of the brainstorming studio: the conversation session, the
//! staged reveal of replies, and user-flow synthesis.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod diagram;
mod error;
mod handoff;
mod model_client;
pub mod prompts;
pub mod reveal;
mod session;
pub mod store;
mod synthesizer;

pub use conversation::{ChatTurn, SessionMetadata, Speaker, Transcript};
pub use diagram::{DiagramStage, export_file_name};
pub use error::{CompletionFailure, ExportError, HandoffError, StoreError};
pub use handoff::HandoffRecord;
pub use model_client::ModelClient;
pub use session::{
    Activity, ConversationSession, SessionBuilder, SessionSnapshot,
    SessionStage,
};
pub use store::{
    MemoryRecordStore, NewSessionRecord, RecordId, RecordStore, StoredRecord,
};
pub use synthesizer::{DiagramSource, FlowSynthesizer};
