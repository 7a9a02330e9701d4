use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::conversation::{SessionMetadata, Transcript};
use crate::error::{CompletionFailure, ExportError};
use crate::handoff::HandoffRecord;
use crate::store::NewSessionRecord;
use crate::synthesizer::{DiagramSource, FlowSynthesizer};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// Returns the file name a diagram for `app_name` is exported under.
///
/// Whitespace runs become a single `-` and the result is lower-cased, so
/// `"Task Flow"` maps to `task-flow-user-flow.mmd`.
pub fn export_file_name(app_name: &str) -> String {
    let stem = WHITESPACE_RUN.replace_all(app_name, "-").to_lowercase();
    format!("{stem}-user-flow.mmd")
}

/// The screen after a brainstorm: the handed-off transcript plus the
/// user-flow diagram generated from it.
pub struct DiagramStage {
    handoff: HandoffRecord,
    synthesizer: FlowSynthesizer,
    source: Option<DiagramSource>,
}

impl DiagramStage {
    /// Creates a stage with no diagram yet.
    #[inline]
    pub fn new(handoff: HandoffRecord, synthesizer: FlowSynthesizer) -> Self {
        Self {
            handoff,
            synthesizer,
            source: None,
        }
    }

    /// Generates the diagram, replacing the current one on success.
    ///
    /// On failure the stage is left unchanged and the failure is returned
    /// for display. Nothing is retried.
    pub async fn generate(
        &mut self,
    ) -> Result<&DiagramSource, CompletionFailure> {
        let fut = self.synthesizer.synthesize(self.handoff.transcript());
        match fut.await {
            Ok(source) => {
                info!(
                    "generated a user flow for {:?}",
                    self.metadata().app_name()
                );
                Ok(&*self.source.insert(source))
            }
            Err(err) => {
                warn!("failed to generate a user flow: {err}");
                Err(err)
            }
        }
    }

    /// Returns the latest diagram, if one was generated.
    #[inline]
    pub fn source(&self) -> Option<&DiagramSource> {
        self.source.as_ref()
    }

    /// Returns the record this stage was created from.
    #[inline]
    pub fn handoff(&self) -> &HandoffRecord {
        &self.handoff
    }

    /// Returns the brainstorm transcript.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        self.handoff.transcript()
    }

    /// Returns the app name and idea.
    #[inline]
    pub fn metadata(&self) -> &SessionMetadata {
        self.handoff.metadata()
    }

    /// Returns a record of the brainstorm and its latest diagram, ready to
    /// be stored.
    pub fn to_record(&self) -> NewSessionRecord {
        let record = NewSessionRecord::from_handoff(&self.handoff);
        match &self.source {
            Some(source) => record.with_diagram(source.clone()),
            None => record,
        }
    }

    /// Returns the file name the diagram is exported under.
    #[inline]
    pub fn export_file_name(&self) -> String {
        export_file_name(self.metadata().app_name())
    }

    /// Writes the latest diagram into `dir` and returns the file's path.
    pub async fn export_to<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<PathBuf, ExportError> {
        let source = self.source.as_ref().ok_or(ExportError::NothingToExport)?;
        let path = dir.as_ref().join(self.export_file_name());
        tokio::fs::write(&path, source.as_str())
            .await
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("exported the user flow to {}", path.display());
        Ok(path)
    }
}
