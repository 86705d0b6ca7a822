use crate::application::use_cases::record_formatter::RecordFormatter;
use crate::domain::error::Result;
use crate::domain::generation::{FallbackReason, GenerationRequest};
use crate::domain::history::{HistoryEntry, NewHistoryEntry};
use crate::domain::llm_config::BackendKind;
use crate::domain::test_case::FormattedRecord;
use crate::infrastructure::history::HistoryLedger;
use crate::infrastructure::llm_clients::TestCaseBackend;
use crate::infrastructure::spreadsheet::{merge_logged, MergeReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use validator::Validate;

/// Result of one generation run as seen by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    /// Whether the output file was written.
    pub success: bool,
    pub backend: BackendKind,
    pub records: Vec<FormattedRecord>,
    /// Set when the backend answer was unusable and the fallback case was emitted.
    pub fallback: Option<FallbackReason>,
    pub merge: Option<MergeReport>,
    pub history_entry: Option<HistoryEntry>,
    pub output_path: PathBuf,
}

pub struct GenerateTestCasesUseCase {
    backend: Arc<dyn TestCaseBackend>,
    formatter: RecordFormatter,
    ledger: Option<HistoryLedger>,
    timeout: Duration,
}

impl GenerateTestCasesUseCase {
    pub fn new(
        backend: Arc<dyn TestCaseBackend>,
        formatter: RecordFormatter,
        ledger: Option<HistoryLedger>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            formatter,
            ledger,
            timeout,
        }
    }

    /// Runs backend, formatter, merge and ledger for one request.
    ///
    /// Only an invalid request is returned as `Err`; backend, merge and ledger
    /// failures are reported through the outcome.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
        template_path: &Path,
        output_path: &Path,
    ) -> Result<GenerationOutcome> {
        request.validate()?;

        let kind = self.backend.kind();
        info!(backend = %kind, ticket_id = %request.ticket_id, "Generating test cases");

        let batch = self.backend.generate(request, self.timeout).await;
        let records = self.formatter.format(&batch.drafts, request, 1);

        let merge = merge_logged(template_path, output_path, &records);
        let success = merge.is_some();

        let history_entry = match (&self.ledger, success) {
            (Some(ledger), true) => {
                let entry = NewHistoryEntry {
                    ticket_id: request.ticket_id.clone(),
                    priority: request.priority.to_string(),
                    acceptance_criteria: request.acceptance_criteria.clone(),
                    file_path: output_path.to_string_lossy().into_owned(),
                    provider: kind.to_string(),
                    component: request.component_or_default().to_string(),
                    test_type: request.test_type_or_default().to_string(),
                };
                match ledger.append(entry) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!(path = %ledger.path().display(), error = %err, "Failed to record generation in history");
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(GenerationOutcome {
            success,
            backend: kind,
            records,
            fallback: batch.fallback,
            merge,
            history_entry,
            output_path: output_path.to_path_buf(),
        })
    }
}
