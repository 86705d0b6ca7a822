use crate::domain::generation::{DraftRecord, GenerationRequest};
use crate::domain::test_case::FormattedRecord;

/// Status column values stamped on every generated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterDefaults {
    pub test_status: String,
    pub automation_status: String,
}

impl Default for FormatterDefaults {
    fn default() -> Self {
        Self {
            test_status: "Draft".to_string(),
            automation_status: "Not Automated".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordFormatter {
    defaults: FormatterDefaults,
}

impl RecordFormatter {
    pub fn new(defaults: FormatterDefaults) -> Self {
        Self { defaults }
    }

    /// Maps drafts onto the canonical columns, numbering test keys from `sequence_start`.
    pub fn format(
        &self,
        drafts: &[DraftRecord],
        request: &GenerationRequest,
        sequence_start: usize,
    ) -> Vec<FormattedRecord> {
        drafts
            .iter()
            .enumerate()
            .map(|(offset, draft)| self.format_one(draft, request, sequence_start + offset))
            .collect()
    }

    fn format_one(
        &self,
        draft: &DraftRecord,
        request: &GenerationRequest,
        sequence: usize,
    ) -> FormattedRecord {
        FormattedRecord {
            test_key: FormattedRecord::test_key(&request.ticket_id, sequence),
            title: draft.title.clone(),
            preconditions: draft.preconditions.clone(),
            priority: request.priority.to_string(),
            test_steps: draft.steps.clone(),
            data_for_steps: draft.test_data.clone(),
            expected_results: draft.expected_results.clone(),
            jira_story_id: request.ticket_id.clone(),
            test_type: request.test_type_or_default().to_string(),
            component: request.component_or_default().to_string(),
            release: request.release_or_default().to_string(),
            test_case_status: self.defaults.test_status.clone(),
            tags: draft.tags.clone(),
            automation_status: self.defaults.automation_status.clone(),
            // Filled in later by automation tooling.
            automation_key: String::new(),
        }
    }
}
