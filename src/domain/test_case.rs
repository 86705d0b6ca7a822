use serde::{Deserialize, Serialize};

/// Output spreadsheet header, in column order.
pub const CANONICAL_COLUMNS: [&str; 15] = [
    "Test Key",
    "Title",
    "Preconditions",
    "Priority",
    "Test Steps",
    "Data for Steps",
    "Expected Results",
    "Jira Story ID",
    "Test Type",
    "Component",
    "Release",
    "Test Case Status",
    "Tags",
    "Automation Status",
    "Automation Key",
];

/// One row of the canonical test case sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedRecord {
    #[serde(rename = "Test Key")]
    pub test_key: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Preconditions")]
    pub preconditions: String,
    #[serde(rename = "Priority")]
    pub priority: String,
    #[serde(rename = "Test Steps")]
    pub test_steps: String,
    #[serde(rename = "Data for Steps")]
    pub data_for_steps: String,
    #[serde(rename = "Expected Results")]
    pub expected_results: String,
    #[serde(rename = "Jira Story ID")]
    pub jira_story_id: String,
    #[serde(rename = "Test Type")]
    pub test_type: String,
    #[serde(rename = "Component")]
    pub component: String,
    #[serde(rename = "Release")]
    pub release: String,
    #[serde(rename = "Test Case Status")]
    pub test_case_status: String,
    #[serde(rename = "Tags")]
    pub tags: String,
    #[serde(rename = "Automation Status")]
    pub automation_status: String,
    #[serde(rename = "Automation Key")]
    pub automation_key: String,
}

impl FormattedRecord {
    pub fn test_key(ticket_id: &str, sequence: usize) -> String {
        format!("{}-TC-{:03}", ticket_id, sequence)
    }

    /// Field values aligned with [`CANONICAL_COLUMNS`].
    pub fn values(&self) -> [&str; 15] {
        [
            self.test_key.as_str(),
            self.title.as_str(),
            self.preconditions.as_str(),
            self.priority.as_str(),
            self.test_steps.as_str(),
            self.data_for_steps.as_str(),
            self.expected_results.as_str(),
            self.jira_story_id.as_str(),
            self.test_type.as_str(),
            self.component.as_str(),
            self.release.as_str(),
            self.test_case_status.as_str(),
            self.tags.as_str(),
            self.automation_status.as_str(),
            self.automation_key.as_str(),
        ]
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        CANONICAL_COLUMNS
            .iter()
            .position(|name| *name == column)
            .map(|index| self.values()[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_zero_padded() {
        assert_eq!(FormattedRecord::test_key("BULK-001", 1), "BULK-001-TC-001");
        assert_eq!(FormattedRecord::test_key("BULK-001", 42), "BULK-001-TC-042");
        assert_eq!(FormattedRecord::test_key("X", 1234), "X-TC-1234");
    }

    #[test]
    fn test_serialized_keys_match_canonical_columns() {
        let record = FormattedRecord {
            test_key: "A-TC-001".to_string(),
            title: "t".to_string(),
            preconditions: String::new(),
            priority: "High".to_string(),
            test_steps: String::new(),
            data_for_steps: String::new(),
            expected_results: String::new(),
            jira_story_id: "A".to_string(),
            test_type: "Functional".to_string(),
            component: "Web Application".to_string(),
            release: "1.0".to_string(),
            test_case_status: "Draft".to_string(),
            tags: String::new(),
            automation_status: "Not Automated".to_string(),
            automation_key: String::new(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), CANONICAL_COLUMNS.len());
        for column in CANONICAL_COLUMNS {
            assert!(object.contains_key(column), "missing {}", column);
        }
        assert_eq!(record.get("Jira Story ID"), Some("A"));
        assert_eq!(record.get("Unknown"), None);
    }
}
