use serde::{Deserialize, Deserializer, Serialize};

/// Provenance record of one successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, alias = "jira_ticket", deserialize_with = "null_as_default")]
    pub ticket_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub acceptance_criteria: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_size: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub component: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_timestamp: f64,
}

/// Older stores may hold `null` for fields that were optional when written.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Caller-provided fields of a new ledger entry; the ledger fills in the rest.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub ticket_id: String,
    pub priority: String,
    pub acceptance_criteria: String,
    pub file_path: String,
    pub provider: String,
    pub component: String,
    pub test_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring of ticket id or acceptance criteria.
    pub query: Option<String>,
    /// Case-insensitive provider name.
    pub provider: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        if let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let needle = query.to_lowercase();
            let in_ticket = entry.ticket_id.to_lowercase().contains(&needle);
            let in_criteria = entry.acceptance_criteria.to_lowercase().contains(&needle);
            if !in_ticket && !in_criteria {
                return false;
            }
        }
        if let Some(provider) = self.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if !entry.provider.eq_ignore_ascii_case(provider) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_entries: usize,
    pub total_files: usize,
    pub total_size: u64,
    pub providers_used: Vec<String>,
    pub most_recent: Option<HistoryEntry>,
}
