//! File-backed ledger of successful generations.
//!
//! The store is a single pretty-printed JSON array. Every mutation reads the
//! whole store, changes it in memory and rewrites it atomically. A single
//! writer per store is assumed.

use crate::domain::error::{AppError, Result};
use crate::domain::history::{HistoryEntry, HistoryFilter, HistoryStats, NewHistoryEntry};
use crate::infrastructure::storage::{atomic_write_bytes, file_size_or_zero};
use chrono::Local;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TIMESTAMP_STEP: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
}

impl HistoryLedger {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let ledger = Self { path: path.into() };
        ledger.initialize()?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an empty store if none exists. Safe to call repeatedly.
    pub fn initialize(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        self.save(&[])
    }

    /// Reads every entry in insertion order. An unreadable or corrupt store is
    /// treated as empty and gets replaced by the next write.
    pub fn load(&self) -> Vec<HistoryEntry> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "History store unreadable, treating as empty");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        let values = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "History store corrupt, treating as empty");
                return Vec::new();
            }
        };
        values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value::<HistoryEntry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %self.path.display(), index, error = %e, "Skipping unreadable history entry");
                    None
                }
            })
            .collect()
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        atomic_write_bytes(&self.path, json.as_bytes())
    }

    pub fn append(&self, new_entry: NewHistoryEntry) -> Result<HistoryEntry> {
        let mut entries = self.load();

        let id = entries.iter().map(|entry| entry.id).max().unwrap_or(0) + 1;
        let now = Local::now();
        let mut created_timestamp = now.timestamp_micros() as f64 / 1_000_000.0;
        if let Some(latest) = entries
            .iter()
            .map(|entry| entry.created_timestamp)
            .max_by(f64::total_cmp)
        {
            if created_timestamp <= latest {
                created_timestamp = latest + TIMESTAMP_STEP;
            }
        }

        let file_path = Path::new(&new_entry.file_path);
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let entry = HistoryEntry {
            id,
            ticket_id: new_entry.ticket_id,
            priority: new_entry.priority,
            acceptance_criteria: new_entry.acceptance_criteria,
            file_size: file_size_or_zero(file_path),
            file_name,
            file_path: new_entry.file_path,
            provider: new_entry.provider,
            component: new_entry.component,
            test_type: new_entry.test_type,
            created_date: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            created_timestamp,
        };

        entries.push(entry.clone());
        self.save(&entries)?;
        info!(id = entry.id, ticket_id = %entry.ticket_id, provider = %entry.provider, "Recorded generation in history");
        Ok(entry)
    }

    /// All entries, newest first. Ties keep insertion order.
    pub fn list_all(&self) -> Vec<HistoryEntry> {
        let mut entries = self.load();
        entries.sort_by(|a, b| b.created_timestamp.total_cmp(&a.created_timestamp));
        entries
    }

    pub fn search(&self, filter: &HistoryFilter) -> Vec<HistoryEntry> {
        self.list_all()
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect()
    }

    pub fn get_by_id(&self, id: u64) -> Option<HistoryEntry> {
        self.load().into_iter().find(|entry| entry.id == id)
    }

    pub fn require(&self, id: u64) -> Result<HistoryEntry> {
        self.get_by_id(id)
            .ok_or_else(|| AppError::NotFound(format!("History entry {} not found", id)))
    }

    /// Removes the first entry with `id`; returns whether anything was removed.
    pub fn delete(&self, id: u64) -> Result<bool> {
        let mut entries = self.load();
        let Some(position) = entries.iter().position(|entry| entry.id == id) else {
            return Ok(false);
        };
        entries.remove(position);
        self.save(&entries)?;
        info!(id, "Deleted history entry");
        Ok(true)
    }

    pub fn stats(&self) -> HistoryStats {
        let entries = self.load();

        let providers_used: BTreeSet<String> = entries
            .iter()
            .map(|entry| {
                if entry.provider.is_empty() {
                    "unknown".to_string()
                } else {
                    entry.provider.clone()
                }
            })
            .collect();

        let most_recent = entries
            .iter()
            .max_by(|a, b| a.created_timestamp.total_cmp(&b.created_timestamp))
            .cloned();

        HistoryStats {
            total_entries: entries.len(),
            total_files: entries
                .iter()
                .filter(|entry| !entry.file_path.is_empty() && Path::new(&entry.file_path).exists())
                .count(),
            total_size: entries.iter().map(|entry| entry.file_size).sum(),
            providers_used: providers_used.into_iter().collect(),
            most_recent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(ticket: &str, provider: &str, file_path: &Path) -> NewHistoryEntry {
        NewHistoryEntry {
            ticket_id: ticket.to_string(),
            priority: "High".to_string(),
            acceptance_criteria: format!("{} login works with SSO", ticket),
            file_path: file_path.to_string_lossy().into_owned(),
            provider: provider.to_string(),
            component: "Web Application".to_string(),
            test_type: "Functional".to_string(),
        }
    }

    fn ledger() -> (tempfile::TempDir, HistoryLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = HistoryLedger::open(dir.path().join("testcases").join("history.json")).unwrap();
        (dir, ledger)
    }

    #[test]
    fn test_open_creates_empty_store() {
        let (_dir, ledger) = ledger();
        assert_eq!(fs::read_to_string(ledger.path()).unwrap().trim(), "[]");
        ledger.initialize().unwrap();
        assert!(ledger.list_all().is_empty());
    }

    #[test]
    fn test_append_snapshots_file_and_sorts_first() {
        let (dir, ledger) = ledger();
        let output = dir.path().join("AUTH-1_testcases.xlsx");
        fs::write(&output, [0u8; 42]).unwrap();

        let first = ledger
            .append(new_entry("AUTH-1", "groq", &output))
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.file_name, "AUTH-1_testcases.xlsx");
        assert_eq!(first.file_size, 42);
        assert!(!first.created_date.is_empty());

        for i in 2..=4 {
            let before = ledger.list_all().len();
            let entry = ledger
                .append(new_entry(&format!("AUTH-{}", i), "ollama", &dir.path().join("missing.xlsx")))
                .unwrap();
            let all = ledger.list_all();
            assert_eq!(all.len(), before + 1);
            assert_eq!(all[0], entry);
            assert_eq!(entry.file_size, 0);
        }
    }

    #[test]
    fn test_ids_do_not_collide_after_delete() {
        let (dir, ledger) = ledger();
        let path = dir.path().join("out.xlsx");
        ledger.append(new_entry("A-1", "groq", &path)).unwrap();
        ledger.append(new_entry("A-2", "groq", &path)).unwrap();
        ledger.append(new_entry("A-3", "groq", &path)).unwrap();

        assert!(ledger.delete(1).unwrap());
        let next = ledger.append(new_entry("A-4", "groq", &path)).unwrap();
        assert_eq!(next.id, 4);

        let ids: BTreeSet<u64> = ledger.list_all().iter().map(|entry| entry.id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_delete_missing_id_leaves_store_unchanged() {
        let (dir, ledger) = ledger();
        let path = dir.path().join("out.xlsx");
        ledger.append(new_entry("A-1", "groq", &path)).unwrap();
        ledger.append(new_entry("A-2", "groq", &path)).unwrap();

        assert!(!ledger.delete(99).unwrap());
        assert_eq!(ledger.list_all().len(), 2);

        assert!(ledger.delete(2).unwrap());
        assert_eq!(ledger.list_all().len(), 1);
        assert!(ledger.get_by_id(2).is_none());
        assert!(matches!(ledger.require(2), Err(AppError::NotFound(_))));
        assert_eq!(ledger.require(1).unwrap().ticket_id, "A-1");
    }

    #[test]
    fn test_stats_empty() {
        let (_dir, ledger) = ledger();
        let stats = ledger.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_size, 0);
        assert!(stats.providers_used.is_empty());
        assert!(stats.most_recent.is_none());
    }

    #[test]
    fn test_stats_counts_existing_files_and_providers() {
        let (dir, ledger) = ledger();
        let kept = dir.path().join("kept.csv");
        fs::write(&kept, "Test Key\n").unwrap();
        ledger.append(new_entry("A-1", "ollama", &kept)).unwrap();
        ledger.append(new_entry("A-2", "groq", &dir.path().join("gone.csv"))).unwrap();
        let latest = ledger.append(new_entry("A-3", "groq", &kept)).unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size, 18);
        assert_eq!(stats.providers_used, vec!["groq", "ollama"]);
        assert_eq!(stats.most_recent, Some(latest));
    }

    #[test]
    fn test_search_filters_by_query_and_provider() {
        let (dir, ledger) = ledger();
        let path = dir.path().join("out.xlsx");
        ledger.append(new_entry("PAY-7", "gemini", &path)).unwrap();
        ledger.append(new_entry("AUTH-9", "groq", &path)).unwrap();
        ledger.append(new_entry("PAY-8", "groq", &path)).unwrap();

        let by_query = ledger.search(&HistoryFilter {
            query: Some("pay".to_string()),
            provider: None,
        });
        let tickets: Vec<&str> = by_query.iter().map(|entry| entry.ticket_id.as_str()).collect();
        assert_eq!(tickets, vec!["PAY-8", "PAY-7"]);

        let by_both = ledger.search(&HistoryFilter {
            query: Some("sso".to_string()),
            provider: Some("GROQ".to_string()),
        });
        assert_eq!(by_both.len(), 2);

        assert_eq!(ledger.search(&HistoryFilter::default()).len(), 3);
    }

    #[test]
    fn test_corrupt_store_reads_empty_and_is_replaced() {
        let (dir, ledger) = ledger();
        fs::write(ledger.path(), "{ not json").unwrap();
        assert!(ledger.list_all().is_empty());

        let entry = ledger
            .append(new_entry("FIX-1", "groq", &dir.path().join("out.xlsx")))
            .unwrap();
        assert_eq!(entry.id, 1);
        assert_eq!(ledger.list_all(), vec![entry]);
    }

    #[test]
    fn test_legacy_ticket_key_is_accepted() {
        let (_dir, ledger) = ledger();
        fs::write(
            ledger.path(),
            r#"[{"id": 3, "jira_ticket": "OLD-1", "provider": "groq", "created_timestamp": 1700000000.5}]"#,
        )
        .unwrap();

        let entry = ledger.get_by_id(3).unwrap();
        assert_eq!(entry.ticket_id, "OLD-1");
        assert_eq!(entry.file_size, 0);
    }

    #[test]
    fn test_null_fields_do_not_discard_history() {
        let (dir, ledger) = ledger();
        fs::write(
            ledger.path(),
            r#"[
  {"id": 1, "ticket_id": "OLD-1", "provider": "groq", "component": "Checkout", "created_timestamp": 1700000000.0},
  {"id": 2, "ticket_id": "OLD-2", "provider": "ollama", "component": null, "test_type": null, "file_size": null, "created_timestamp": 1700000100.0}
]"#,
        )
        .unwrap();

        let entries = ledger.list_all();
        assert_eq!(entries.len(), 2);
        let second = ledger.get_by_id(2).unwrap();
        assert_eq!(second.component, "");
        assert_eq!(second.file_size, 0);

        let added = ledger
            .append(new_entry("NEW-1", "gemini", &dir.path().join("NEW-1.xlsx")))
            .unwrap();
        assert_eq!(added.id, 3);
        assert_eq!(ledger.list_all().len(), 3);
        assert_eq!(ledger.get_by_id(1).unwrap().component, "Checkout");
    }

    #[test]
    fn test_malformed_entry_is_skipped_not_the_store() {
        let (_dir, ledger) = ledger();
        fs::write(
            ledger.path(),
            r#"[{"id": "seven", "ticket_id": "BAD-1"}, {"id": 4, "ticket_id": "OK-1", "created_timestamp": 1.0}]"#,
        )
        .unwrap();

        let entries = ledger.list_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ticket_id, "OK-1");
    }
}
