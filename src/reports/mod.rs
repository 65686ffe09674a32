//! Attendance history persisted as a single blob in the local store.
//!
//! Every mutation rewrites the full list. The in-memory copy only changes
//! once the write succeeded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::AttendanceReport;
use crate::storage::LocalStore;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const HISTORY_KEY: &str = "attendance_history";
pub const HISTORY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceCorrupt {
    #[error("history blob is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("history blob has unsupported version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize)]
struct HistoryBlobRef<'a> {
    version: u32,
    reports: &'a [AttendanceReport],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Versioned {
        version: u32,
        reports: Vec<AttendanceReport>,
    },
    /// Bare array written before the blob carried a version.
    Legacy(Vec<AttendanceReport>),
}

pub fn decode_history(raw: &str) -> Result<Vec<AttendanceReport>, PersistenceCorrupt> {
    match serde_json::from_str::<StoredHistory>(raw)? {
        StoredHistory::Versioned { version, reports } if version == HISTORY_SCHEMA_VERSION => {
            Ok(reports)
        }
        StoredHistory::Versioned { version, .. } => {
            Err(PersistenceCorrupt::UnsupportedVersion(version))
        }
        StoredHistory::Legacy(reports) => Ok(reports),
    }
}

pub fn encode_history(reports: &[AttendanceReport]) -> Result<String> {
    serde_json::to_string(&HistoryBlobRef {
        version: HISTORY_SCHEMA_VERSION,
        reports,
    })
    .context("failed to serialize attendance history")
}

pub struct ReportStore {
    store: LocalStore,
    reports: RwLock<Vec<AttendanceReport>>,
}

impl ReportStore {
    /// Reads the history once. Unreadable data is logged and treated as empty.
    pub async fn load(store: LocalStore) -> Self {
        let reports = match store.get_item(HISTORY_KEY).await {
            Ok(Some(raw)) => decode_history(&raw).unwrap_or_else(|err| {
                log_warn!("Discarding stored attendance history: {err}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                log_warn!("Failed to read attendance history: {err:#}");
                Vec::new()
            }
        };

        log_info!("Loaded {} attendance report(s)", reports.len());

        Self {
            store,
            reports: RwLock::new(reports),
        }
    }

    /// Most recent first.
    pub async fn list(&self) -> Vec<AttendanceReport> {
        self.reports.read().await.clone()
    }

    pub async fn save(&self, report: AttendanceReport) -> Result<()> {
        let mut guard = self.reports.write().await;
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.push(report);
        next.extend(guard.iter().cloned());

        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    /// Returns whether a report with `id` existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut guard = self.reports.write().await;
        if !guard.iter().any(|report| report.id == id) {
            return Ok(false);
        }

        let next: Vec<AttendanceReport> = guard
            .iter()
            .filter(|report| report.id != id)
            .cloned()
            .collect();

        self.persist(&next).await?;
        *guard = next;
        Ok(true)
    }

    async fn persist(&self, reports: &[AttendanceReport]) -> Result<()> {
        let blob = encode_history(reports)?;
        self.store
            .set_item(HISTORY_KEY, blob)
            .await
            .context("failed to persist attendance history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Student;
    use chrono::Utc;

    fn report(course: &str, present: usize) -> AttendanceReport {
        let students: Vec<Student> = (0..4)
            .map(|index| Student {
                id: (index + 1).to_string(),
                name: format!("S{}", index + 1),
                is_present: index < present,
            })
            .collect();
        AttendanceReport::from_roster(&students, course, "Group A", Utc::now())
    }

    #[tokio::test]
    async fn save_prepends_and_persists() {
        let local = LocalStore::in_memory().unwrap();
        let store = ReportStore::load(local.clone()).await;

        let first = report("first", 1);
        let second = report("second", 2);
        store.save(first.clone()).await.unwrap();
        store.save(second.clone()).await.unwrap();

        assert_eq!(store.list().await, vec![second.clone(), first.clone()]);

        let reloaded = ReportStore::load(local).await;
        assert_eq!(reloaded.list().await, vec![second, first]);
    }

    #[tokio::test]
    async fn save_then_delete_is_net_noop() {
        let local = LocalStore::in_memory().unwrap();
        let store = ReportStore::load(local.clone()).await;
        store.save(report("a", 1)).await.unwrap();
        store.save(report("b", 2)).await.unwrap();
        let before = store.list().await;

        let extra = report("c", 3);
        store.save(extra.clone()).await.unwrap();
        assert!(store.delete(&extra.id).await.unwrap());

        assert_eq!(store.list().await, before);
        assert_eq!(ReportStore::load(local).await.list().await, before);
    }

    #[tokio::test]
    async fn delete_keeps_order_of_remaining() {
        let store = ReportStore::load(LocalStore::in_memory().unwrap()).await;
        let a = report("a", 0);
        let b = report("b", 1);
        let c = report("c", 2);
        for r in [a.clone(), b.clone(), c.clone()] {
            store.save(r).await.unwrap();
        }

        assert!(store.delete(&b.id).await.unwrap());
        assert_eq!(store.list().await, vec![c, a]);
        assert!(!store.delete("missing").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_blob_loads_as_empty() {
        let local = LocalStore::in_memory().unwrap();
        local
            .set_item(HISTORY_KEY, "{not json".into())
            .await
            .unwrap();

        let store = ReportStore::load(local).await;
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn legacy_array_blob_is_accepted() {
        let local = LocalStore::in_memory().unwrap();
        let legacy = vec![report("legacy", 2)];
        local
            .set_item(HISTORY_KEY, serde_json::to_string(&legacy).unwrap())
            .await
            .unwrap();

        let store = ReportStore::load(local).await;
        assert_eq!(store.list().await, legacy);
    }

    #[test]
    fn future_version_is_rejected() {
        let raw = r#"{ "version": 7, "reports": [] }"#;
        assert!(matches!(
            decode_history(raw),
            Err(PersistenceCorrupt::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn wrong_field_types_are_rejected() {
        let raw = r#"[{ "id": 1, "timestamp": "yesterday" }]"#;
        assert!(matches!(decode_history(raw), Err(PersistenceCorrupt::Malformed(_))));
    }

    #[test]
    fn encoded_blob_carries_version() {
        let blob = encode_history(&[report("x", 1)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&blob).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["reports"].as_array().unwrap().len(), 1);
    }
}
