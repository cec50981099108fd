//! Compares declared index settings with the remote ones and pushes the
//! local definition where they differ.

use crate::error::Result;
use crate::indexer::{IndexNameOptions, Indexer};
use crate::types::{Record, TaskId};
use indexmap::IndexMap;
use serde_json::Value;

/// One setting that differs. `remote` is `None` when the key is not set
/// remotely at all.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingDelta {
    pub key: String,
    pub local: Value,
    pub remote: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiffStatus {
    /// The index does not exist remotely yet.
    New,
    Changed(Vec<SettingDelta>),
    InSync,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDiff {
    pub index_name: String,
    pub local: Record,
    pub status: DiffStatus,
}

impl IndexDiff {
    pub fn is_dirty(&self) -> bool {
        !matches!(self.status, DiffStatus::InSync)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsReport {
    pub indexes: Vec<IndexDiff>,
}

impl SettingsReport {
    pub fn dirty(&self) -> impl Iterator<Item = &IndexDiff> {
        self.indexes.iter().filter(|d| d.is_dirty())
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty().count()
    }

    pub fn is_in_sync(&self) -> bool {
        self.dirty_count() == 0
    }
}

pub struct SettingsReconciler<'a> {
    indexer: &'a mut Indexer,
}

impl<'a> SettingsReconciler<'a> {
    pub fn new(indexer: &'a mut Indexer) -> Self {
        SettingsReconciler { indexer }
    }

    /// Declared settings per remote index name for every mapped class in
    /// `classes`. Unmapped classes are skipped.
    pub fn local_settings(&mut self, classes: &[String]) -> Result<IndexMap<String, Record>> {
        let mut local = IndexMap::new();
        for class in classes {
            let Some(meta) = self.indexer.registry_mut().resolve(class) else {
                continue;
            };
            let index_name = self.indexer.index_name(class)?;
            local.insert(index_name, meta.index.algolia_settings());
        }
        Ok(local)
    }

    pub async fn diff_index(&mut self, index_name: &str, local: &Record) -> Result<IndexDiff> {
        let index = self.indexer.index(index_name);
        let status = match index.get_settings().await? {
            None => DiffStatus::New,
            Some(remote) => {
                let deltas: Vec<SettingDelta> = local
                    .iter()
                    .filter_map(|(key, value)| match remote.get(key) {
                        Some(r) if r == value => None,
                        r => Some(SettingDelta {
                            key: key.clone(),
                            local: value.clone(),
                            remote: r.cloned(),
                        }),
                    })
                    .collect();
                if deltas.is_empty() {
                    DiffStatus::InSync
                } else {
                    DiffStatus::Changed(deltas)
                }
            }
        };

        match &status {
            DiffStatus::New => tracing::info!("[SYNC {}] new local index", index_name),
            DiffStatus::Changed(deltas) => {
                for delta in deltas {
                    let remote = delta.remote.clone().unwrap_or(serde_json::Value::Null);
                    tracing::info!(
                        "[SYNC {}] setting {} differs: local {} remote {}",
                        index_name,
                        delta.key,
                        delta.local,
                        remote
                    );
                }
            }
            DiffStatus::InSync => {}
        }

        Ok(IndexDiff {
            index_name: index_name.to_string(),
            local: local.clone(),
            status,
        })
    }

    /// Compare every mapped class in `classes`. Indexes without declared
    /// settings are left out: there is nothing to push for them.
    pub async fn diff(&mut self, classes: &[String]) -> Result<SettingsReport> {
        let mut report = SettingsReport::default();
        for (index_name, local) in self.local_settings(classes)? {
            if local.is_empty() {
                continue;
            }
            report.indexes.push(self.diff_index(&index_name, &local).await?);
        }
        tracing::info!(
            "[SYNC] {} of {} indexes need a settings update",
            report.dirty_count(),
            report.indexes.len()
        );
        Ok(report)
    }

    /// Write `local` verbatim. Keys only present remotely are left alone.
    pub async fn push(&mut self, index_name: &str, local: Record) -> Result<TaskId> {
        self.indexer
            .set_index_settings(index_name, local, IndexNameOptions::exact())
            .await
    }

    /// Push every dirty index of `report` when `confirmed`; otherwise change
    /// nothing. Returns the number of indexes pushed.
    pub async fn push_settings(&mut self, report: &SettingsReport, confirmed: bool) -> Result<usize> {
        if !confirmed {
            tracing::info!("[SYNC] settings push not confirmed, changing nothing");
            return Ok(0);
        }

        let mut pushed = 0;
        for diff in report.dirty() {
            if diff.local.is_empty() {
                continue;
            }
            let task_id = self.push(&diff.index_name, diff.local.clone()).await?;
            tracing::info!("[SYNC {}] settings pushed, task {}", diff.index_name, task_id);
            pushed += 1;
        }
        Ok(pushed)
    }
}
