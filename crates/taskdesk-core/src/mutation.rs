//! Single-record mutations against a data source.
//!
//! Each mutation is one remote call followed by invalidation of the whole
//! collection family and a refetch of the active mode. Destructive
//! mutations land on page 1, the rest keep the current page.

use crate::api::{ReassignRequest, TaskApi};
use crate::error::CoreError;
use crate::models::MasterSeriesRecord;
use crate::source::{DataSource, ReloadAt};

/// `include_files` is the attachment decision: `Some(true)` keeps files,
/// `Some(false)` drops them, `None` means the user has not decided yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SoftDeleteSeries {
        series_id: String,
        include_files: Option<bool>,
    },
    PermanentDeleteSeries {
        series_id: String,
        include_files: Option<bool>,
    },
    PurgeTask {
        task_id: String,
    },
    RestoreTask {
        task_id: String,
    },
    RestoreSeries {
        series_id: String,
    },
    ReassignSeries {
        series_id: String,
        include_files: Option<bool>,
    },
}

impl Mutation {
    pub fn reload_at(&self) -> ReloadAt {
        match self {
            Mutation::SoftDeleteSeries { .. }
            | Mutation::PermanentDeleteSeries { .. }
            | Mutation::PurgeTask { .. } => ReloadAt::FirstPage,
            Mutation::RestoreTask { .. }
            | Mutation::RestoreSeries { .. }
            | Mutation::ReassignSeries { .. } => ReloadAt::CurrentPage,
        }
    }

    fn series_target(&self) -> Option<(&str, Option<bool>)> {
        match self {
            Mutation::SoftDeleteSeries {
                series_id,
                include_files,
            }
            | Mutation::PermanentDeleteSeries {
                series_id,
                include_files,
            }
            | Mutation::ReassignSeries {
                series_id,
                include_files,
            } => Some((series_id.as_str(), *include_files)),
            _ => None,
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Mutation::SoftDeleteSeries { .. } => "Series moved to bin",
            Mutation::PermanentDeleteSeries { .. } => "Series permanently deleted",
            Mutation::PurgeTask { .. } => "Task permanently deleted",
            Mutation::RestoreTask { .. } => "Task restored",
            Mutation::RestoreSeries { .. } => "Series restored",
            Mutation::ReassignSeries { .. } => "Series reassigned for the next period",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Mutation::SoftDeleteSeries { .. } => "Failed to delete series",
            Mutation::PermanentDeleteSeries { .. } => "Failed to permanently delete series",
            Mutation::PurgeTask { .. } => "Failed to permanently delete task",
            Mutation::RestoreTask { .. } => "Failed to restore task",
            Mutation::RestoreSeries { .. } => "Failed to restore series",
            Mutation::ReassignSeries { .. } => "Failed to reassign series",
        }
    }
}

/// Runs mutations against one data source and keeps its view consistent.
pub struct MutationCoordinator<'a, A: TaskApi> {
    source: &'a mut DataSource<A>,
}

impl<'a, A: TaskApi> MutationCoordinator<'a, A> {
    pub fn new(source: &'a mut DataSource<A>) -> Self {
        Self { source }
    }

    pub async fn soft_delete_series(
        &mut self,
        series_id: &str,
        include_files: Option<bool>,
    ) -> Result<(), CoreError> {
        self.apply(Mutation::SoftDeleteSeries {
            series_id: series_id.to_string(),
            include_files,
        })
        .await
    }

    pub async fn permanent_delete_series(
        &mut self,
        series_id: &str,
        include_files: Option<bool>,
    ) -> Result<(), CoreError> {
        self.apply(Mutation::PermanentDeleteSeries {
            series_id: series_id.to_string(),
            include_files,
        })
        .await
    }

    pub async fn purge_task(&mut self, task_id: &str) -> Result<(), CoreError> {
        self.apply(Mutation::PurgeTask {
            task_id: task_id.to_string(),
        })
        .await
    }

    pub async fn restore_task(&mut self, task_id: &str) -> Result<(), CoreError> {
        self.apply(Mutation::RestoreTask {
            task_id: task_id.to_string(),
        })
        .await
    }

    pub async fn restore_series(&mut self, series_id: &str) -> Result<(), CoreError> {
        self.apply(Mutation::RestoreSeries {
            series_id: series_id.to_string(),
        })
        .await
    }

    pub async fn reassign_series(
        &mut self,
        series_id: &str,
        include_files: Option<bool>,
    ) -> Result<(), CoreError> {
        self.apply(Mutation::ReassignSeries {
            series_id: series_id.to_string(),
            include_files,
        })
        .await
    }

    pub async fn apply(&mut self, mutation: Mutation) -> Result<(), CoreError> {
        let series = match mutation.series_target() {
            Some((series_id, include_files)) => {
                let reassign = matches!(mutation, Mutation::ReassignSeries { .. });
                Some(self.resolve_series(series_id, include_files, reassign).await?)
            }
            None => None,
        };

        tracing::info!(?mutation, "applying mutation");
        let api = self.source.api();
        let result = match &mutation {
            Mutation::SoftDeleteSeries {
                series_id,
                include_files,
            } => api.delete_series(series_id, false, *include_files).await,
            Mutation::PermanentDeleteSeries {
                series_id,
                include_files,
            } => api.delete_series(series_id, true, *include_files).await,
            Mutation::PurgeTask { task_id } => api.purge_task(task_id).await,
            Mutation::RestoreTask { task_id } => api.restore_task(task_id).await,
            Mutation::RestoreSeries { series_id } => api.restore_series(series_id).await,
            Mutation::ReassignSeries {
                series_id,
                include_files,
            } => {
                let request = ReassignRequest {
                    include_files: include_files.unwrap_or(false),
                    task_ids: series.as_ref().map(|s| s.instance_ids()).unwrap_or_default(),
                };
                api.reassign_series(series_id, &request).await
            }
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, ?mutation, "mutation failed");
            self.source
                .notifier()
                .error(&format!("{}: {}", mutation.failure_message(), err));
            return Err(CoreError::Network(err));
        }

        self.source.notifier().success(mutation.success_message());
        let removed = self.source.invalidate_family();
        tracing::debug!(removed, "invalidated cached collection after mutation");
        if let Err(err) = self.source.reload(mutation.reload_at()).await {
            // The mutation itself went through; the source already reported the fetch.
            tracing::warn!(error = %err, "refetch after mutation failed");
        }
        Ok(())
    }

    /// The detailed series a series-level mutation acts on, after the
    /// eligibility and attachment-decision checks.
    async fn resolve_series(
        &mut self,
        series_id: &str,
        include_files: Option<bool>,
        reassign: bool,
    ) -> Result<MasterSeriesRecord, CoreError> {
        // Reject on the loaded record first so a blocked mutation costs no calls.
        if let Some(known) = self.source.find_series(series_id) {
            check_series(known, include_files, reassign)?;
            if known.is_detailed() {
                return Ok(known.clone());
            }
        }

        let detail = self.source.series_detail(series_id).await?;
        check_series(&detail, include_files, reassign)?;
        Ok(detail)
    }
}

fn check_series(
    series: &MasterSeriesRecord,
    include_files: Option<bool>,
    reassign: bool,
) -> Result<(), CoreError> {
    if reassign && !series.is_forever() {
        return Err(CoreError::NotForever(series.title.clone()));
    }
    if include_files.is_none() && series.has_attachments() {
        return Err(CoreError::MissingDecisions(vec![series.title.clone()]));
    }
    Ok(())
}
