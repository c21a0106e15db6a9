//! Multi-series reassignment.
//!
//! A session collects eligible series, gathers an attachment decision for
//! every one that needs it, then fires all reassign calls concurrently.
//! Non-forever series are excluded at selection time and only reported.
//! Series selected from light records are resolved to their detail once
//! before submission, so instance attachments and ids are known.

use futures::future::join_all;
use std::collections::HashMap;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::{ReassignRequest, TaskApi};
use crate::error::CoreError;
use crate::models::MasterSeriesRecord;
use crate::source::{DataSource, ReloadAt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Selecting,
    Validating,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The series has an end date
    NotForever,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    Deselected,
    Excluded(ExclusionReason),
}

/// What the session remembers about a selected series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSeries {
    pub series_id: String,
    pub title: String,
    pub has_attachments: bool,
    pub task_ids: Vec<String>,
    /// Whether the fields above came from a record with nested instances
    pub detailed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedSeries {
    pub series_id: String,
    pub title: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BulkOutcome {
    /// Every series the user picked, excluded ones included
    pub requested: usize,
    pub excluded: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Collapse into an error when any reassignment failed.
    pub fn into_result(self) -> Result<Self, CoreError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(CoreError::PartialBulkFailure {
                failed: self.failed,
                total: self.succeeded + self.failed,
            })
        }
    }
}

#[derive(Debug)]
pub struct BulkOperationSession {
    id: Uuid,
    state: SessionState,
    selected: Vec<SelectedSeries>,
    excluded: Vec<ExcludedSeries>,
    decisions: HashMap<String, bool>,
}

impl Default for BulkOperationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkOperationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            state: SessionState::Idle,
            selected: Vec::new(),
            excluded: Vec::new(),
            decisions: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected(&self) -> &[SelectedSeries] {
        &self.selected
    }

    pub fn excluded(&self) -> &[ExcludedSeries] {
        &self.excluded
    }

    pub fn decision(&self, series_id: &str) -> Option<bool> {
        self.decisions.get(series_id).copied()
    }

    pub fn is_selected(&self, series_id: &str) -> bool {
        self.selected.iter().any(|s| s.series_id == series_id)
    }

    /// Series that carry attachments and still lack a decision.
    pub fn pending_decisions(&self) -> Vec<&SelectedSeries> {
        self.selected
            .iter()
            .filter(|s| s.has_attachments && !self.decisions.contains_key(&s.series_id))
            .collect()
    }

    pub fn select(&mut self, series: &MasterSeriesRecord) -> SelectOutcome {
        self.state = SessionState::Selecting;

        if !series.is_forever() {
            if !self.excluded.iter().any(|e| e.series_id == series.series_id) {
                self.excluded.push(ExcludedSeries {
                    series_id: series.series_id.clone(),
                    title: series.title.clone(),
                    reason: ExclusionReason::NotForever,
                });
            }
            return SelectOutcome::Excluded(ExclusionReason::NotForever);
        }

        if !self.is_selected(&series.series_id) {
            self.selected.push(SelectedSeries {
                series_id: series.series_id.clone(),
                title: series.title.clone(),
                has_attachments: series.has_attachments(),
                task_ids: series.instance_ids(),
                detailed: series.is_detailed(),
            });
        }
        SelectOutcome::Selected
    }

    pub fn deselect(&mut self, series_id: &str) -> bool {
        let before = self.selected.len() + self.excluded.len();
        self.selected.retain(|s| s.series_id != series_id);
        self.excluded.retain(|e| e.series_id != series_id);
        self.decisions.remove(series_id);
        if self.selected.is_empty() && self.excluded.is_empty() {
            self.state = SessionState::Idle;
        }
        before != self.selected.len() + self.excluded.len()
    }

    pub fn toggle(&mut self, series: &MasterSeriesRecord) -> SelectOutcome {
        let known = self.is_selected(&series.series_id)
            || self.excluded.iter().any(|e| e.series_id == series.series_id);
        if known {
            self.deselect(&series.series_id);
            SelectOutcome::Deselected
        } else {
            self.select(series)
        }
    }

    pub fn set_decision(&mut self, series_id: &str, include_files: bool) {
        self.decisions.insert(series_id.to_string(), include_files);
    }

    pub fn clear_decision(&mut self, series_id: &str) {
        self.decisions.remove(series_id);
    }

    pub fn reset(&mut self) {
        self.selected.clear();
        self.excluded.clear();
        self.decisions.clear();
        self.state = SessionState::Idle;
        self.id = Uuid::now_v7();
    }

    /// Validate, reassign every selected series concurrently, then refresh
    /// the source at its current page.
    ///
    /// A missing decision aborts before any reassign call and leaves the
    /// selection intact. When the selected records already show it, no call
    /// is made at all; otherwise only the detail fetches precede the error.
    /// Individual call failures are counted, not retried.
    pub async fn submit<A: TaskApi>(
        &mut self,
        source: &mut DataSource<A>,
    ) -> Result<BulkOutcome, CoreError> {
        if self.selected.is_empty() {
            return Err(self.nothing_eligible(source));
        }

        self.state = SessionState::Validating;
        self.check_decisions()?;
        if let Err(err) = self.resolve_details(source).await {
            self.state = SessionState::Selecting;
            return Err(err);
        }
        if self.selected.is_empty() {
            self.state = SessionState::Selecting;
            return Err(self.nothing_eligible(source));
        }
        self.check_decisions()?;

        self.state = SessionState::Submitting;
        let requests: Vec<(&str, ReassignRequest)> = self
            .selected
            .iter()
            .map(|s| {
                let request = ReassignRequest {
                    include_files: self.decisions.get(&s.series_id).copied().unwrap_or(false),
                    task_ids: s.task_ids.clone(),
                };
                (s.series_id.as_str(), request)
            })
            .collect();

        let span = tracing::info_span!("bulk_reassign", session = %self.id, count = requests.len());
        let api = source.api();
        let results = join_all(
            requests
                .iter()
                .map(|(series_id, request)| api.reassign_series(series_id, request)),
        )
        .instrument(span)
        .await;

        let mut failed = 0;
        for ((series_id, _), result) in requests.iter().zip(&results) {
            if let Err(err) = result {
                tracing::warn!(error = %err, series_id, "reassign failed");
                failed += 1;
            }
        }

        let outcome = BulkOutcome {
            requested: self.selected.len() + self.excluded.len(),
            excluded: self.excluded.len(),
            succeeded: requests.len() - failed,
            failed,
        };
        tracing::info!(?outcome, session = %self.id, "bulk reassign finished");

        let notifier = source.notifier().clone();
        if outcome.failed == 0 {
            notifier.success(&format!("Reassigned {} series", outcome.succeeded));
        } else {
            notifier.error(&format!(
                "{} of {} reassignments failed",
                outcome.failed,
                outcome.succeeded + outcome.failed
            ));
        }
        if !self.excluded.is_empty() {
            notifier.error(&self.exclusion_notice());
        }

        source.invalidate_family();
        if let Err(err) = source.reload(ReloadAt::CurrentPage).await {
            tracing::warn!(error = %err, "refetch after bulk reassign failed");
        }

        self.reset();
        Ok(outcome)
    }

    fn check_decisions(&mut self) -> Result<(), CoreError> {
        let missing: Vec<String> = self
            .pending_decisions()
            .into_iter()
            .map(|s| s.title.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            self.state = SessionState::Selecting;
            Err(CoreError::MissingDecisions(missing))
        }
    }

    /// Replace light selections with what the detail endpoint reports. A
    /// series whose detail turns out to have an end date moves to the
    /// excluded list.
    async fn resolve_details<A: TaskApi>(
        &mut self,
        source: &mut DataSource<A>,
    ) -> Result<(), CoreError> {
        let mut index = 0;
        while index < self.selected.len() {
            if self.selected[index].detailed {
                index += 1;
                continue;
            }

            let detail = source.series_detail(&self.selected[index].series_id).await?;
            if !detail.is_forever() {
                let dropped = self.selected.remove(index);
                self.decisions.remove(&dropped.series_id);
                self.excluded.push(ExcludedSeries {
                    series_id: dropped.series_id,
                    title: dropped.title,
                    reason: ExclusionReason::NotForever,
                });
                continue;
            }

            let entry = &mut self.selected[index];
            entry.has_attachments = detail.has_attachments();
            entry.task_ids = detail.instance_ids();
            entry.detailed = true;
            index += 1;
        }
        Ok(())
    }

    fn nothing_eligible<A: TaskApi>(&self, source: &DataSource<A>) -> CoreError {
        if !self.excluded.is_empty() {
            source.notifier().error(&self.exclusion_notice());
        }
        CoreError::InvalidInput("No eligible series selected".to_string())
    }

    fn exclusion_notice(&self) -> String {
        let names: Vec<&str> = self.excluded.iter().map(|e| e.title.as_str()).collect();
        format!(
            "{} of {} selected series excluded (not forever): {}",
            self.excluded.len(),
            self.selected.len() + self.excluded.len(),
            names.join(", ")
        )
    }
}
