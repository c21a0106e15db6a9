#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use taskdesk_core::api::{PageQuery, ReassignRequest, TaskApi};
use taskdesk_core::error::ApiError;
use taskdesk_core::models::{MasterSeriesRecord, TaskPage, TaskRecord, ViewKind};
use taskdesk_core::paginate;

#[derive(Default)]
struct FakeState {
    instances: Vec<TaskRecord>,
    light: Vec<MasterSeriesRecord>,
    full: Vec<MasterSeriesRecord>,
    details: HashMap<String, MasterSeriesRecord>,
    calls: HashMap<&'static str, usize>,
    page_queries: Vec<PageQuery>,
    reassigned: Vec<(String, ReassignRequest)>,
    failing_reassigns: HashSet<String>,
    offline: bool,
}

/// In-memory task API that records every call it receives.
pub struct FakeApi {
    view: ViewKind,
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new(view: ViewKind) -> Self {
        Self {
            view,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_instances(self, instances: Vec<TaskRecord>) -> Self {
        self.state.lock().unwrap().instances = instances;
        self
    }

    pub fn with_light(self, light: Vec<MasterSeriesRecord>) -> Self {
        self.state.lock().unwrap().light = light;
        self
    }

    pub fn with_full(self, full: Vec<MasterSeriesRecord>) -> Self {
        self.state.lock().unwrap().full = full;
        self
    }

    pub fn with_detail(self, detail: MasterSeriesRecord) -> Self {
        self.state
            .lock()
            .unwrap()
            .details
            .insert(detail.series_id.clone(), detail);
        self
    }

    pub fn set_instances(&self, instances: Vec<TaskRecord>) {
        self.state.lock().unwrap().instances = instances;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn fail_reassign(&self, series_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_reassigns
            .insert(series_id.to_string());
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    pub fn page_queries(&self) -> Vec<PageQuery> {
        self.state.lock().unwrap().page_queries.clone()
    }

    pub fn reassigned(&self) -> Vec<(String, ReassignRequest)> {
        self.state.lock().unwrap().reassigned.clone()
    }

    fn record(&self, name: &'static str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(name).or_insert(0) += 1;
        if state.offline {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    fn view(&self) -> ViewKind {
        self.view
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<TaskPage, ApiError> {
        self.record("fetch_page")?;
        let mut state = self.state.lock().unwrap();
        state.page_queries.push(query.clone());

        let matching: Vec<TaskRecord> = state
            .instances
            .iter()
            .filter(|t| {
                query.search.as_deref().map_or(true, |s| {
                    t.title.to_lowercase().contains(&s.to_lowercase())
                })
            })
            .filter(|t| {
                query.assigned_to.as_deref().map_or(true, |id| {
                    t.assigned_to.as_ref().is_some_and(|u| u.id == id)
                })
            })
            .cloned()
            .collect();

        let slice = paginate::paginate(&matching, query.page, query.limit);
        // Like the real server: an empty result reports zero pages and
        // out-of-range pages come back empty.
        let total_pages = slice.total.div_ceil(query.limit.max(1));
        let tasks = if query.page > total_pages {
            Vec::new()
        } else {
            slice.items.to_vec()
        };
        Ok(TaskPage {
            tasks,
            total: slice.total,
            total_pages,
            has_more: query.page < total_pages,
        })
    }

    async fn fetch_series_light(&self) -> Result<Vec<MasterSeriesRecord>, ApiError> {
        self.record("fetch_series_light")?;
        Ok(self.state.lock().unwrap().light.clone())
    }

    async fn fetch_series_full(&self, limit: usize) -> Result<Vec<MasterSeriesRecord>, ApiError> {
        self.record("fetch_series_full")?;
        let state = self.state.lock().unwrap();
        Ok(state.full.iter().take(limit).cloned().collect())
    }

    async fn fetch_series_detail(&self, series_id: &str) -> Result<MasterSeriesRecord, ApiError> {
        self.record("fetch_series_detail")?;
        self.state
            .lock()
            .unwrap()
            .details
            .get(series_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "Master task not found".to_string(),
            })
    }

    async fn delete_series(
        &self,
        _series_id: &str,
        _permanent: bool,
        _include_files: Option<bool>,
    ) -> Result<(), ApiError> {
        self.record("delete_series")
    }

    async fn restore_task(&self, _task_id: &str) -> Result<(), ApiError> {
        self.record("restore_task")
    }

    async fn restore_series(&self, _series_id: &str) -> Result<(), ApiError> {
        self.record("restore_series")
    }

    async fn purge_task(&self, _task_id: &str) -> Result<(), ApiError> {
        self.record("purge_task")
    }

    async fn reassign_series(
        &self,
        series_id: &str,
        request: &ReassignRequest,
    ) -> Result<(), ApiError> {
        self.record("reassign_series")?;
        let mut state = self.state.lock().unwrap();
        if state.failing_reassigns.contains(series_id) {
            return Err(ApiError::Status {
                status: 500,
                message: "reassign failed".to_string(),
            });
        }
        state
            .reassigned
            .push((series_id.to_string(), request.clone()));
        Ok(())
    }
}

/// Common record fixtures
pub struct Fixtures;

impl Fixtures {
    pub fn instance(id: &str, title: &str, assignee: &str) -> TaskRecord {
        serde_json::from_value(json!({
            "_id": id,
            "title": title,
            "taskType": "daily",
            "assignedTo": { "_id": assignee, "username": assignee },
            "assignedBy": { "_id": "boss", "username": "Boss" },
            "status": "pending",
        }))
        .unwrap()
    }

    pub fn instances(count: usize, assignee: &str) -> Vec<TaskRecord> {
        (1..=count)
            .map(|n| Self::instance(&format!("t{n}"), &format!("Task {n}"), assignee))
            .collect()
    }

    pub fn series(id: &str, title: &str, is_forever: bool) -> MasterSeriesRecord {
        serde_json::from_value(json!({
            "taskGroupId": id,
            "title": title,
            "taskType": "weekly",
            "assignedTo": { "_id": "u1", "username": "Ann" },
            "assignedBy": { "_id": "boss", "username": "Boss" },
            "isForever": is_forever,
            "instanceCount": 3,
            "pendingCount": 3,
        }))
        .unwrap()
    }

    pub fn series_with_attachment(id: &str, title: &str, is_forever: bool) -> MasterSeriesRecord {
        let mut series = Self::series(id, title, is_forever);
        series.attachments = vec![serde_json::from_value(json!({ "filename": "brief.pdf" })).unwrap()];
        series
    }

    /// What the detail endpoint returns for `series`: the same record with
    /// `instances` nested under it.
    pub fn detail_of(series: &MasterSeriesRecord, instances: Vec<TaskRecord>) -> MasterSeriesRecord {
        let mut detail = series.clone();
        detail.tasks = Some(
            instances
                .into_iter()
                .map(|mut task| {
                    task.series_id = Some(series.series_id.clone());
                    task
                })
                .collect(),
        );
        detail
    }

    pub fn instance_with_attachment(id: &str, title: &str, filename: &str) -> TaskRecord {
        let mut task = Self::instance(id, title, "u1");
        task.attachments = vec![serde_json::from_value(json!({ "filename": filename })).unwrap()];
        task
    }

    /// A full-endpoint record whose nested tasks arrive out of order.
    pub fn full_series(id: &str, task_type: &str, assignee: &str) -> MasterSeriesRecord {
        serde_json::from_value(json!({
            "taskGroupId": id,
            "title": format!("Series {id}"),
            "taskType": task_type,
            "assignedTo": { "_id": assignee, "username": assignee },
            "isForever": true,
            "tasks": [
                { "_id": format!("{id}-c"), "title": "third", "taskGroupId": id,
                  "assignedTo": assignee, "dueDate": "2026-03-20T09:00:00Z" },
                { "_id": format!("{id}-a"), "title": "first", "taskGroupId": id,
                  "assignedTo": assignee, "dueDate": "2026-03-01T09:00:00Z" },
                { "_id": format!("{id}-b"), "title": "second", "taskGroupId": id,
                  "assignedTo": assignee, "dueDate": "2026-03-10T09:00:00Z" }
            ]
        }))
        .unwrap()
    }
}
