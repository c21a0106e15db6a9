//! Endpoint adapters.
//!
//! [`TaskApi`] is the seam between the engine and the server. One adapter
//! instance serves one view (recurring or bin); the engine never builds
//! URLs itself.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{
    FilterState, MasterSeriesRecord, TaskPage, TaskPriority, TaskStatus, TaskType, ViewKind,
};

/// Query for one server-side page of instances.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
}

impl PageQuery {
    pub fn new(page: usize, limit: usize, filters: &FilterState) -> Self {
        Self {
            page,
            limit,
            task_type: filters.task_type,
            status: filters.status,
            priority: filters.priority,
            assigned_to: filters.assignee.clone(),
            assigned_by: filters.assigner.clone(),
            search: filters.search.clone(),
            date_from: filters.date_from,
            date_to: filters.date_to,
        }
    }
}

/// Payload for "reassign for the next period".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReassignRequest {
    pub include_files: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Which collection family this adapter serves
    fn view(&self) -> ViewKind;

    async fn fetch_page(&self, query: &PageQuery) -> Result<TaskPage, ApiError>;

    /// Minimal per-series records for the whole collection
    async fn fetch_series_light(&self) -> Result<Vec<MasterSeriesRecord>, ApiError>;

    /// Slower feature-complete series list with nested instances
    async fn fetch_series_full(&self, limit: usize) -> Result<Vec<MasterSeriesRecord>, ApiError>;

    async fn fetch_series_detail(&self, series_id: &str) -> Result<MasterSeriesRecord, ApiError>;

    async fn delete_series(
        &self,
        series_id: &str,
        permanent: bool,
        include_files: Option<bool>,
    ) -> Result<(), ApiError>;

    async fn restore_task(&self, task_id: &str) -> Result<(), ApiError>;

    async fn restore_series(&self, series_id: &str) -> Result<(), ApiError>;

    async fn purge_task(&self, task_id: &str) -> Result<(), ApiError>;

    async fn reassign_series(
        &self,
        series_id: &str,
        request: &ReassignRequest,
    ) -> Result<(), ApiError>;
}

/// The light endpoint has shipped both a bare array and a wrapped list.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesList {
    Bare(Vec<MasterSeriesRecord>),
    Wrapped {
        #[serde(rename = "masterTasks")]
        master_tasks: Vec<MasterSeriesRecord>,
    },
}

impl From<SeriesList> for Vec<MasterSeriesRecord> {
    fn from(list: SeriesList) -> Self {
        match list {
            SeriesList::Bare(items) => items,
            SeriesList::Wrapped { master_tasks } => master_tasks,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReassignBody<'a> {
    #[serde(flatten)]
    request: &'a ReassignRequest,
    company_id: &'a str,
}

const MAX_ERROR_BODY: usize = 200;

/// reqwest-backed adapter for one view of one company.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: Url,
    view: ViewKind,
    company_id: String,
    token: Option<String>,
}

impl HttpTaskApi {
    /// `base_url` is the task API root, e.g. `https://host/api/tasks`.
    pub fn new(base_url: &str, view: ViewKind, company_id: impl Into<String>) -> Result<Self, ApiError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| ApiError::Url(format!("{}: {}", base, e)))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            view,
            company_id: company_id.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Same server and credentials, different view.
    pub fn for_view(&self, view: ViewKind) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Url(format!("{}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "task api request");
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    fn company(&self) -> [(&'static str, &str); 1] {
        [("companyId", self.company_id.as_str())]
    }

    async fn execute(builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body.to_vec())
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let body = Self::execute(builder).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
        Self::execute(builder).await.map(|_| ())
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    fn view(&self) -> ViewKind {
        self.view
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<TaskPage, ApiError> {
        let path = format!("{}/instances", self.view.family());
        let builder = self.request(Method::GET, &path)?.query(query).query(&self.company());
        Self::send_json(builder).await
    }

    async fn fetch_series_light(&self) -> Result<Vec<MasterSeriesRecord>, ApiError> {
        let path = format!("{}/master-light", self.view.family());
        let builder = self.request(Method::GET, &path)?.query(&self.company());
        let list: SeriesList = Self::send_json(builder).await?;
        Ok(list.into())
    }

    async fn fetch_series_full(&self, limit: usize) -> Result<Vec<MasterSeriesRecord>, ApiError> {
        let path = format!("{}/master", self.view.family());
        let builder = self
            .request(Method::GET, &path)?
            .query(&self.company())
            .query(&[("limit", limit)]);
        let list: SeriesList = Self::send_json(builder).await?;
        Ok(list.into())
    }

    async fn fetch_series_detail(&self, series_id: &str) -> Result<MasterSeriesRecord, ApiError> {
        let builder = self
            .request(Method::GET, &format!("master/{}", series_id))?
            .query(&self.company());
        Self::send_json(builder).await
    }

    async fn delete_series(
        &self,
        series_id: &str,
        permanent: bool,
        include_files: Option<bool>,
    ) -> Result<(), ApiError> {
        let mut builder = self
            .request(Method::DELETE, "bulk/master")?
            .query(&[("taskGroupId", series_id)])
            .query(&self.company())
            .query(&[("permanent", permanent)]);
        if let Some(include) = include_files {
            builder = builder.query(&[("includeFiles", include)]);
        }
        Self::send_empty(builder).await
    }

    async fn restore_task(&self, task_id: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &format!("restore/{}", task_id))?
            .query(&self.company());
        Self::send_empty(builder).await
    }

    async fn restore_series(&self, series_id: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, &format!("restore-master/{}", series_id))?
            .query(&self.company());
        Self::send_empty(builder).await
    }

    async fn purge_task(&self, task_id: &str) -> Result<(), ApiError> {
        let builder = self
            .request(Method::DELETE, &format!("permanent/{}", task_id))?
            .query(&self.company());
        Self::send_empty(builder).await
    }

    async fn reassign_series(
        &self,
        series_id: &str,
        request: &ReassignRequest,
    ) -> Result<(), ApiError> {
        let body = ReassignBody {
            request,
            company_id: &self.company_id,
        };
        let builder = self
            .request(Method::POST, &format!("reassign/{}", series_id))?
            .json(&body);
        Self::send_empty(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api(server: &MockServer, view: ViewKind) -> HttpTaskApi {
        HttpTaskApi::new(&format!("{}/api/tasks", server.uri()), view, "c1")
            .unwrap()
            .with_token("secret")
    }

    #[tokio::test]
    async fn test_fetch_page_sends_filters_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/recurring/instances"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "25"))
            .and(query_param("priority", "high"))
            .and(query_param("taskType", "one-time"))
            .and(query_param("dateFrom", "2026-03-01"))
            .and(query_param("companyId", "c1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [{"_id": "t1", "title": "One"}],
                "total": 26,
                "totalPages": 2,
                "hasMore": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let filters = FilterState {
            priority: Some(TaskPriority::High),
            task_type: Some(TaskType::OneTime),
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };
        let page = api(&server, ViewKind::Recurring)
            .await
            .fetch_page(&PageQuery::new(2, 25, &filters))
            .await
            .unwrap();
        assert_eq!(page.total, 26);
        assert_eq!(page.tasks[0].id, "t1");
    }

    #[tokio::test]
    async fn test_light_and_full_series_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/bin/master-light"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"taskGroupId": "g1", "title": "Light"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/bin/master"))
            .and(query_param("limit", "500"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "masterTasks": [{"taskGroupId": "g2", "title": "Full", "tasks": []}]
            })))
            .mount(&server)
            .await;

        let api = api(&server, ViewKind::Recurring).await.for_view(ViewKind::Bin);
        assert_eq!(api.view(), ViewKind::Bin);
        let light = api.fetch_series_light().await.unwrap();
        assert_eq!(light[0].series_id, "g1");
        let full = api.fetch_series_full(500).await.unwrap();
        assert_eq!(full[0].series_id, "g2");
        assert!(full[0].is_detailed());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/tasks/permanent/t9"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Task not found"))
            .mount(&server)
            .await;

        let err = api(&server, ViewKind::Bin).await.purge_task("t9").await.unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("Expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reassign_and_delete_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tasks/reassign/g1"))
            .and(body_json(json!({
                "includeFiles": true,
                "taskIds": ["a", "b"],
                "companyId": "c1"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/tasks/bulk/master"))
            .and(query_param("taskGroupId", "g1"))
            .and(query_param("permanent", "false"))
            .and(query_param("includeFiles", "false"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server, ViewKind::Recurring).await;
        let request = ReassignRequest {
            include_files: true,
            task_ids: vec!["a".into(), "b".into()],
        };
        api.reassign_series("g1", &request).await.unwrap();
        api.delete_series("g1", false, Some(false)).await.unwrap();
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpTaskApi::new("not a url", ViewKind::Recurring, "c1"),
            Err(ApiError::Url(_))
        ));
    }
}
