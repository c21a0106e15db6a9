use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use std::str::FromStr;
use std::time::Duration as StdDuration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskType {
    #[default]
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl TaskType {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, TaskType::OneTime)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::OneTime => write!(f, "one-time"),
            TaskType::Daily => write!(f, "daily"),
            TaskType::Weekly => write!(f, "weekly"),
            TaskType::Monthly => write!(f, "monthly"),
            TaskType::Quarterly => write!(f, "quarterly"),
            TaskType::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task type: {0}")]
pub struct ParseTaskTypeError(String);

impl FromStr for TaskType {
    type Err = ParseTaskTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "one-time" | "onetime" | "one_time" => Ok(TaskType::OneTime),
            "daily" => Ok(TaskType::Daily),
            "weekly" => Ok(TaskType::Weekly),
            "monthly" => Ok(TaskType::Monthly),
            "quarterly" => Ok(TaskType::Quarterly),
            "yearly" => Ok(TaskType::Yearly),
            _ => Err(ParseTaskTypeError(s.to_string())),
        }
    }
}

/// Task status as reported by the server. `Overdue` is accepted on the wire
/// but filtering always derives it from `Pending` plus the due date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Overdue,
    Deleted,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Overdue => write!(f, "overdue"),
            TaskStatus::Deleted => write!(f, "deleted"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task status: {0}")]
pub struct ParseTaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "overdue" => Ok(TaskStatus::Overdue),
            "deleted" => Ok(TaskStatus::Deleted),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid task priority: {0}")]
pub struct ParseTaskPriorityError(String);

impl FromStr for TaskPriority {
    type Err = ParseTaskPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(ParseTaskPriorityError(s.to_string())),
        }
    }
}

/// A user reference. The server sends either a bare id or a populated object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "UserRefRepr")]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserRefRepr {
    Id(String),
    Populated {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default, alias = "username")]
        name: String,
    },
}

impl From<UserRefRepr> for UserRef {
    fn from(repr: UserRefRepr) -> Self {
        match repr {
            UserRefRepr::Id(id) => UserRef { id, name: String::new() },
            UserRefRepr::Populated { id, name } => UserRef { id, name },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One concrete occurrence of a task.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub assigned_by: Option<UserRef>,
    #[serde(default)]
    pub assigned_to: Option<UserRef>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    /// Parent series reference (`taskGroupId` on the wire)
    #[serde(default, rename = "taskGroupId", alias = "seriesId")]
    pub series_id: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<u32>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_remarks: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub completion_attachments: Vec<Attachment>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_delete_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Pending and due before the given start of today.
    pub fn is_overdue(&self, today_start: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.due_date.is_some_and(|due| due < today_start)
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty() || !self.completion_attachments.is_empty()
    }

    /// When a binned task will be purged. The server value wins; the
    /// retention window is only used when the server did not compute one.
    pub fn effective_auto_delete_at(&self, retention_days: i64) -> Option<DateTime<Utc>> {
        self.auto_delete_at
            .or_else(|| self.deleted_at.map(|at| at + Duration::days(retention_days)))
    }
}

/// Recurrence parameters of a series. Opaque to the engine except `is_forever`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_forever: bool,
    #[serde(default)]
    pub include_sunday: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub week_off_days: Vec<u8>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub weekly_days: Vec<u8>,
    #[serde(default)]
    pub monthly_day: Option<u8>,
    #[serde(default)]
    pub yearly_duration: Option<u32>,
}

/// The master record shared by every instance of a series.
///
/// Counters are computed by the server from the live instance set and are
/// never recomputed here. `tasks` is only present on the full and detail
/// representations.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterSeriesRecord {
    #[serde(rename = "taskGroupId", alias = "seriesId")]
    pub series_id: String,
    pub title: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub assigned_by: Option<UserRef>,
    #[serde(default)]
    pub assigned_to: Option<UserRef>,
    #[serde(flatten)]
    pub recurrence: Recurrence,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub instance_count: u32,
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub deleted_count: u32,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskRecord>>,
}

impl MasterSeriesRecord {
    pub fn is_forever(&self) -> bool {
        self.recurrence.is_forever
    }

    /// Whether this record carries its instances (full or detail representation).
    pub fn is_detailed(&self) -> bool {
        self.tasks.is_some()
    }

    /// Attachments on the series itself or on any known instance.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
            || self
                .tasks
                .as_deref()
                .is_some_and(|tasks| tasks.iter().any(TaskRecord::has_attachments))
    }

    pub fn instance_ids(&self) -> Vec<String> {
        self.tasks
            .as_deref()
            .map(|tasks| tasks.iter().map(|t| t.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Orders nested instances by due date ascending; undated instances go last.
    pub fn sort_tasks_by_due_date(&mut self) {
        if let Some(tasks) = self.tasks.as_mut() {
            tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }
    }
}

/// A page of instances as returned by the paged endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub has_more: bool,
}

/// User-owned filter inputs. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub task_type: Option<TaskType>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Assigner display name
    pub assigner: Option<String>,
    /// Assignee user id
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterState {
    /// Trims text fields and maps blank text to the "all" sentinel.
    pub fn normalized(mut self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        self.assigner = clean(self.assigner);
        self.assignee = clean(self.assignee);
        self.search = clean(self.search);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterState::default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Employee,
}

impl Role {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "employee" | "user" => Ok(Role::Employee),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// The signed-in user on whose behalf the engine fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: String,
    pub role: Role,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Cache scope segment: privileged viewers share one scope, others are per user.
    pub fn scope(&self) -> String {
        if self.role.is_privileged() {
            "all".to_string()
        } else {
            format!("user-{}", self.user_id)
        }
    }
}

/// Which collection family a view operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Live recurring instances and their series
    Recurring,
    /// Soft-deleted instances and series
    Bin,
}

impl ViewKind {
    pub fn family(&self) -> &'static str {
        match self {
            ViewKind::Recurring => "recurring",
            ViewKind::Bin => "bin",
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.family())
    }
}

/// Engine tuning - core version.
/// This is separate from the CLI config to allow for type differences
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial page size
    pub page_size: usize,
    /// TTL for paged and detail cache entries
    pub short_ttl: StdDuration,
    /// TTL for the aggregate series cache entry
    pub long_ttl: StdDuration,
    /// Quiet period before free-text search settles
    pub search_debounce: StdDuration,
    /// Quiet period before a date range edit settles
    pub date_debounce: StdDuration,
    /// `limit` sent to the full series endpoint on fallback
    pub fallback_limit: usize,
    /// Bin retention used when the server omits `autoDeleteAt`
    pub retention_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            short_ttl: StdDuration::from_secs(30 * 60),
            long_ttl: StdDuration::from_secs(60 * 60),
            search_debounce: StdDuration::from_millis(500),
            date_debounce: StdDuration::from_millis(300),
            fallback_limit: 1000,
            retention_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_task_record_from_wire() {
        let json = r#"{
            "_id": "t1",
            "title": "Water plants",
            "description": null,
            "taskType": "weekly",
            "assignedBy": {"_id": "u1", "username": "Ada"},
            "assignedTo": "u2",
            "dueDate": "2026-03-02T09:00:00Z",
            "priority": "high",
            "status": "pending",
            "taskGroupId": "g1",
            "sequenceNumber": 3,
            "attachments": null,
            "unknownField": 42
        }"#;
        let task: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.description, "");
        assert_eq!(task.task_type, TaskType::Weekly);
        assert_eq!(task.assigned_by.as_ref().unwrap().name, "Ada");
        assert_eq!(task.assigned_to.as_ref().unwrap().id, "u2");
        assert_eq!(task.series_id.as_deref(), Some("g1"));
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn test_series_record_flattened_recurrence() {
        let json = r#"{
            "taskGroupId": "g1",
            "title": "Standup",
            "taskType": "daily",
            "isForever": true,
            "startDate": "2026-01-01T00:00:00Z",
            "weekOffDays": [0],
            "attachments": [{"filename": "a.pdf"}],
            "instanceCount": 12,
            "pendingCount": 4
        }"#;
        let series: MasterSeriesRecord = serde_json::from_str(json).unwrap();
        assert!(series.is_forever());
        assert!(!series.is_detailed());
        assert!(series.has_attachments());
        assert_eq!(series.recurrence.week_off_days, vec![0]);
        assert_eq!(series.instance_count, 12);
    }

    #[test]
    fn test_overdue_is_derived_from_pending() {
        let today_start = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let mut task: TaskRecord = serde_json::from_str(
            r#"{"id": "t", "title": "x", "dueDate": "2026-03-09T23:59:00Z"}"#,
        )
        .unwrap();
        assert!(task.is_overdue(today_start));

        task.due_date = Some(today_start);
        assert!(!task.is_overdue(today_start));

        task.due_date = Some(today_start - Duration::days(2));
        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(today_start));
    }

    #[test]
    fn test_effective_auto_delete_prefers_server_value() {
        let deleted = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let server = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        let mut task: TaskRecord =
            serde_json::from_str(r#"{"id": "t", "title": "x", "status": "deleted"}"#).unwrap();
        task.deleted_at = Some(deleted);
        assert_eq!(
            task.effective_auto_delete_at(7),
            Some(deleted + Duration::days(7))
        );
        task.auto_delete_at = Some(server);
        assert_eq!(task.effective_auto_delete_at(7), Some(server));
    }

    #[test]
    fn test_filter_state_normalized() {
        let state = FilterState {
            search: Some("   ".to_string()),
            assigner: Some(" Ada ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(state.search, None);
        assert_eq!(state.assigner.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("One-Time".parse::<TaskType>(), Ok(TaskType::OneTime));
        assert_eq!("HIGH".parse::<TaskPriority>(), Ok(TaskPriority::High));
        assert_eq!("overdue".parse::<TaskStatus>(), Ok(TaskStatus::Overdue));
        assert!("weird".parse::<Role>().is_err());
        assert!(Role::Manager.is_privileged());
        assert!(!Role::Employee.is_privileged());
    }
}
