//! In-memory filter pipeline.
//!
//! Stages run in a fixed order and each one passes everything through when
//! its field is `None`. Every stage is a standalone function so it can be
//! exercised on its own; the result does not depend on stage order.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{
    FilterState, MasterSeriesRecord, TaskPriority, TaskRecord, TaskStatus, TaskType, Viewer,
};
use crate::timezone;

/// Field access the pipeline needs from a record.
pub trait Filterable {
    fn is_assigned_to(&self, user_id: &str) -> bool;
    fn assigner_name(&self) -> Option<&str>;
    fn task_type(&self) -> TaskType;
    fn priority(&self) -> TaskPriority;
    fn title(&self) -> &str;
    fn description(&self) -> &str;
    /// Due date for instances, range start for series
    fn relevant_date(&self) -> Option<DateTime<Utc>>;
    fn matches_status(&self, status: TaskStatus, today_start: DateTime<Utc>) -> bool;
}

impl Filterable for TaskRecord {
    fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.as_ref().is_some_and(|u| u.id == user_id)
    }

    fn assigner_name(&self) -> Option<&str> {
        self.assigned_by.as_ref().map(|u| u.name.as_str())
    }

    fn task_type(&self) -> TaskType {
        self.task_type
    }

    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn relevant_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    fn matches_status(&self, status: TaskStatus, today_start: DateTime<Utc>) -> bool {
        match status {
            TaskStatus::Overdue => self.is_overdue(today_start),
            other => self.status == other,
        }
    }
}

impl Filterable for MasterSeriesRecord {
    fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.as_ref().is_some_and(|u| u.id == user_id)
            || self
                .tasks
                .as_deref()
                .is_some_and(|tasks| tasks.iter().any(|t| t.is_assigned_to(user_id)))
    }

    fn assigner_name(&self) -> Option<&str> {
        self.assigned_by.as_ref().map(|u| u.name.as_str())
    }

    fn task_type(&self) -> TaskType {
        self.task_type
    }

    fn priority(&self) -> TaskPriority {
        self.priority
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn relevant_date(&self) -> Option<DateTime<Utc>> {
        self.recurrence.start_date
    }

    // Series have no status of their own; the server counters stand in for it.
    fn matches_status(&self, status: TaskStatus, today_start: DateTime<Utc>) -> bool {
        match status {
            TaskStatus::Pending => self.pending_count > 0,
            TaskStatus::Completed => self.completed_count > 0,
            TaskStatus::Deleted => self.deleted_count > 0,
            TaskStatus::Overdue => self
                .tasks
                .as_deref()
                .is_some_and(|tasks| tasks.iter().any(|t| t.is_overdue(today_start))),
        }
    }
}

/// Who is filtering, and what "today" means for them.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub viewer: Viewer,
    pub tz: Tz,
    /// UTC instant of local midnight today
    pub today_start: DateTime<Utc>,
}

impl FilterContext {
    pub fn new(viewer: Viewer, tz: Tz, now: DateTime<Utc>) -> Self {
        Self {
            viewer,
            tz,
            today_start: timezone::today_start(now, tz),
        }
    }

    pub fn now(viewer: Viewer, tz: Tz) -> Self {
        Self::new(viewer, tz, Utc::now())
    }
}

/// Non-privileged viewers only see their own assignments; privileged viewers
/// may narrow to one assignee.
pub fn by_scope<'a, T: Filterable>(
    items: Vec<&'a T>,
    viewer: &Viewer,
    assignee: Option<&str>,
) -> Vec<&'a T> {
    let required = if viewer.role.is_privileged() {
        assignee
    } else {
        Some(viewer.user_id.as_str())
    };
    match required {
        Some(user_id) => items.into_iter().filter(|r| r.is_assigned_to(user_id)).collect(),
        None => items,
    }
}

pub fn by_type<'a, T: Filterable>(items: Vec<&'a T>, task_type: Option<TaskType>) -> Vec<&'a T> {
    match task_type {
        Some(wanted) => items.into_iter().filter(|r| r.task_type() == wanted).collect(),
        None => items,
    }
}

pub fn by_status<'a, T: Filterable>(
    items: Vec<&'a T>,
    status: Option<TaskStatus>,
    today_start: DateTime<Utc>,
) -> Vec<&'a T> {
    match status {
        Some(wanted) => items
            .into_iter()
            .filter(|r| r.matches_status(wanted, today_start))
            .collect(),
        None => items,
    }
}

pub fn by_priority<'a, T: Filterable>(
    items: Vec<&'a T>,
    priority: Option<TaskPriority>,
) -> Vec<&'a T> {
    match priority {
        Some(wanted) => items.into_iter().filter(|r| r.priority() == wanted).collect(),
        None => items,
    }
}

/// Case-insensitive match on the assigner's display name.
pub fn by_assigner<'a, T: Filterable>(items: Vec<&'a T>, assigner: Option<&str>) -> Vec<&'a T> {
    match assigner {
        Some(name) => {
            let wanted = name.to_lowercase();
            items
                .into_iter()
                .filter(|r| r.assigner_name().is_some_and(|n| n.to_lowercase() == wanted))
                .collect()
        }
        None => items,
    }
}

/// Case-insensitive substring match against title and description.
pub fn by_search<'a, T: Filterable>(items: Vec<&'a T>, search: Option<&str>) -> Vec<&'a T> {
    match search {
        Some(text) => {
            let needle = text.to_lowercase();
            items
                .into_iter()
                .filter(|r| {
                    r.title().to_lowercase().contains(&needle)
                        || r.description().to_lowercase().contains(&needle)
                })
                .collect()
        }
        None => items,
    }
}

/// Inclusive local-date range on the record's relevant date. Undated
/// records never match a bounded range.
pub fn by_date_range<'a, T: Filterable>(
    items: Vec<&'a T>,
    state: &FilterState,
    tz: Tz,
) -> Vec<&'a T> {
    if state.date_from.is_none() && state.date_to.is_none() {
        return items;
    }
    items
        .into_iter()
        .filter(|r| match r.relevant_date() {
            Some(at) => {
                let day = timezone::local_date(at, tz);
                state.date_from.map_or(true, |from| day >= from)
                    && state.date_to.map_or(true, |to| day <= to)
            }
            None => false,
        })
        .collect()
}

/// Runs every stage over a collection without touching it.
pub struct FilterPipeline;

impl FilterPipeline {
    pub fn apply<T: Filterable + Clone>(
        collection: &[T],
        state: &FilterState,
        ctx: &FilterContext,
    ) -> Vec<T> {
        let items: Vec<&T> = collection.iter().collect();
        let items = by_scope(items, &ctx.viewer, state.assignee.as_deref());
        let items = by_type(items, state.task_type);
        let items = by_status(items, state.status, ctx.today_start);
        let items = by_priority(items, state.priority);
        let items = by_assigner(items, state.assigner.as_deref());
        let items = by_search(items, state.search.as_deref());
        let items = by_date_range(items, state, ctx.tz);
        items.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, UserRef};
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;
    use rstest::rstest;

    fn user(id: &str, name: &str) -> Option<UserRef> {
        Some(UserRef {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    fn task(id: &str, title: &str) -> TaskRecord {
        TaskRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            task_type: TaskType::Daily,
            assigned_by: user("boss", "Grace Hopper"),
            assigned_to: user("u1", "Ada"),
            due_date: Some(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            series_id: None,
            sequence_number: None,
            attachments: vec![],
            completed_at: None,
            completion_remarks: None,
            completion_attachments: vec![],
            deleted_at: None,
            auto_delete_at: None,
        }
    }

    fn admin_ctx() -> FilterContext {
        FilterContext::new(
            Viewer::new("admin", Role::Admin),
            Tz::UTC,
            Utc.with_ymd_and_hms(2026, 3, 12, 15, 0, 0).unwrap(),
        )
    }

    fn sample() -> Vec<TaskRecord> {
        let mut a = task("a", "Clean the lab");
        a.description = "Weekly deep CLEAN".to_string();
        let mut b = task("b", "File invoices");
        b.assigned_to = user("u2", "Linus");
        b.priority = TaskPriority::High;
        b.task_type = TaskType::Monthly;
        b.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let mut c = task("c", "Audit");
        c.status = TaskStatus::Completed;
        c.assigned_by = user("boss2", "Barbara");
        c.due_date = None;
        vec![a, b, c]
    }

    fn ids(items: &[TaskRecord]) -> Vec<&str> {
        items.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_is_identity() {
        let tasks = sample();
        let result = FilterPipeline::apply(&tasks, &FilterState::default(), &admin_ctx());
        assert_eq!(result, tasks);
    }

    #[test]
    fn test_non_privileged_scope_ignores_assignee_filter() {
        let tasks = sample();
        let ctx = FilterContext::new(Viewer::new("u2", Role::Employee), Tz::UTC, Utc::now());
        let state = FilterState {
            assignee: Some("u1".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &state, &ctx)), vec!["b"]);
    }

    #[test]
    fn test_privileged_scope_narrows_by_assignee() {
        let tasks = sample();
        let state = FilterState {
            assignee: Some("u1".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &state, &admin_ctx())), vec!["a", "c"]);
    }

    #[rstest]
    #[case(FilterState { task_type: Some(TaskType::Monthly), ..Default::default() }, vec!["b"])]
    #[case(FilterState { priority: Some(TaskPriority::High), ..Default::default() }, vec!["b"])]
    #[case(FilterState { status: Some(TaskStatus::Completed), ..Default::default() }, vec!["c"])]
    #[case(FilterState { assigner: Some("grace HOPPER".into()), ..Default::default() }, vec!["a", "b"])]
    #[case(FilterState { search: Some("clean".into()), ..Default::default() }, vec!["a"])]
    #[case(FilterState { search: Some("INVOICE".into()), ..Default::default() }, vec!["b"])]
    fn test_single_stage(#[case] state: FilterState, #[case] expected: Vec<&str>) {
        let tasks = sample();
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &state, &admin_ctx())), expected);
    }

    #[test]
    fn test_overdue_is_derived_with_local_midnight() {
        let tasks = sample();
        let state = FilterState {
            status: Some(TaskStatus::Overdue),
            ..Default::default()
        };
        // today is 2026-03-12; "a" was due on the 10th, "b" on the 14th
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &state, &admin_ctx())), vec!["a"]);

        let mut due_this_morning = task("d", "Due today");
        due_this_morning.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 12, 1, 0, 0).unwrap());
        let result = FilterPipeline::apply(&[due_this_morning], &state, &admin_ctx());
        assert!(result.is_empty());
    }

    #[test]
    fn test_wire_overdue_status_does_not_imply_overdue() {
        let mut labelled = task("e", "Labelled overdue");
        labelled.status = TaskStatus::Overdue;
        labelled.due_date = Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap());
        let state = FilterState {
            status: Some(TaskStatus::Overdue),
            ..Default::default()
        };
        assert!(FilterPipeline::apply(&[labelled], &state, &admin_ctx()).is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let tasks = sample();
        let state = FilterState {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 10),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 14),
            ..Default::default()
        };
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &state, &admin_ctx())), vec!["a", "b"]);

        let only_from = FilterState {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 11),
            ..Default::default()
        };
        assert_eq!(ids(&FilterPipeline::apply(&tasks, &only_from, &admin_ctx())), vec!["b"]);
    }

    #[test]
    fn test_series_status_uses_counters() {
        let series: MasterSeriesRecord = serde_json::from_str(
            r#"{"taskGroupId": "g", "title": "s", "pendingCount": 0, "completedCount": 3}"#,
        )
        .unwrap();
        let today = Utc::now();
        assert!(!series.matches_status(TaskStatus::Pending, today));
        assert!(series.matches_status(TaskStatus::Completed, today));
        assert!(!series.matches_status(TaskStatus::Overdue, today));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let tasks = sample();
        let snapshot = tasks.clone();
        let state = FilterState {
            search: Some("audit".into()),
            ..Default::default()
        };
        let _ = FilterPipeline::apply(&tasks, &state, &admin_ctx());
        assert_eq!(tasks, snapshot);
    }

    fn arb_task() -> impl Strategy<Value = TaskRecord> {
        (
            0usize..3,
            0usize..3,
            0usize..2,
            prop::sample::select(vec!["alpha", "beta", "Gamma ray", "delta"]),
            0i64..20,
        )
            .prop_map(|(prio, who, status, title, day)| {
                let mut t = task(&format!("{title}-{day}"), title);
                t.priority = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High][prio];
                t.assigned_to = user(["u1", "u2", "u3"][who], "x");
                t.status = [TaskStatus::Pending, TaskStatus::Completed][status];
                t.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
                    + chrono::Duration::days(day));
                t
            })
    }

    fn arb_state() -> impl Strategy<Value = FilterState> {
        (
            prop::option::of(prop::sample::select(vec![TaskPriority::Low, TaskPriority::High])),
            prop::option::of(prop::sample::select(vec!["u1".to_string(), "u2".to_string()])),
            prop::option::of(prop::sample::select(vec!["a".to_string(), "RAY".to_string()])),
            prop::option::of(prop::sample::select(vec![TaskStatus::Pending, TaskStatus::Overdue])),
            prop::option::of(1u32..15),
        )
            .prop_map(|(priority, assignee, search, status, from)| FilterState {
                priority,
                assignee,
                search,
                status,
                date_from: from.and_then(|d| NaiveDate::from_ymd_opt(2026, 3, d)),
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_filter_is_idempotent(
            tasks in prop::collection::vec(arb_task(), 0..40),
            state in arb_state(),
        ) {
            let ctx = admin_ctx();
            let once = FilterPipeline::apply(&tasks, &state, &ctx);
            let twice = FilterPipeline::apply(&once, &state, &ctx);
            prop_assert_eq!(once, twice);
        }
    }
}
