use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use taskdesk_core::models::{MasterSeriesRecord, TaskPriority, TaskRecord, TaskStatus, UserRef};
use taskdesk_core::timezone::today_start;

/// Rendering options shared by every table.
#[derive(Debug, Clone, Copy)]
pub struct TableContext {
    pub tz: Tz,
    pub now: DateTime<Utc>,
    /// Bin view: show purge dates instead of due dates
    pub bin: bool,
    pub retention_days: i64,
}

fn user_name(user: Option<&UserRef>) -> String {
    match user {
        Some(u) if !u.name.is_empty() => u.name.clone(),
        Some(u) => u.id.clone(),
        None => "None".to_string(),
    }
}

fn priority_cell(priority: TaskPriority) -> Cell {
    let cell = Cell::new(priority.to_string());
    match priority {
        TaskPriority::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        TaskPriority::Medium => cell.fg(Color::Yellow),
        TaskPriority::Low => cell.fg(Color::Green),
    }
}

fn local_date(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

fn status_cell(task: &TaskRecord, ctx: &TableContext) -> Cell {
    if task.is_overdue(today_start(ctx.now, ctx.tz)) {
        return Cell::new("overdue").fg(Color::Red).add_attribute(Attribute::Bold);
    }
    let cell = Cell::new(task.status.to_string());
    match task.status {
        TaskStatus::Completed => cell.fg(Color::Green),
        TaskStatus::Deleted => cell.fg(Color::DarkGrey),
        TaskStatus::Pending | TaskStatus::Overdue => cell,
    }
}

fn date_cell(task: &TaskRecord, ctx: &TableContext) -> Cell {
    if ctx.bin {
        return match task.effective_auto_delete_at(ctx.retention_days) {
            Some(at) => Cell::new(format!("purged {}", at.humanize())).fg(Color::DarkGrey),
            None => Cell::new("None"),
        };
    }
    match task.due_date {
        Some(due) => {
            let text = format!("{} ({})", local_date(due, ctx.tz), due.humanize());
            if task.is_overdue(today_start(ctx.now, ctx.tz)) {
                Cell::new(text).fg(Color::Red)
            } else {
                Cell::new(text)
            }
        }
        None => Cell::new("None"),
    }
}

pub fn display_instances(tasks: &[TaskRecord], ctx: &TableContext) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    let date_header = if ctx.bin { "Purge" } else { "Due" };
    table.set_header(vec!["ID", "Title", "Type", "Status", "Priority", "Assignee", date_header]);

    for task in tasks {
        let mut row = Row::new();
        row.add_cell(Cell::new(&task.id));

        let mut title = task.title.clone();
        if task.has_attachments() {
            title.push_str(" 📎");
        }
        row.add_cell(Cell::new(title));
        row.add_cell(Cell::new(task.task_type.to_string()));
        row.add_cell(status_cell(task, ctx));
        row.add_cell(priority_cell(task.priority));
        row.add_cell(Cell::new(user_name(task.assigned_to.as_ref())));
        row.add_cell(date_cell(task, ctx));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_series(series: &[MasterSeriesRecord], ctx: &TableContext) {
    if series.is_empty() {
        println!("No series found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Series", "Title", "Type", "Priority", "Assignee", "Starts", "Ends", "Done/Total",
    ]);

    for s in series {
        let mut row = Row::new();
        row.add_cell(Cell::new(&s.series_id));

        let mut title = String::new();
        if s.is_forever() {
            title.push_str("↻ ");
        }
        title.push_str(&s.title);
        if s.has_attachments() {
            title.push_str(" 📎");
        }
        row.add_cell(Cell::new(title));
        row.add_cell(Cell::new(s.task_type.to_string()));
        row.add_cell(priority_cell(s.priority));
        row.add_cell(Cell::new(user_name(s.assigned_to.as_ref())));
        row.add_cell(Cell::new(
            s.recurrence
                .start_date
                .map(|d| local_date(d, ctx.tz))
                .unwrap_or_else(|| "None".to_string()),
        ));
        let ends = if s.is_forever() {
            Cell::new("forever").fg(Color::Cyan)
        } else {
            Cell::new(
                s.recurrence
                    .end_date
                    .map(|d| local_date(d, ctx.tz))
                    .unwrap_or_else(|| "None".to_string()),
            )
        };
        row.add_cell(ends);
        row.add_cell(Cell::new(format!("{}/{}", s.completed_count, s.instance_count)));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_series_detail(series: &MasterSeriesRecord, ctx: &TableContext) {
    display_series(std::slice::from_ref(series), ctx);
    if !series.description.is_empty() {
        println!("{}", series.description);
    }
    println!(
        "Assigned by {} | {} pending, {} completed, {} deleted",
        user_name(series.assigned_by.as_ref()),
        series.pending_count,
        series.completed_count,
        series.deleted_count
    );
    display_instances(series.tasks.as_deref().unwrap_or_default(), ctx);
}

pub fn display_page_footer(page: usize, total_pages: usize, total: usize) {
    println!("Page {} of {} ({} total)", page, total_pages, total);
}
