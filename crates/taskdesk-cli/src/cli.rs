use clap::{Args, Parser, Subcommand};
use taskdesk_core::models::{TaskPriority, TaskStatus, TaskType};

/// Admin console for recurring task series and the task recycle bin
#[derive(Parser, Debug)]
#[command(name = "taskdesk", author, version, about, long_about = None)]
pub struct Cli {
    /// Work on the recycle bin instead of live recurring tasks
    #[arg(long, global = true)]
    pub bin: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List instances page by page, or whole series with --aggregate
    List(ListCommand),
    /// Show a series with all of its instances
    Show(ShowCommand),
    /// Delete a series (to the bin unless --permanent)
    Delete(DeleteCommand),
    /// Restore a task or series from the bin
    Restore(RestoreCommand),
    /// Permanently delete one task from the bin
    Purge(PurgeCommand),
    /// Reassign a forever series for the next period
    Reassign(ReassignCommand),
    /// Reassign several forever series at once
    BulkReassign(BulkReassignCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListCommand {
    /// Load every series once and filter locally
    #[arg(long)]
    pub aggregate: bool,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Page size (defaults to the configured size)
    #[arg(long)]
    pub size: Option<usize>,
    #[arg(long = "type")]
    pub task_type: Option<TaskType>,
    #[arg(long)]
    pub status: Option<TaskStatus>,
    #[arg(long)]
    pub priority: Option<TaskPriority>,
    /// Assigner display name
    #[arg(long)]
    pub assigner: Option<String>,
    /// Assignee user id
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(short, long)]
    pub search: Option<String>,
    /// Start of the date range (e.g. '2026-03-01', 'last monday')
    #[arg(long)]
    pub from: Option<String>,
    /// End of the date range, inclusive
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowCommand {
    pub series_id: String,
}

/// What to do with files attached to a series or its instances.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct AttachmentChoice {
    /// Keep attachments
    #[arg(long, conflicts_with = "exclude_files")]
    pub include_files: bool,
    /// Drop attachments
    #[arg(long)]
    pub exclude_files: bool,
}

impl AttachmentChoice {
    /// `None` when neither flag was given and the user must be asked.
    pub fn decision(&self) -> Option<bool> {
        match (self.include_files, self.exclude_files) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeleteCommand {
    pub series_id: String,
    /// Skip the bin
    #[arg(long)]
    pub permanent: bool,
    #[command(flatten)]
    pub files: AttachmentChoice,
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RestoreCommand {
    /// Task id, or series id with --series
    pub id: String,
    /// Restore a whole series
    #[arg(long)]
    pub series: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PurgeCommand {
    pub task_id: String,
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReassignCommand {
    pub series_id: String,
    #[command(flatten)]
    pub files: AttachmentChoice,
}

#[derive(Args, Debug, Clone)]
pub struct BulkReassignCommand {
    #[arg(required = true, num_args = 1..)]
    pub series_ids: Vec<String>,
    /// Applied to every selected series that has attachments
    #[command(flatten)]
    pub files: AttachmentChoice,
}
