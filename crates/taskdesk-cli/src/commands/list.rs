use anyhow::Result;
use chrono_tz::Tz;
use taskdesk_core::api::TaskApi;
use taskdesk_core::models::FilterState;
use taskdesk_core::source::{DataMode, DataSource, VisiblePage};

use crate::cli::ListCommand;
use crate::parser::parse_date;
use crate::views::progress::with_spinner;
use crate::views::table::{display_instances, display_page_footer, display_series, TableContext};

pub fn filters_from(command: &ListCommand, tz: Tz) -> Result<FilterState> {
    Ok(FilterState {
        task_type: command.task_type,
        status: command.status,
        priority: command.priority,
        assigner: command.assigner.clone(),
        assignee: command.assignee.clone(),
        search: command.search.clone(),
        date_from: command.from.as_deref().map(|d| parse_date(d, tz)).transpose()?,
        date_to: command.to.as_deref().map(|d| parse_date(d, tz)).transpose()?,
    }
    .normalized())
}

pub async fn list<A: TaskApi>(
    source: &mut DataSource<A>,
    command: ListCommand,
    ctx: &TableContext,
) -> Result<()> {
    // Filters were set when the source was built; in paged mode a later
    // page is fetched directly instead of going through page 1.
    if source.mode() == DataMode::Paged && command.page > 1 {
        with_spinner("Loading tasks...", source.set_page(command.page)).await?;
    } else {
        with_spinner("Loading tasks...", source.load()).await?;
        if command.page > 1 {
            source.set_page(command.page).await?;
        }
    }

    match source.visible_page() {
        VisiblePage::Instances(tasks) => display_instances(tasks, ctx),
        VisiblePage::Series(series) => display_series(series, ctx),
    }
    display_page_footer(source.page(), source.total_pages(), source.total());

    Ok(())
}
