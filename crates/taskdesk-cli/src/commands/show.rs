use anyhow::Result;
use taskdesk_core::api::TaskApi;
use taskdesk_core::source::DataSource;

use crate::cli::ShowCommand;
use crate::views::progress::with_spinner;
use crate::views::table::{display_series_detail, TableContext};

pub async fn show<A: TaskApi>(
    source: &mut DataSource<A>,
    command: ShowCommand,
    ctx: &TableContext,
) -> Result<()> {
    let series = with_spinner("Loading series...", source.series_detail(&command.series_id)).await?;
    display_series_detail(&series, ctx);
    Ok(())
}
