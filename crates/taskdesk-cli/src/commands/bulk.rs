use anyhow::Result;
use owo_colors::OwoColorize;
use taskdesk_core::api::TaskApi;
use taskdesk_core::bulk::{BulkOperationSession, SelectOutcome};
use taskdesk_core::source::DataSource;

use crate::cli::BulkReassignCommand;
use crate::commands::ask_attachment_decision;
use crate::views::progress::with_spinner;

pub async fn bulk_reassign<A: TaskApi>(
    source: &mut DataSource<A>,
    command: BulkReassignCommand,
) -> Result<()> {
    with_spinner("Loading series...", source.load()).await?;

    let mut session = BulkOperationSession::new();
    for series_id in &command.series_ids {
        let known = source.find_series(series_id).cloned();
        let series = match known {
            Some(series) => series,
            None => source.series_detail(series_id).await?,
        };
        if let SelectOutcome::Excluded(_) = session.select(&series) {
            println!(
                "{} '{}' has an end date and will be skipped",
                "Note:".yellow().bold(),
                series.title
            );
        }
    }

    let pending: Vec<(String, String)> = session
        .pending_decisions()
        .into_iter()
        .map(|s| (s.series_id.clone(), s.title.clone()))
        .collect();
    for (series_id, title) in pending {
        let include = match command.files.decision() {
            Some(include) => include,
            None => ask_attachment_decision(&[title])?,
        };
        session.set_decision(&series_id, include);
    }

    let outcome = session.submit(source).await?;
    println!(
        "Reassigned {} of {} requested series ({} excluded, {} failed)",
        outcome.succeeded, outcome.requested, outcome.excluded, outcome.failed
    );
    outcome.into_result()?;
    Ok(())
}
