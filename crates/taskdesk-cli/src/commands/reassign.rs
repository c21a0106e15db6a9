use anyhow::Result;
use taskdesk_core::api::TaskApi;
use taskdesk_core::mutation::Mutation;
use taskdesk_core::source::DataSource;

use crate::cli::ReassignCommand;
use crate::commands::apply_with_decision;

pub async fn reassign<A: TaskApi>(source: &mut DataSource<A>, command: ReassignCommand) -> Result<()> {
    apply_with_decision(source, command.files.decision(), |include_files| {
        Mutation::ReassignSeries {
            series_id: command.series_id.clone(),
            include_files,
        }
    })
    .await
}
