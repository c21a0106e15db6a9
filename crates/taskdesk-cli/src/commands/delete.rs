use anyhow::Result;
use taskdesk_core::api::TaskApi;
use taskdesk_core::mutation::Mutation;
use taskdesk_core::source::DataSource;

use crate::cli::DeleteCommand;
use crate::commands::{apply_with_decision, confirm};

pub async fn delete<A: TaskApi>(source: &mut DataSource<A>, command: DeleteCommand) -> Result<()> {
    if !command.force {
        let series = source.series_detail(&command.series_id).await?;
        let prompt = if command.permanent {
            format!(
                "Permanently delete series '{}' and all of its instances?",
                series.title
            )
        } else {
            format!("Move series '{}' to the bin?", series.title)
        };
        if !confirm(prompt)? {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let series_id = command.series_id.clone();
    apply_with_decision(source, command.files.decision(), |include_files| {
        if command.permanent {
            Mutation::PermanentDeleteSeries {
                series_id: series_id.clone(),
                include_files,
            }
        } else {
            Mutation::SoftDeleteSeries {
                series_id: series_id.clone(),
                include_files,
            }
        }
    })
    .await
}
