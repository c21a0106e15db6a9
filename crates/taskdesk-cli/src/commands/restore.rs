use anyhow::Result;
use taskdesk_core::api::TaskApi;
use taskdesk_core::mutation::MutationCoordinator;
use taskdesk_core::source::DataSource;

use crate::cli::RestoreCommand;

pub async fn restore<A: TaskApi>(source: &mut DataSource<A>, command: RestoreCommand) -> Result<()> {
    let mut coordinator = MutationCoordinator::new(source);
    if command.series {
        coordinator.restore_series(&command.id).await?;
    } else {
        coordinator.restore_task(&command.id).await?;
    }
    Ok(())
}
