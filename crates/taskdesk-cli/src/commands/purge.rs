use anyhow::Result;
use taskdesk_core::api::TaskApi;
use taskdesk_core::mutation::MutationCoordinator;
use taskdesk_core::source::DataSource;

use crate::cli::PurgeCommand;
use crate::commands::confirm;

pub async fn purge<A: TaskApi>(source: &mut DataSource<A>, command: PurgeCommand) -> Result<()> {
    if !command.force
        && !confirm(format!(
            "Permanently delete task '{}'? This cannot be undone",
            command.task_id
        ))?
    {
        println!("Purge cancelled.");
        return Ok(());
    }

    MutationCoordinator::new(source)
        .purge_task(&command.task_id)
        .await?;
    Ok(())
}
