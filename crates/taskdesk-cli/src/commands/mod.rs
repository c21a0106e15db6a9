use anyhow::Result;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use taskdesk_core::api::TaskApi;
use taskdesk_core::error::CoreError;
use taskdesk_core::mutation::{Mutation, MutationCoordinator};
use taskdesk_core::source::DataSource;

pub mod bulk;
pub mod delete;
pub mod list;
pub mod purge;
pub mod reassign;
pub mod restore;
pub mod show;

/// Ask whether attachments should be kept for the named series.
pub fn ask_attachment_decision(titles: &[String]) -> Result<bool> {
    println!(
        "{} {}",
        "Attachments found on:".yellow(),
        titles.join(", ")
    );
    let include = Confirm::new()
        .with_prompt("Include attached files?")
        .default(true)
        .interact()?;
    Ok(include)
}

pub fn confirm(prompt: String) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Apply a series mutation, asking for the attachment decision if the
/// engine reports one is missing.
pub async fn apply_with_decision<A, F>(
    source: &mut DataSource<A>,
    decision: Option<bool>,
    build: F,
) -> Result<()>
where
    A: TaskApi,
    F: Fn(Option<bool>) -> Mutation,
{
    let mut coordinator = MutationCoordinator::new(source);
    match coordinator.apply(build(decision)).await {
        Err(CoreError::MissingDecisions(titles)) => {
            let include = ask_attachment_decision(&titles)?;
            coordinator.apply(build(Some(include))).await?;
            Ok(())
        }
        other => Ok(other?),
    }
}
