// src/pipeline.rs

use crate::aggregator::{batch_channel, fan_in};
use crate::config::Config;
use crate::error::ImportError;
use crate::gitlab::Origin;
use crate::importer::{open_or_clone, Importer};
use crate::model::{ImportResult, ProjectBatch, RunSummary};
use crate::publisher::Publish;
use std::sync::mpsc::Receiver;
use std::thread;
use tracing::info;

/// Drains the batch stream into the repository, one batch at a time.
fn consume(
    importer: &mut Importer,
    batches: &Receiver<ProjectBatch>,
) -> Result<(ImportResult, usize), ImportError> {
    let mut total = ImportResult::default();
    let mut count = 0;
    for batch in batches.iter() {
        let result = importer.import_batch(&batch.commits)?;
        info!(
            project = batch.project,
            created = result.created,
            duplicates = result.duplicates,
            "imported batch"
        );
        total += result;
        count += 1;
    }
    Ok((total, count))
}

/// One complete import: list projects, fetch them in parallel, import
/// serially, and push if anything new was created.
pub fn run<O, P>(config: &Config, origin: &O, publisher: &P) -> Result<RunSummary, ImportError>
where
    O: Origin,
    P: Publish,
{
    let user = origin.current_user()?;
    info!("Authenticated as {} (id {})", user.username, user.id);

    let projects = origin.contributed_projects(user.id)?;
    let mut summary = RunSummary {
        projects: projects.len(),
        ..Default::default()
    };
    if projects.is_empty() {
        info!("No contributions found for this user. Nothing to import.");
        return Ok(summary);
    }
    info!("Found contributions in {} projects", projects.len());

    let author = config.gitlab_username.as_str();
    let repo = open_or_clone(config)?;
    let mut importer = Importer::new(repo, config)?;

    let (tx, rx) = batch_channel(projects.len());
    let project_ids = &projects;
    let (imported, batches) = thread::scope(|s| -> Result<(ImportResult, usize), ImportError> {
        let fetcher = s.spawn(move || fan_in(origin, project_ids, author, config.jobs, tx));
        let consumed = consume(&mut importer, &rx);
        let stats = fetcher
            .join()
            .map_err(|_| ImportError::AggregatorPanicked)??;
        info!(
            delivered = stats.delivered,
            empty = stats.empty,
            failed = stats.failed,
            "fetching finished"
        );
        consumed
    })?;

    summary.imported = imported;
    summary.batches = batches;
    info!("Imported {} commits.", imported.created);

    if imported.created > 0 {
        summary.push = Some(publisher.publish(importer.repo())?);
    } else {
        info!("No new commits were created, skipping push operation.");
    }
    Ok(summary)
}
