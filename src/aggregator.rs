// src/aggregator.rs

use crate::error::ImportError;
use crate::gitlab::Origin;
use crate::model::{ProjectBatch, ProjectId};
use indicatif::ProgressBar;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use tracing::{info, warn};

/// Channel between the fetch workers and the importer.
///
/// Capacity equals the number of projects, so no worker ever waits on the consumer.
pub fn batch_channel(projects: usize) -> (SyncSender<ProjectBatch>, Receiver<ProjectBatch>) {
    sync_channel(projects.max(1))
}

/// Counters for one fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanInStats {
    pub delivered: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Fetches every project on a pool of `jobs` workers and sends each non-empty
/// batch to `output`.
///
/// A failing project is logged and skipped. Returns once every fetch has
/// finished; `output` is consumed, so the receiver sees end-of-stream as soon
/// as this returns.
pub fn fan_in<O: Origin + ?Sized>(
    origin: &O,
    projects: &[ProjectId],
    author: &str,
    jobs: usize,
    output: SyncSender<ProjectBatch>,
) -> Result<FanInStats, ImportError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("fetch-{i}"))
        .build()?;

    let delivered = AtomicUsize::new(0);
    let empty = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let bar = ProgressBar::new(projects.len() as u64);
    bar.set_message("Fetching commits");

    // The scope only returns after every spawned fetch has completed.
    pool.scope(|s| {
        for &project in projects {
            let output = output.clone();
            let (bar, delivered, empty, failed) = (&bar, &delivered, &empty, &failed);
            s.spawn(move |_| {
                match origin.project_commits(project, author) {
                    Ok(commits) if commits.is_empty() => {
                        empty.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(commits) => {
                        info!(project, count = commits.len(), "found commits");
                        // The importer may have stopped on a fatal error; nothing left to do then.
                        if output.send(ProjectBatch { project, commits }).is_ok() {
                            delivered.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) if e.is_no_commits() => {
                        info!(project, "no commits by {author}, skipping");
                        empty.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(project, "error fetching commits: {e}");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                bar.inc(1);
            });
        }
    });
    drop(output);
    bar.finish_with_message("Fetching complete");

    let stats = FanInStats {
        delivered: delivered.into_inner(),
        empty: empty.into_inner(),
        failed: failed.into_inner(),
    };
    if stats.delivered == 0 {
        info!("no valid commits found across any projects");
    }
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::{CommitRecord, RemoteUser};
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn record(id: &str, authored: &str) -> CommitRecord {
        CommitRecord {
            id: id.to_string(),
            message: format!("work on {id}"),
            author_name: "Remote Author".into(),
            author_email: "remote@example.com".into(),
            authored_date: DateTime::parse_from_rfc3339(authored).unwrap(),
        }
    }

    /// In-memory origin: `None` for a project means the fetch fails.
    #[derive(Default)]
    pub(crate) struct FakeOrigin {
        pub projects: Vec<ProjectId>,
        /// Makes the project listing answer with a server error
        pub listing_fails: bool,
        pub commits: HashMap<ProjectId, Option<Vec<CommitRecord>>>,
        pub calls: Mutex<Vec<(ProjectId, String)>>,
    }

    impl Origin for FakeOrigin {
        fn current_user(&self) -> Result<RemoteUser, FetchError> {
            Ok(RemoteUser {
                id: 1,
                username: "alice".into(),
            })
        }

        fn contributed_projects(&self, user_id: u64) -> Result<Vec<ProjectId>, FetchError> {
            if self.listing_fails {
                return Err(FetchError::Server {
                    url: format!("http://gitlab.test/users/{user_id}/contributed_projects"),
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "maintenance".into(),
                });
            }
            Ok(self.projects.clone())
        }

        fn project_commits(
            &self,
            project: ProjectId,
            author: &str,
        ) -> Result<Vec<CommitRecord>, FetchError> {
            self.calls.lock().unwrap().push((project, author.to_string()));
            match self.commits.get(&project) {
                Some(Some(commits)) if !commits.is_empty() => Ok(commits.clone()),
                Some(Some(_)) => Err(FetchError::NoCommits(project)),
                _ => Err(FetchError::Server {
                    url: format!("http://gitlab.test/projects/{project}"),
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".into(),
                }),
            }
        }
    }

    #[test]
    fn failing_projects_do_not_affect_siblings() {
        let origin = FakeOrigin {
            projects: vec![1, 2, 3, 4],
            commits: HashMap::from([
                (1, Some(vec![record("a1", "2024-01-01T10:00:00Z")])),
                (2, Some(vec![])),
                (3, None),
                (
                    4,
                    Some(vec![
                        record("d1", "2024-01-02T10:00:00Z"),
                        record("d2", "2024-01-03T10:00:00Z"),
                    ]),
                ),
            ]),
            ..Default::default()
        };

        let (tx, rx) = batch_channel(origin.projects.len());
        let stats = fan_in(&origin, &origin.projects, "alice", 2, tx).unwrap();
        assert_eq!(stats, FanInStats { delivered: 2, empty: 1, failed: 1 });

        let mut batches: Vec<ProjectBatch> = rx.iter().collect();
        batches.sort_by_key(|b| b.project);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].project, 1);
        let ids: Vec<_> = batches[1].commits.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2"]);

        let calls = origin.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|(_, author)| author == "alice"));
    }

    #[test]
    fn stream_closes_when_nothing_is_found() {
        let origin = FakeOrigin {
            projects: vec![9],
            commits: HashMap::from([(9, Some(vec![]))]),
            ..Default::default()
        };
        let (tx, rx) = batch_channel(1);
        let stats = fan_in(&origin, &origin.projects, "alice", 4, tx).unwrap();
        assert_eq!(stats.delivered, 0);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn all_batches_fit_without_a_consumer() {
        let projects: Vec<ProjectId> = (1..=16).collect();
        let origin = FakeOrigin {
            commits: projects
                .iter()
                .map(|&p| (p, Some(vec![record(&format!("c{p}"), "2024-05-05T05:05:05Z")])))
                .collect(),
            projects,
            ..Default::default()
        };
        // Nobody reads until fan_in returns; a smaller buffer would deadlock here.
        let (tx, rx) = batch_channel(origin.projects.len());
        let stats = fan_in(&origin, &origin.projects, "alice", 8, tx).unwrap();
        assert_eq!(stats.delivered, 16);
        assert_eq!(rx.iter().count(), 16);
    }
}
