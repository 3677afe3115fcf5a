// src/importer.rs

use crate::config::Config;
use crate::error::ImportError;
use crate::model::{CommitRecord, ImportResult};
use chrono::{DateTime, FixedOffset};
use git2::build::RepoBuilder;
use git2::{Commit, Cred, ErrorCode, FetchOptions, RemoteCallbacks, Repository, Signature, Time};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub const REMOTE_NAME: &str = "origin";

/// Tracked placeholder staged before every synthetic commit
const SENTINEL_FILE: &str = "readme.md";
const SENTINEL_CONTENT: &str = "Just a readme.";

/// Credential callback offering the configured token once, then giving up.
pub fn token_callbacks<'a>(username: &'a str, token: &'a str) -> RemoteCallbacks<'a> {
    let mut tried = false;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, _allowed| {
        if tried {
            return Err(git2::Error::from_str("push token was rejected"));
        }
        tried = true;
        Cred::userpass_plaintext(username_from_url.unwrap_or(username), token)
    });
    callbacks
}

/// Opens the local copy of the destination repository, cloning it first if missing.
pub fn open_or_clone(config: &Config) -> Result<Repository, ImportError> {
    let path = &config.repo_path;
    let repo = match Repository::open(path) {
        Ok(repo) => {
            info!("Opened existing repository at {}", path.display());
            repo
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            info!(
                "Repository doesn't exist, cloning {} into {}",
                config.origin_repo_url,
                path.display()
            );
            let mut fetch = FetchOptions::new();
            fetch.remote_callbacks(token_callbacks(&config.push_username, &config.origin_token));
            RepoBuilder::new()
                .fetch_options(fetch)
                .clone(&config.origin_repo_url, path)?
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = repo.find_remote(REMOTE_NAME) {
        if e.code() != ErrorCode::NotFound {
            return Err(e.into());
        }
        info!("Adding remote {REMOTE_NAME} -> {}", config.origin_repo_url);
        repo.remote(REMOTE_NAME, &config.origin_repo_url)?;
    }
    Ok(repo)
}

/// The commit HEAD points at, or `None` on a repository without history.
fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, git2::Error> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Messages of every commit reachable from HEAD, i.e. the origin identifiers already imported.
pub fn imported_identifiers(repo: &Repository) -> Result<HashSet<String>, git2::Error> {
    let mut known = HashSet::new();
    let Some(head) = head_commit(repo)? else {
        return Ok(known);
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.push(head.id())?;
    for oid in revwalk {
        let commit = repo.find_commit(oid?)?;
        if let Some(message) = commit.message() {
            known.insert(message.trim().to_string());
        }
    }
    Ok(known)
}

fn git_time(date: &DateTime<FixedOffset>) -> Time {
    Time::new(date.timestamp(), date.offset().local_minus_utc() / 60)
}

/// Turns fetched commit records into synthetic commits on the current branch.
///
/// Owns the repository; must stay on a single thread.
pub struct Importer {
    repo: Repository,
    author_name: String,
    author_email: String,
    known: HashSet<String>,
}

impl Importer {
    /// Seeds the set of known identifiers from the repository's full history.
    pub fn new(repo: Repository, config: &Config) -> Result<Self, ImportError> {
        let known = imported_identifiers(&repo)?;
        info!("Found {} previously imported commits", known.len());
        Ok(Self {
            repo,
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
            known,
        })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    fn stage_sentinel(&self) -> Result<git2::Oid, ImportError> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| git2::Error::from_str("repository has no working tree"))?;
        let sentinel = workdir.join(SENTINEL_FILE);
        if !sentinel.exists() {
            fs::write(&sentinel, SENTINEL_CONTENT)?;
        }

        let mut index = self.repo.index()?;
        index.add_path(Path::new(SENTINEL_FILE))?;
        index.write()?;
        Ok(index.write_tree()?)
    }

    fn commit(
        &self,
        record: &CommitRecord,
        tree: &git2::Tree<'_>,
    ) -> Result<git2::Oid, ImportError> {
        let when = git_time(&record.authored_date);
        let signature = Signature::new(&self.author_name, &self.author_email, &when)?;
        let parent = head_commit(&self.repo)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        // git2 never refuses a commit whose tree equals its parent's.
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, &record.id, tree, &parents)?;
        Ok(oid)
    }

    /// Imports one project's commits in the order given, skipping known identifiers.
    pub fn import_batch(&mut self, commits: &[CommitRecord]) -> Result<ImportResult, ImportError> {
        let mut result = ImportResult::default();
        if commits.is_empty() {
            debug!("No commits to process");
            return Ok(result);
        }

        let tree_id = self.stage_sentinel()?;
        let tree = self.repo.find_tree(tree_id)?;

        for record in commits {
            if self.known.contains(&record.id) {
                debug!("Commit {} is already imported", record.id);
                result.duplicates += 1;
                continue;
            }
            let oid = self.commit(record, &tree)?;
            debug!(
                "Created commit {oid} for {} by {} <{}> on {}: {}",
                record.id,
                record.author_name,
                record.author_email,
                record.authored_date.to_rfc2822(),
                record.message.lines().next().unwrap_or_default()
            );
            self.known.insert(record.id.clone());
            result.created += 1;
        }
        Ok(result)
    }
}
