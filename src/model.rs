// src/model.rs

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Uniquely identifies a project on the origin system
pub type ProjectId = u64;

/// The authenticated account on the origin system
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: u64,
    pub username: String,
}

/// One commit as reported by the origin system
#[derive(Debug, Clone, Deserialize)]
pub struct CommitRecord {
    /// Content hash on the origin; doubles as the dedup key and the synthetic commit message
    pub id: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    /// Keeps the offset it was authored in, so the synthetic commit lands on the same day
    pub authored_date: DateTime<FixedOffset>,
}

/// All commits fetched for a single project
#[derive(Debug, Clone)]
pub struct ProjectBatch {
    pub project: ProjectId,
    pub commits: Vec<CommitRecord>,
}

/// Outcome of importing one batch into the local repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub created: usize,
    pub duplicates: usize,
}

impl std::ops::AddAssign for ImportResult {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.duplicates += rhs.duplicates;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    UpToDate,
}

/// What a complete run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub projects: usize,
    pub batches: usize,
    pub imported: ImportResult,
    /// `None` when the publisher was never invoked
    pub push: Option<PushOutcome>,
}
