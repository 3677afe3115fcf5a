// src/error.rs

use crate::model::ProjectId;
use thiserror::Error;

/// Failures talking to the origin system
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}: {body}")]
    Server {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("found no commits in project {0}")]
    NoCommits(ProjectId),
}

impl FetchError {
    /// An empty project is expected and only means there is nothing to import from it.
    pub fn is_no_commits(&self) -> bool {
        matches!(self, FetchError::NoCommits(_))
    }
}

/// Fatal failures of an import run
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not start fetch workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("remote rejected {reference}: {message}")]
    PushRejected { reference: String, message: String },

    #[error("fetch aggregator panicked")]
    AggregatorPanicked,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}
