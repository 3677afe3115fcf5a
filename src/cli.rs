// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Mirror GitLab commit activity into another git repository",
    long_about = None
)]
pub struct Args {
    /// Base URL of the GitLab instance, e.g. https://gitlab.com
    #[arg(long, env = "BASE_URL")]
    pub base_url: String,

    /// GitLab personal access token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: String,

    /// Commit author name or email to import, as GitLab's `author` filter matches it
    #[arg(long, env = "GITLAB_USERNAME")]
    pub gitlab_username: String,

    /// Name used as author and committer of the imported commits
    #[arg(long, env = "GITHUB_USERNAME")]
    pub author_name: String,

    /// Email used as author and committer of the imported commits
    #[arg(long, env = "COMMITER_EMAIL")]
    pub author_email: String,

    /// URL of the repository receiving the imported commits
    #[arg(long, env = "ORIGIN_REPO_URL")]
    pub origin_repo_url: String,

    /// Token used to clone from and push to the receiving repository
    #[arg(long, env = "ORIGIN_TOKEN", hide_env_values = true)]
    pub origin_token: String,

    /// Username presented with the push token (defaults to the author name)
    #[arg(long, env = "ORIGIN_USERNAME")]
    pub push_username: Option<String>,

    /// Local working copy of the receiving repository [default: ~/commits-importer]
    #[arg(long, env = "IMPORTER_REPO_PATH")]
    pub repo_path: Option<PathBuf>,

    /// Number of projects fetched in parallel
    #[arg(short, long, env = "IMPORTER_JOBS", default_value_t = 8)]
    pub jobs: usize,

    /// Per-request timeout for the GitLab API, in seconds
    #[arg(long, env = "IMPORTER_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}
