// src/config.rs

use crate::cli::Args;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Directory under $HOME used when no repository path is configured
const DEFAULT_REPO_DIR: &str = "commits-importer";

/// Settings for a single run, validated once and then only borrowed
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub gitlab_token: String,
    /// Value of GitLab's `author` filter for the commit listing
    pub gitlab_username: String,
    pub author_name: String,
    pub author_email: String,
    pub origin_repo_url: String,
    pub origin_token: String,
    pub push_username: String,
    pub repo_path: PathBuf,
    pub jobs: usize,
    pub timeout: Duration,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let base_url = required("BASE_URL", &args.base_url)?;
        let base_url = Url::parse(&base_url).map_err(|e| ConfigError::Invalid {
            var: "BASE_URL",
            reason: e.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "BASE_URL",
                reason: format!("unsupported scheme {}", base_url.scheme()),
            });
        }

        let author_name = required("GITHUB_USERNAME", &args.author_name)?;
        let author_email = required("COMMITER_EMAIL", &args.author_email)?;
        if !author_email.contains('@') {
            return Err(ConfigError::Invalid {
                var: "COMMITER_EMAIL",
                reason: format!("{author_email} is not an email address"),
            });
        }

        let gitlab_username = required("GITLAB_USERNAME", &args.gitlab_username)?;
        let push_username = match args.push_username.as_deref() {
            Some(name) => required("ORIGIN_USERNAME", name)?,
            None => author_name.clone(),
        };

        let repo_path = match args.repo_path {
            Some(path) => path,
            None => dirs::home_dir()
                .ok_or(ConfigError::Missing("IMPORTER_REPO_PATH"))?
                .join(DEFAULT_REPO_DIR),
        };

        if args.jobs == 0 {
            return Err(ConfigError::Invalid {
                var: "IMPORTER_JOBS",
                reason: "must be at least 1".into(),
            });
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "IMPORTER_TIMEOUT_SECS",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Config {
            base_url,
            gitlab_token: required("GITLAB_TOKEN", &args.gitlab_token)?,
            gitlab_username,
            author_name,
            author_email,
            origin_repo_url: required("ORIGIN_REPO_URL", &args.origin_repo_url)?,
            origin_token: required("ORIGIN_TOKEN", &args.origin_token)?,
            push_username,
            repo_path,
            jobs: args.jobs,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }
}

fn required(var: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(var));
    }
    Ok(value.to_string())
}
