// src/gitlab.rs

//! Read side of the import: who the user is, which projects they touched,
//! and which commits they authored in each of them.

use crate::config::Config;
use crate::error::FetchError;
use crate::model::{CommitRecord, ProjectId, RemoteUser};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "X-Next-Page";
const PER_PAGE: &str = "100";

/// Everything the import needs from the origin system.
///
/// Implementations are shared by all fetch workers, hence `Sync`.
pub trait Origin: Sync {
    fn current_user(&self) -> Result<RemoteUser, FetchError>;

    /// Every project the user contributed to, across all pages.
    fn contributed_projects(&self, user_id: u64) -> Result<Vec<ProjectId>, FetchError>;

    /// Every commit in `project` authored by `author`, across all pages.
    ///
    /// Returns [`FetchError::NoCommits`] when the project has none.
    fn project_commits(
        &self,
        project: ProjectId,
        author: &str,
    ) -> Result<Vec<CommitRecord>, FetchError>;
}

/// One page of a paginated listing
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
}

/// Follows `next_page` cursors starting from page 1 and concatenates the items.
///
/// Stops when the server sends no cursor or one that does not move forward.
/// The first failing page fails the whole listing.
pub fn collect_pages<T, F>(mut fetch_page: F) -> Result<Vec<T>, FetchError>
where
    F: FnMut(u32) -> Result<Page<T>, FetchError>,
{
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let Page { items, next_page } = fetch_page(page)?;
        all.extend(items);
        match next_page {
            Some(next) if next > page => page = next,
            _ => break,
        }
    }
    Ok(all)
}

fn next_page(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: ProjectId,
}

struct RawResponse {
    url: String,
    body: String,
    next_page: Option<u32>,
}

impl RawResponse {
    fn decode<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_str(&self.body).map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Blocking client for the GitLab REST API (v4)
pub struct GitLabClient {
    http: Client,
    api_base: String,
    token: String,
}

impl GitLabClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let api_base = format!("{}/api/v4", config.base_url.as_str().trim_end_matches('/'));
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Transport {
                url: api_base.clone(),
                source,
            })?;

        Ok(Self {
            http,
            api_base,
            token: config.gitlab_token.clone(),
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse, FetchError> {
        let url = format!("{}{}", self.api_base, path);
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.clone(),
            source,
        };

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .query(query)
            .send()
            .map_err(transport)?;

        let status = response.status();
        let next_page = next_page(response.headers());
        let body = response.text().map_err(transport)?;

        if !status.is_success() {
            return Err(FetchError::Server { url, status, body });
        }
        Ok(RawResponse {
            url,
            body,
            next_page,
        })
    }

    fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<Page<T>, FetchError> {
        let page_number = page.to_string();
        let mut query = query.to_vec();
        query.push(("per_page", PER_PAGE));
        query.push(("page", &page_number));

        let response = self.get(path, &query)?;
        debug!(path, page, next_page = ?response.next_page, "fetched page");
        Ok(Page {
            items: response.decode()?,
            next_page: response.next_page,
        })
    }
}

impl Origin for GitLabClient {
    fn current_user(&self) -> Result<RemoteUser, FetchError> {
        self.get("/user", &[])?.decode()
    }

    fn contributed_projects(&self, user_id: u64) -> Result<Vec<ProjectId>, FetchError> {
        let path = format!("/users/{user_id}/contributed_projects");
        let projects: Vec<ProjectRef> = collect_pages(|page| self.get_page(&path, &[], page))?;
        Ok(projects.into_iter().map(|p| p.id).collect())
    }

    fn project_commits(
        &self,
        project: ProjectId,
        author: &str,
    ) -> Result<Vec<CommitRecord>, FetchError> {
        let path = format!("/projects/{project}/repository/commits");
        let commits: Vec<CommitRecord> =
            collect_pages(|page| self.get_page(&path, &[("author", author)], page))?;
        if commits.is_empty() {
            return Err(FetchError::NoCommits(project));
        }
        debug!(project, count = commits.len(), "found commits");
        Ok(commits)
    }
}
