// src/publisher.rs

use crate::config::Config;
use crate::error::ImportError;
use crate::importer::{token_callbacks, REMOTE_NAME};
use crate::model::PushOutcome;
use git2::{PushOptions, Repository};
use std::cell::RefCell;
use tracing::info;

/// Sends the imported history to the destination.
pub trait Publish {
    fn publish(&self, repo: &Repository) -> Result<PushOutcome, ImportError>;
}

/// Pushes the current branch to `origin` over git2
pub struct RemotePublisher {
    username: String,
    token: String,
}

impl RemotePublisher {
    pub fn new(config: &Config) -> Self {
        Self {
            username: config.push_username.clone(),
            token: config.origin_token.clone(),
        }
    }
}

impl Publish for RemotePublisher {
    fn publish(&self, repo: &Repository) -> Result<PushOutcome, ImportError> {
        let head = repo.head()?;
        let branch = head
            .shorthand()
            .ok_or_else(|| git2::Error::from_str("HEAD is not a valid branch name"))?
            .to_string();
        let local = head.target();

        let tracking = format!("refs/remotes/{REMOTE_NAME}/{branch}");
        if local.is_some() && repo.refname_to_id(&tracking).ok() == local {
            info!("No changes to push, everything is up to date.");
            return Ok(PushOutcome::UpToDate);
        }

        let rejection: RefCell<Option<(String, String)>> = RefCell::new(None);
        let mut callbacks = token_callbacks(&self.username, &self.token);
        callbacks.push_update_reference(|reference, status| {
            if let Some(message) = status {
                *rejection.borrow_mut() = Some((reference.to_string(), message.to_string()));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut remote = repo.find_remote(REMOTE_NAME)?;
        remote.push(&[refspec.as_str()], Some(&mut options))?;
        drop(options);

        if let Some((reference, message)) = rejection.into_inner() {
            return Err(ImportError::PushRejected { reference, message });
        }
        info!("Pushed {branch} to {}", remote.url().unwrap_or(REMOTE_NAME));
        Ok(PushOutcome::Pushed)
    }
}
