pub mod admins;
pub mod comments;
pub mod content;
pub mod donations;
pub mod media;
pub mod messages;
pub mod outreach;
pub mod projects;

use std::sync::Arc;

use rusqlite::Connection;

use crate::error::Result;
use crate::persistence::PersistenceManager;

pub use admins::AdminRepository;
pub use comments::CommentRepository;
pub use content::{ContentRepository, ResolvedContent};
pub use donations::{DEFAULT_CURRENCY, DonationRepository};
pub use media::MediaRepository;
pub use messages::MessageRepository;
pub use outreach::OutreachRepository;
pub use projects::{AppProjectRepository, MAX_APP_PROJECTS};

/// Shared plumbing for every repository: reads run against the engine,
/// writes run against the engine and are then snapshotted to disk.
#[derive(Clone)]
pub struct Repo {
    persistence: Arc<PersistenceManager>,
}

impl Repo {
    pub fn new(persistence: Arc<PersistenceManager>) -> Self {
        Self { persistence }
    }

    pub(crate) fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let engine = self.persistence.acquire()?;
        engine.with_conn(f)
    }

    /// Run a mutation, then flush. An error from `f` returns before the
    /// snapshot, so a failed write is never persisted.
    pub(crate) fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let engine = self.persistence.acquire()?;
        let out = engine.with_conn(f)?;
        self.persistence.snapshot()?;
        Ok(out)
    }
}

/// Every repository over one shared persistence manager.
#[derive(Clone)]
pub struct Repositories {
    pub persistence: Arc<PersistenceManager>,
    pub messages: MessageRepository,
    pub donations: DonationRepository,
    pub comments: CommentRepository,
    pub content: ContentRepository,
    pub admins: AdminRepository,
    pub media: MediaRepository,
    pub projects: AppProjectRepository,
    pub outreach: OutreachRepository,
}

impl Repositories {
    pub fn new(persistence: Arc<PersistenceManager>) -> Self {
        let repo = Repo::new(Arc::clone(&persistence));
        let messages = MessageRepository::new(repo.clone());
        Self {
            donations: DonationRepository::new(repo.clone(), messages.clone()),
            messages,
            comments: CommentRepository::new(repo.clone()),
            content: ContentRepository::new(repo.clone()),
            admins: AdminRepository::new(repo.clone()),
            media: MediaRepository::new(repo.clone()),
            projects: AppProjectRepository::new(repo.clone()),
            outreach: OutreachRepository::new(repo),
            persistence,
        }
    }

    pub fn with_default_currency(mut self, currency: &str) -> Self {
        self.donations = self.donations.with_default_currency(currency);
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::persistence::StorageConfig;

    /// Repositories over a fresh file in a temp dir. Keep the dir alive.
    pub fn repositories() -> (tempfile::TempDir, Repositories) {
        let dir = tempfile::TempDir::new().unwrap();
        let pm = Arc::new(PersistenceManager::new(StorageConfig::new(None, dir.path())));
        (dir, Repositories::new(pm))
    }
}
