//! Staff and broadcast directories.
//!
//! `AdminDirectory` holds the staff identities allowed to run gated
//! commands. `GroupDirectory` holds the broadcast destinations. Both are
//! persisted list stores and every mutator checks that the caller is already
//! an admin.

pub mod store;

use std::path::PathBuf;

use crate::gateway::traits::{ChatId, UserId};

pub use store::{AddReport, ListStore, RemoveReport};

/// Compiled bootstrap admin set. Operators normally override it with
/// `[directory] seed_admins` in the config file.
pub const DEFAULT_ADMIN_IDS: &[i64] = &[100_000_001];

/// Compiled default broadcast destinations (none).
pub const DEFAULT_GROUP_IDS: &[i64] = &[];

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Caller is not an admin")]
    Unauthorized,

    #[error("Refusing to remove the last remaining admin")]
    LastAdmin,
}

/// Authorized staff identities.
#[derive(Debug, Clone)]
pub struct AdminDirectory {
    store: ListStore,
}

impl AdminDirectory {
    /// Load from `path`; an empty `seed` falls back to [`DEFAULT_ADMIN_IDS`].
    pub async fn load(path: PathBuf, seed: &[i64]) -> Self {
        let seed = if seed.is_empty() {
            DEFAULT_ADMIN_IDS
        } else {
            seed
        };
        Self {
            store: ListStore::load_or_seed(path, seed, "admins", true).await,
        }
    }

    pub async fn is_admin(&self, user: UserId) -> bool {
        self.store.contains(user.0).await
    }

    /// Gate used by every mutator and by commands that expose all tickets.
    pub async fn authorize(&self, caller: UserId) -> DirectoryResult<()> {
        if self.is_admin(caller).await {
            Ok(())
        } else {
            Err(DirectoryError::Unauthorized)
        }
    }

    pub async fn add_many(&self, caller: UserId, ids: &[String]) -> DirectoryResult<AddReport> {
        self.authorize(caller).await?;
        Ok(self.store.add_many(ids).await)
    }

    pub async fn remove_many(
        &self,
        caller: UserId,
        ids: &[String],
    ) -> DirectoryResult<RemoveReport> {
        self.authorize(caller).await?;
        self.store
            .remove_many(ids)
            .await
            .map_err(|_| DirectoryError::LastAdmin)
    }

    pub async fn remove(&self, caller: UserId, id: &str) -> DirectoryResult<RemoveReport> {
        self.remove_many(caller, &[id.to_string()]).await
    }

    pub async fn list(&self, caller: UserId) -> DirectoryResult<Vec<UserId>> {
        self.authorize(caller).await?;
        Ok(self.members().await)
    }

    /// All admins, without an authorization check (internal routing only).
    pub(crate) async fn members(&self) -> Vec<UserId> {
        self.store.snapshot().await.into_iter().map(UserId).collect()
    }

    /// Any admin, used as the staff fallback destination.
    pub(crate) async fn any_member(&self) -> Option<UserId> {
        self.store.first().await.map(UserId)
    }
}

/// Broadcast destinations for ticket events.
#[derive(Debug, Clone)]
pub struct GroupDirectory {
    store: ListStore,
    admins: AdminDirectory,
}

impl GroupDirectory {
    pub async fn load(path: PathBuf, seed: &[i64], admins: AdminDirectory) -> Self {
        Self {
            store: ListStore::load_or_seed(path, seed, "groups", false).await,
            admins,
        }
    }

    pub async fn add_many(&self, caller: UserId, ids: &[String]) -> DirectoryResult<AddReport> {
        self.admins.authorize(caller).await?;
        Ok(self.store.add_many(ids).await)
    }

    pub async fn remove(&self, caller: UserId, id: &str) -> DirectoryResult<RemoveReport> {
        self.admins.authorize(caller).await?;
        // Group lists may be emptied, so the store never refuses here.
        Ok(self
            .store
            .remove_many(&[id.to_string()])
            .await
            .unwrap_or_default())
    }

    pub async fn list(&self, caller: UserId) -> DirectoryResult<Vec<ChatId>> {
        self.admins.authorize(caller).await?;
        Ok(self.destinations().await)
    }

    /// All destinations, without an authorization check (fanout only).
    pub(crate) async fn destinations(&self) -> Vec<ChatId> {
        self.store.snapshot().await.into_iter().map(ChatId).collect()
    }
}
