//! Collaborator interfaces the HTTP layer consumes, plus their backends.
//!
//! The in-memory implementations are the default and back every test. The
//! MongoDB and Redis backends are compiled in with the `mongodb` and `redis`
//! features.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Listing, User};
use crate::search::ListingFilter;

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(feature = "redis")]
pub mod redis_cache;
pub mod seed;

pub use memory::{InMemoryListingStore, InMemoryTokenCache, InMemoryUserStore};

/// Read access to the vehicle inventory
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// All listings matching `filter`, in storage order
    async fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>>;
}

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("a user with this id or email already exists")]
    AlreadyExists,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Credential / identity storage
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Lookup by email; callers pass the normalized (lowercase) address
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Insert a new user. The uniqueness check and the insert are one atomic
    /// step, a taken id or email yields [`CreateUserError::AlreadyExists`].
    async fn create(&self, user: User) -> Result<User, CreateUserError>;

    /// Replace an existing user record
    async fn save(&self, user: User) -> Result<User>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Short-lived key-value storage for refresh tokens and the access-token blacklist
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn del(&self, key: &str) -> Result<()>;
}
