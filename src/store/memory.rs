//! In-memory backends for development and testing

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::models::{Listing, User};
use crate::search::ListingFilter;

use super::{CreateUserError, ListingStore, TokenCache, UserStore};

/// Immutable listing snapshot handed in at startup
#[derive(Clone, Default)]
pub struct InMemoryListingStore {
    listings: Arc<Vec<Listing>>,
}

impl InMemoryListingStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(listings),
        }
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        Ok(filter.apply(&self.listings))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>> {
        Ok(self.listings.iter().find(|l| l.id == id).cloned())
    }
}

/// In-memory user store. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(users.get(id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, CreateUserError> {
        // Check and insert under one write lock
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if users.contains_key(&user.id) || users.values().any(|u| u.email == user.email) {
            return Err(CreateUserError::AlreadyExists);
        }
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(anyhow!("User {} not found", user.id)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(users.remove(id).is_some())
    }
}

/// Expiring key-value map. Expired entries are dropped lazily on read.
#[derive(Clone, Default)]
pub struct InMemoryTokenCache {
    entries: Arc<tokio::sync::RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        // Opportunistic sweep so the map does not grow without bound
        entries.retain(|_, (_, exp)| *exp > Instant::now());
        entries.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, exp)) if *exp > Instant::now() => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // A set may have landed since the read lock was released
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((value, exp)) if *exp > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::search::filter::{Predicate, TextField};
    use crate::store::seed::demo_listings;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.into(),
            email: email.into(),
            password_hash: "hash".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            phone: None,
            location: None,
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn listing_store_find_applies_the_filter() {
        let store = InMemoryListingStore::new(demo_listings());
        let filter = ListingFilter::new().and(Predicate::AnyContains {
            field: TextField::Make,
            needles: vec!["toyota".into()],
        });

        let found = store.find(&filter).await.unwrap();
        assert_eq!(found.len(), 4);
        assert!(found.iter().all(|l| l.make == "Toyota"));
        assert_eq!(
            store.find(&ListingFilter::new()).await.unwrap().len(),
            demo_listings().len()
        );
    }

    #[tokio::test]
    async fn listing_store_find_by_id() {
        let store = InMemoryListingStore::new(demo_listings());
        let hit = store.find_by_id("veh-001").await.unwrap();
        assert_eq!(hit.map(|l| l.make), Some("Toyota".to_string()));
        assert!(store.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_store_crud() {
        let store = InMemoryUserStore::new();
        store.create(user("u1", "a@example.com")).await.unwrap();

        assert!(matches!(
            store.create(user("u2", "a@example.com")).await,
            Err(CreateUserError::AlreadyExists)
        ));
        assert!(matches!(
            store.create(user("u1", "b@example.com")).await,
            Err(CreateUserError::AlreadyExists)
        ));

        let found = store.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, "u1");

        let mut changed = found.clone();
        changed.first_name = "Changed".into();
        store.save(changed).await.unwrap();
        assert_eq!(
            store.find_by_id("u1").await.unwrap().unwrap().first_name,
            "Changed"
        );

        assert!(store.save(user("ghost", "g@example.com")).await.is_err());
        assert!(store.delete("u1").await.unwrap());
        assert!(!store.delete("u1").await.unwrap());
        assert!(store.find_by_id("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_cache_set_get_del() {
        let cache = InMemoryTokenCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.del("missing").await.unwrap();
    }

    #[tokio::test]
    async fn token_cache_entries_expire() {
        let cache = InMemoryTokenCache::new();
        cache.set("short", "v", Duration::from_millis(20)).await.unwrap();
        cache.set("long", "v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_read_keeps_a_concurrent_overwrite() {
        let cache = InMemoryTokenCache::new();
        cache.set("refresh:u1", "stale", Duration::ZERO).await.unwrap();

        // Queue a reader and then a writer behind a held lock so the writer
        // lands between the reader's read and write phases
        let guard = cache.entries.write().await;
        let reader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get("refresh:u1").await })
        };
        tokio::task::yield_now().await;
        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .set("refresh:u1", "fresh", Duration::from_secs(60))
                    .await
            })
        };
        tokio::task::yield_now().await;
        drop(guard);

        writer.await.unwrap().unwrap();
        let seen = reader.await.unwrap().unwrap();
        assert!(seen.is_none() || seen.as_deref() == Some("fresh"));
        assert_eq!(
            cache.get("refresh:u1").await.unwrap().as_deref(),
            Some("fresh")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_admit_one_email() {
        let store = InMemoryUserStore::new();
        let attempts: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create(user(&format!("u{}", i), "race@example.com"))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        let mut rejected = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => created += 1,
                Err(CreateUserError::AlreadyExists) => rejected += 1,
                Err(e) => panic!("unexpected store error: {}", e),
            }
        }
        assert_eq!((created, rejected), (1, 7));
    }
}
