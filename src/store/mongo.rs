//! MongoDB storage backend using the official async driver.
//!
//! Listings live in a `listings` collection and users in `users`; both carry
//! their own string `id` field, MongoDB's `_id` is left to the server.
//! [`filter_document`] translates the engine's [`ListingFilter`] into a query
//! document so the persisted path narrows with the same predicates as the
//! in-memory one.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::models::{Listing, User};
use crate::search::ListingFilter;
use crate::search::filter::{Predicate, TextField, keywords};

use super::{CreateUserError, ListingStore, UserStore};

const LISTINGS: &str = "listings";
const USERS: &str = "users";

pub async fn connect(uri: &str, database: &str) -> Result<Database> {
    let client = Client::with_uri_str(uri)
        .await
        .context("Failed to connect to MongoDB")?;
    Ok(client.database(database))
}

// ---------------------------------------------------------------------------
// Filter translation
// ---------------------------------------------------------------------------

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains(path: &str, needle: &str) -> Document {
    let mut d = Document::new();
    d.insert(path, doc! { "$regex": escape_regex(needle), "$options": "i" });
    d
}

fn predicate_document(predicate: &Predicate) -> Document {
    match predicate {
        Predicate::AnyContains { field, needles } => {
            let alternatives: Vec<Document> =
                needles.iter().map(|n| contains(field.path(), n)).collect();
            doc! { "$or": alternatives }
        }
        Predicate::ConditionIn(conditions) => {
            let values: Vec<&str> = conditions.iter().map(|c| c.as_str()).collect();
            doc! { "condition": { "$in": values } }
        }
        Predicate::Range { field, bounds } => {
            let mut range = Document::new();
            if let Some(min) = bounds.min {
                range.insert("$gte", i64::from(min));
            }
            if let Some(max) = bounds.max {
                range.insert("$lte", i64::from(max));
            }
            let mut d = Document::new();
            d.insert(field.path(), range);
            d
        }
        Predicate::Text(query) => {
            let per_keyword: Vec<Document> = keywords(query)
                .map(|kw| {
                    let fields: Vec<Document> = TextField::SEARCHABLE
                        .iter()
                        .map(|f| contains(f.path(), kw))
                        .collect();
                    doc! { "$or": fields }
                })
                .collect();
            doc! { "$and": per_keyword }
        }
    }
}

/// `{}` for the empty filter, otherwise `{ "$and": [...] }`
pub fn filter_document(filter: &ListingFilter) -> Document {
    if filter.is_empty() {
        return Document::new();
    }
    let clauses: Vec<Bson> = filter
        .predicates()
        .iter()
        .map(|p| Bson::Document(predicate_document(p)))
        .collect();
    doc! { "$and": clauses }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MongoListingStore {
    collection: Collection<Listing>,
}

impl MongoListingStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(LISTINGS),
        }
    }
}

#[async_trait]
impl ListingStore for MongoListingStore {
    async fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let query = filter_document(filter);
        tracing::debug!("MongoDB listings query: {}", query);
        let cursor = self
            .collection
            .find(query)
            .await
            .context("Failed to query listings")?;
        cursor
            .try_collect()
            .await
            .context("Failed to read listings cursor")
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>> {
        self.collection
            .find_one(doc! { "id": id })
            .await
            .with_context(|| format!("Failed to load listing {}", id))
    }
}

#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    /// Opens the users collection and makes sure `id` and `email` are unique
    pub async fn new(db: &Database) -> Result<Self> {
        let collection: Collection<User> = db.collection(USERS);
        let unique = || IndexOptions::builder().unique(true).build();
        collection
            .create_indexes([
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(unique())
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            ])
            .await
            .context("Failed to create unique indexes on users")?;
        Ok(Self { collection })
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.collection
            .find_one(doc! { "email": email })
            .await
            .context("Failed to look up user by email")
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.collection
            .find_one(doc! { "id": id })
            .await
            .with_context(|| format!("Failed to load user {}", id))
    }

    async fn create(&self, user: User) -> Result<User, CreateUserError> {
        // The unique indexes make the insert itself the uniqueness check
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(CreateUserError::AlreadyExists),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user").into()),
        }
    }

    async fn save(&self, user: User) -> Result<User> {
        let result = self
            .collection
            .replace_one(doc! { "id": &user.id }, &user)
            .await
            .with_context(|| format!("Failed to update user {}", user.id))?;
        if result.matched_count == 0 {
            anyhow::bail!("User {} not found", user.id);
        }
        Ok(user)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "id": id })
            .await
            .with_context(|| format!("Failed to delete user {}", id))?;
        Ok(result.deleted_count > 0)
    }
}
