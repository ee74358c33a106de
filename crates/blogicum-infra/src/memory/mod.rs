//! In-memory storage - used when no database is configured, and by tests.
//!
//! All tables live behind a single async `RwLock`, so every repository
//! operation sees and leaves a consistent state. Foreign keys and unique
//! columns are enforced the same way the database schema does.
//! Data is lost on process restart.

mod repositories;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use blogicum_core::domain::{Category, Comment, Location, Post, PostEntry, User};
use blogicum_core::error::RepoError;

pub use repositories::{
    InMemoryCategoryRepository, InMemoryCommentRepository, InMemoryLocationRepository,
    InMemoryPostRepository, InMemoryUserRepository,
};

/// A record with a store-assigned integer key.
pub(crate) trait Row: Clone {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

macro_rules! impl_row {
    ($($ty:ty),*) => {
        $(impl Row for $ty {
            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }
        })*
    };
}

impl_row!(User, Category, Location, Post, Comment);

/// Rows keyed by id, plus the sequence for the next insert.
pub(crate) struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T: Row> Table<T> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }

    pub(crate) fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id)
    }

    pub(crate) fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Insert when the row has no id yet, replace the stored row otherwise.
    pub(crate) fn upsert(&mut self, mut row: T) -> Result<T, RepoError> {
        if row.id() == 0 {
            self.last_id += 1;
            row.set_id(self.last_id);
        } else if !self.rows.contains_key(&row.id()) {
            return Err(RepoError::NotFound);
        }

        self.rows.insert(row.id(), row.clone());
        Ok(row)
    }

    pub(crate) fn remove(&mut self, id: i64) -> Result<T, RepoError> {
        self.rows.remove(&id).ok_or(RepoError::NotFound)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&i64, &mut T) -> bool) {
        self.rows.retain(keep);
    }
}

pub(crate) struct Tables {
    pub(crate) users: Table<User>,
    pub(crate) categories: Table<Category>,
    pub(crate) locations: Table<Location>,
    pub(crate) posts: Table<Post>,
    pub(crate) comments: Table<Comment>,
}

impl Tables {
    /// Join a post with its related rows. `None` when a required row is
    /// missing, which the foreign key checks rule out.
    pub(crate) fn entry(&self, post: &Post) -> Option<PostEntry> {
        Some(PostEntry {
            post: post.clone(),
            author: self.users.get(post.author_id)?.clone(),
            category: self.categories.get(post.category_id)?.clone(),
            location: post
                .location_id
                .and_then(|id| self.locations.get(id))
                .cloned(),
            comment_count: self
                .comments
                .values()
                .filter(|c| c.post_id == post.id)
                .count() as u64,
        })
    }

    /// Delete a post together with its comments.
    pub(crate) fn remove_post(&mut self, id: i64) -> Result<Post, RepoError> {
        let post = self.posts.remove(id)?;
        self.comments.retain(|_, c| c.post_id != id);
        Ok(post)
    }
}

/// Shared handle to the in-memory tables.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                users: Table::new(),
                categories: Table::new(),
                locations: Table::new(),
                posts: Table::new(),
                comments: Table::new(),
            })),
        }
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository::new(self.clone())
    }

    pub fn categories(&self) -> InMemoryCategoryRepository {
        InMemoryCategoryRepository::new(self.clone())
    }

    pub fn locations(&self) -> InMemoryLocationRepository {
        InMemoryLocationRepository::new(self.clone())
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository::new(self.clone())
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository::new(self.clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
