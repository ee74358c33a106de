//! Repository ports over [`InMemoryStore`].

use async_trait::async_trait;

use blogicum_core::domain::{Category, Comment, CommentEntry, Location, Post, PostEntry, User};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::{Page, PageRequest, Paginator};
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    UserRepository,
};
use blogicum_core::query::PostQuery;

use super::{InMemoryStore, Tables};

fn constraint(message: &str) -> RepoError {
    RepoError::Constraint(message.to_string())
}

pub struct InMemoryUserRepository {
    store: InMemoryStore,
}

impl InMemoryUserRepository {
    pub(super) fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<User, i64> for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.users.get(id).cloned())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(constraint("Entity already exists"));
        }

        tables.users.upsert(user)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.users.remove(id)?;

        let authored: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id)?;
        }
        tables.comments.retain(|_, c| c.author_id != id);

        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

pub struct InMemoryCategoryRepository {
    store: InMemoryStore,
}

impl InMemoryCategoryRepository {
    pub(super) fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<Category, i64> for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.categories.get(id).cloned())
    }

    async fn save(&self, category: Category) -> Result<Category, RepoError> {
        let mut tables = self.store.tables.write().await;

        if tables
            .categories
            .values()
            .any(|c| c.slug == category.slug && c.id != category.id)
        {
            return Err(constraint("Entity already exists"));
        }

        tables.categories.upsert(category)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;

        if !tables.categories.contains(id) {
            return Err(RepoError::NotFound);
        }
        if tables.posts.values().any(|p| p.category_id == id) {
            return Err(constraint("category is still referenced by posts"));
        }

        tables.categories.remove(id)?;
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

pub struct InMemoryLocationRepository {
    store: InMemoryStore,
}

impl InMemoryLocationRepository {
    pub(super) fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<Location, i64> for InMemoryLocationRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Location>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.locations.get(id).cloned())
    }

    async fn save(&self, location: Location) -> Result<Location, RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.locations.upsert(location)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.locations.remove(id)?;

        // Posts outlive their location.
        tables.posts.retain(|_, p| {
            if p.location_id == Some(id) {
                p.location_id = None;
            }
            true
        });

        Ok(())
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationRepository {
    async fn list(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.store.tables.read().await;
        let mut locations: Vec<Location> = tables.locations.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }
}

pub struct InMemoryPostRepository {
    store: InMemoryStore,
}

impl InMemoryPostRepository {
    pub(super) fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

fn check_post_references(tables: &Tables, post: &Post) -> Result<(), RepoError> {
    if !tables.users.contains(post.author_id) {
        return Err(constraint("post author does not exist"));
    }
    if !tables.categories.contains(post.category_id) {
        return Err(constraint("post category does not exist"));
    }
    if post
        .location_id
        .is_some_and(|id| !tables.locations.contains(id))
    {
        return Err(constraint("post location does not exist"));
    }
    Ok(())
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.get(id).cloned())
    }

    async fn save(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.store.tables.write().await;
        check_post_references(&tables, &post)?;
        tables.posts.upsert(post)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.remove_post(id)?;
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_entry(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.posts.get(id).and_then(|post| tables.entry(post)))
    }

    async fn list(
        &self,
        query: &PostQuery,
        page: &PageRequest,
    ) -> Result<Page<PostEntry>, RepoError> {
        let tables = self.store.tables.read().await;

        let mut entries: Vec<PostEntry> = tables
            .posts
            .values()
            .filter_map(|post| tables.entry(post))
            .filter(|entry| query.filter.matches(entry))
            .collect();
        query.sort(&mut entries);

        let window = Paginator::new(entries.len() as u64, page.per_page)
            .window(page.number.as_deref());
        let items = entries
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect();

        Ok(Page::new(items, window))
    }
}

pub struct InMemoryCommentRepository {
    store: InMemoryStore,
}

impl InMemoryCommentRepository {
    pub(super) fn new(store: InMemoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseRepository<Comment, i64> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let tables = self.store.tables.read().await;
        Ok(tables.comments.get(id).cloned())
    }

    async fn save(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.store.tables.write().await;

        if !tables.posts.contains(comment.post_id) {
            return Err(constraint("comment post does not exist"));
        }
        if !tables.users.contains(comment.author_id) {
            return Err(constraint("comment author does not exist"));
        }

        tables.comments.upsert(comment)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.store.tables.write().await;
        tables.comments.remove(id)?;
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentEntry>, RepoError> {
        let tables = self.store.tables.read().await;

        let mut entries: Vec<CommentEntry> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                Some(CommentEntry {
                    comment: c.clone(),
                    author: tables.users.get(c.author_id)?.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.comment.created_at, a.comment.id).cmp(&(b.comment.created_at, b.comment.id))
        });

        Ok(entries)
    }
}
