use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Location, User};

/// Post entity - a blog publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Store-assigned identifier, `0` until the post is first saved.
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Moment from which the post may be shown to readers.
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub author_id: i64,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, unsaved and published post.
    pub fn new(
        author_id: i64,
        category_id: i64,
        title: String,
        text: String,
        pub_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            title,
            text,
            pub_date,
            is_published: true,
            image: None,
            author_id,
            category_id,
            location_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A post together with its related records and its comment count,
/// as returned by listing and detail queries.
#[derive(Debug, Clone)]
pub struct PostEntry {
    pub post: Post,
    pub author: User,
    pub category: Category,
    pub location: Option<Location>,
    pub comment_count: u64,
}
