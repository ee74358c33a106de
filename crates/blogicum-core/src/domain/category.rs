use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity - a themed section of the blog addressed by its slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(title: String, slug: String, description: String, is_published: bool) -> Self {
        Self {
            id: 0,
            title,
            slug,
            description,
            is_published,
            created_at: Utc::now(),
        }
    }
}
