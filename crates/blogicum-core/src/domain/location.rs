use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location entity - an optional place tag on a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(name: String, is_published: bool) -> Self {
        Self {
            id: 0,
            name,
            is_published,
            created_at: Utc::now(),
        }
    }
}
