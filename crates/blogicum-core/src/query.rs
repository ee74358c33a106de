//! Listing queries: which posts a page shows and in what order.

use chrono::{DateTime, Utc};

use crate::domain::PostEntry;
use crate::policy::is_publicly_visible;

/// Which posts a listing may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only posts publicly visible at the given moment.
    Public { now: DateTime<Utc> },
    /// Every post, including unpublished and scheduled ones.
    All,
}

/// Listing order. Posts sharing a `pub_date` fall back to the newest id
/// first, so pages stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrder {
    #[default]
    PubDateDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFilter {
    pub visibility: Visibility,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl PostFilter {
    /// In-process equivalent of the filter, used by stores without a query
    /// language.
    pub fn matches(&self, entry: &PostEntry) -> bool {
        let visible = match self.visibility {
            Visibility::Public { now } => is_publicly_visible(&entry.post, &entry.category, now),
            Visibility::All => true,
        };

        visible
            && self.author_id.is_none_or(|id| id == entry.post.author_id)
            && self.category_id.is_none_or(|id| id == entry.post.category_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub filter: PostFilter,
    pub order: PostOrder,
}

impl PostQuery {
    /// The global feed.
    pub fn feed(now: DateTime<Utc>) -> Self {
        Self::with_filter(PostFilter {
            visibility: Visibility::Public { now },
            author_id: None,
            category_id: None,
        })
    }

    /// Posts of a single category.
    pub fn category(category_id: i64, now: DateTime<Utc>) -> Self {
        Self::with_filter(PostFilter {
            visibility: Visibility::Public { now },
            author_id: None,
            category_id: Some(category_id),
        })
    }

    /// Posts of a single author. The owner of the profile sees everything
    /// they wrote; everyone else sees only the public part.
    pub fn profile(author_id: i64, now: DateTime<Utc>, viewer_is_owner: bool) -> Self {
        let visibility = if viewer_is_owner {
            Visibility::All
        } else {
            Visibility::Public { now }
        };

        Self::with_filter(PostFilter {
            visibility,
            author_id: Some(author_id),
            category_id: None,
        })
    }

    fn with_filter(filter: PostFilter) -> Self {
        Self {
            filter,
            order: PostOrder::default(),
        }
    }

    /// Sort entries in place according to [`Self::order`].
    pub fn sort(&self, entries: &mut [PostEntry]) {
        match self.order {
            PostOrder::PubDateDesc => {
                entries.sort_by(|a, b| {
                    b.post
                        .pub_date
                        .cmp(&a.post.pub_date)
                        .then_with(|| b.post.id.cmp(&a.post.id))
                })
            }
        }
    }
}
