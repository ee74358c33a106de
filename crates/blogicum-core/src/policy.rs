//! Visibility and ownership rules.

use chrono::{DateTime, Utc};

use crate::domain::{Category, Comment, Post, PostEntry};

/// A post is shown to the public only when it is published, its category is
/// published, and its publication time has come.
pub fn is_publicly_visible(post: &Post, category: &Category, now: DateTime<Utc>) -> bool {
    post.is_published && category.is_published && post.pub_date <= now
}

/// Whether `viewer` may open the post's detail page.
///
/// Authors always see their own posts. Listing queries do not use this
/// override; see [`crate::query::Visibility`].
pub fn is_visible(entry: &PostEntry, now: DateTime<Utc>, viewer: Option<i64>) -> bool {
    is_publicly_visible(&entry.post, &entry.category, now)
        || viewer.is_some_and(|id| id == entry.post.author_id)
}

/// Anything written by a single user.
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }
}

/// Only the author may edit or delete an entity.
pub fn is_owner<E: Authored + ?Sized>(entity: &E, actor: i64) -> bool {
    entity.author_id() == actor
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::User;

    fn entry(is_published: bool, category_published: bool, offset: Duration) -> PostEntry {
        let now = Utc::now();
        let mut author = User::new("author".into(), None, String::new());
        author.id = 7;
        let mut category = Category::new("Travel".into(), "travel".into(), String::new(), true);
        category.id = 1;
        category.is_published = category_published;
        let mut post = Post::new(author.id, category.id, "Title".into(), "Text".into(), now + offset);
        post.id = 3;
        post.is_published = is_published;

        PostEntry {
            post,
            author,
            category,
            location: None,
            comment_count: 0,
        }
    }

    #[test]
    fn test_published_due_post_is_visible_to_everyone() {
        let entry = entry(true, true, Duration::minutes(-5));
        let now = Utc::now();

        assert!(is_visible(&entry, now, None));
        assert!(is_visible(&entry, now, Some(99)));
    }

    #[test]
    fn test_hidden_posts_are_visible_only_to_author() {
        let now = Utc::now();
        let hidden = [
            entry(false, true, Duration::minutes(-5)),
            entry(true, false, Duration::minutes(-5)),
            entry(true, true, Duration::days(1)),
        ];

        for entry in &hidden {
            assert!(!is_publicly_visible(&entry.post, &entry.category, now));
            assert!(!is_visible(entry, now, None));
            assert!(!is_visible(entry, now, Some(99)));
            assert!(is_visible(entry, now, Some(7)));
        }
    }

    #[test]
    fn test_pub_date_equal_to_now_is_due() {
        let entry = entry(true, true, Duration::zero());

        assert!(is_publicly_visible(
            &entry.post,
            &entry.category,
            entry.post.pub_date
        ));
    }

    #[test]
    fn test_is_owner() {
        let post = Post::new(7, 1, "Title".into(), "Text".into(), Utc::now());
        let comment = Comment::new(3, 8, "Nice".into());

        assert!(is_owner(&post, 7));
        assert!(!is_owner(&post, 8));
        assert!(is_owner(&comment, 8));
        assert!(!is_owner(&comment, 7));
    }
}
