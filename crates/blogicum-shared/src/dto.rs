//! View models: the context each page template is rendered with.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A template name together with its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendered<T> {
    pub template: String,
    pub context: T,
}

impl<T> Rendered<T> {
    pub fn new(template: impl Into<String>, context: T) -> Self {
        Self {
            template: template.into(),
            context,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationView {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub image: Option<String>,
    pub author: AuthorView,
    pub category: CategoryView,
    pub location: Option<LocationView>,
    pub comment_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
}

/// Public profile of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub date_joined: DateTime<Utc>,
}

/// One page of a listing with the navigation a template needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageView<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> PageView<T> {
    pub fn new(object_list: Vec<T>, number: u64, num_pages: u64, count: u64) -> Self {
        let has_next = number < num_pages;
        let has_previous = number > 1;

        Self {
            object_list,
            number,
            num_pages,
            count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then(|| number - 1),
        }
    }
}

/// Bound form values and their errors, keyed by field name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormView<T> {
    pub data: T,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl<T> FormView<T> {
    pub fn unbound(data: T) -> Self {
        Self {
            data,
            errors: BTreeMap::new(),
        }
    }

    pub fn with_errors(data: T, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self { data, errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `blog/index.html`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexContext {
    pub page_obj: PageView<PostView>,
}

/// `blog/category.html`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryContext {
    pub category: CategoryView,
    pub page_obj: PageView<PostView>,
}

/// `blog/profile.html`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileContext {
    pub profile: ProfileView,
    pub page_obj: PageView<PostView>,
}

/// `blog/detail.html`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailContext<F> {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub form: FormView<F>,
}

/// `blog/create.html`: create, edit and delete confirmation of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostFormContext<F> {
    pub form: FormView<F>,
    pub categories: Vec<CategoryView>,
    pub locations: Vec<LocationView>,
}

/// `blog/comment.html`: comment edit form, or delete confirmation without a
/// form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentContext<F> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormView<F>>,
    pub comment: CommentView,
}

/// `blog/user.html` and the registration/login pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormContext<F> {
    pub form: FormView<F>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Pages without context, such as `registration/logged_out.html`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyContext {}

/// `GET /health/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub storage: String,
}
