//! Rendering helpers and conversions from domain records to view models.

use actix_web::{HttpResponse, http::StatusCode, http::header};
use serde::Serialize;

use blogicum_core::domain::{Category, CommentEntry, Location, PostEntry, User};
use blogicum_core::forms::FormErrors;
use blogicum_core::pagination::Page;
use blogicum_shared::Rendered;
use blogicum_shared::dto::{
    AuthorView, CategoryView, CommentView, FormView, LocationView, PageView, PostView,
    ProfileView,
};

/// Respond with `template` rendered against `context`.
pub fn render<T: Serialize>(status: StatusCode, template: &str, context: T) -> HttpResponse {
    HttpResponse::build(status).json(Rendered::new(template, context))
}

pub fn page<T: Serialize>(template: &str, context: T) -> HttpResponse {
    render(StatusCode::OK, template, context)
}

/// Re-render a form that failed validation.
pub fn invalid<T: Serialize>(template: &str, context: T) -> HttpResponse {
    render(StatusCode::UNPROCESSABLE_ENTITY, template, context)
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub fn form_view<T>(data: T, errors: FormErrors) -> FormView<T> {
    FormView::with_errors(data, errors.into_inner())
}

pub fn author_view(user: &User) -> AuthorView {
    AuthorView {
        id: user.id,
        username: user.username.clone(),
        full_name: user.display_name(),
    }
}

pub fn profile_view(user: &User) -> ProfileView {
    ProfileView {
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        full_name: user.display_name(),
        date_joined: user.created_at,
    }
}

pub fn category_view(category: &Category) -> CategoryView {
    CategoryView {
        id: category.id,
        title: category.title.clone(),
        slug: category.slug.clone(),
        description: category.description.clone(),
        is_published: category.is_published,
    }
}

pub fn location_view(location: &Location) -> LocationView {
    LocationView {
        id: location.id,
        name: location.name.clone(),
        is_published: location.is_published,
    }
}

pub fn post_view(entry: &PostEntry) -> PostView {
    let post = &entry.post;
    PostView {
        id: post.id,
        title: post.title.clone(),
        text: post.text.clone(),
        pub_date: post.pub_date,
        is_published: post.is_published,
        image: post.image.clone(),
        author: author_view(&entry.author),
        category: category_view(&entry.category),
        location: entry.location.as_ref().map(location_view),
        comment_count: entry.comment_count,
    }
}

pub fn comment_view(entry: &CommentEntry) -> CommentView {
    CommentView {
        id: entry.comment.id,
        post_id: entry.comment.post_id,
        text: entry.comment.text.clone(),
        created_at: entry.comment.created_at,
        author: author_view(&entry.author),
    }
}

pub fn page_view(page: Page<PostEntry>) -> PageView<PostView> {
    let (number, num_pages, count) = (page.number, page.num_pages, page.count);
    let items = page.map(|entry| post_view(&entry)).items;
    PageView::new(items, number, num_pages, count)
}
