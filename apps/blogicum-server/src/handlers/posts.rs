//! Post listings, detail page and the post create/edit/delete views.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use blogicum_core::domain::{CommentEntry, Post, PostEntry};
use blogicum_core::forms::{CommentForm, FormErrors, INVALID_CHOICE, PostDraft, PostForm};
use blogicum_core::pagination::PageRequest;
use blogicum_core::policy::{is_owner, is_visible};
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
};
use blogicum_core::query::PostQuery;
use blogicum_core::{DomainError, POSTS_PER_PAGE};
use blogicum_shared::dto::{CategoryContext, DetailContext, FormView, IndexContext, PostFormContext};

use super::urls;
use super::views::{
    category_view, comment_view, form_view, invalid, location_view, page, page_view, post_view,
    redirect,
};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

pub(crate) const DETAIL_TEMPLATE: &str = "blog/detail.html";
const CREATE_TEMPLATE: &str = "blog/create.html";

/// `?page=` of a listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn request(self) -> PageRequest {
        PageRequest::new(self.page, POSTS_PER_PAGE)
    }
}

/// A post the viewer may see, or not found.
pub(crate) async fn visible_entry(
    state: &AppState,
    post_id: i64,
    viewer: Option<i64>,
) -> AppResult<PostEntry> {
    let now = state.clock.now();
    let entry = state
        .posts
        .find_entry(post_id)
        .await?
        .filter(|entry| is_visible(entry, now, viewer))
        .ok_or_else(|| DomainError::not_found("Post", post_id))?;

    Ok(entry)
}

pub(crate) fn detail_context(
    entry: &PostEntry,
    comments: &[CommentEntry],
    form: FormView<CommentForm>,
) -> DetailContext<CommentForm> {
    DetailContext {
        post: post_view(entry),
        comments: comments.iter().map(comment_view).collect(),
        form,
    }
}

async fn find_post(state: &AppState, post_id: i64) -> AppResult<Post> {
    let post = state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id))?;

    Ok(post)
}

async fn post_form_context(
    state: &AppState,
    form: FormView<PostForm>,
) -> AppResult<PostFormContext<PostForm>> {
    let categories = state.categories.list().await?;
    let locations = state.locations.list().await?;

    Ok(PostFormContext {
        form,
        categories: categories.iter().map(category_view).collect(),
        locations: locations.iter().map(location_view).collect(),
    })
}

/// Validate the form, then check that the chosen category and location exist.
async fn clean_post(state: &AppState, form: &PostForm) -> AppResult<Result<PostDraft, FormErrors>> {
    let draft = match form.clean() {
        Ok(draft) => draft,
        Err(errors) => return Ok(Err(errors)),
    };

    let mut errors = FormErrors::new();
    if state.categories.find_by_id(draft.category_id).await?.is_none() {
        errors.add("category", INVALID_CHOICE);
    }
    if let Some(location_id) = draft.location_id {
        if state.locations.find_by_id(location_id).await?.is_none() {
            errors.add("location", INVALID_CHOICE);
        }
    }

    Ok(if errors.is_empty() { Ok(draft) } else { Err(errors) })
}

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let now = state.clock.now();
    let posts = state
        .posts
        .list(&PostQuery::feed(now), &query.into_inner().request())
        .await?;

    Ok(page(
        "blog/index.html",
        IndexContext {
            page_obj: page_view(posts),
        },
    ))
}

/// GET /posts/{id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let entry = visible_entry(&state, post_id, identity.user_id()).await?;
    let comments = state.comments.list_for_post(post_id).await?;

    Ok(page(
        DETAIL_TEMPLATE,
        detail_context(&entry, &comments, FormView::unbound(CommentForm::default())),
    ))
}

/// GET /{category_slug}/
pub async fn category_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_by_slug(&slug)
        .await?
        .filter(|category| category.is_published)
        .ok_or_else(|| DomainError::not_found("Category", &slug))?;

    let now = state.clock.now();
    let posts = state
        .posts
        .list(
            &PostQuery::category(category.id, now),
            &query.into_inner().request(),
        )
        .await?;

    Ok(page(
        "blog/category.html",
        CategoryContext {
            category: category_view(&category),
            page_obj: page_view(posts),
        },
    ))
}

/// GET /create/
pub async fn create_form(state: web::Data<AppState>, _identity: Identity) -> AppResult<HttpResponse> {
    let context = post_form_context(&state, FormView::unbound(PostForm::default())).await?;
    Ok(page(CREATE_TEMPLATE, context))
}

/// POST /create/
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    match clean_post(&state, &form).await? {
        Ok(draft) => {
            let post = state.posts.save(draft.into_post(identity.id())).await?;
            tracing::info!(post_id = post.id, author_id = identity.id(), "Post created");
            Ok(redirect(urls::profile(&identity.user.username)))
        }
        Err(errors) => {
            let context = post_form_context(&state, form_view(form, errors)).await?;
            Ok(invalid(CREATE_TEMPLATE, context))
        }
    }
}

/// GET /posts/{id}/edit/
pub async fn edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    if !is_owner(&post, identity.id()) {
        return Ok(redirect(urls::post_detail(post.id)));
    }

    let context = post_form_context(&state, FormView::unbound(PostForm::from_post(&post))).await?;
    Ok(page(CREATE_TEMPLATE, context))
}

/// POST /posts/{id}/edit/
pub async fn edit_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, path.into_inner()).await?;
    if !is_owner(&post, identity.id()) {
        tracing::debug!(post_id = post.id, user_id = identity.id(), "Edit refused: not the author");
        return Ok(redirect(urls::post_detail(post.id)));
    }

    let form = form.into_inner();
    match clean_post(&state, &form).await? {
        Ok(draft) => {
            draft.apply(&mut post);
            let post = state.posts.save(post).await?;
            tracing::info!(post_id = post.id, "Post updated");
            Ok(redirect(urls::post_detail(post.id)))
        }
        Err(errors) => {
            let context = post_form_context(&state, form_view(form, errors)).await?;
            Ok(invalid(CREATE_TEMPLATE, context))
        }
    }
}

/// GET /posts/{id}/delete/ - confirmation page.
pub async fn delete_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    if !is_owner(&post, identity.id()) {
        return Ok(redirect(urls::post_detail(post.id)));
    }

    let context = post_form_context(&state, FormView::unbound(PostForm::from_post(&post))).await?;
    Ok(page(CREATE_TEMPLATE, context))
}

/// POST /posts/{id}/delete/
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, path.into_inner()).await?;
    if !is_owner(&post, identity.id()) {
        tracing::debug!(post_id = post.id, user_id = identity.id(), "Delete refused: not the author");
        return Ok(redirect(urls::post_detail(post.id)));
    }

    state.posts.delete(post.id).await?;
    tracing::info!(post_id = post.id, "Post deleted");

    Ok(redirect(urls::index()))
}
