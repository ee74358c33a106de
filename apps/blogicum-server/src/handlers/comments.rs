//! Comment views: add, edit and delete.

use actix_web::{HttpResponse, web};

use blogicum_core::DomainError;
use blogicum_core::domain::{Comment, CommentEntry};
use blogicum_core::forms::CommentForm;
use blogicum_core::policy::is_owner;
use blogicum_core::ports::{BaseRepository, CommentRepository};
use blogicum_shared::dto::{CommentContext, FormView};

use super::posts::{DETAIL_TEMPLATE, detail_context, visible_entry};
use super::urls;
use super::views::{comment_view, form_view, invalid, page, redirect};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

const COMMENT_TEMPLATE: &str = "blog/comment.html";

/// A comment under the given post, or not found.
async fn find_comment(state: &AppState, post_id: i64, comment_id: i64) -> AppResult<Comment> {
    let comment = state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|comment| comment.post_id == post_id)
        .ok_or_else(|| DomainError::not_found("Comment", comment_id))?;

    Ok(comment)
}

fn comment_context(
    comment: Comment,
    identity: &Identity,
    form: Option<FormView<CommentForm>>,
) -> CommentContext<CommentForm> {
    // Only the author reaches these pages.
    let entry = CommentEntry {
        comment,
        author: identity.user.clone(),
    };

    CommentContext {
        form,
        comment: comment_view(&entry),
    }
}

/// POST /{id}/comment/
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let entry = visible_entry(&state, post_id, Some(identity.id())).await?;
    let form = form.into_inner();

    match form.clean() {
        Ok(text) => {
            let mut comment = Comment::new(post_id, identity.id(), text);
            comment.created_at = state.clock.now();
            let comment = state.comments.save(comment).await?;
            tracing::info!(post_id, comment_id = comment.id, "Comment added");
            Ok(redirect(urls::post_detail(post_id)))
        }
        Err(errors) => {
            let comments = state.comments.list_for_post(post_id).await?;
            Ok(invalid(
                DETAIL_TEMPLATE,
                detail_context(&entry, &comments, form_view(form, errors)),
            ))
        }
    }
}

/// GET /{id}/comment/ - comments are only posted; send the reader to the post.
pub async fn comment_redirect(_identity: Identity, path: web::Path<i64>) -> HttpResponse {
    redirect(urls::post_detail(path.into_inner()))
}

/// GET /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = find_comment(&state, post_id, comment_id).await?;
    if !is_owner(&comment, identity.id()) {
        return Ok(redirect(urls::post_detail(post_id)));
    }

    let form = FormView::unbound(CommentForm::from_comment(&comment));
    Ok(page(
        COMMENT_TEMPLATE,
        comment_context(comment, &identity, Some(form)),
    ))
}

/// POST /posts/{id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let mut comment = find_comment(&state, post_id, comment_id).await?;
    if !is_owner(&comment, identity.id()) {
        tracing::debug!(comment_id, user_id = identity.id(), "Edit refused: not the author");
        return Ok(redirect(urls::post_detail(post_id)));
    }

    let form = form.into_inner();
    match form.clean() {
        Ok(text) => {
            comment.text = text;
            state.comments.save(comment).await?;
            tracing::info!(post_id, comment_id, "Comment updated");
            Ok(redirect(urls::post_detail(post_id)))
        }
        Err(errors) => Ok(invalid(
            COMMENT_TEMPLATE,
            comment_context(comment, &identity, Some(form_view(form, errors))),
        )),
    }
}

/// GET /posts/{id}/delete_comment/{comment_id}/ - confirmation page.
pub async fn delete_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = find_comment(&state, post_id, comment_id).await?;
    if !is_owner(&comment, identity.id()) {
        return Ok(redirect(urls::post_detail(post_id)));
    }

    Ok(page(COMMENT_TEMPLATE, comment_context(comment, &identity, None)))
}

/// POST /posts/{id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(i64, i64)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = find_comment(&state, post_id, comment_id).await?;
    if !is_owner(&comment, identity.id()) {
        tracing::debug!(comment_id, user_id = identity.id(), "Delete refused: not the author");
        return Ok(redirect(urls::post_detail(post_id)));
    }

    state.comments.delete(comment.id).await?;
    tracing::info!(post_id, comment_id, "Comment deleted");

    Ok(redirect(urls::post_detail(post_id)))
}
