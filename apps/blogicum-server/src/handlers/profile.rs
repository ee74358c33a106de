//! Profile page and profile editing.

use actix_web::{HttpResponse, web};

use blogicum_core::DomainError;
use blogicum_core::error::RepoError;
use blogicum_core::forms::{FormErrors, ProfileForm, USERNAME_TAKEN};
use blogicum_core::ports::{BaseRepository, PostRepository, UserRepository};
use blogicum_core::query::PostQuery;
use blogicum_shared::dto::{FormContext, FormView, ProfileContext};

use super::posts::PageQuery;
use super::urls;
use super::views::{form_view, invalid, page, page_view, profile_view, redirect};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

const EDIT_TEMPLATE: &str = "blog/user.html";

/// Whether `username` belongs to someone other than `current_user`.
pub(crate) async fn username_taken(
    state: &AppState,
    username: &str,
    current_user: Option<i64>,
) -> AppResult<bool> {
    let existing = state.users.find_by_username(username).await?;
    Ok(existing.is_some_and(|user| Some(user.id) != current_user))
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let viewer_is_owner = identity.user_id() == Some(user.id);
    let now = state.clock.now();
    let posts = state
        .posts
        .list(
            &PostQuery::profile(user.id, now, viewer_is_owner),
            &query.into_inner().request(),
        )
        .await?;

    Ok(page(
        "blog/profile.html",
        ProfileContext {
            profile: profile_view(&user),
            page_obj: page_view(posts),
        },
    ))
}

/// GET /profile/edit/
pub async fn edit_form(identity: Identity) -> HttpResponse {
    page(
        EDIT_TEMPLATE,
        FormContext {
            form: FormView::unbound(ProfileForm::from_user(&identity.user)),
            next: None,
        },
    )
}

fn edit_invalid(form: ProfileForm, errors: FormErrors) -> HttpResponse {
    invalid(
        EDIT_TEMPLATE,
        FormContext {
            form: form_view(form, errors),
            next: None,
        },
    )
}

/// POST /profile/edit/
pub async fn edit_profile(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<ProfileForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let mut errors = form.clean().err().unwrap_or_default();
    if !errors.has("username") && username_taken(&state, &form.username, Some(identity.id())).await?
    {
        errors.add("username", USERNAME_TAKEN);
    }
    if !errors.is_empty() {
        return Ok(edit_invalid(form, errors));
    }

    let mut user = identity.user;
    form.apply(&mut user);
    let user = match state.users.save(user).await {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            errors.add("username", USERNAME_TAKEN);
            return Ok(edit_invalid(form, errors));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = user.id, "Profile updated");

    Ok(redirect(urls::profile(&user.username)))
}
