//! Login, logout and registration views.

use actix_web::{HttpResponse, http::header, web};
use serde::Deserialize;

use blogicum_core::domain::User;
use blogicum_core::error::RepoError;
use blogicum_core::forms::{
    FormErrors, INVALID_LOGIN, LoginForm, NON_FIELD_ERRORS, RegistrationForm, USERNAME_TAKEN,
};
use blogicum_core::ports::{BaseRepository, UserRepository};
use blogicum_shared::Rendered;
use blogicum_shared::dto::{EmptyContext, FormContext, FormView};

use super::profile::username_taken;
use super::urls;
use super::views::{form_view, invalid, page};
use crate::middleware::auth::{removal_cookie, session_cookie};
use crate::middleware::error::AppResult;
use crate::state::AppState;

const LOGIN_TEMPLATE: &str = "registration/login.html";
const REGISTRATION_TEMPLATE: &str = "registration/registration_form.html";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Issue a session cookie for `user` and redirect to `location`.
fn start_session(state: &AppState, user: &User, location: String) -> AppResult<HttpResponse> {
    let token = state.tokens.generate_token(user.id, &user.username)?;
    let cookie = session_cookie(
        token,
        state.tokens.expiration_seconds(),
        state.secure_cookies,
    );

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

fn password_matches(state: &AppState, password: &str, user: &User) -> bool {
    match state.passwords.verify(password, &user.password_hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Unusable password hash");
            false
        }
    }
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> HttpResponse {
    page(
        LOGIN_TEMPLATE,
        FormContext {
            form: FormView::unbound(LoginForm::default()),
            next: urls::safe_next(query.next.as_deref()),
        },
    )
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    query: web::Query<NextQuery>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let next = urls::safe_next(query.next.as_deref());

    let mut errors = form.clean().err().unwrap_or_default();
    if errors.is_empty() {
        let user = state.users.find_by_username(&form.username).await?;
        match user {
            Some(user) if password_matches(&state, &form.password, &user) => {
                tracing::info!(user_id = user.id, "User logged in");
                return start_session(&state, &user, next.unwrap_or_else(urls::index));
            }
            _ => errors.add(NON_FIELD_ERRORS, INVALID_LOGIN),
        }
    }

    Ok(invalid(
        LOGIN_TEMPLATE,
        FormContext {
            form: form_view(form, errors),
            next,
        },
    ))
}

/// GET|POST /auth/logout/
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(Rendered::new(
            "registration/logged_out.html",
            EmptyContext::default(),
        ))
}

/// GET /auth/registration/
pub async fn registration_form() -> HttpResponse {
    page(
        REGISTRATION_TEMPLATE,
        FormContext {
            form: FormView::unbound(RegistrationForm::default()),
            next: None,
        },
    )
}

fn registration_invalid(form: RegistrationForm, errors: FormErrors) -> HttpResponse {
    invalid(
        REGISTRATION_TEMPLATE,
        FormContext {
            form: form_view(form, errors),
            next: None,
        },
    )
}

/// POST /auth/registration/
pub async fn register(
    state: web::Data<AppState>,
    form: web::Form<RegistrationForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let mut errors: FormErrors = form.clean().err().unwrap_or_default();
    if !errors.has("username") && username_taken(&state, &form.username, None).await? {
        errors.add("username", USERNAME_TAKEN);
    }
    if !errors.is_empty() {
        return Ok(registration_invalid(form, errors));
    }

    let password_hash = state.passwords.hash(&form.password1)?;
    let user = match state
        .users
        .save(User::new(
            form.username.clone(),
            form.email.clone(),
            password_hash,
        ))
        .await
    {
        Ok(user) => user,
        // Someone registered the name since the check above.
        Err(RepoError::Constraint(_)) => {
            errors.add("username", USERNAME_TAKEN);
            return Ok(registration_invalid(form, errors));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = user.id, "User registered");

    start_session(&state, &user, urls::index())
}
