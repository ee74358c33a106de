//! Authentication extractors.
//!
//! The session token travels in the `blogicum_session` cookie set by the
//! login view, or in an `Authorization: Bearer` header. Either way the token
//! is resolved to the stored user on every request.

use actix_web::{
    FromRequest, HttpRequest, HttpResponse, ResponseError,
    cookie::{Cookie, SameSite, time::Duration},
    dev::Payload,
    http::{StatusCode, header},
    web,
};
use futures::future::LocalBoxFuture;

use blogicum_core::domain::User;
use blogicum_core::ports::{AuthError, BaseRepository};
use blogicum_shared::ErrorResponse;

use crate::handlers::urls;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "blogicum_session";

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// Cookie that clears the session.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Authenticated user extractor.
///
/// Handlers taking an `Identity` require a logged-in user; anonymous
/// requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
}

impl Identity {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

/// Authentication failure, remembering where the user wanted to go.
#[derive(Debug)]
pub struct AuthenticationError {
    pub error: AuthError,
    pub next: String,
}

impl std::fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match &self.error {
            AuthError::Lookup(_) | AuthError::HashingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.error {
            AuthError::Lookup(msg) | AuthError::HashingError(msg) => {
                tracing::error!("Session lookup failed: {}", msg);
                HttpResponse::InternalServerError().json(ErrorResponse::internal_error())
            }
            _ => HttpResponse::Found()
                .insert_header((header::LOCATION, urls::login(&self.next)))
                .finish(),
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| bearer_token(req))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = session_token(req);

        Box::pin(async move {
            let fail = |error| AuthenticationError {
                error,
                next: next.clone(),
            };

            let state = state.ok_or_else(|| {
                tracing::error!("AppState not found in app data");
                fail(AuthError::Lookup("Server configuration error".to_string()))
            })?;
            let token = token.ok_or_else(|| fail(AuthError::MissingAuth))?;

            let claims = state.tokens.validate_token(&token).map_err(|e| {
                tracing::debug!(error = %e, "Rejected session token");
                fail(e)
            })?;

            let user = state
                .users
                .find_by_id(claims.user_id)
                .await
                .map_err(|e| fail(AuthError::Lookup(e.to_string())))?
                .ok_or_else(|| fail(AuthError::UnknownUser))?;

            Ok(Identity { user })
        })
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(Identity::id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let identity = Identity::from_request(req, payload);

        Box::pin(async move {
            match identity.await {
                Ok(identity) => Ok(OptionalIdentity(Some(identity))),
                Err(e @ AuthenticationError {
                    error: AuthError::Lookup(_),
                    ..
                }) => Err(e.into()),
                Err(_) => Ok(OptionalIdentity(None)),
            }
        })
    }
}
