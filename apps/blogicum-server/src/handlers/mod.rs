//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;
mod profile;
pub mod urls;
mod views;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, web};

use blogicum_shared::ErrorResponse;

use crate::middleware::error::AppError;

/// Configure all application routes.
///
/// Fixed paths come first: `/{category_slug}/` matches any single segment.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Malformed ids in the path are unknown pages.
    cfg.app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::NotFound(err.to_string()).into()
    }))
    .route("/health/", web::get().to(health::health_check))
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                )
                .service(
                    web::resource("/registration/")
                        .route(web::get().to(auth::registration_form))
                        .route(web::post().to(auth::register)),
                ),
        )
        .route("/", web::get().to(posts::index))
        .route("/posts/{id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::create_form))
                .route(web::post().to(posts::create_post)),
        )
        .service(
            web::resource("/profile/edit/")
                .route(web::get().to(profile::edit_form))
                .route(web::post().to(profile::edit_profile)),
        )
        .route("/profile/{username}/", web::get().to(profile::profile))
        .service(
            web::resource("/posts/{id}/edit/")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::edit_post)),
        )
        .service(
            web::resource("/posts/{id}/delete/")
                .route(web::get().to(posts::delete_form))
                .route(web::post().to(posts::delete_post)),
        )
        .service(
            web::resource("/{id}/comment/")
                .route(web::get().to(comments::comment_redirect))
                .route(web::post().to(comments::add_comment)),
        )
        .service(
            web::resource("/posts/{id}/edit_comment/{comment_id}/")
                .route(web::get().to(comments::edit_form))
                .route(web::post().to(comments::edit_comment)),
        )
        .service(
            web::resource("/posts/{id}/delete_comment/{comment_id}/")
                .route(web::get().to(comments::delete_form))
                .route(web::post().to(comments::delete_comment)),
        )
        .route("/{category_slug}/", web::get().to(posts::category_posts));
}

/// Fallback for unmatched paths.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound()
        .json(ErrorResponse::not_found("Page not found").with_instance(req.path()))
}
