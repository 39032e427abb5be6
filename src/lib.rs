pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod query;
pub mod routes;

use actix_web::web;

use crate::errors::ApiError;

/// Full /api route table. Shared between the binary and the integration
/// tests so both exercise the same dispatch. Literal paths (/recent,
/// /bulk) are registered ahead of /{id} on purpose.
///
/// Extractor failures (malformed JSON, bad query params) are remapped so
/// every 400 carries the same {"error": ...} envelope the handlers use.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(routes::health::health_check))
            .route("/signup", web::post().to(routes::auth::signup))
            .route("/login", web::post().to(routes::auth::login))
            .route("/me", web::get().to(routes::auth::me))
            .service(
                web::scope("/files")
                    .route("", web::get().to(routes::files::list_files))
                    .route("", web::post().to(routes::files::create_file))
                    .route("/recent", web::get().to(routes::files::recent_files))
                    .route("/bulk", web::post().to(routes::files::bulk_update))
                    .route("/{id}", web::get().to(routes::files::get_file))
                    .route("/{id}", web::patch().to(routes::files::update_file))
                    .route("/{id}/trash", web::patch().to(routes::files::trash_file))
                    .route("/{id}/share", web::post().to(routes::files::share_file))
                    .route("/{id}/children", web::get().to(routes::files::children))
                    .route("/{id}/download", web::get().to(routes::files::download_file)),
            )
            .default_service(web::route().to(routes::not_found)),
    );
}
