pub mod auth;
pub mod files;
pub mod health;

use actix_web::HttpResponse;

/// Fallback for unmatched /api paths, same envelope as everything else.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found" }))
}
