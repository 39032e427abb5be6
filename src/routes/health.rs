use crate::db::Db;
use actix_web::{HttpResponse, web};

pub async fn health_check(db: web::Data<Db>) -> HttpResponse {
    let db_ok = sqlx::query("SELECT 1").fetch_one(&db.0).await.is_ok();
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "db": if db_ok { "connected" } else { "disconnected" },
        "time": chrono::Utc::now(),
    }))
}
