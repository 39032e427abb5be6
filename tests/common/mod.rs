//! Shared setup for API tests: in-memory database, a test config with a
//! fixed JWT secret, and helpers for minting users and authed requests.

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::web::Data;
use actix_web::{test, App};
use drivelite::auth;
use drivelite::config::Config;
use drivelite::db::Db;

pub fn test_config() -> Config {
    Config {
        listen: "127.0.0.1:0".into(),
        database_path: ":memory:".into(),
        jwt_secret: Some("integration-test-secret".into()),
        token_ttl_minutes: 60,
        storage_quota_bytes: 15 * 1024 * 1024 * 1024,
    }
}

pub async fn setup() -> (Config, Db) {
    let cfg = test_config();
    let db = Db::connect_in_memory().await.expect("in-memory db");
    (cfg, db)
}

pub async fn init_app(
    cfg: &Config,
    db: &Db,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .configure(drivelite::configure_api),
    )
    .await
}

/// Inserts a user directly and returns (id, bearer token).
pub async fn create_user(db: &Db, cfg: &Config, email: &str, name: &str) -> (String, String) {
    let id = uuid::Uuid::new_v4().to_string();
    let hash = auth::hash_password("password123").unwrap();
    let now = chrono::Utc::now();
    sqlx::query(
        "INSERT INTO users(id, email, name, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(email)
    .bind(name)
    .bind(&hash)
    .bind(now)
    .bind(now)
    .execute(&db.0)
    .await
    .unwrap();
    let token = auth::create_token(&id, email, name, cfg).unwrap();
    (id, token)
}

pub fn get(path: &str, token: &str) -> Request {
    test::TestRequest::get()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request()
}

pub fn post_json(path: &str, token: &str, body: serde_json::Value) -> Request {
    test::TestRequest::post()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
        .to_request()
}

pub fn patch_json(path: &str, token: &str, body: serde_json::Value) -> Request {
    test::TestRequest::patch()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
        .to_request()
}

/// Creates a file through the API and returns the response body.
pub async fn create_file<S, B>(app: &S, token: &str, body: serde_json::Value) -> serde_json::Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let res = test::call_service(app, post_json("/api/files", token, body)).await;
    assert_eq!(res.status(), 201, "file create should return 201");
    test::read_body_json(res).await
}
