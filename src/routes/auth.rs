use crate::{auth, auth::AuthUser, config::Config, db::Db, errors::ApiError, models::user::PublicUser};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Deserialize)]
pub struct SignupReq {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResp {
    id: String,
    email: String,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn signup(
    db: web::Data<Db>,
    body: web::Json<SignupReq>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim().to_lowercase();
    let name = body.name.trim().to_string();
    if email.is_empty() || name.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email, name, and password are required".into(),
        ));
    }

    let hash = auth::hash_password(&body.password)?;
    let user_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    let res = sqlx::query(
        "INSERT INTO users(id, email, name, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user_id)
    .bind(&email)
    .bind(&name)
    .bind(&hash)
    .bind(now)
    .bind(now)
    .execute(&db.0)
    .await;

    if let Err(e) = res {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.message().contains("UNIQUE") {
                return Err(ApiError::Conflict("Email already registered".into()));
            }
        }
        return Err(e.into());
    }

    Ok(HttpResponse::Created().json(SignupResp {
        id: user_id,
        email,
        name,
        created_at: now,
    }))
}

#[derive(Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

pub async fn login(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    body: web::Json<LoginReq>,
) -> Result<HttpResponse, ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("email and password are required".into()));
    }

    let row = sqlx::query("SELECT id, email, name, password_hash FROM users WHERE email = ?")
        .bind(body.email.trim().to_lowercase())
        .fetch_optional(&db.0)
        .await?;

    let row = row.ok_or_else(|| ApiError::Unauthorized("invalid credentials".into()))?;
    let password_hash: String = row.get("password_hash");
    if !auth::verify_password(&password_hash, &body.password) {
        return Err(ApiError::Unauthorized("invalid credentials".into()));
    }

    let user = PublicUser {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
    };
    let token = auth::create_token(&user.id, &user.email, &user.name, &cfg)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "user": user,
    })))
}

pub async fn me(
    cfg: web::Data<Config>,
    db: web::Data<Db>,
    user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let row = sqlx::query("SELECT email, name FROM users WHERE id = ?")
        .bind(&user.user_id)
        .fetch_optional(&db.0)
        .await?;
    let row = row.ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    let name: String = row.get("name");
    let email: String = row.get("email");

    let avatar_initial = name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "?".to_string());

    let storage_row =
        sqlx::query("SELECT COALESCE(SUM(size), 0) AS total FROM files WHERE owner_id = ?")
            .bind(&user.user_id)
            .fetch_one(&db.0)
            .await?;
    let storage_used: i64 = storage_row.get("total");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "username": name,
        "email": email,
        "avatarInitial": avatar_initial,
        "storageUsed": storage_used,
        "storageTotal": cfg.storage_quota_bytes,
    })))
}
