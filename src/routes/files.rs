use crate::{
    auth::AuthUser,
    db::Db,
    errors::ApiError,
    models::file::{is_allowed_type, FileMeta, ALLOWED_TYPES, DEFAULT_LOCATION, TRASH_LOCATION},
    query::{build_list_query, ListParams},
};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::HashMap;

/// IDs are uuids; a malformed one can't exist, so report it the same
/// way as a missing file.
fn check_id(id: &str) -> Result<(), ApiError> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| ApiError::NotFound("Invalid file ID".into()))
}

async fn fetch_file(db: &Db, id: &str) -> Result<Option<SqliteRow>, ApiError> {
    Ok(sqlx::query("SELECT * FROM files WHERE id = ?")
        .bind(id)
        .fetch_optional(&db.0)
        .await?)
}

async fn shares_for_one(db: &Db, file_id: &str) -> Result<Vec<String>, ApiError> {
    let rows = sqlx::query(
        "SELECT email FROM file_shares WHERE file_id = ? ORDER BY created_at ASC, email ASC",
    )
    .bind(file_id)
    .fetch_all(&db.0)
    .await?;
    Ok(rows.into_iter().map(|r| r.get("email")).collect())
}

/// Batch-fetch the share sets for a page of listed files in one query.
async fn shares_for_many(
    db: &Db,
    ids: &[String],
) -> Result<HashMap<String, Vec<String>>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let placeholders: String = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT file_id, email FROM file_shares WHERE file_id IN ({}) ORDER BY created_at ASC, email ASC",
        placeholders
    );
    let mut q = sqlx::query(&sql);
    for id in ids {
        q = q.bind(id);
    }
    let rows = q.fetch_all(&db.0).await?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for r in rows {
        map.entry(r.get("file_id"))
            .or_default()
            .push(r.get("email"));
    }
    Ok(map)
}

async fn load_file(db: &Db, id: &str) -> Result<Option<FileMeta>, ApiError> {
    let row = match fetch_file(db, id).await? {
        Some(r) => r,
        None => return Ok(None),
    };
    let shared_with = shares_for_one(db, id).await?;
    Ok(Some(FileMeta::from_row(&row, shared_with)))
}

async fn rows_to_metas(db: &Db, rows: Vec<SqliteRow>) -> Result<Vec<FileMeta>, ApiError> {
    let ids: Vec<String> = rows.iter().map(|r| r.get::<String, _>("id")).collect();
    let mut shares = shares_for_many(db, &ids).await?;
    Ok(rows
        .iter()
        .map(|r| {
            let id: String = r.get("id");
            let shared = shares.remove(&id).unwrap_or_default();
            FileMeta::from_row(r, shared)
        })
        .collect())
}

/// Lowercase, trim, drop empties, dedupe while keeping first-seen order.
fn normalize_emails(emails: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for e in emails {
        let e = e.trim().to_lowercase();
        if !e.is_empty() && seen.insert(e.clone()) {
            out.push(e);
        }
    }
    out
}

async fn add_shares(db: &Db, file_id: &str, emails: &[String]) -> Result<(), ApiError> {
    let now = chrono::Utc::now();
    for email in emails {
        sqlx::query("INSERT OR IGNORE INTO file_shares(file_id, email, created_at) VALUES (?, ?, ?)")
            .bind(file_id)
            .bind(email)
            .bind(now)
            .execute(&db.0)
            .await?;
    }
    sqlx::query("UPDATE files SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(file_id)
        .execute(&db.0)
        .await?;
    Ok(())
}

fn safe_base_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileReq {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    pub location: Option<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content_preview: String,
}

pub async fn create_file(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<CreateFileReq>,
) -> Result<HttpResponse, ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }

    let file_type = if body.is_folder {
        "folder".to_string()
    } else {
        let t = body
            .type_
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::BadRequest("type is required for non-folder items".into()))?;
        if !is_allowed_type(t) {
            return Err(ApiError::BadRequest(format!(
                "type must be one of: {}",
                ALLOWED_TYPES.join(", ")
            )));
        }
        t.to_string()
    };

    if body.size < 0 {
        return Err(ApiError::BadRequest("size must not be negative".into()));
    }
    let location = body
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCATION)
        .to_string();

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    sqlx::query(
        "INSERT INTO files(id, name, type, owner_id, owner_name, owner_email, size, location, is_folder, is_starred, description, content_preview, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&name)
    .bind(&file_type)
    .bind(&user.user_id)
    .bind(&user.name)
    .bind(user.email.to_lowercase())
    .bind(body.size)
    .bind(&location)
    .bind(body.is_folder)
    .bind(&body.description)
    .bind(&body.content_preview)
    .bind(now)
    .bind(now)
    .execute(&db.0)
    .await?;

    let file = load_file(&db, &id).await?.ok_or(ApiError::Internal)?;
    Ok(HttpResponse::Created().json(file))
}

pub async fn list_files(
    db: web::Data<Db>,
    user: AuthUser,
    q: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let mut qb = build_list_query(&q, &user.user_id, &user.email)?;
    let rows = qb.build().fetch_all(&db.0).await?;
    let files = rows_to_metas(&db, rows).await?;
    Ok(HttpResponse::Ok().json(files))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn recent_files(
    db: web::Data<Db>,
    user: AuthUser,
    q: web::Query<RecentQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let rows = sqlx::query(
        "SELECT * FROM files WHERE owner_id = ? AND location <> ? ORDER BY updated_at DESC LIMIT ?",
    )
    .bind(&user.user_id)
    .bind(TRASH_LOCATION)
    .bind(limit)
    .fetch_all(&db.0)
    .await?;
    let files = rows_to_metas(&db, rows).await?;
    Ok(HttpResponse::Ok().json(files))
}

pub async fn get_file(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    let file = load_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;

    // 404 rather than 403 so existence doesn't leak to non-parties.
    if !file.is_visible_to(&user.user_id, &user.email) {
        return Err(ApiError::NotFound("File not accessible".into()));
    }
    Ok(HttpResponse::Ok().json(file))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileReq {
    pub name: Option<String>,
    pub is_starred: Option<bool>,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub async fn update_file(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateFileReq>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    let row = fetch_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;
    if row.get::<String, _>("owner_id") != user.user_id {
        return Err(ApiError::Forbidden("Not allowed to edit this file".into()));
    }

    if body.name.is_none()
        && body.is_starred.is_none()
        && body.location.is_none()
        && body.description.is_none()
    {
        return Err(ApiError::BadRequest("No valid fields to update".into()));
    }

    sqlx::query(
        "UPDATE files SET name = COALESCE(?, name), is_starred = COALESCE(?, is_starred),
         location = COALESCE(?, location), description = COALESCE(?, description), updated_at = ?
         WHERE id = ?",
    )
    .bind(&body.name)
    .bind(body.is_starred)
    .bind(&body.location)
    .bind(&body.description)
    .bind(chrono::Utc::now())
    .bind(&id)
    .execute(&db.0)
    .await?;

    let file = load_file(&db, &id).await?.ok_or(ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(file))
}

pub async fn trash_file(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    let row = fetch_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;
    if row.get::<String, _>("owner_id") != user.user_id {
        return Err(ApiError::Forbidden("Not allowed to trash this file".into()));
    }

    sqlx::query("UPDATE files SET location = ?, updated_at = ? WHERE id = ?")
        .bind(TRASH_LOCATION)
        .bind(chrono::Utc::now())
        .bind(&id)
        .execute(&db.0)
        .await?;

    let file = load_file(&db, &id).await?.ok_or(ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(file))
}

#[derive(Deserialize)]
pub struct ShareReq {
    pub emails: Vec<String>,
}

pub async fn share_file(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<ShareReq>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    if body.emails.is_empty() {
        return Err(ApiError::BadRequest("emails must be a non-empty array".into()));
    }
    let row = fetch_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;
    if row.get::<String, _>("owner_id") != user.user_id {
        return Err(ApiError::Forbidden("Only the owner can share this file".into()));
    }

    let emails = normalize_emails(&body.emails);
    add_shares(&db, &id, &emails).await?;

    let file = load_file(&db, &id).await?.ok_or(ApiError::Internal)?;
    Ok(HttpResponse::Ok().json(file))
}

pub async fn children(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    let folder = load_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Folder not found".into()))?;
    if !folder.is_folder {
        return Err(ApiError::BadRequest("This file is not a folder".into()));
    }
    if !folder.is_visible_to(&user.user_id, &user.email) {
        return Err(ApiError::NotFound("Folder not accessible".into()));
    }

    let child_location = format!("{}/{}", folder.location, folder.name);
    let rows = sqlx::query(
        "SELECT * FROM files
         WHERE location = ?
           AND (owner_id = ? OR EXISTS (SELECT 1 FROM file_shares s WHERE s.file_id = files.id AND s.email = ?))
         ORDER BY is_folder DESC, name ASC",
    )
    .bind(&child_location)
    .bind(&user.user_id)
    .bind(&user.email)
    .fetch_all(&db.0)
    .await?;

    let files = rows_to_metas(&db, rows).await?;
    Ok(HttpResponse::Ok().json(files))
}

pub async fn download_file(
    db: web::Data<Db>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    check_id(&id)?;
    let file = load_file(&db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("File not found".into()))?;
    if !file.is_visible_to(&user.user_id, &user.email) {
        return Err(ApiError::NotFound("File not accessible".into()));
    }

    // No binary content exists; synthesize a placeholder from metadata.
    let filename = format!("{}.txt", safe_base_name(&file.name));
    let shared = if file.shared_with.is_empty() {
        "(none)".to_string()
    } else {
        file.shared_with.join(", ")
    };
    let content = [
        "Fake download for metadata-only file".to_string(),
        "=====================================".to_string(),
        String::new(),
        format!("Name:       {}", file.name),
        format!("Type:       {}", file.file_type),
        format!("Owner:      {}", file.owner_email),
        format!("Location:   {}", file.location),
        format!("Size:       {} bytes (metadata only, not real)", file.size),
        format!("Starred:    {}", if file.is_starred { "yes" } else { "no" }),
        format!("SharedWith: {}", shared),
        String::new(),
        format!("Created at: {}", file.created_at),
        format!("Updated at: {}", file.updated_at),
        String::new(),
        "This file is generated by the backend as a placeholder".to_string(),
        "because actual binary upload is not implemented.".to_string(),
    ]
    .join("\n");

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(content))
}

#[derive(Deserialize)]
pub struct BulkData {
    pub location: Option<String>,
    pub emails: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReq {
    pub operation: String,
    pub file_ids: Vec<String>,
    pub data: Option<BulkData>,
}

#[derive(Serialize)]
pub struct BulkItem {
    pub id: String,
    pub status: &'static str,
}

const BULK_OPS: [&str; 5] = ["trash", "star", "unstar", "move", "share"];

/// Applies one operation to many files. Items are independent: a failure
/// is recorded in the per-item status and the loop keeps going.
pub async fn bulk_update(
    db: web::Data<Db>,
    user: AuthUser,
    body: web::Json<BulkReq>,
) -> Result<HttpResponse, ApiError> {
    if body.file_ids.is_empty() {
        return Err(ApiError::BadRequest("operation and fileIds are required".into()));
    }
    if !BULK_OPS.contains(&body.operation.as_str()) {
        return Err(ApiError::BadRequest("Unsupported operation".into()));
    }

    let mut results: Vec<BulkItem> = Vec::with_capacity(body.file_ids.len());
    for file_id in &body.file_ids {
        if uuid::Uuid::parse_str(file_id).is_err() {
            results.push(BulkItem { id: file_id.clone(), status: "invalid-id" });
            continue;
        }
        let row = match fetch_file(&db, file_id).await? {
            Some(r) => r,
            None => {
                results.push(BulkItem { id: file_id.clone(), status: "not-found" });
                continue;
            }
        };
        if row.get::<String, _>("owner_id") != user.user_id {
            results.push(BulkItem { id: file_id.clone(), status: "forbidden" });
            continue;
        }

        let now = chrono::Utc::now();
        match body.operation.as_str() {
            "trash" => {
                sqlx::query("UPDATE files SET location = ?, updated_at = ? WHERE id = ?")
                    .bind(TRASH_LOCATION)
                    .bind(now)
                    .bind(file_id)
                    .execute(&db.0)
                    .await?;
            }
            "star" | "unstar" => {
                sqlx::query("UPDATE files SET is_starred = ?, updated_at = ? WHERE id = ?")
                    .bind(body.operation == "star")
                    .bind(now)
                    .bind(file_id)
                    .execute(&db.0)
                    .await?;
            }
            "move" => {
                let location = body
                    .data
                    .as_ref()
                    .and_then(|d| d.location.as_deref())
                    .map(str::trim)
                    .filter(|l| !l.is_empty());
                let location = match location {
                    Some(l) => l.to_string(),
                    None => {
                        results.push(BulkItem { id: file_id.clone(), status: "bad-data" });
                        continue;
                    }
                };
                sqlx::query("UPDATE files SET location = ?, updated_at = ? WHERE id = ?")
                    .bind(&location)
                    .bind(now)
                    .bind(file_id)
                    .execute(&db.0)
                    .await?;
            }
            "share" => {
                let emails = body.data.as_ref().and_then(|d| d.emails.as_ref());
                let emails = match emails {
                    Some(e) if !e.is_empty() => normalize_emails(e),
                    _ => {
                        results.push(BulkItem { id: file_id.clone(), status: "bad-data" });
                        continue;
                    }
                };
                add_shares(&db, file_id, &emails).await?;
            }
            _ => unreachable!("operation validated above"),
        }
        results.push(BulkItem { id: file_id.clone(), status: "ok" });
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "operation": body.operation,
        "results": results,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_emails_cleans_and_dedupes() {
        let input = vec![
            "  A@B.com ".to_string(),
            "a@b.com".to_string(),
            "".to_string(),
            "  ".to_string(),
            "c@d.com".to_string(),
        ];
        assert_eq!(normalize_emails(&input), vec!["a@b.com", "c@d.com"]);
    }

    #[test]
    fn safe_base_name_replaces_odd_chars() {
        assert_eq!(safe_base_name("Q3 report (final).pdf"), "Q3_report__final_.pdf");
        assert_eq!(safe_base_name("notes"), "notes");
        assert_eq!(safe_base_name(""), "file");
    }

    #[test]
    fn malformed_ids_read_as_missing() {
        assert!(check_id("not-a-uuid").is_err());
        assert!(check_id(&uuid::Uuid::new_v4().to_string()).is_ok());
    }
}
