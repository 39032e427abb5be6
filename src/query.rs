//! Translates /api/files query parameters into a sqlite SELECT.
//!
//! Every parameter is optional and conjuncts one predicate. Sort columns
//! go through a safelist so nothing user-controlled is ever spliced into
//! the SQL text; all values are bound.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::errors::ApiError;
use crate::models::file::TRASH_LOCATION;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// "shared" | "starred" | anything else means "my files"
    pub scope: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    /// Alias for `type`, kept for the frontend's older query shape.
    pub file_type: Option<String>,
    pub owner: Option<String>,
    pub owner_email: Option<String>,
    pub location: Option<String>,
    /// "file" | "folder"
    pub kind: Option<String>,
    pub min_size: Option<i64>,
    pub max_size: Option<i64>,
    pub uploaded_after: Option<String>,
    pub uploaded_before: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Accepts RFC 3339 or a bare YYYY-MM-DD (what date inputs send).
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }
    Err(ApiError::BadRequest(format!("invalid date: {s}")))
}

/// LIKE-pattern escaping for user search terms; `\` is the escape char.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Safelisted sort columns. "uploadDate" is what the frontend calls
/// created_at; anything unknown also falls back to created_at.
fn sort_column(sort: Option<&str>) -> &'static str {
    match sort {
        Some("name") => "name",
        Some("size") => "size",
        Some("updatedAt") => "updated_at",
        _ => "created_at",
    }
}

fn sort_direction(order: Option<&str>) -> &'static str {
    match order {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

pub fn build_list_query(
    p: &ListParams,
    user_id: &str,
    user_email: &str,
) -> Result<QueryBuilder<'static, Sqlite>, ApiError> {
    let mut qb: QueryBuilder<'static, Sqlite> =
        QueryBuilder::new("SELECT * FROM files WHERE 1=1");

    match p.scope.as_deref() {
        Some("shared") => {
            qb.push(" AND EXISTS (SELECT 1 FROM file_shares s WHERE s.file_id = files.id AND s.email = ");
            qb.push_bind(user_email.to_string());
            qb.push(")");
        }
        Some("starred") => {
            qb.push(" AND is_starred = 1 AND owner_id = ");
            qb.push_bind(user_id.to_string());
        }
        _ => {
            qb.push(" AND owner_id = ");
            qb.push_bind(user_id.to_string());
        }
    }

    // Without an explicit location, hide trashed items.
    if let Some(loc) = p.location.as_deref() {
        qb.push(" AND location = ");
        qb.push_bind(loc.trim().to_string());
    } else {
        qb.push(" AND location <> ");
        qb.push_bind(TRASH_LOCATION.to_string());
    }

    match p.kind.as_deref() {
        Some("folder") => {
            qb.push(" AND is_folder = 1");
        }
        Some("file") => {
            qb.push(" AND is_folder = 0");
        }
        _ => {}
    }

    if let Some(t) = p.type_.as_deref().or(p.file_type.as_deref()) {
        qb.push(" AND type = ");
        qb.push_bind(t.trim().to_string());
    }

    if let Some(owner) = p.owner.as_deref() {
        qb.push(" AND owner_id = ");
        qb.push_bind(owner.to_string());
    }
    if let Some(email) = p.owner_email.as_deref() {
        qb.push(" AND owner_email = ");
        qb.push_bind(email.trim().to_lowercase());
    }

    if let Some(min) = p.min_size {
        qb.push(" AND size >= ");
        qb.push_bind(min);
    }
    if let Some(max) = p.max_size {
        qb.push(" AND size <= ");
        qb.push_bind(max);
    }

    if let Some(after) = p.uploaded_after.as_deref() {
        qb.push(" AND created_at >= ");
        qb.push_bind(parse_date(after)?);
    }
    if let Some(before) = p.uploaded_before.as_deref() {
        qb.push(" AND created_at <= ");
        qb.push_bind(parse_date(before)?);
    }

    if let Some(search) = p.search.as_deref() {
        let term = search.trim();
        if !term.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (name LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR description LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" ESCAPE '\\' OR content_preview LIKE ");
            qb.push_bind(pattern);
            qb.push(" ESCAPE '\\')");
        }
    }

    qb.push(format!(
        " ORDER BY {} {}",
        sort_column(p.sort.as_deref()),
        sort_direction(p.order.as_deref())
    ));

    Ok(qb)
}
