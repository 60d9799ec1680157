//! Database operations for the `conteudos` table.

use chrono::{DateTime, NaiveDate, Utc};
use conteudos_core::{ContentDraft, ContentPatch, Page};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `conteudos` table.
///
/// The internal `seq` column only breaks `created_at` ties and is not selected.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ContentRow {
    pub id: String,
    pub project_name: String,
    pub channel: String,
    pub content_type: String,
    pub view_count: Option<i32>,
    pub segment: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub link: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `NULL` until the first update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContentRow {
    /// The user-editable fields of this row.
    #[must_use]
    pub fn draft(&self) -> ContentDraft {
        ContentDraft {
            project_name: self.project_name.clone(),
            channel: self.channel.clone(),
            content_type: self.content_type.clone(),
            view_count: self.view_count,
            segment: self.segment.clone(),
            publication_date: self.publication_date,
            client: self.client.clone(),
            link: self.link.clone(),
            description: self.description.clone(),
        }
    }
}

/// Input filters for content listing.
///
/// Blank `channel`, `content_type` and `query` values are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentListFilters<'a> {
    /// Exact match on `channel`.
    pub channel: Option<&'a str>,
    /// Exact match on `content_type`.
    pub content_type: Option<&'a str>,
    /// Case-insensitive substring over project name, client, segment,
    /// description and link.
    pub query: Option<&'a str>,
    pub page: Page,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a new content row under a freshly generated id and returns it.
///
/// Text fields are trimmed before they are written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_content(pool: &PgPool, draft: ContentDraft) -> Result<ContentRow, DbError> {
    let draft = draft.normalized();
    let id = Uuid::new_v4().to_string();

    let row = sqlx::query_as::<_, ContentRow>(
        "INSERT INTO conteudos \
           (id, project_name, channel, content_type, view_count, segment, \
            publication_date, client, link, description) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id, project_name, channel, content_type, view_count, segment, \
                   publication_date, client, link, description, created_at, updated_at",
    )
    .bind(&id)
    .bind(&draft.project_name)
    .bind(&draft.channel)
    .bind(&draft.content_type)
    .bind(draft.view_count)
    .bind(&draft.segment)
    .bind(draft.publication_date)
    .bind(&draft.client)
    .bind(&draft.link)
    .bind(&draft.description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns content rows matching `filters`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_contents(
    pool: &PgPool,
    filters: ContentListFilters<'_>,
) -> Result<Vec<ContentRow>, DbError> {
    let channel = filters.channel.filter(|c| !c.trim().is_empty());
    let content_type = filters.content_type.filter(|t| !t.trim().is_empty());
    let pattern = filters
        .query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(like_pattern);

    let rows = sqlx::query_as::<_, ContentRow>(
        "SELECT id, project_name, channel, content_type, view_count, segment, \
                publication_date, client, link, description, created_at, updated_at \
         FROM conteudos \
         WHERE ($1::TEXT IS NULL OR channel = $1) \
           AND ($2::TEXT IS NULL OR content_type = $2) \
           AND ($3::TEXT IS NULL \
                OR project_name ILIKE $3 ESCAPE '\\' \
                OR client ILIKE $3 ESCAPE '\\' \
                OR segment ILIKE $3 ESCAPE '\\' \
                OR description ILIKE $3 ESCAPE '\\' \
                OR link ILIKE $3 ESCAPE '\\') \
         ORDER BY created_at DESC, seq DESC \
         LIMIT $4 OFFSET $5",
    )
    .bind(channel)
    .bind(content_type)
    .bind(pattern)
    .bind(filters.page.limit)
    .bind(filters.page.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single content row by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_content(pool: &PgPool, id: &str) -> Result<Option<ContentRow>, DbError> {
    let row = sqlx::query_as::<_, ContentRow>(
        "SELECT id, project_name, channel, content_type, view_count, segment, \
                publication_date, client, link, description, created_at, updated_at \
         FROM conteudos \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Applies `patch` to the row with `id` and stamps `updated_at`.
///
/// The row is locked with `SELECT ... FOR UPDATE`, merged in Rust through
/// [`ContentPatch::apply`], and written back inside one transaction.
/// Returns `None` when no row has that id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn update_content(
    pool: &PgPool,
    id: &str,
    patch: ContentPatch,
) -> Result<Option<ContentRow>, DbError> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, ContentRow>(
        "SELECT id, project_name, channel, content_type, view_count, segment, \
                publication_date, client, link, description, created_at, updated_at \
         FROM conteudos \
         WHERE id = $1 \
         FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(current) = current else {
        return Ok(None);
    };

    let merged = patch.apply(current.draft());

    // clock_timestamp() rather than NOW(): the lock may have been waited on,
    // and NOW() is frozen at transaction start.
    let row = sqlx::query_as::<_, ContentRow>(
        "UPDATE conteudos \
         SET project_name     = $2, \
             channel          = $3, \
             content_type     = $4, \
             view_count       = $5, \
             segment          = $6, \
             publication_date = $7, \
             client           = $8, \
             link             = $9, \
             description      = $10, \
             updated_at       = clock_timestamp() \
         WHERE id = $1 \
         RETURNING id, project_name, channel, content_type, view_count, segment, \
                   publication_date, client, link, description, created_at, updated_at",
    )
    .bind(id)
    .bind(&merged.project_name)
    .bind(&merged.channel)
    .bind(&merged.content_type)
    .bind(merged.view_count)
    .bind(&merged.segment)
    .bind(merged.publication_date)
    .bind(&merged.client)
    .bind(&merged.link)
    .bind(&merged.description)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(row))
}

/// Deletes the row with `id`. Returns `false` if there was nothing to delete.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_content(pool: &PgPool, id: &str) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM conteudos WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Wraps `term` in `%` wildcards, escaping LIKE metacharacters so the match
/// is a literal substring.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
