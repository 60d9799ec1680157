//! Content record handlers.
//!
//! - `GET    /conteudos`       filtered, paginated list (`canal`, `tipo`, `q`, `limit`, `offset`)
//! - `POST   /conteudos`       create
//! - `GET    /conteudos/{id}`  fetch one
//! - `PUT    /conteudos/{id}`  partial update
//! - `DELETE /conteudos/{id}`  delete

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use conteudos_core::{CreateContentRequest, FieldError, Page, UpdateContentRequest};
use conteudos_db::{ContentListFilters, ContentRow};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ContentItem {
    pub id: String,
    pub project_name: String,
    pub channel: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub view_count: Option<i32>,
    pub segment: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub client: Option<String>,
    pub link: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ContentRow> for ContentItem {
    fn from(row: ContentRow) -> Self {
        Self {
            id: row.id,
            project_name: row.project_name,
            channel: row.channel,
            content_type: row.content_type,
            view_count: row.view_count,
            segment: row.segment,
            publication_date: row.publication_date,
            client: row.client,
            link: row.link,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentQuery {
    pub canal: Option<String>,
    pub tipo: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Parses the request body, reporting a type mismatch against the field that
/// caused it.
fn decode_body<T: DeserializeOwned>(
    request_id: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|e| ApiError::new(request_id, "bad_request", e.body_text()))?;
    serde_path_to_error::deserialize(value).map_err(|e| {
        let field = match e.path().to_string() {
            path if path == "." => "body".to_string(),
            path => path,
        };
        let error = FieldError {
            field,
            message: e.into_inner().to_string(),
        };
        ApiError::validation(request_id, error.into())
    })
}

fn path_id(request_id: &str, id: Result<Path<String>, PathRejection>) -> Result<String, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|e| ApiError::new(request_id, "bad_request", e.body_text()))
}

pub(super) async fn list_contents(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<ContentQuery>, QueryRejection>,
) -> Result<Json<Vec<ContentItem>>, ApiError> {
    let rid = &req_id.0;
    let Query(query) = query.map_err(|e| ApiError::new(rid, "bad_request", e.body_text()))?;
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref())
        .map_err(|e| ApiError::validation(rid, e))?;

    let rows = conteudos_db::list_contents(
        &state.pool,
        ContentListFilters {
            channel: query.canal.as_deref(),
            content_type: query.tipo.as_deref(),
            query: query.q.as_deref(),
            page,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(rows.into_iter().map(ContentItem::from).collect()))
}

pub(super) async fn create_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<ContentItem>), ApiError> {
    let rid = &req_id.0;
    let body: CreateContentRequest = decode_body(rid, body)?;
    let draft = body.validate().map_err(|e| ApiError::validation(rid, e))?;

    let row = conteudos_db::create_content(&state.pool, draft)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    tracing::info!(content_id = %row.id, channel = %row.channel, "content created");

    Ok((StatusCode::CREATED, Json(ContentItem::from(row))))
}

pub(super) async fn get_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<ContentItem>, ApiError> {
    let rid = &req_id.0;
    let id = path_id(rid, id)?;
    conteudos_db::get_content(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .map(|row| Json(ContentItem::from(row)))
        .ok_or_else(|| ApiError::not_found(rid))
}

pub(super) async fn update_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ContentItem>, ApiError> {
    let rid = &req_id.0;
    let id = path_id(rid, id)?;
    let body: UpdateContentRequest = decode_body(rid, body)?;
    let patch = body.validate().map_err(|e| ApiError::validation(rid, e))?;

    let row = conteudos_db::update_content(&state.pool, &id, patch)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(rid))?;
    tracing::debug!(content_id = %row.id, "content updated");

    Ok(Json(ContentItem::from(row)))
}

pub(super) async fn delete_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = path_id(rid, id)?;
    let deleted = conteudos_db::delete_content(&state.pool, &id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    if !deleted {
        return Err(ApiError::not_found(rid));
    }
    tracing::info!(content_id = %id, "content deleted");
    Ok(StatusCode::NO_CONTENT)
}
