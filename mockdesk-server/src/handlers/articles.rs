//! Article endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    context::SimContext,
    errors::{ApiError, ApiResult},
    handlers::parse_id,
};

/// Create an article under a section.
///
/// `POST /{locale}/sections/{section_id}/articles.json`
pub async fn create_article(
    State(ctx): State<SimContext>,
    Path((locale, section_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let section_id = parse_id(&section_id, "section ID")?;

    if !ctx.store.section_exists(section_id) {
        return Err(ApiError::not_found("Section", section_id));
    }

    let article = ctx.store.create_article(&locale, section_id);
    info!(article_id = article.id, %locale, section_id, "created article");

    Ok((StatusCode::CREATED, Json(json!({ "article": article }))))
}

/// Fetch an article.
///
/// `GET /{locale}/articles/{id}.json`
pub async fn show_article(
    State(ctx): State<SimContext>,
    Path((locale, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "article ID")?;
    debug!(article_id = id, %locale, "fetching article");

    let article = ctx
        .store
        .get_article(id)
        .ok_or_else(|| ApiError::not_found("Article", id))?;

    Ok(Json(json!({ "article": article })))
}

/// Update an article.
///
/// `PUT /{locale}/articles/{id}`
pub async fn update_article(
    State(ctx): State<SimContext>,
    Path((locale, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let id = parse_id(&id, "article ID")?;

    let article = ctx
        .store
        .update_article(id)
        .ok_or_else(|| ApiError::not_found("Article", id))?;
    info!(article_id = id, %locale, "updated article");

    Ok(Json(json!({ "article": article })))
}
