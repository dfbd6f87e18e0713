//! Translation endpoints

use axum::{
    body::Bytes,
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

/// Locale assumed when a creation request does not name one.
const DEFAULT_LOCALE: &str = "en-us";

/// Create a translation for an article.
///
/// `POST /articles/{article_id}/translations.json`. The target locale
/// comes from the request body's `translation.locale` field.
pub async fn create_translation(
    State(ctx): State<SimContext>,
    Path(article_id): Path<String>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let article_id = parse_id(&article_id, "article ID")?;

    let locale = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/translation/locale")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

    let translation = ctx
        .store
        .create_translation(article_id, &locale)
        .ok_or_else(|| ApiError::not_found("Article", article_id))?;
    info!(article_id, %locale, translation_id = translation.id, "created translation");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "translation": translation })),
    ))
}

/// Fetch a translation.
///
/// `GET /articles/{article_id}/translations/{locale}`
pub async fn show_translation(
    State(ctx): State<SimContext>,
    Path((article_id, locale)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let article_id = parse_id(&article_id, "article ID")?;
    debug!(article_id, %locale, "fetching translation");

    let translation = ctx
        .store
        .get_translation(article_id, &locale)
        .ok_or_else(|| {
            ApiError::not_found("Translation", format!("{}/{}", article_id, locale))
        })?;

    Ok(Json(json!({ "translation": translation })))
}

/// Update a translation.
///
/// `PUT /articles/{article_id}/translations/{locale}`
pub async fn update_translation(
    State(ctx): State<SimContext>,
    Path((article_id, locale)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let article_id = parse_id(&article_id, "article ID")?;

    let translation = ctx
        .store
        .update_translation(article_id, &locale)
        .ok_or_else(|| {
            ApiError::not_found("Translation", format!("{}/{}", article_id, locale))
        })?;
    info!(article_id, %locale, "updated translation");

    Ok(Json(json!({ "translation": translation })))
}
