//! Gallery endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{provided, CreateGalleryRequest, Gallery, UpdateGalleryRequest};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::validation::{validate_max_len, validate_required, validate_url_list, validate_uuid};
use super::{check_id, timed};

const MAX_TITLE_LEN: usize = 150;
const MAX_DESCRIPTION_LEN: usize = 500;

fn validate_image_url(url: &str) -> Result<(), String> {
    validate_required(url, "Image URL", 1, 2048)?;
    validate_url_list(&[url.to_string()], "image_url")
}

fn validate_create_request(req: &CreateGalleryRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("photographer_id", validate_uuid(&req.photographer_id, "photographer_id"))
        .check("title", validate_required(&req.title, "Title", 1, MAX_TITLE_LEN))
        .check("image_url", validate_image_url(&req.image_url));

    if let Some(description) = &req.description {
        errors.check(
            "description",
            validate_max_len(description, "Description", MAX_DESCRIPTION_LEN),
        );
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateGalleryRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(photographer_id) = provided(&req.photographer_id) {
        errors.check("photographer_id", validate_uuid(photographer_id, "photographer_id"));
    }
    if let Some(title) = provided(&req.title) {
        errors.check("title", validate_required(title, "Title", 1, MAX_TITLE_LEN));
    }
    if let Some(image_url) = provided(&req.image_url) {
        errors.check("image_url", validate_image_url(image_url));
    }
    if let Some(description) = provided(&req.description) {
        errors.check(
            "description",
            validate_max_len(description, "Description", MAX_DESCRIPTION_LEN),
        );
    }

    errors.finish()
}

/// List all gallery entries
pub async fn list_galleries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Gallery>>, ApiError> {
    let galleries = timed(
        &state,
        sqlx::query_as::<_, Gallery>("SELECT * FROM galleries ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(Json(galleries))
}

pub async fn get_gallery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Gallery>, ApiError> {
    check_id(&id, "id")?;

    let gallery = timed(
        &state,
        sqlx::query_as::<_, Gallery>("SELECT * FROM galleries WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Gallery not found"))?;

    Ok(Json(gallery))
}

pub async fn create_gallery(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateGalleryRequest>,
) -> Result<(StatusCode, Json<Gallery>), ApiError> {
    validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let gallery = Gallery {
        id: Uuid::new_v4().to_string(),
        photographer_id: req.photographer_id,
        title: req.title.trim().to_string(),
        image_url: req.image_url.trim().to_string(),
        description: provided(&req.description).map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    };

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO galleries (id, photographer_id, title, image_url, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&gallery.id)
        .bind(&gallery.photographer_id)
        .bind(&gallery.title)
        .bind(&gallery.image_url)
        .bind(&gallery.description)
        .bind(&gallery.created_at)
        .bind(&gallery.updated_at)
        .execute(&state.db),
    )
    .await?;

    tracing::info!(
        gallery_id = %gallery.id,
        photographer_id = %gallery.photographer_id,
        "Created gallery entry"
    );

    Ok((StatusCode::CREATED, Json(gallery)))
}

pub async fn update_gallery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateGalleryRequest>,
) -> Result<Json<Gallery>, ApiError> {
    check_id(&id, "id")?;
    validate_update_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();

    let result = timed(
        &state,
        sqlx::query(
            r#"
            UPDATE galleries SET
                photographer_id = COALESCE(?, photographer_id),
                title = COALESCE(?, title),
                image_url = COALESCE(?, image_url),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(provided(&req.photographer_id))
        .bind(provided(&req.title))
        .bind(provided(&req.image_url))
        .bind(provided(&req.description))
        .bind(&now)
        .bind(&id)
        .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Gallery not found"));
    }

    let gallery = timed(
        &state,
        sqlx::query_as::<_, Gallery>("SELECT * FROM galleries WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db),
    )
    .await?;

    tracing::info!(gallery_id = %id, "Updated gallery entry");

    Ok(Json(gallery))
}

pub async fn delete_gallery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_id(&id, "id")?;

    let result = timed(
        &state,
        sqlx::query("DELETE FROM galleries WHERE id = ?")
            .bind(&id)
            .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Gallery not found"));
    }

    tracing::info!(gallery_id = %id, "Deleted gallery entry");

    Ok(Json(json!({ "message": "Gallery deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_core_fields() {
        let req = CreateGalleryRequest {
            photographer_id: Uuid::new_v4().to_string(),
            title: "Prewedding Lembang".to_string(),
            image_url: "https://cdn.example.com/lembang.jpg".to_string(),
            description: None,
        };
        assert!(validate_create_request(&req).is_ok());

        let req = CreateGalleryRequest {
            photographer_id: String::new(),
            title: String::new(),
            image_url: String::new(),
            description: None,
        };
        let err = validate_create_request(&req).unwrap_err();
        assert!(err.message().contains("3 fields"));
    }

    #[test]
    fn test_update_rejects_non_http_image_url() {
        let req = UpdateGalleryRequest {
            image_url: Some("file:///tmp/a.jpg".to_string()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_err());

        assert!(validate_update_request(&UpdateGalleryRequest::default()).is_ok());
    }
}
