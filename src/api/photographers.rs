//! Photographer profile endpoints.
//!
//! Profile updates arrive either as JSON or as `multipart/form-data` with an
//! optional `profile_photo` file, which is written to the upload directory
//! and served back under `/uploads/`.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    provided, serialize_string_list, CreatePhotographerRequest, Photographer,
    PhotographerResponse, UpdatePhotographerRequest,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::validation::{validate_max_len, validate_phone, validate_url_list, validate_uuid};
use super::{check_id, timed};

const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_LOCATION_LEN: usize = 200;

/// A profile photo received in a multipart update
#[derive(Debug)]
struct PhotoUpload {
    file_name: String,
    bytes: Bytes,
}

fn validate_create_request(req: &CreatePhotographerRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("user_id", validate_uuid(&req.user_id, "user_id"))
        .check("phone", validate_phone(&req.phone))
        .check(
            "description",
            validate_max_len(&req.description, "Description", MAX_DESCRIPTION_LEN),
        )
        .check("location", validate_max_len(&req.location, "Location", MAX_LOCATION_LEN))
        .check("portfolio", validate_url_list(&req.portfolio, "portfolio"));
    errors.finish()
}

fn validate_update_request(req: &UpdatePhotographerRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(phone) = provided(&req.phone) {
        errors.check("phone", validate_phone(phone));
    }
    if let Some(description) = provided(&req.description) {
        errors.check(
            "description",
            validate_max_len(description, "Description", MAX_DESCRIPTION_LEN),
        );
    }
    if let Some(location) = provided(&req.location) {
        errors.check("location", validate_max_len(location, "Location", MAX_LOCATION_LEN));
    }
    if let Some(portfolio) = &req.portfolio {
        errors.check("portfolio", validate_url_list(portfolio, "portfolio"));
    }

    errors.finish()
}

/// Keep only the last path component and a conservative character set
fn sanitize_file_name(name: &str) -> String {
    let base = std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Read the text fields and the optional photo of a multipart update
async fn read_multipart_update(
    mut multipart: Multipart,
) -> Result<(UpdatePhotographerRequest, Option<PhotoUpload>), ApiError> {
    let mut req = UpdatePhotographerRequest::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "profile_photo" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid profile photo: {}", e)))?;

                match file_name {
                    Some(file_name) if !bytes.is_empty() => {
                        upload = Some(PhotoUpload { file_name, bytes });
                    }
                    // A plain text value is treated like the JSON field
                    None => {
                        req.profile_photo = Some(String::from_utf8_lossy(&bytes).into_owned());
                    }
                    _ => {}
                }
            }
            "phone" | "description" | "location" | "portfolio" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid field {}: {}", name, e)))?;

                match name.as_str() {
                    "phone" => req.phone = Some(text),
                    "description" => req.description = Some(text),
                    "location" => req.location = Some(text),
                    _ => {
                        if !text.trim().is_empty() {
                            let portfolio: Vec<String> = serde_json::from_str(&text).map_err(|_| {
                                ApiError::validation_field(
                                    "portfolio",
                                    "Portfolio must be a JSON array of URLs",
                                )
                            })?;
                            req.portfolio = Some(portfolio);
                        }
                    }
                }
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown multipart field");
            }
        }
    }

    Ok((req, upload))
}

/// Write an uploaded photo and return its public path
async fn save_upload(
    state: &AppState,
    upload: &PhotoUpload,
) -> Result<(String, PathBuf), ApiError> {
    let dir = &state.config.server.upload_dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        tracing::error!("Failed to create upload directory {:?}: {}", dir, e);
        ApiError::internal("Failed to save profile photo")
    })?;

    let file_name = format!(
        "{}_{}",
        chrono::Utc::now().timestamp(),
        sanitize_file_name(&upload.file_name)
    );
    let path = dir.join(&file_name);

    tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
        tracing::error!("Failed to write upload {:?}: {}", path, e);
        ApiError::internal("Failed to save profile photo")
    })?;

    Ok((format!("/uploads/{}", file_name), path))
}

/// List all photographers
pub async fn list_photographers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PhotographerResponse>>, ApiError> {
    let photographers = timed(
        &state,
        sqlx::query_as::<_, Photographer>("SELECT * FROM photographers ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(Json(photographers.into_iter().map(Into::into).collect()))
}

/// Get a photographer by ID
pub async fn get_photographer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PhotographerResponse>, ApiError> {
    check_id(&id, "id")?;

    let photographer = timed(
        &state,
        sqlx::query_as::<_, Photographer>("SELECT * FROM photographers WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Photographer not found"))?;

    Ok(Json(photographer.into()))
}

/// Get the photographer profile owned by a user
pub async fn get_photographer_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PhotographerResponse>, ApiError> {
    check_id(&user_id, "user_id")?;

    let photographer = timed(
        &state,
        sqlx::query_as::<_, Photographer>(
            "SELECT * FROM photographers WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&user_id)
        .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Photographer not found"))?;

    Ok(Json(photographer.into()))
}

/// Create a photographer profile
pub async fn create_photographer(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePhotographerRequest>,
) -> Result<(StatusCode, Json<PhotographerResponse>), ApiError> {
    validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let portfolio: Vec<String> = req.portfolio.iter().map(|u| u.trim().to_string()).collect();
    let photographer = Photographer {
        id: Uuid::new_v4().to_string(),
        user_id: req.user_id,
        phone: req.phone.trim().to_string(),
        description: req.description.trim().to_string(),
        portfolio: serialize_string_list(&portfolio),
        location: req.location.trim().to_string(),
        profile_photo: req.profile_photo.trim().to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO photographers (
                id, user_id, phone, description, portfolio, location, profile_photo,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&photographer.id)
        .bind(&photographer.user_id)
        .bind(&photographer.phone)
        .bind(&photographer.description)
        .bind(&photographer.portfolio)
        .bind(&photographer.location)
        .bind(&photographer.profile_photo)
        .bind(&photographer.created_at)
        .bind(&photographer.updated_at)
        .execute(&state.db),
    )
    .await?;

    tracing::info!(photographer_id = %photographer.id, "Created photographer");

    Ok((StatusCode::CREATED, Json(photographer.into())))
}

/// Update a photographer profile from JSON or a multipart form
pub async fn update_photographer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<PhotographerResponse>, ApiError> {
    check_id(&id, "id")?;

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let (req, upload) = if is_multipart {
        let multipart = Multipart::from_request(request, &state).await.map_err(|e| {
            ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text()))
        })?;
        read_multipart_update(multipart).await?
    } else {
        let ApiJson(req) =
            ApiJson::<UpdatePhotographerRequest>::from_request(request, &state).await?;
        (req, None)
    };

    validate_update_request(&req)?;

    let saved = match &upload {
        Some(upload) => Some(save_upload(&state, upload).await?),
        None => None,
    };
    let profile_photo = saved
        .as_ref()
        .map(|(public, _)| public.as_str())
        .or_else(|| provided(&req.profile_photo));

    let result = apply_update(&state, &id, &req, profile_photo).await;

    // A photo is only kept once the profile points at it
    if result.is_err() {
        if let Some((_, path)) = &saved {
            discard_upload(path).await;
        }
    }
    let photographer = result?;

    tracing::info!(
        photographer_id = %id,
        photo_uploaded = saved.is_some(),
        "Updated photographer"
    );

    Ok(Json(photographer.into()))
}

async fn apply_update(
    state: &AppState,
    id: &str,
    req: &UpdatePhotographerRequest,
    profile_photo: Option<&str>,
) -> Result<Photographer, ApiError> {
    // An empty list leaves the stored portfolio alone
    let portfolio = req.portfolio.as_ref().filter(|p| !p.is_empty()).map(|p| {
        let urls: Vec<String> = p.iter().map(|u| u.trim().to_string()).collect();
        serialize_string_list(&urls)
    });

    let now = chrono::Utc::now().to_rfc3339();

    let result = timed(
        state,
        sqlx::query(
            r#"
            UPDATE photographers SET
                phone = COALESCE(?, phone),
                description = COALESCE(?, description),
                portfolio = COALESCE(?, portfolio),
                location = COALESCE(?, location),
                profile_photo = COALESCE(?, profile_photo),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(provided(&req.phone))
        .bind(provided(&req.description))
        .bind(&portfolio)
        .bind(provided(&req.location))
        .bind(profile_photo)
        .bind(&now)
        .bind(id)
        .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Photographer not found"));
    }

    timed(
        state,
        sqlx::query_as::<_, Photographer>("SELECT * FROM photographers WHERE id = ?")
            .bind(id)
            .fetch_one(&state.db),
    )
    .await
}

async fn discard_upload(path: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove orphaned upload {:?}: {}", path, e);
    }
}

/// Delete a photographer profile
pub async fn delete_photographer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_id(&id, "id")?;

    let result = timed(
        &state,
        sqlx::query("DELETE FROM photographers WHERE id = ?")
            .bind(&id)
            .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Photographer not found"));
    }

    tracing::info!(photographer_id = %id, "Deleted photographer");

    Ok(Json(json!({ "message": "Photographer deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("me.jpg"), "me.jpg");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("foto profil (1).png"), "foto_profil__1_.png");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_create_request_limits() {
        let mut req = CreatePhotographerRequest {
            user_id: Uuid::new_v4().to_string(),
            phone: "081234567890".to_string(),
            description: "Wedding and prewedding".to_string(),
            portfolio: vec!["https://cdn.example.com/1.jpg".to_string()],
            location: "Bandung".to_string(),
            profile_photo: String::new(),
        };
        assert!(validate_create_request(&req).is_ok());

        req.description = "a".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(validate_create_request(&req).is_err());

        req.description.clear();
        req.location = "b".repeat(MAX_LOCATION_LEN + 1);
        assert!(validate_create_request(&req).is_err());

        req.location.clear();
        req.portfolio = vec!["  ".to_string()];
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_update_request_blank_phone_is_ignored() {
        let req = UpdatePhotographerRequest {
            phone: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_ok());

        let req = UpdatePhotographerRequest {
            phone: Some("12".to_string()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_err());
    }
}
