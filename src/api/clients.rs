//! Client profile endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{provided, Client, CreateClientRequest, UpdateClientRequest};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::{check_id, timed};
use super::validation::{validate_phone, validate_required, validate_uuid};

fn validate_client_name(name: &str) -> Result<(), String> {
    validate_required(name, "Name", 3, 100)
}

fn validate_address(address: &str) -> Result<(), String> {
    validate_required(address, "Address", 5, 300)
}

fn validate_create_request(req: &CreateClientRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("user_id", validate_uuid(&req.user_id, "user_id"))
        .check("name", validate_client_name(&req.name))
        .check("phone", validate_phone(&req.phone))
        .check("address", validate_address(&req.address));
    errors.finish()
}

/// Only fields that carry a value are checked; blanks mean "leave as is"
fn validate_update_request(req: &UpdateClientRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(name) = provided(&req.name) {
        errors.check("name", validate_client_name(name));
    }
    if let Some(phone) = provided(&req.phone) {
        errors.check("phone", validate_phone(phone));
    }
    if let Some(address) = provided(&req.address) {
        errors.check("address", validate_address(address));
    }

    errors.finish()
}

/// List all clients
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = timed(
        &state,
        sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(Json(clients))
}

/// Get a client by ID
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    check_id(&id, "id")?;

    let client = timed(
        &state,
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Client not found"))?;

    Ok(Json(client))
}

/// Get the client profile owned by a user
pub async fn get_client_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    check_id(&user_id, "user_id")?;

    let client = timed(
        &state,
        sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(&user_id)
        .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Client not found"))?;

    Ok(Json(client))
}

/// Create a client
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let client = Client {
        id: Uuid::new_v4().to_string(),
        user_id: req.user_id,
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        address: req.address.trim().to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO clients (id, user_id, name, phone, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.id)
        .bind(&client.user_id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.created_at)
        .bind(&client.updated_at)
        .execute(&state.db),
    )
    .await?;

    tracing::info!(client_id = %client.id, "Created client");

    Ok((StatusCode::CREATED, Json(client)))
}

/// Update a client
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
    check_id(&id, "id")?;
    validate_update_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();

    let result = timed(
        &state,
        sqlx::query(
            r#"
            UPDATE clients SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                address = COALESCE(?, address),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(provided(&req.name))
        .bind(provided(&req.phone))
        .bind(provided(&req.address))
        .bind(&now)
        .bind(&id)
        .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Client not found"));
    }

    let client = timed(
        &state,
        sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db),
    )
    .await?;

    tracing::info!(client_id = %id, "Updated client");

    Ok(Json(client))
}

/// Delete a client
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_id(&id, "id")?;

    let result = timed(
        &state,
        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(&id)
            .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Client not found"));
    }

    tracing::info!(client_id = %id, "Deleted client");

    Ok(Json(json!({ "message": "Client deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateClientRequest {
        CreateClientRequest {
            user_id: Uuid::new_v4().to_string(),
            name: "Budi Santoso".to_string(),
            phone: "081234567890".to_string(),
            address: "Jl. Sarijadi No. 54, Bandung".to_string(),
        }
    }

    #[test]
    fn test_create_request_valid() {
        assert!(validate_create_request(&valid_request()).is_ok());
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let mut req = valid_request();
        req.name = "Bu".to_string();
        assert!(validate_create_request(&req).is_err());

        let mut req = valid_request();
        req.phone = "12ab".to_string();
        assert!(validate_create_request(&req).is_err());

        let mut req = valid_request();
        req.address = "Jl.".to_string();
        assert!(validate_create_request(&req).is_err());

        let mut req = valid_request();
        req.user_id = "123".to_string();
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_update_request_ignores_blank_fields() {
        let req = UpdateClientRequest {
            name: Some(String::new()),
            phone: Some("   ".to_string()),
            address: None,
        };
        assert!(validate_update_request(&req).is_ok());

        let req = UpdateClientRequest {
            phone: Some("not-a-phone".to_string()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_err());
    }
}
