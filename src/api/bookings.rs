//! Booking endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{provided, Booking, BookingStatus, CreateBookingRequest, UpdateBookingRequest};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::validation::{
    parse_rfc3339, validate_max_len, validate_one_of, validate_required, validate_uuid,
};
use super::{check_id, timed};

const MAX_LOCATION_LEN: usize = 200;
const MAX_NOTE_LEN: usize = 500;

/// Validated booking fields ready to be written
#[derive(Debug)]
struct BookingInput {
    date: Option<String>,
    status: Option<String>,
}

fn validate_create_request(req: &CreateBookingRequest) -> Result<BookingInput, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("client_id", validate_uuid(&req.client_id, "client_id"))
        .check("photographer_id", validate_uuid(&req.photographer_id, "photographer_id"))
        .check(
            "location",
            validate_required(&req.location, "Location", 1, MAX_LOCATION_LEN),
        );

    let date = match parse_rfc3339(&req.date, "date") {
        Ok(date) => Some(date),
        Err(e) => {
            errors.add("date", e);
            None
        }
    };

    let status = provided(&req.status)
        .unwrap_or(BookingStatus::default().as_str())
        .to_string();
    errors.check("status", validate_one_of(&status, "status", &BookingStatus::ALL));

    if let Some(note) = &req.note {
        errors.check("note", validate_max_len(note, "Note", MAX_NOTE_LEN));
    }

    errors.finish()?;
    Ok(BookingInput {
        date,
        status: Some(status),
    })
}

fn validate_update_request(req: &UpdateBookingRequest) -> Result<BookingInput, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(client_id) = provided(&req.client_id) {
        errors.check("client_id", validate_uuid(client_id, "client_id"));
    }
    if let Some(photographer_id) = provided(&req.photographer_id) {
        errors.check("photographer_id", validate_uuid(photographer_id, "photographer_id"));
    }
    if let Some(location) = provided(&req.location) {
        errors.check("location", validate_max_len(location, "Location", MAX_LOCATION_LEN));
    }
    if let Some(note) = provided(&req.note) {
        errors.check("note", validate_max_len(note, "Note", MAX_NOTE_LEN));
    }
    if let Some(status) = provided(&req.status) {
        errors.check("status", validate_one_of(status, "status", &BookingStatus::ALL));
    }

    let date = match provided(&req.date).map(|d| parse_rfc3339(d, "date")) {
        Some(Ok(date)) => Some(date),
        Some(Err(e)) => {
            errors.add("date", e);
            None
        }
        None => None,
    };

    errors.finish()?;
    Ok(BookingInput {
        date,
        status: provided(&req.status).map(str::to_string),
    })
}

/// List all bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let bookings = timed(
        &state,
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(Json(bookings))
}

/// Get a booking by ID
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    check_id(&id, "id")?;

    let booking = timed(
        &state,
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Booking not found"))?;

    Ok(Json(booking))
}

/// Create a booking; status defaults to pending
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let input = validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        client_id: req.client_id,
        photographer_id: req.photographer_id,
        date: input.date.unwrap_or_default(),
        location: req.location.trim().to_string(),
        status: input.status.unwrap_or_else(|| BookingStatus::Pending.to_string()),
        note: provided(&req.note).map(str::to_string),
        created_at: now.clone(),
        updated_at: now,
    };

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, client_id, photographer_id, date, location, status, note,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.client_id)
        .bind(&booking.photographer_id)
        .bind(&booking.date)
        .bind(&booking.location)
        .bind(&booking.status)
        .bind(&booking.note)
        .bind(&booking.created_at)
        .bind(&booking.updated_at)
        .execute(&state.db),
    )
    .await?;

    tracing::info!(booking_id = %booking.id, status = %booking.status, "Created booking");

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Update a booking
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBookingRequest>,
) -> Result<Json<Booking>, ApiError> {
    check_id(&id, "id")?;
    let input = validate_update_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();

    let result = timed(
        &state,
        sqlx::query(
            r#"
            UPDATE bookings SET
                client_id = COALESCE(?, client_id),
                photographer_id = COALESCE(?, photographer_id),
                date = COALESCE(?, date),
                location = COALESCE(?, location),
                status = COALESCE(?, status),
                note = COALESCE(?, note),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(provided(&req.client_id))
        .bind(provided(&req.photographer_id))
        .bind(&input.date)
        .bind(provided(&req.location))
        .bind(&input.status)
        .bind(provided(&req.note))
        .bind(&now)
        .bind(&id)
        .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Booking not found"));
    }

    let booking = timed(
        &state,
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db),
    )
    .await?;

    tracing::info!(booking_id = %id, status = %booking.status, "Updated booking");

    Ok(Json(booking))
}

/// Delete a booking
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    check_id(&id, "id")?;

    let result = timed(
        &state,
        sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(&id)
            .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Booking not found"));
    }

    tracing::info!(booking_id = %id, "Deleted booking");

    Ok(Json(json!({ "message": "Booking deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateBookingRequest {
        CreateBookingRequest {
            client_id: Uuid::new_v4().to_string(),
            photographer_id: Uuid::new_v4().to_string(),
            date: "2024-06-01T10:00:00+07:00".to_string(),
            location: "Gedung Sate, Bandung".to_string(),
            status: None,
            note: None,
        }
    }

    #[test]
    fn test_create_defaults_to_pending_and_normalizes_date() {
        let input = validate_create_request(&valid_request()).unwrap();
        assert_eq!(input.status.as_deref(), Some("pending"));
        assert_eq!(input.date.as_deref(), Some("2024-06-01T03:00:00+00:00"));
    }

    #[test]
    fn test_create_rejects_unknown_status_and_bad_date() {
        let mut req = valid_request();
        req.status = Some("cancelled".to_string());
        assert!(validate_create_request(&req).is_err());

        let mut req = valid_request();
        req.date = "besok".to_string();
        assert!(validate_create_request(&req).is_err());

        let mut req = valid_request();
        req.location = String::new();
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_update_with_blank_fields_changes_nothing() {
        let req = UpdateBookingRequest {
            status: Some(String::new()),
            date: Some(" ".to_string()),
            ..Default::default()
        };
        let input = validate_update_request(&req).unwrap();
        assert!(input.status.is_none());
        assert!(input.date.is_none());
    }

    #[test]
    fn test_update_validates_present_fields() {
        let req = UpdateBookingRequest {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_err());

        let req = UpdateBookingRequest {
            client_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(validate_update_request(&req).is_err());
    }
}
