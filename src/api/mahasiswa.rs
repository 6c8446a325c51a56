//! Student registry endpoints, keyed by NPM (student number).
//!
//! Successful responses use the `{status, message, data}` envelope that the
//! registry's frontend expects; failures use the common error envelope.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{
    provided, serialize_string_list, CreateMahasiswaRequest, Mahasiswa, MahasiswaEnvelope,
    MahasiswaResponse, UpdateMahasiswaRequest,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::timed;
use super::validation::{parse_npm, validate_max_len, validate_required};

const MAX_ALAMAT_LEN: usize = 300;

fn envelope<T: serde::Serialize>(
    status: StatusCode,
    message: &str,
    data: T,
) -> Json<MahasiswaEnvelope<T>> {
    Json(MahasiswaEnvelope {
        status: status.as_u16(),
        message: message.to_string(),
        data,
    })
}

fn check_npm(raw: &str) -> Result<i64, ApiError> {
    parse_npm(raw).map_err(|e| ApiError::validation_field("npm", e))
}

fn validate_minat(minat: &[String]) -> Result<(), String> {
    if minat.iter().any(|m| m.trim().is_empty()) {
        return Err("Interests must not contain empty entries".to_string());
    }
    Ok(())
}

fn validate_create_request(req: &CreateMahasiswaRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if req.npm <= 0 {
        errors.add("npm", "NPM must be a positive number");
    }
    errors
        .check("nama", validate_required(&req.nama, "Nama", 3, 100))
        .check("prodi", validate_required(&req.prodi, "Prodi", 2, 100))
        .check("fakultas", validate_required(&req.fakultas, "Fakultas", 2, 100))
        .check("minat", validate_minat(&req.minat));

    if let Some(alamat) = &req.alamat {
        errors.check("alamat", validate_max_len(alamat, "Alamat", MAX_ALAMAT_LEN));
    }

    errors.finish()
}

fn validate_update_request(req: &UpdateMahasiswaRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(nama) = provided(&req.nama) {
        errors.check("nama", validate_required(nama, "Nama", 3, 100));
    }
    if let Some(prodi) = provided(&req.prodi) {
        errors.check("prodi", validate_required(prodi, "Prodi", 2, 100));
    }
    if let Some(fakultas) = provided(&req.fakultas) {
        errors.check("fakultas", validate_required(fakultas, "Fakultas", 2, 100));
    }
    if let Some(alamat) = provided(&req.alamat) {
        errors.check("alamat", validate_max_len(alamat, "Alamat", MAX_ALAMAT_LEN));
    }
    if let Some(minat) = &req.minat {
        errors.check("minat", validate_minat(minat));
    }

    errors.finish()
}

pub async fn list_mahasiswa(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MahasiswaEnvelope<Vec<MahasiswaResponse>>>, ApiError> {
    let rows = timed(
        &state,
        sqlx::query_as::<_, Mahasiswa>("SELECT * FROM mahasiswa ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(envelope(
        StatusCode::OK,
        "Student records retrieved",
        rows.into_iter().map(Into::into).collect(),
    ))
}

pub async fn get_mahasiswa(
    State(state): State<Arc<AppState>>,
    Path(npm): Path<String>,
) -> Result<Json<MahasiswaEnvelope<MahasiswaResponse>>, ApiError> {
    let npm = check_npm(&npm)?;

    let row = timed(
        &state,
        sqlx::query_as::<_, Mahasiswa>("SELECT * FROM mahasiswa WHERE npm = ?")
            .bind(npm)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Student not found"))?;

    Ok(envelope(StatusCode::OK, "Student record retrieved", row.into()))
}

pub async fn create_mahasiswa(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateMahasiswaRequest>,
) -> Result<(StatusCode, Json<MahasiswaEnvelope<MahasiswaResponse>>), ApiError> {
    validate_create_request(&req)?;

    let now = chrono::Utc::now().to_rfc3339();
    let minat: Vec<String> = req.minat.iter().map(|m| m.trim().to_string()).collect();
    let row = Mahasiswa {
        npm: req.npm,
        nama: req.nama.trim().to_string(),
        prodi: req.prodi.trim().to_string(),
        fakultas: req.fakultas.trim().to_string(),
        alamat: provided(&req.alamat).map(str::to_string),
        minat: serialize_string_list(&minat),
        created_at: now.clone(),
        updated_at: now,
    };

    timed(
        &state,
        sqlx::query(
            r#"
            INSERT INTO mahasiswa (npm, nama, prodi, fakultas, alamat, minat, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.npm)
        .bind(&row.nama)
        .bind(&row.prodi)
        .bind(&row.fakultas)
        .bind(&row.alamat)
        .bind(&row.minat)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&state.db),
    )
    .await
    .map_err(|e| {
        if e.status() == StatusCode::BAD_REQUEST {
            ApiError::bad_request(format!("Student with NPM {} already exists", req.npm))
        } else {
            e
        }
    })?;

    tracing::info!(npm = row.npm, "Created student record");

    Ok((
        StatusCode::CREATED,
        envelope(StatusCode::CREATED, "Student record created", row.into()),
    ))
}

pub async fn update_mahasiswa(
    State(state): State<Arc<AppState>>,
    Path(npm): Path<String>,
    ApiJson(req): ApiJson<UpdateMahasiswaRequest>,
) -> Result<Json<MahasiswaEnvelope<MahasiswaResponse>>, ApiError> {
    let npm = check_npm(&npm)?;
    validate_update_request(&req)?;

    let minat = req.minat.as_ref().filter(|m| !m.is_empty()).map(|m| {
        let interests: Vec<String> = m.iter().map(|s| s.trim().to_string()).collect();
        serialize_string_list(&interests)
    });
    let now = chrono::Utc::now().to_rfc3339();

    let result = timed(
        &state,
        sqlx::query(
            r#"
            UPDATE mahasiswa SET
                nama = COALESCE(?, nama),
                prodi = COALESCE(?, prodi),
                fakultas = COALESCE(?, fakultas),
                alamat = COALESCE(?, alamat),
                minat = COALESCE(?, minat),
                updated_at = ?
            WHERE npm = ?
            "#,
        )
        .bind(provided(&req.nama))
        .bind(provided(&req.prodi))
        .bind(provided(&req.fakultas))
        .bind(provided(&req.alamat))
        .bind(&minat)
        .bind(&now)
        .bind(npm)
        .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Student not found"));
    }

    let row = timed(
        &state,
        sqlx::query_as::<_, Mahasiswa>("SELECT * FROM mahasiswa WHERE npm = ?")
            .bind(npm)
            .fetch_one(&state.db),
    )
    .await?;

    tracing::info!(npm, "Updated student record");

    Ok(envelope(StatusCode::OK, "Student record updated", row.into()))
}

pub async fn delete_mahasiswa(
    State(state): State<Arc<AppState>>,
    Path(npm): Path<String>,
) -> Result<Json<MahasiswaEnvelope<Value>>, ApiError> {
    let npm = check_npm(&npm)?;

    let result = timed(
        &state,
        sqlx::query("DELETE FROM mahasiswa WHERE npm = ?")
            .bind(npm)
            .execute(&state.db),
    )
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Student not found"));
    }

    tracing::info!(npm, "Deleted student record");

    Ok(envelope(
        StatusCode::OK,
        "Student record deleted",
        json!({ "npm": npm }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateMahasiswaRequest {
        CreateMahasiswaRequest {
            npm: 714230051,
            nama: "Rizky Pratama".to_string(),
            prodi: "D4 Teknik Informatika".to_string(),
            fakultas: "Sekolah Vokasi".to_string(),
            alamat: Some("Jl. Sariasih No. 54".to_string()),
            minat: vec!["Backend".to_string(), "Data".to_string()],
        }
    }

    #[test]
    fn test_create_request_valid() {
        assert!(validate_create_request(&valid_request()).is_ok());
    }

    #[test]
    fn test_create_request_requires_positive_npm() {
        let mut req = valid_request();
        req.npm = 0;
        let err = validate_create_request(&req).unwrap_err();
        assert_eq!(err.message(), "NPM must be a positive number");
    }

    #[test]
    fn test_create_request_rejects_blank_interest() {
        let mut req = valid_request();
        req.minat.push(" ".to_string());
        assert!(validate_create_request(&req).is_err());
    }

    #[test]
    fn test_check_npm() {
        assert_eq!(check_npm("714230051").unwrap(), 714230051);
        assert_eq!(check_npm("abc").unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(check_npm("-1").unwrap_err().message(), "NPM must be a positive number");
    }
}
