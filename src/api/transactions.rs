//! Payment endpoints.
//!
//! Creating a transaction confirms its booking. Both writes share one
//! database transaction, so a payment never exists for a booking that is
//! still pending.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    BookingStatus, CreateTransactionRequest, DbPool, PaymentMethod, Transaction,
    TransactionCreatedResponse, TransactionStatus,
};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extractors::ApiJson;
use super::validation::{validate_one_of, validate_positive, validate_uuid};
use super::{check_id, timed};

/// Ways a booking confirmation can fail
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("Booking not found")]
    BookingNotFound,

    #[error("Booking is not pending (current status: {0})")]
    NotPending(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<ConfirmError> for ApiError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::BookingNotFound => ApiError::not_found(err.to_string()),
            ConfirmError::NotPending(_) => ApiError::bad_request(err.to_string()),
            ConfirmError::Database(e) => ApiError::from(e),
        }
    }
}

/// Record a paid transaction and move its booking from pending to confirmed.
///
/// The guarded update runs first so the write lock is taken before anything
/// is read; concurrent payments for one booking queue on the busy timeout and
/// all but the first see a non-pending booking. Nothing is persisted unless
/// both writes succeed.
pub async fn confirm_booking(
    pool: &DbPool,
    booking_id: &str,
    method: PaymentMethod,
    total: f64,
) -> Result<Transaction, ConfirmError> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().to_rfc3339();

    let updated = sqlx::query(
        "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(BookingStatus::Confirmed.as_str())
    .bind(&now)
    .bind(booking_id)
    .bind(BookingStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        // Only tells a missing booking from one in the wrong state; dropping
        // `tx` rolls back
        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM bookings WHERE id = ?")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?;
        return Err(match status {
            Some((status,)) => ConfirmError::NotPending(status),
            None => ConfirmError::BookingNotFound,
        });
    }

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        booking_id: booking_id.to_string(),
        method: method.as_str().to_string(),
        total,
        status: TransactionStatus::Paid.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO transactions (id, booking_id, method, total, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.booking_id)
    .bind(&transaction.method)
    .bind(transaction.total)
    .bind(&transaction.status)
    .bind(&transaction.created_at)
    .bind(&transaction.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(transaction)
}

fn validate_create_request(req: &CreateTransactionRequest) -> Result<PaymentMethod, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("booking_id", validate_uuid(&req.booking_id, "booking_id"))
        .check("method", validate_one_of(&req.method, "method", &PaymentMethod::ALL))
        .check("total", validate_positive(req.total, "total"));
    errors.finish()?;

    req.method
        .parse()
        .map_err(|e: String| ApiError::validation_field("method", e))
}

/// Pay for a pending booking
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionCreatedResponse>), ApiError> {
    let method = validate_create_request(&req)?;

    let transaction = timed(
        &state,
        confirm_booking(&state.db, &req.booking_id, method, req.total),
    )
    .await
    .inspect_err(|e| {
        tracing::warn!(booking_id = %req.booking_id, error = %e, "Booking confirmation failed");
    })?;

    tracing::info!(
        transaction_id = %transaction.id,
        booking_id = %transaction.booking_id,
        method = %transaction.method,
        "Booking confirmed"
    );

    Ok((
        StatusCode::CREATED,
        Json(TransactionCreatedResponse {
            message: "Payment recorded, booking confirmed".to_string(),
            transaction,
        }),
    ))
}

/// List all transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let transactions = timed(
        &state,
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY created_at DESC")
            .fetch_all(&state.db),
    )
    .await?;

    Ok(Json(transactions))
}

/// Get a transaction by ID
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    check_id(&id, "id")?;

    let transaction = timed(
        &state,
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = ?")
            .bind(&id)
            .fetch_optional(&state.db),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Transaction not found"))?;

    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    async fn insert_booking(pool: &DbPool, status: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO bookings (id, client_id, photographer_id, date, location, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(Uuid::new_v4().to_string())
        .bind(Uuid::new_v4().to_string())
        .bind("2024-06-01T03:00:00+00:00")
        .bind("Dago, Bandung")
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn booking_status(pool: &DbPool, id: &str) -> String {
        let (status,): (String,) = sqlx::query_as("SELECT status FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
        status
    }

    async fn transaction_count(pool: &DbPool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_confirm_pending_booking() {
        let pool = memory_pool().await;
        let booking_id = insert_booking(&pool, "pending").await;

        let trx = confirm_booking(&pool, &booking_id, PaymentMethod::Transfer, 750000.0)
            .await
            .unwrap();

        assert_eq!(trx.status, "paid");
        assert_eq!(trx.method, "transfer");
        assert_eq!(trx.booking_id, booking_id);
        assert_eq!(booking_status(&pool, &booking_id).await, "confirmed");
        assert_eq!(transaction_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_confirm_twice_fails_without_side_effects() {
        let pool = memory_pool().await;
        let booking_id = insert_booking(&pool, "pending").await;

        confirm_booking(&pool, &booking_id, PaymentMethod::Ewallet, 100.0)
            .await
            .unwrap();
        let err = confirm_booking(&pool, &booking_id, PaymentMethod::Ewallet, 100.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfirmError::NotPending(ref s) if s == "confirmed"));
        assert_eq!(transaction_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_confirm_done_booking_is_rejected() {
        let pool = memory_pool().await;
        let booking_id = insert_booking(&pool, "done").await;

        let err = confirm_booking(&pool, &booking_id, PaymentMethod::Transfer, 10.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfirmError::NotPending(_)));
        assert_eq!(booking_status(&pool, &booking_id).await, "done");
        assert_eq!(transaction_count(&pool).await, 0);
        assert_eq!(ApiError::from(err).status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_confirm_missing_booking_is_not_found() {
        let pool = memory_pool().await;
        let err = confirm_booking(&pool, &Uuid::new_v4().to_string(), PaymentMethod::Transfer, 10.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ConfirmError::BookingNotFound));
        assert_eq!(ApiError::from(err).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_confirmations_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::DatabaseConfig {
            url: Some(format!(
                "sqlite://{}?mode=rwc",
                dir.path().join("fotografi.db").display()
            )),
            max_connections: 8,
            ..Default::default()
        };
        let pool = crate::db::init(&config).await.unwrap();

        let mut bookings = Vec::new();
        for _ in 0..10 {
            bookings.push(insert_booking(&pool, "pending").await);
        }

        let mut handles = Vec::new();
        for booking_id in &bookings {
            for _ in 0..5 {
                let pool = pool.clone();
                let booking_id = booking_id.clone();
                handles.push(tokio::spawn(async move {
                    confirm_booking(&pool, &booking_id, PaymentMethod::Transfer, 100.0).await
                }));
            }
        }

        let mut paid = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => paid += 1,
                Err(ConfirmError::NotPending(status)) => {
                    assert_eq!(status, "confirmed");
                    rejected += 1;
                }
                Err(e) => panic!("confirmation failed with a storage error: {e}"),
            }
        }

        assert_eq!(paid, 10);
        assert_eq!(rejected, 40);
        assert_eq!(transaction_count(&pool).await, 10);
        for booking_id in &bookings {
            assert_eq!(booking_status(&pool, booking_id).await, "confirmed");
        }
    }

    #[test]
    fn test_validate_create_request() {
        let req = CreateTransactionRequest {
            booking_id: Uuid::new_v4().to_string(),
            method: "ewallet".to_string(),
            total: 250000.0,
        };
        assert_eq!(validate_create_request(&req).unwrap(), PaymentMethod::Ewallet);

        let req = CreateTransactionRequest {
            booking_id: Uuid::new_v4().to_string(),
            method: "cash".to_string(),
            total: 0.0,
        };
        let err = validate_create_request(&req).unwrap_err();
        assert!(err.message().contains("2 fields"));
    }
}
