//! Request extractors that reject with [`ApiError`] instead of axum's plain-text rejections.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// JSON body extractor.
///
/// Missing content type, syntax errors and type mismatches all become a
/// 400 `bad_request` in the usual error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        total: f64,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_is_extracted() {
        let request = json_request(r#"{"total": 12.5}"#);
        let ApiJson(payload) = ApiJson::<Payload>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(payload.total, 12.5);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_bad_request() {
        let err = ApiJson::<Payload>::from_request(json_request(r#"{"total": "lots"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_syntax_error_and_missing_content_type_are_bad_request() {
        let err = ApiJson::<Payload>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"total": 1}"#))
            .unwrap();
        let err = ApiJson::<Payload>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
