//! Request-body extraction that keeps rejections inside the error envelope.

use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Drop-in replacement for `axum::Json`. A missing or malformed field comes
/// back as a 400 with the usual `{"error"}` body instead of axum's
/// plain-text 422.
#[derive(Debug, Clone, Copy)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use quaddash_types::api::CreateOrderRequest;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_required_field_is_a_validation_error() {
        let req = json_request(r#"{"amount": 5.0, "dining_hall": "Houston Market"}"#);
        let err = match Json::<CreateOrderRequest>::from_request(req, &()).await {
            Err(e) => e,
            Ok(_) => panic!("deserialization should fail without a dorm"),
        };
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let req = json_request("{not json");
        assert!(matches!(
            Json::<CreateOrderRequest>::from_request(req, &()).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn well_formed_body_passes_through() {
        let req = json_request(
            r#"{"amount": 5.0, "dining_hall": "Houston Market", "dorm": "Harnwell College House"}"#,
        );
        let Json(parsed) = Json::<CreateOrderRequest>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(parsed.amount, 5.0);
    }
}
