//! Validated JSON extractor
//!
//! Deserializes a JSON body and runs its `validator` rules before the handler
//! sees it.
//!
//! # Example
//!
//! ```rust,no_run
//! use shop_dashboard::extractors::ValidatedJson;
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Debug, Deserialize, Validate)]
//! struct Rename {
//!     #[validate(length(min = 1))]
//!     title: String,
//! }
//!
//! async fn rename(ValidatedJson(body): ValidatedJson<Rename>) -> String {
//!     body.title
//! }
//! ```

use crate::error::ShopError;
use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Validated JSON extractor
///
/// Rejects with [`ShopError::MalformedBody`] (400) when the body is not valid
/// JSON for `T`, and with [`ShopError::Validation`] (422) when it parses but
/// breaks a validation rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync + 'static,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ShopError::MalformedBody(rejection.body_text()))?;

        data.validate()?;

        Ok(Self(data))
    }
}

/// Format validation errors for display
///
/// Converts `validator::ValidationErrors` into one line per failure.
#[must_use]
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = error.message.as_ref().map_or_else(
                || format!("{field}: {}", error.code),
                ToString::to_string,
            );
            messages.push(message);
        }
    }

    messages.sort();
    messages.join("\n")
}

/// Validation errors as a JSON object keyed by field
#[must_use]
pub fn validation_errors_json(errors: &validator::ValidationErrors) -> serde_json::Value {
    let mut error_map = serde_json::Map::new();

    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|error| {
                error.message.as_ref().map_or_else(
                    || error.code.to_string(),
                    ToString::to_string,
                )
            })
            .collect();

        error_map.insert(field.to_string(), serde_json::json!(messages));
    }

    serde_json::json!({
        "errors": error_map
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::IntoResponse,
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(range(exclusive_min = 0.0))]
        hours: f64,
    }

    async fn test_handler(ValidatedJson(body): ValidatedJson<TestBody>) -> String {
        format!("{} {}", body.name, body.hours)
    }

    fn json_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body() {
        let app = Router::new().route("/", post(test_handler));
        let response = app
            .oneshot(json_request(r#"{"name":"Sam","hours":1.5}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_value() {
        let app = Router::new().route("/", post(test_handler));
        let response = app
            .oneshot(json_request(r#"{"name":"","hours":1.5}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_zero_hours_rejected() {
        let app = Router::new().route("/", post(test_handler));
        let response = app
            .oneshot(json_request(r#"{"name":"Sam","hours":0}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let app = Router::new().route("/", post(test_handler));
        let response = app.oneshot(json_request("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_format_validation_errors() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "title",
            validator::ValidationError::new("blank")
                .with_message(std::borrow::Cow::Borrowed("Title is required")),
        );
        errors.add("quotedHours", validator::ValidationError::new("range"));

        let formatted = format_validation_errors(&errors);
        assert_eq!(formatted, "Title is required\nquotedHours: range");
    }

    #[test]
    fn test_validation_errors_json() {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "title",
            validator::ValidationError::new("blank")
                .with_message(std::borrow::Cow::Borrowed("Title is required")),
        );

        let json = validation_errors_json(&errors);
        assert_eq!(json["errors"]["title"][0], "Title is required");
    }

    #[test]
    fn test_rejection_renders_as_error() {
        let response = ShopError::MalformedBody("missing field".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
