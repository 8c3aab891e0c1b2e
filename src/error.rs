use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::From;
use serde::Serialize;

use crate::{store::StoreError, utils::escape_angle_brackets};

/// Body returned for every rate-limited request.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

#[derive(Debug, Serialize)]
struct ApiErrorResponse {
    #[serde(flatten)]
    error: ApiError,
    message: &'static str,
}

#[derive(Debug, From, Serialize)]
#[serde(tag = "error_type", content = "error")]
/// API error
pub enum ApiError {
    /// Internal server error
    ///
    /// This error is returned when an internal server error occurs.
    InternalServerError(InternalServerError),
    /// Body error
    ///
    /// This error is returned when the body is not as expected.
    Body(BodyError),
    /// Validation error
    ///
    /// This error is returned when the body was parsed but its fields are not
    /// as expected.
    Validation(ValidationError),
    /// Rate limited
    ///
    /// This error is returned when a client has sent too many requests within
    /// the limiter window. Rendered as the fixed plain-text limiter message.
    RateLimited(RateLimitedError),
    /// Create book error
    ///
    /// This error is returned when the store failed to create a book. Rendered
    /// as plain text with angle brackets escaped.
    CreateBook(CreateBookError),
    /// Method not allowed
    ///
    /// This error is returned when the method is not allowed.
    MethodNotAllowed(MethodNotAllowedError),
    /// Not found error
    ///
    /// This error is returned when the requested resource is not found.
    NotFound(NotFoundError),
}

impl ApiError {
    fn message(&self) -> &'static str {
        match self {
            ApiError::InternalServerError(_) => "An internal server error has occurred",
            ApiError::Body(_) => "Failed to parse request body",
            ApiError::Validation(_) => "Request body failed validation",
            ApiError::RateLimited(_) => RATE_LIMIT_MESSAGE,
            ApiError::CreateBook(_) => "Error creating book",
            ApiError::MethodNotAllowed(_) => "Method not allowed",
            ApiError::NotFound(_) => "The requested resource was not found",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InternalServerError(err) => err.status_code(),
            ApiError::Body(err) => err.status_code(),
            ApiError::Validation(err) => err.status_code(),
            ApiError::RateLimited(err) => err.status_code(),
            ApiError::CreateBook(err) => err.status_code(),
            ApiError::MethodNotAllowed(err) => err.status_code(),
            ApiError::NotFound(err) => err.status_code(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::CreateBook(CreateBookError::new(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // These two carry an exact plain-text body contract.
            ApiError::RateLimited(err) => err.into_response(),
            ApiError::CreateBook(err) => err.into_response(),
            error => {
                let status_code = error.status_code();
                let message = error.message();

                (status_code, Json(ApiErrorResponse { error, message })).into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InternalServerError {}

impl InternalServerError {
    pub fn from_generic_error<E: Into<anyhow::Error>>(err: E) -> Self {
        let err: anyhow::Error = err.into();
        let err = format!("{err:#}");
        tracing::error!(%err, "Internal server error");

        InternalServerError {}
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Debug, Serialize)]
pub struct BodyError {
    pub body_error_reason: String,
    pub body_expected_schema: String,
}

impl BodyError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationError {
    validation_errors: validator::ValidationErrors,
}

impl ValidationError {
    pub fn from_validation_errors(validation_errors: validator::ValidationErrors) -> Self {
        ValidationError { validation_errors }
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Debug, Serialize)]
pub struct RateLimitedError {}

impl RateLimitedError {
    pub fn new() -> Self {
        RateLimitedError {}
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }
}

impl Default for RateLimitedError {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for RateLimitedError {
    fn into_response(self) -> Response {
        (self.status_code(), RATE_LIMIT_MESSAGE).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct CreateBookError {
    #[serde(skip)]
    message: String,
}

impl CreateBookError {
    pub fn new(err: StoreError) -> Self {
        let message = err.to_string();
        tracing::error!(%message, "Error creating book");

        CreateBookError { message }
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for CreateBookError {
    fn into_response(self) -> Response {
        let body = format!("Error creating book: {}", escape_angle_brackets(&self.message));

        (self.status_code(), body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct MethodNotAllowedError {}

impl MethodNotAllowedError {
    pub fn new() -> Self {
        MethodNotAllowedError {}
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::METHOD_NOT_ALLOWED
    }
}

impl Default for MethodNotAllowedError {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct NotFoundError {}

impl NotFoundError {
    pub fn new() -> Self {
        NotFoundError {}
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }
}

impl Default for NotFoundError {
    fn default() -> Self {
        Self::new()
    }
}
