use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::{
    error::ApiError,
    extractor::{payload::ApiPayload, validated::Validated, Extractor},
    state::ApiState,
    store::{BookRecord, SanitizedBookDetails},
};

#[derive(Debug, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBookRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub family_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub genre_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub book_title: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|value| value.trim().to_owned())
}

impl NewBookRequest {
    fn into_sanitized(self) -> SanitizedBookDetails {
        SanitizedBookDetails {
            family_name: self.family_name,
            first_name: self.first_name,
            genre_name: self.genre_name,
            book_title: self.book_title,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewBookResponse {
    #[serde(flatten)]
    pub book: BookRecord,
}

impl IntoResponse for NewBookResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Creates a book for an author and a genre that already exist in the store.
///
/// The rate limit middleware and the validating extractor have already run by
/// the time this is invoked. Every store failure collapses to the same
/// 500 response with the error text escaped.
pub async fn new_book(
    State(state): State<ApiState>,
    Validated(payload): Validated<ApiPayload<NewBookRequest>>,
) -> Result<NewBookResponse, ApiError> {
    let details = payload.into_extracted().into_sanitized();

    let book = state
        .store()
        .save_book_of_existing_author_and_genre(details)
        .await?;

    Ok(NewBookResponse { book })
}
