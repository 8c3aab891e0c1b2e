use std::fmt::Debug;

use axum::{
    async_trait,
    extract::{Form, FromRequest, Json as AxumJson, Request},
    http::header::CONTENT_TYPE,
};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, BodyError, InternalServerError};

use super::Extractor;

/// An extractor that rejects with an [`ApiError`].
///
/// Extracts the request body as JSON or as an url-encoded form, depending on
/// the `Content-Type` header, consuming the request.
pub struct ApiPayload<T>(pub T);

impl<T> Extractor for ApiPayload<T> {
    type Extracted = T;

    fn extracted(&self) -> &Self::Extracted {
        &self.0
    }

    fn into_extracted(self) -> Self::Extracted {
        self.0
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ApiPayload<T>
where
    T: DeserializeOwned + JsonSchema + Debug + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[tracing::instrument(name = "payload_extractor", skip_all)]
    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_ascii_lowercase()
            })
            .unwrap_or_default();

        let extracted = match content_type.as_str() {
            "application/json" => AxumJson::<T>::from_request(req, state)
                .await
                .map(|json| json.0)
                .map_err(|rejection| rejection.body_text()),
            "application/x-www-form-urlencoded" => Form::<T>::from_request(req, state)
                .await
                .map(|form| form.0)
                .map_err(|rejection| rejection.body_text()),
            other => Err(format!("Unsupported content type: `{other}`")),
        };

        match extracted {
            Ok(payload) => {
                tracing::trace!(?payload, "Extracted");

                Ok(ApiPayload(payload))
            }
            Err(body_error_reason) => {
                tracing::warn!(reason = %body_error_reason, "Rejection");

                let body_expected_schema = serde_yaml::to_string(&schema_for!(T))
                    .map_err(InternalServerError::from_generic_error)?;

                Err(BodyError {
                    body_error_reason,
                    body_expected_schema,
                }
                .into())
            }
        }
    }
}
