//! Signed-trigger extractor for Axum handlers.

use axum::body::Bytes;
use axum::extract::{FromRequest, OriginalUri, Request};
use vplan_core::error::CoreError;

use crate::auth::signature::SIGNATURE_HEADER;
use crate::error::AppError;
use crate::router::MAX_JSON_BODY_BYTES;
use crate::state::AppState;

/// A request whose signature has been verified.
///
/// The body is buffered once for hashing and handed to the handler, so it
/// stays available after verification:
///
/// ```ignore
/// async fn my_handler(trigger: SignedTrigger) -> AppResult<Json<()>> {
///     tracing::info!(url = %trigger.url, bytes = trigger.body.len(), "trigger accepted");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SignedTrigger {
    /// The raw request body.
    pub body: Bytes,
    /// The candidate URL the signature was issued for.
    pub url: String,
}

impl FromRequest<AppState> for SignedTrigger {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();

        let body = axum::body::to_bytes(body, MAX_JSON_BODY_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read request body: {e}")))?;

        let signature = parts
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());

        // Nested routers strip their prefix; sign against the full path.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let candidates = state.authenticator.candidate_urls(uri, &parts.headers);

        let verified = state
            .authenticator
            .verify(signature, &candidates, &body)
            .map_err(|e| AppError::Core(CoreError::Unauthorized(e.to_string())))?;

        Ok(SignedTrigger {
            body,
            url: verified.matched,
        })
    }
}
