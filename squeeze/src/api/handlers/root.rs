use crate::api::models::compress::CompressResponse;
use crate::errors::Error;
use axum::Json;

/// Welcome payload. Also answers every path no other route claims.
#[utoipa::path(
    get,
    path = "/",
    tag = "info",
    summary = "Service info",
    responses(
        (status = 200, description = "Welcome message", body = CompressResponse)
    )
)]
pub async fn welcome() -> Json<CompressResponse> {
    Json(CompressResponse::welcome())
}

/// Fallback for verbs a route does not accept
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}
