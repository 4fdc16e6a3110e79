//! Request guard applied in front of every patient route.

use crate::AppState;
use api_shared::{AuthDecision, MessageRes};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

/// Rejects the request with 401 unless the bearer credential checks out.
///
/// On success the caller's [`api_shared::Identity`] is attached to the request extensions.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = state.credentials.check(
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );

    match decision {
        AuthDecision::Authorized(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthDecision::Denied => {
            tracing::warn!(
                "rejected unauthenticated {} {}",
                request.method(),
                request.uri().path()
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(MessageRes::new("Unauthorized")),
            )
                .into_response()
        }
    }
}
