//! Route definitions for the document intake form.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::intake;
use crate::state::AppState;

/// Routes mounted at the root.
///
/// ```text
/// GET    /          -> upload_form
/// POST   /upload    -> upload
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(intake::upload_form))
        .route("/upload", post(intake::upload))
}
