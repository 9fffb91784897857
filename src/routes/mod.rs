pub mod dashboard;
pub mod home;

use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/dashboard/", get(dashboard::dashboard))
        .route("/health", get(|| async { "ok" }))
}
