use axum::{
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthUser;

#[derive(Debug, Serialize)]
pub struct Landing {
    pub message: &'static str,
    pub signup: &'static str,
    pub login: &'static str,
    pub adoption_info: &'static str,
}

/// Signed-in callers go straight to the catalog.
pub async fn home(user: Option<AuthUser>) -> Response {
    match user {
        Some(_) => Redirect::to("/explore/").into_response(),
        None => Json(Landing {
            message: "Find a new friend, or a new home for yours.",
            signup: "/signup/",
            login: "/login/",
            adoption_info: "/adoption-info/",
        })
        .into_response(),
    }
}
