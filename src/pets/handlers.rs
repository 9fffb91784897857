use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{DeletedPetResponse, ExploreResponse, PetView, SearchQuery, SearchResponse};
use super::form::PetForm;
use super::services;
use crate::{auth::AuthUser, error::AppResult, state::AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/explore/", get(explore))
        .route("/adoption-info/", get(adoption_info))
        .route("/my-pets/", get(my_pets))
        .route("/pet/:id/", get(pet_details))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/add-pet/", post(add_pet))
        .route("/edit-pet/:id/", get(edit_pet_form).post(edit_pet))
        .route("/delete-pet/:id/", post(delete_pet))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn location(pet_id: i64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&format!("/pet/{}/", pet_id)) {
        headers.insert(header::LOCATION, v);
    }
    headers
}

/// All pets (optionally filtered) plus the caller's own.
#[instrument(skip(state))]
pub async fn explore(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<ExploreResponse>> {
    let pets = services::search(&state, &params.q, None).await?;
    let user_pets = services::search(&state, "", Some(user_id)).await?;
    Ok(Json(ExploreResponse {
        pets: services::to_views(&state, pets).await,
        user_pets: services::to_views(&state, user_pets).await,
        query: params.q,
    }))
}

#[instrument(skip(state))]
pub async fn adoption_info(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let pets = services::search(&state, &params.q, None).await?;
    Ok(Json(SearchResponse {
        pets: services::to_views(&state, pets).await,
        query: params.q,
    }))
}

#[instrument(skip(state))]
pub async fn my_pets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<PetView>>> {
    let pets = services::search(&state, "", Some(user_id)).await?;
    Ok(Json(services::to_views(&state, pets).await))
}

#[instrument(skip(state))]
pub async fn pet_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PetView>> {
    let pet = services::get_pet(&state, id).await?;
    Ok(Json(services::to_view(&state, pet).await))
}

/// POST /add-pet/ (multipart: name, category, age, breed, description, contact_email, image)
#[instrument(skip(state, mp))]
pub async fn add_pet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Multipart,
) -> AppResult<(StatusCode, HeaderMap, Json<PetView>)> {
    let form = PetForm::from_multipart(mp).await?;
    let pet = services::create_pet(&state, user_id, form).await?;
    Ok((
        StatusCode::CREATED,
        location(pet.id),
        Json(services::to_view(&state, pet).await),
    ))
}

/// Current values for the edit form; owner only.
#[instrument(skip(state))]
pub async fn edit_pet_form(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<PetView>> {
    let pet = services::get_owned_pet(&state, id, user_id).await?;
    Ok(Json(services::to_view(&state, pet).await))
}

#[instrument(skip(state, mp))]
pub async fn edit_pet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> AppResult<Json<PetView>> {
    let form = PetForm::from_multipart(mp).await?;
    let pet = services::update_pet(&state, id, user_id, form).await?;
    Ok(Json(services::to_view(&state, pet).await))
}

#[instrument(skip(state))]
pub async fn delete_pet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<DeletedPetResponse>> {
    let pet = services::get_owned_pet(&state, id, user_id).await?;
    services::delete_pet(&state, id, user_id).await?;
    Ok(Json(DeletedPetResponse {
        id,
        message: format!("{} has been deleted successfully.", pet.name),
    }))
}
