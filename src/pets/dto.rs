use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::Category;

#[derive(Debug, Clone, Serialize)]
pub struct PetView {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub age: i64,
    pub breed: String,
    pub description: String,
    pub image: String,
    pub image_url: Option<String>,
    pub available: bool,
    pub status: &'static str,
    pub owner_id: i64,
    pub owner_username: String,
    pub contact_email: Option<String>,
    pub adopted: bool,
    pub approved: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ExploreResponse {
    pub pets: Vec<PetView>,
    pub user_pets: Vec<PetView>,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub pets: Vec<PetView>,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedPetResponse {
    pub id: i64,
    pub message: String,
}
