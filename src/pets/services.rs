use tracing::{info, warn};

use super::form::PetForm;
use super::repo;
use super::repo_types::{Pet, PetRow};
use crate::error::{AppError, AppResult};
use crate::images::services::{discard_image, presign_image, upload_pet_image};
use crate::pets::dto::PetView;
use crate::state::AppState;

fn to_pets(rows: Vec<PetRow>) -> AppResult<Vec<Pet>> {
    rows.into_iter()
        .map(|r| Pet::try_from(r).map_err(AppError::from))
        .collect()
}

/// Trimmed search text, or None when the caller asked for everything.
fn normalize_query(query: &str) -> Option<&str> {
    Some(query.trim()).filter(|q| !q.is_empty())
}

pub async fn search(st: &AppState, query: &str, owner_id: Option<i64>) -> AppResult<Vec<Pet>> {
    to_pets(repo::search(&st.db, normalize_query(query), owner_id).await?)
}

/// Public read.
pub async fn get_pet(st: &AppState, pet_id: i64) -> AppResult<Pet> {
    let row = repo::get(&st.db, pet_id).await?.ok_or(AppError::NotFound("Pet"))?;
    Ok(Pet::try_from(row)?)
}

/// Owner-scoped read. Missing and not-yours are the same answer.
pub async fn get_owned_pet(st: &AppState, pet_id: i64, owner_id: i64) -> AppResult<Pet> {
    let row = repo::get_owned(&st.db, pet_id, owner_id)
        .await?
        .ok_or(AppError::NotFound("Pet"))?;
    Ok(Pet::try_from(row)?)
}

pub async fn create_pet(st: &AppState, owner_id: i64, form: PetForm) -> AppResult<Pet> {
    let (attrs, image) = form.validate(true)?;
    let image = image.ok_or_else(|| AppError::field("image", "This field is required."))?;

    let key = upload_pet_image(st, owner_id, image).await?;
    let pet_id = match repo::insert(&st.db, owner_id, &attrs, &key).await {
        Ok(id) => id,
        Err(e) => {
            discard_image(st, &key).await;
            return Err(e.into());
        }
    };

    info!(pet_id, owner_id, name = %attrs.name, "pet created");
    get_pet(st, pet_id).await
}

pub async fn update_pet(st: &AppState, pet_id: i64, owner_id: i64, form: PetForm) -> AppResult<Pet> {
    let current = get_owned_pet(st, pet_id, owner_id).await?;
    let (attrs, image) = form.validate(false)?;

    let new_key = match image {
        Some(img) => Some(upload_pet_image(st, owner_id, img).await?),
        None => None,
    };
    let key = new_key.as_deref().unwrap_or(&current.image);

    let updated = match repo::update(&st.db, pet_id, owner_id, &attrs, key).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(k) = &new_key {
                discard_image(st, k).await;
            }
            return Err(e.into());
        }
    };
    if !updated {
        // deleted between the lookup and the update
        if let Some(k) = &new_key {
            discard_image(st, k).await;
        }
        return Err(AppError::NotFound("Pet"));
    }
    if new_key.is_some() {
        discard_image(st, &current.image).await;
    }

    info!(pet_id, owner_id, "pet updated");
    get_pet(st, pet_id).await
}

pub async fn delete_pet(st: &AppState, pet_id: i64, owner_id: i64) -> AppResult<()> {
    let key = repo::delete(&st.db, pet_id, owner_id)
        .await?
        .ok_or(AppError::NotFound("Pet"))?;
    discard_image(st, &key).await;
    info!(pet_id, owner_id, "pet deleted");
    Ok(())
}

pub async fn to_view(st: &AppState, pet: Pet) -> PetView {
    let image_url = match presign_image(st, &pet.image).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, pet_id = pet.id, "presign pet image failed");
            None
        }
    };
    PetView {
        status: pet.status(),
        id: pet.id,
        name: pet.name,
        category: pet.category,
        age: pet.age,
        breed: pet.breed,
        description: pet.description,
        image: pet.image,
        image_url,
        available: pet.available,
        owner_id: pet.owner_id,
        owner_username: pet.owner_username,
        contact_email: pet.contact_email,
        adopted: pet.adopted,
        approved: pet.approved,
        created_at: pet.created_at,
    }
}

pub async fn to_views(st: &AppState, pets: Vec<Pet>) -> Vec<PetView> {
    let mut out = Vec::with_capacity(pets.len());
    for pet in pets {
        out.push(to_view(st, pet).await);
    }
    out
}
