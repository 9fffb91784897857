use tracing::{info, warn};

use super::repo;
use super::repo_types::{AdoptionRequest, AdoptionRequestRow, RequestStatus};
use crate::error::{AppError, AppResult, DomainError};
use crate::pets::{self, repo_types::Pet};
use crate::state::AppState;

fn to_requests(rows: Vec<AdoptionRequestRow>) -> AppResult<Vec<AdoptionRequest>> {
    rows.into_iter()
        .map(|r| AdoptionRequest::try_from(r).map_err(AppError::from))
        .collect()
}

fn invalid_decision(raw: &str) -> AppError {
    AppError::field(
        "status",
        format!("{} is not a valid decision; use Approved or Rejected.", raw),
    )
}

/// Only the two outcomes an owner can pick.
pub fn parse_decision(raw: &str) -> AppResult<RequestStatus> {
    match raw.parse::<RequestStatus>() {
        Ok(s @ (RequestStatus::Approved | RequestStatus::Rejected)) => Ok(s),
        _ => Err(invalid_decision(raw)),
    }
}

/// Files a pending request. Availability, ownership and duplicate checks run in
/// the same transaction as the insert.
pub async fn request_adoption(
    st: &AppState,
    pet_id: i64,
    requester_id: i64,
    message: Option<&str>,
) -> AppResult<AdoptionRequest> {
    let message = message.map(str::trim).filter(|m| !m.is_empty());

    let mut tx = st.db.begin().await?;
    let pet = pets::repo::get(&mut *tx, pet_id)
        .await?
        .ok_or(AppError::NotFound("Pet"))?;

    if !pet.available {
        warn!(pet_id, requester_id, "adoption requested for unavailable pet");
        return Err(DomainError::PetUnavailable.into());
    }
    if pet.owner_id == requester_id {
        warn!(pet_id, requester_id, "owner tried to adopt own pet");
        return Err(DomainError::OwnPet.into());
    }
    if repo::exists_for_pair_tx(&mut tx, pet_id, requester_id).await? {
        warn!(pet_id, requester_id, "duplicate adoption request");
        return Err(DomainError::DuplicateRequest.into());
    }

    let id = repo::insert_tx(&mut tx, pet_id, requester_id, message).await?;
    let row = repo::get(&mut *tx, id)
        .await?
        .ok_or(AppError::NotFound("Adoption request"))?;
    tx.commit().await?;

    info!(request_id = id, pet_id, requester_id, "adoption requested");
    Ok(AdoptionRequest::try_from(row)?)
}

pub async fn list_by_requester(st: &AppState, user_id: i64) -> AppResult<Vec<AdoptionRequest>> {
    to_requests(repo::list_by_requester(&st.db, user_id).await?)
}

/// Pending requests on the owner's pets. A `pet_id` the owner does not own
/// yields nothing.
pub async fn list_for_owner(
    st: &AppState,
    owner_id: i64,
    pet_id: Option<i64>,
) -> AppResult<Vec<AdoptionRequest>> {
    to_requests(repo::list_pending_for_owner(&st.db, owner_id, pet_id).await?)
}

pub async fn list_adopted_pets(st: &AppState, user_id: i64) -> AppResult<Vec<Pet>> {
    repo::list_adopted_pets(&st.db, user_id)
        .await?
        .into_iter()
        .map(|r| Pet::try_from(r).map_err(AppError::from))
        .collect()
}

/// Owner's verdict on a pending request. Approval also takes the pet off the
/// market and rejects every other request on it, atomically. Decided requests
/// are final.
pub async fn decide(
    st: &AppState,
    request_id: i64,
    decider_id: i64,
    decision: RequestStatus,
) -> AppResult<AdoptionRequest> {
    if decision == RequestStatus::Pending {
        return Err(invalid_decision(decision.as_str()));
    }

    let mut tx = st.db.begin().await?;
    let current = repo::get(&mut *tx, request_id)
        .await?
        .ok_or(AppError::NotFound("Adoption request"))?;

    if current.pet_owner_id != decider_id {
        warn!(request_id, decider_id, "non-owner tried to decide adoption request");
        return Err(AppError::Forbidden(
            "You are not authorized to update this request.".into(),
        ));
    }

    if current.status != RequestStatus::Pending.as_str() {
        warn!(request_id, decider_id, status = %current.status, "adoption request already decided");
        return Err(DomainError::AlreadyDecided.into());
    }

    repo::set_status_tx(&mut tx, request_id, decision).await?;
    if decision == RequestStatus::Approved {
        pets::repo::mark_unavailable_tx(&mut tx, current.pet_id).await?;
        let rejected = repo::reject_siblings_tx(&mut tx, current.pet_id, request_id).await?;
        info!(request_id, pet_id = current.pet_id, rejected, "sibling requests rejected");
    }

    let row = repo::get(&mut *tx, request_id)
        .await?
        .ok_or(AppError::NotFound("Adoption request"))?;
    tx.commit().await?;

    info!(request_id, pet_id = current.pet_id, status = %decision, "adoption request decided");
    Ok(AdoptionRequest::try_from(row)?)
}
