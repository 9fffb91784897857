use axum::{extract::State, Json};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::AppResult,
    pets::{repo, repo_types::PetCounts},
    state::AppState,
};

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<PetCounts>> {
    Ok(Json(repo::counts(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adoptions::{repo_types::RequestStatus, services as adoptions};
    use crate::pets::services::tests::{named_pet, user};

    #[tokio::test]
    async fn counts_follow_approvals() {
        let st = AppState::fake().await;
        assert_eq!(
            repo::counts(&st.db).await.unwrap(),
            PetCounts { total_pets: 0, available_pets: 0, adopted_pets: 0 }
        );

        let alice = user(&st, "alice").await;
        let bob = user(&st, "bob").await;
        let rex = named_pet(&st, alice, "Rex").await;
        named_pet(&st, alice, "Fido").await;
        let req = adoptions::request_adoption(&st, rex.id, bob, None).await.unwrap();
        adoptions::decide(&st, req.id, alice, RequestStatus::Approved).await.unwrap();

        let Json(counts) = dashboard(State(st.clone()), AuthUser(bob)).await.unwrap();
        assert_eq!(
            counts,
            PetCounts { total_pets: 2, available_pets: 1, adopted_pets: 1 }
        );
    }
}
