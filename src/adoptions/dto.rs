use serde::{Deserialize, Serialize};

use super::repo_types::AdoptionRequest;

#[derive(Debug, Default, Deserialize)]
pub struct AdoptBody {
    pub message: Option<String>,
}

/// `?pet_id=` may be present but empty, which means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerRequestsQuery {
    #[serde(default)]
    pub pet_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestResponse {
    pub message: String,
    pub request: AdoptionRequest,
}
