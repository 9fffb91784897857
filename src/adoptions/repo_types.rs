use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [RequestStatus::Pending, RequestStatus::Approved, RequestStatus::Rejected]
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown request status {:?}", s))
    }
}

/// Request row joined with its pet and requester.
#[derive(Debug, Clone, FromRow)]
pub struct AdoptionRequestRow {
    pub id: i64,
    pub pet_id: i64,
    pub pet_name: String,
    pub pet_owner_id: i64,
    pub user_id: i64,
    pub requester_username: String,
    pub message: Option<String>,
    pub status: String,
    pub request_date: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdoptionRequest {
    pub id: i64,
    pub pet_id: i64,
    pub pet_name: String,
    pub pet_owner_id: i64,
    pub user_id: i64,
    pub requester_username: String,
    pub message: Option<String>,
    pub status: RequestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub request_date: OffsetDateTime,
}

impl TryFrom<AdoptionRequestRow> for AdoptionRequest {
    type Error = anyhow::Error;

    fn try_from(r: AdoptionRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            pet_id: r.pet_id,
            pet_name: r.pet_name,
            pet_owner_id: r.pet_owner_id,
            user_id: r.user_id,
            requester_username: r.requester_username,
            message: r.message,
            status: r.status.parse()?,
            request_date: r.request_date,
        })
    }
}
