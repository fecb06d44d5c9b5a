use artemis_core::ProposalPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProposalRequest {
    pub proposal_id: String,
    pub payload: ProposalPayload,
}

/// `stage` stays a raw string so a missing or unknown value can be reported
/// as a validation error instead of a query rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListProposalsQuery {
    pub stage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
