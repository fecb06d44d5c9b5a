//! HTTP surface for proposal submission and the back-office review gate.

use std::sync::Arc;

use artemis_core::{
    DecisionOutcome, DecisionRequest, DomainError, PipelineEntry, ProposalDetail,
    ProposalRepository, ProposalStage, ProposalSummary, SubmissionReceipt,
};
use artemis_platform::{HealthResponse, ListProposalsQuery, SubmitProposalRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tracing::info;

pub mod error;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    repository: Arc<dyn ProposalRepository>,
}

impl AppState {
    pub fn new(repository: Arc<dyn ProposalRepository>) -> Self {
        Self { repository }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/proposals/submit", post(submit_proposal))
        .route("/api/gate/proposals", get(list_proposals))
        .route("/api/gate/proposals/{proposal_id}", get(get_proposal))
        .route(
            "/api/gate/proposals/{proposal_id}/decision",
            post(submit_decision),
        )
        .route("/api/gate/pipeline", get(pipeline))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn submit_proposal(
    State(state): State<AppState>,
    body: Result<Json<SubmitProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), ApiError> {
    let Json(request) = body?;
    let proposal_id = request.proposal_id.trim();
    if proposal_id.is_empty() {
        return Err(ApiError::Validation(
            "proposalId must not be empty".to_string(),
        ));
    }

    let receipt = state
        .repository
        .submit(proposal_id, request.payload, Utc::now())
        .await?;
    info!(
        proposal_id = %receipt.proposal_id,
        stage = %receipt.stage,
        "proposal submitted"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_proposals(
    State(state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> Result<Json<Vec<ProposalSummary>>, ApiError> {
    let Some(raw) = query.stage.as_deref().filter(|raw| !raw.trim().is_empty()) else {
        return Err(ApiError::Validation(
            "stage query parameter is required".to_string(),
        ));
    };
    let stage: ProposalStage = raw
        .parse()
        .map_err(|err: DomainError| ApiError::Validation(err.to_string()))?;

    Ok(Json(state.repository.list_by_stage(stage).await?))
}

async fn get_proposal(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
) -> Result<Json<ProposalDetail>, ApiError> {
    state
        .repository
        .get(&proposal_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("proposal {proposal_id} not found")))
}

async fn submit_decision(
    State(state): State<AppState>,
    Path(proposal_id): Path<String>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DecisionOutcome>), ApiError> {
    let Json(request) = body?;
    let outcome = state
        .repository
        .record_decision(&proposal_id, request, Utc::now())
        .await?;
    info!(
        proposal_id = %proposal_id,
        decision = %outcome.decision,
        from = %outcome.previous_stage,
        to = %outcome.new_stage,
        "decision recorded"
    );
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn pipeline(State(state): State<AppState>) -> Result<Json<Vec<PipelineEntry>>, ApiError> {
    Ok(Json(state.repository.pipeline().await?))
}
