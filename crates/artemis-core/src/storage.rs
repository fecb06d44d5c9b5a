use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;
use crate::proposal::ProposalPayload;
use crate::workflow::{Decision, DecisionOutcome, DecisionRequest, ProposalStage, WorkflowError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedProposal {
    pub proposal_id: String,
    pub stage: ProposalStage,
    pub submitted_at: DateTime<Utc>,
    pub payload: ProposalPayload,
}

impl SubmittedProposal {
    pub fn new(
        proposal_id: impl Into<String>,
        payload: ProposalPayload,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            proposal_id: proposal_id.into(),
            stage: ProposalStage::DocReview,
            submitted_at,
            payload,
        }
    }

    pub fn receipt(&self) -> SubmissionReceipt {
        SubmissionReceipt {
            proposal_id: self.proposal_id.clone(),
            stage: self.stage,
            submitted_at: self.submitted_at,
        }
    }

    /// Queue row for the review screens. Evidence counts are derived from the
    /// payload each time, so a change to the requirement rules shows up on
    /// proposals that were already submitted.
    pub fn summary(&self) -> ProposalSummary {
        let (required, completed) =
            self.payload
                .members
                .iter()
                .fold((0, 0), |(required, completed), member| {
                    (
                        required + member.evidence_required_count(),
                        completed + member.evidence_completed_count(),
                    )
                });

        ProposalSummary {
            proposal_id: self.proposal_id.clone(),
            group_id: self.payload.group_id.clone(),
            leader_name: self.payload.leader_name.clone(),
            members_count: self.payload.members.len(),
            total_amount: self.payload.total_amount,
            submitted_at: self.submitted_at,
            stage: self.stage,
            evidence_required_count: required,
            evidence_completed_count: completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub proposal_id: String,
    pub group_id: String,
    pub leader_name: String,
    pub members_count: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub stage: ProposalStage,
    pub evidence_required_count: u32,
    pub evidence_completed_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDetail {
    pub proposal_id: String,
    pub stage: ProposalStage,
    pub submitted_at: DateTime<Utc>,
    pub payload: ProposalPayload,
    /// Oldest first.
    pub decisions: Vec<Decision>,
}

impl ProposalDetail {
    pub fn new(proposal: SubmittedProposal, decisions: Vec<Decision>) -> Self {
        Self {
            proposal_id: proposal.proposal_id,
            stage: proposal.stage,
            submitted_at: proposal.submitted_at,
            payload: proposal.payload,
            decisions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub proposal_id: String,
    pub stage: ProposalStage,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEntry {
    pub stage: ProposalStage,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl PipelineEntry {
    /// One entry per stage, in workflow order, including empty stages.
    pub fn tally(proposals: impl IntoIterator<Item = (ProposalStage, Decimal)>) -> Vec<Self> {
        let mut entries: Vec<Self> = ProposalStage::ALL
            .into_iter()
            .map(|stage| Self {
                stage,
                count: 0,
                total_amount: Decimal::ZERO,
            })
            .collect();

        for (stage, amount) in proposals {
            if let Some(entry) = entries.iter_mut().find(|entry| entry.stage == stage) {
                entry.count += 1;
                entry.total_amount += amount;
            }
        }

        entries
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("proposal {proposal_id} was already submitted")]
    Duplicate { proposal_id: String },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Server-side store of submitted proposals and their decision log.
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Persists a validated payload at `DOC_REVIEW`.
    async fn submit(
        &self,
        proposal_id: &str,
        payload: ProposalPayload,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, RepositoryError>;

    /// Proposals at `stage`, most recently submitted first.
    async fn list_by_stage(
        &self,
        stage: ProposalStage,
    ) -> Result<Vec<ProposalSummary>, RepositoryError>;

    async fn get(&self, proposal_id: &str) -> Result<Option<ProposalDetail>, RepositoryError>;

    /// Validates the decision against the current stage, then appends it
    /// and moves the proposal in one atomic step. Nothing is written when
    /// the decision is refused.
    async fn record_decision(
        &self,
        proposal_id: &str,
        request: DecisionRequest,
        decided_at: DateTime<Utc>,
    ) -> Result<DecisionOutcome, RepositoryError>;

    async fn pipeline(&self) -> Result<Vec<PipelineEntry>, RepositoryError>;
}
