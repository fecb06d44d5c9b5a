use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::DomainError;

/// Back-office review stage of a submitted proposal.
///
/// ```text
/// DOC_REVIEW --approve--> RISK_REVIEW --approve--> APPROVED
///     |                        |
///     +--------reject----------+-------------------> REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStage {
    DocReview,
    RiskReview,
    Approved,
    Rejected,
}

impl ProposalStage {
    pub const ALL: [ProposalStage; 4] = [
        ProposalStage::DocReview,
        ProposalStage::RiskReview,
        ProposalStage::Approved,
        ProposalStage::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStage::DocReview => "DOC_REVIEW",
            ProposalStage::RiskReview => "RISK_REVIEW",
            ProposalStage::Approved => "APPROVED",
            ProposalStage::Rejected => "REJECTED",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, ProposalStage::Approved | ProposalStage::Rejected)
    }
}

impl fmt::Display for ProposalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStage {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        ProposalStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownStage(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionKind {
    Approve,
    Reject,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::Approve => "APPROVE",
            DecisionKind::Reject => "REJECT",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "APPROVE" => Ok(DecisionKind::Approve),
            "REJECT" => Ok(DecisionKind::Reject),
            _ => Err(DomainError::invalid("decision", format!("unknown decision '{value}'"))),
        }
    }
}

/// Workflow violations. Each carries the stages involved so the caller can
/// resynchronize before retrying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("proposal {proposal_id} not found")]
    NotFound { proposal_id: String },
    #[error("proposal is at {current}, decision was made for {attempted}")]
    StageMismatch {
        current: ProposalStage,
        attempted: ProposalStage,
    },
    #[error("proposal is already final with stage {current}")]
    AlreadyFinal { current: ProposalStage },
    #[error("cannot {decision} a proposal at {current}")]
    InvalidTransition {
        current: ProposalStage,
        decision: DecisionKind,
    },
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "NOT_FOUND",
            WorkflowError::StageMismatch { .. } => "STAGE_MISMATCH",
            WorkflowError::AlreadyFinal { .. } => "ALREADY_FINAL",
            WorkflowError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }

    pub fn current_stage(&self) -> Option<ProposalStage> {
        match self {
            WorkflowError::NotFound { .. } => None,
            WorkflowError::StageMismatch { current, .. }
            | WorkflowError::AlreadyFinal { current }
            | WorkflowError::InvalidTransition { current, .. } => Some(*current),
        }
    }

    pub fn attempted_stage(&self) -> Option<ProposalStage> {
        match self {
            WorkflowError::StageMismatch { attempted, .. } => Some(*attempted),
            _ => None,
        }
    }
}

/// Stage reached by applying `decision` at `current`.
pub fn next_stage(
    current: ProposalStage,
    decision: DecisionKind,
) -> Result<ProposalStage, WorkflowError> {
    match (current, decision) {
        (ProposalStage::DocReview | ProposalStage::RiskReview, DecisionKind::Reject) => {
            Ok(ProposalStage::Rejected)
        }
        (ProposalStage::DocReview, DecisionKind::Approve) => Ok(ProposalStage::RiskReview),
        (ProposalStage::RiskReview, DecisionKind::Approve) => Ok(ProposalStage::Approved),
        (ProposalStage::Approved | ProposalStage::Rejected, _) => {
            Err(WorkflowError::InvalidTransition { current, decision })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: ProposalStage,
    pub to: ProposalStage,
    pub decision: DecisionKind,
}

/// Checks a reviewer's decision against the proposal's current stage.
///
/// Final proposals are reported as such before the stage comparison: a
/// request can only name a review stage, so comparing first would hide the
/// real reason.
pub fn plan_decision(
    current: ProposalStage,
    requested: ProposalStage,
    decision: DecisionKind,
) -> Result<StageTransition, WorkflowError> {
    if current.is_final() {
        return Err(WorkflowError::AlreadyFinal { current });
    }
    if requested != current {
        return Err(WorkflowError::StageMismatch {
            current,
            attempted: requested,
        });
    }

    Ok(StageTransition {
        from: current,
        to: next_stage(current, decision)?,
        decision,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub stage: ProposalStage,
    pub decision: DecisionKind,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub user_id: String,
}

impl DecisionRequest {
    /// Normalizes free-text fields and requires a reviewer id. The stage is
    /// checked against the proposal by [`plan_decision`].
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.user_id = self.user_id.trim().to_string();
        if self.user_id.is_empty() {
            return Err(DomainError::invalid("userId", "userId is required"));
        }

        self.reasons = self
            .reasons
            .into_iter()
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
            .collect();
        self.comment = self
            .comment
            .map(|comment| comment.trim().to_string())
            .filter(|comment| !comment.is_empty());

        Ok(self)
    }
}

/// Immutable record of one reviewer decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub decision_id: Uuid,
    pub proposal_id: String,
    pub stage: ProposalStage,
    pub decision: DecisionKind,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Decision {
    pub fn record(
        proposal_id: impl Into<String>,
        request: DecisionRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            proposal_id: proposal_id.into(),
            stage: request.stage,
            decision: request.decision,
            reasons: request.reasons,
            comment: request.comment,
            user_id: request.user_id,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub decision_id: Uuid,
    pub previous_stage: ProposalStage,
    pub new_stage: ProposalStage,
    pub decision: DecisionKind,
}
