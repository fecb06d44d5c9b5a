use std::collections::HashMap;

use artemis_core::{
    Decision, DecisionOutcome, DecisionRequest, PipelineEntry, ProposalDetail, ProposalPayload,
    ProposalRepository, ProposalStage, ProposalSummary, RepositoryError, SubmissionReceipt,
    SubmittedProposal, WorkflowError, plan_decision,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    proposals: HashMap<String, SubmittedProposal>,
    decisions: Vec<Decision>,
}

/// Proposal repository kept in process memory. A single lock guards both
/// the proposals and the decision log, so a decision and its stage change
/// are always observed together.
#[derive(Default)]
pub struct InMemoryProposalRepository {
    state: RwLock<State>,
}

impl InMemoryProposalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn submit(
        &self,
        proposal_id: &str,
        payload: ProposalPayload,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        payload.validate()?;

        let mut state = self.state.write().await;
        if state.proposals.contains_key(proposal_id) {
            return Err(RepositoryError::Duplicate {
                proposal_id: proposal_id.to_string(),
            });
        }

        let proposal = SubmittedProposal::new(proposal_id, payload, submitted_at);
        let receipt = proposal.receipt();
        state.proposals.insert(proposal_id.to_string(), proposal);
        Ok(receipt)
    }

    async fn list_by_stage(
        &self,
        stage: ProposalStage,
    ) -> Result<Vec<ProposalSummary>, RepositoryError> {
        let state = self.state.read().await;
        let mut summaries: Vec<ProposalSummary> = state
            .proposals
            .values()
            .filter(|proposal| proposal.stage == stage)
            .map(SubmittedProposal::summary)
            .collect();
        summaries.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| a.proposal_id.cmp(&b.proposal_id))
        });
        Ok(summaries)
    }

    async fn get(&self, proposal_id: &str) -> Result<Option<ProposalDetail>, RepositoryError> {
        let state = self.state.read().await;
        let Some(proposal) = state.proposals.get(proposal_id) else {
            return Ok(None);
        };

        let decisions = state
            .decisions
            .iter()
            .filter(|decision| decision.proposal_id == proposal_id)
            .cloned()
            .collect();
        Ok(Some(ProposalDetail::new(proposal.clone(), decisions)))
    }

    async fn record_decision(
        &self,
        proposal_id: &str,
        request: DecisionRequest,
        decided_at: DateTime<Utc>,
    ) -> Result<DecisionOutcome, RepositoryError> {
        let request = request.validate()?;

        let mut state = self.state.write().await;
        let proposal =
            state
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| WorkflowError::NotFound {
                    proposal_id: proposal_id.to_string(),
                })?;

        let transition = plan_decision(proposal.stage, request.stage, request.decision)?;
        proposal.stage = transition.to;

        let decision = Decision::record(proposal_id, request, decided_at);
        let outcome = DecisionOutcome {
            decision_id: decision.decision_id,
            previous_stage: transition.from,
            new_stage: transition.to,
            decision: transition.decision,
        };
        state.decisions.push(decision);
        Ok(outcome)
    }

    async fn pipeline(&self) -> Result<Vec<PipelineEntry>, RepositoryError> {
        let state = self.state.read().await;
        Ok(PipelineEntry::tally(state.proposals.values().map(|proposal| {
            (proposal.stage, proposal.payload.total_amount)
        })))
    }
}
