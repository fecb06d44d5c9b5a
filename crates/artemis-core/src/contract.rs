//! Contract reading, member signatures and the one-shot submission gate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::completion::{MIN_GROUP_MEMBERS, MissingField};
use crate::error::DomainError;
use crate::evidence::EvidenceKey;
use crate::member::MemberId;
use crate::proposal::{DraftProposal, DraftStatus, ProposalPayload};
use crate::storage::{ProposalRepository, SubmissionReceipt};

/// A member's signature together with the terms they signed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSignature {
    pub data_url: String,
    pub signed_at: DateTime<Utc>,
    pub signer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractState {
    Incomplete,
    ReadingContract,
    /// Read, but signatures or the acknowledgement are still outstanding.
    AwaitingSignatures,
    ReadyToSubmit,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberGaps {
    pub member_id: MemberId,
    pub name: String,
    pub missing_fields: Vec<MissingField>,
    pub missing_evidence: Vec<EvidenceKey>,
}

impl MemberGaps {
    pub fn is_empty(&self) -> bool {
        self.missing_fields.is_empty() && self.missing_evidence.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ContractError {
    #[error(
        "proposal is incomplete: {} member(s) with gaps, {members_needed} more member(s) needed",
        .gaps.len()
    )]
    Incomplete {
        gaps: Vec<MemberGaps>,
        members_needed: usize,
    },
    #[error("the contract has to be read before signing")]
    ContractUnread,
    #[error("signature of member {0} is empty")]
    EmptySignature(MemberId),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("proposal is not ready to submit (state: {0:?})")]
    NotReady(ContractState),
    #[error("proposal was already submitted")]
    AlreadySubmitted,
    #[error("submission failed: {0:#}")]
    Submission(anyhow::Error),
    #[error("could not build the submission payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Delivers a finished payload to the back office.
#[async_trait]
pub trait ProposalSubmitter: Send + Sync {
    async fn submit(
        &self,
        proposal_id: &str,
        payload: ProposalPayload,
    ) -> anyhow::Result<SubmissionReceipt>;
}

/// Submits straight into a [`ProposalRepository`].
pub struct RepositorySubmitter<R: ?Sized> {
    repository: Arc<R>,
}

impl<R: ?Sized> RepositorySubmitter<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R> ProposalSubmitter for RepositorySubmitter<R>
where
    R: ProposalRepository + ?Sized,
{
    async fn submit(
        &self,
        proposal_id: &str,
        payload: ProposalPayload,
    ) -> anyhow::Result<SubmissionReceipt> {
        Ok(self
            .repository
            .submit(proposal_id, payload, Utc::now())
            .await?)
    }
}

/// Drives one draft from contract reading to submission.
///
/// A session can only be opened on a complete draft; it owns the draft until
/// [`ContractSession::into_draft`] hands it back for persisting.
#[derive(Debug)]
pub struct ContractSession {
    draft: DraftProposal,
    acknowledged: bool,
}

impl ContractSession {
    pub fn enter(draft: DraftProposal) -> Result<Self, ContractError> {
        if draft.is_submitted() {
            return Err(ContractError::AlreadySubmitted);
        }
        if !draft.is_complete() {
            return Err(ContractError::Incomplete {
                gaps: draft.gaps(),
                members_needed: MIN_GROUP_MEMBERS.saturating_sub(draft.group.len()),
            });
        }

        Ok(Self {
            draft,
            acknowledged: false,
        })
    }

    pub fn draft(&self) -> &DraftProposal {
        &self.draft
    }

    pub fn into_draft(self) -> DraftProposal {
        self.draft
    }

    pub fn state(&self) -> ContractState {
        if self.draft.is_submitted() {
            ContractState::Submitted
        } else if !self.draft.is_complete() {
            ContractState::Incomplete
        } else if self.draft.group.contract_read_at().is_none() {
            ContractState::ReadingContract
        } else if !self.acknowledged || !self.draft.group.all_signed() {
            ContractState::AwaitingSignatures
        } else {
            ContractState::ReadyToSubmit
        }
    }

    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        self.draft.group.mark_contract_read(now);
        self.draft.updated_at = now;
    }

    pub fn acknowledge(&mut self, accepted: bool) {
        self.acknowledged = accepted;
    }

    /// Stores `data_url` as the member's signature, snapshotting the loan
    /// terms they are signing for.
    pub fn sign(
        &mut self,
        member_id: MemberId,
        data_url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), ContractError> {
        if self.draft.is_submitted() {
            return Err(ContractError::AlreadySubmitted);
        }
        if self.draft.group.contract_read_at().is_none() {
            return Err(ContractError::ContractUnread);
        }
        let data_url = data_url.into();
        if data_url.trim().is_empty() {
            return Err(ContractError::EmptySignature(member_id));
        }

        let terms = self.draft.loan_details(member_id).cloned().unwrap_or_default();
        let member = self
            .draft
            .group
            .member_mut(member_id)
            .ok_or(DomainError::UnknownMember(member_id))?;
        member.signature = Some(ContractSignature {
            data_url,
            signed_at: now,
            signer_name: member.full_name(),
            loan_amount: terms.loan_value,
            first_payment_date: terms.first_payment_date,
            installments: terms.installments,
        });
        self.draft.updated_at = now;
        Ok(())
    }

    pub fn clear_signature(
        &mut self,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> Result<Option<ContractSignature>, ContractError> {
        if self.draft.is_submitted() {
            return Err(ContractError::AlreadySubmitted);
        }
        let member = self
            .draft
            .group
            .member_mut(member_id)
            .ok_or(DomainError::UnknownMember(member_id))?;
        let cleared = member.signature.take();
        self.draft.updated_at = now;
        Ok(cleared)
    }

    /// Sends the proposal once. A failed attempt leaves the session as it
    /// was so the caller can retry.
    pub async fn submit<S>(
        &mut self,
        submitter: &S,
        contract_text: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, ContractError>
    where
        S: ProposalSubmitter + ?Sized,
    {
        match self.state() {
            ContractState::ReadyToSubmit => {}
            ContractState::Submitted => return Err(ContractError::AlreadySubmitted),
            other => return Err(ContractError::NotReady(other)),
        }

        let payload = ProposalPayload::from_draft(&self.draft, contract_text)?;
        let receipt = submitter
            .submit(&self.draft.id, payload)
            .await
            .map_err(ContractError::Submission)?;

        self.draft.status = DraftStatus::UnderEvaluation;
        self.draft.updated_at = now;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;
    use crate::completion::fixtures::complete_group;
    use crate::workflow::ProposalStage;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap()
    }

    fn complete_draft() -> DraftProposal {
        let (group, loans) = complete_group(3);
        let mut draft = DraftProposal::from_group("proposal-7", group, now());
        draft.loan_details = loans;
        draft
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        fail: bool,
        sent: Mutex<Vec<(String, ProposalPayload)>>,
    }

    #[async_trait]
    impl ProposalSubmitter for RecordingSubmitter {
        async fn submit(
            &self,
            proposal_id: &str,
            payload: ProposalPayload,
        ) -> anyhow::Result<SubmissionReceipt> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            self.sent
                .lock()
                .unwrap()
                .push((proposal_id.to_string(), payload));
            Ok(SubmissionReceipt {
                proposal_id: proposal_id.to_string(),
                stage: ProposalStage::DocReview,
                submitted_at: now(),
            })
        }
    }

    fn signed_session() -> ContractSession {
        let mut session = ContractSession::enter(complete_draft()).unwrap();
        session.mark_read(now());
        for id in 1..=3 {
            session.sign(id, format!("data:image/png;base64,{id}"), now()).unwrap();
        }
        session.acknowledge(true);
        session
    }

    #[test]
    fn incomplete_draft_cannot_enter() {
        let mut draft = complete_draft();
        draft
            .group
            .member_mut(3)
            .unwrap()
            .evidence
            .remove(EvidenceKey::UtilityBillWater);

        match ContractSession::enter(draft) {
            Err(ContractError::Incomplete {
                gaps,
                members_needed,
            }) => {
                assert_eq!(members_needed, 0);
                assert_eq!(gaps.len(), 1);
                assert_eq!(gaps[0].member_id, 3);
                assert_eq!(gaps[0].missing_evidence, vec![EvidenceKey::UtilityBillWater]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn small_group_reports_missing_members() {
        let (group, loans) = complete_group(2);
        let mut draft = DraftProposal::from_group("p", group, now());
        draft.loan_details = loans;

        match ContractSession::enter(draft) {
            Err(ContractError::Incomplete {
                gaps,
                members_needed,
            }) => {
                assert!(gaps.is_empty());
                assert_eq!(members_needed, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn signing_requires_reading_first() {
        let mut session = ContractSession::enter(complete_draft()).unwrap();
        assert_eq!(session.state(), ContractState::ReadingContract);
        assert!(matches!(
            session.sign(1, "data:image/png;base64,x", now()),
            Err(ContractError::ContractUnread)
        ));

        session.mark_read(now());
        assert_eq!(session.state(), ContractState::AwaitingSignatures);
        assert!(matches!(
            session.sign(1, "   ", now()),
            Err(ContractError::EmptySignature(1))
        ));
        assert!(matches!(
            session.sign(9, "data:image/png;base64,x", now()),
            Err(ContractError::Domain(DomainError::UnknownMember(9)))
        ));
    }

    #[test]
    fn signature_snapshots_loan_terms() {
        let session = signed_session();
        let signature = session.draft().group.member(2).unwrap().signature.clone().unwrap();
        assert_eq!(signature.signer_name, "Member2 Santos");
        assert_eq!(signature.loan_amount, Some(Decimal::from(4_000)));
        assert_eq!(signature.installments, Some(10));
        assert_eq!(signature.first_payment_date, NaiveDate::from_ymd_opt(2026, 2, 15));
    }

    #[test]
    fn ready_needs_acknowledgement_and_every_signature() {
        let mut session = signed_session();
        assert_eq!(session.state(), ContractState::ReadyToSubmit);

        session.acknowledge(false);
        assert_eq!(session.state(), ContractState::AwaitingSignatures);
        session.acknowledge(true);

        let cleared = session.clear_signature(2, now()).unwrap();
        assert!(cleared.is_some());
        assert_eq!(session.state(), ContractState::AwaitingSignatures);
    }

    #[test]
    fn reopened_draft_keeps_contract_read() {
        let mut session = ContractSession::enter(complete_draft()).unwrap();
        session.mark_read(now());
        let draft = session.into_draft();

        let session = ContractSession::enter(draft).unwrap();
        assert_eq!(session.state(), ContractState::AwaitingSignatures);
    }

    #[tokio::test]
    async fn submit_is_one_shot() {
        let mut session = signed_session();
        let submitter = RecordingSubmitter::default();

        let receipt = session
            .submit(&submitter, Some("contract".into()), now())
            .await
            .unwrap();
        assert_eq!(receipt.proposal_id, "proposal-7");
        assert_eq!(session.state(), ContractState::Submitted);
        assert_eq!(session.draft().status, DraftStatus::UnderEvaluation);

        let sent = submitter.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.members.len(), 3);
        assert!(sent[0].1.members.iter().all(|member| member.signature.is_some()));

        assert!(matches!(
            session.submit(&submitter, None, now()).await,
            Err(ContractError::AlreadySubmitted)
        ));
        assert!(matches!(
            ContractSession::enter(session.into_draft()),
            Err(ContractError::AlreadySubmitted)
        ));
    }

    #[tokio::test]
    async fn failed_submission_changes_nothing() {
        let mut session = signed_session();
        let failing = RecordingSubmitter {
            fail: true,
            ..RecordingSubmitter::default()
        };

        let err = session.submit(&failing, None, now()).await.unwrap_err();
        assert!(matches!(err, ContractError::Submission(_)));
        assert_eq!(session.state(), ContractState::ReadyToSubmit);
        assert_eq!(session.draft().status, DraftStatus::OnGoing);

        let working = RecordingSubmitter::default();
        session.submit(&working, None, now()).await.unwrap();
        assert_eq!(session.state(), ContractState::Submitted);
    }

    #[tokio::test]
    async fn unsigned_proposal_is_not_submitted() {
        let mut session = ContractSession::enter(complete_draft()).unwrap();
        session.mark_read(now());
        session.acknowledge(true);
        let submitter = RecordingSubmitter::default();

        assert!(matches!(
            session.submit(&submitter, None, now()).await,
            Err(ContractError::NotReady(ContractState::AwaitingSignatures))
        ));
        assert!(submitter.sent.lock().unwrap().is_empty());
    }
}
