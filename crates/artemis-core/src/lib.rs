pub mod completion;
pub mod contract;
pub mod error;
pub mod evidence;
pub mod group;
pub mod loan;
pub mod member;
pub mod proposal;
pub mod storage;
pub mod workflow;

pub use completion::{
    CompletionResult, Filled, MIN_GROUP_MEMBERS, MissingField, Page, fields_per_member,
    is_proposal_complete, is_proposal_complete_with_evidence, member_completion,
    member_completion_with_evidence, member_evidence_completion, missing_evidence,
    missing_fields, page_completion, proposal_completion, proposal_completion_with_evidence,
    proposal_completion_with_evidence_min_clients, proposal_completion_with_min_clients,
};
pub use contract::{
    ContractError, ContractSession, ContractSignature, ContractState, MemberGaps,
    ProposalSubmitter, RepositorySubmitter,
};
pub use error::DomainError;
pub use evidence::{
    BASE_REQUIRED_EVIDENCE, EvidenceCategory, EvidenceItem, EvidenceKey, MemberEvidence,
    required_evidence_keys,
};
pub use group::Group;
pub use loan::{FieldError, LoanBook, LoanDetails, LoanGoal, LoanType, validate_loan_terms};
pub use member::{BusinessData, Member, MemberId, PersonalData, ProfitAndLoss};
pub use proposal::{DraftProposal, DraftStatus, PayloadMember, ProposalPayload};
pub use storage::{
    PipelineEntry, ProposalDetail, ProposalRepository, ProposalSummary, RepositoryError,
    SubmissionReceipt, SubmittedProposal,
};
pub use workflow::{
    Decision, DecisionKind, DecisionOutcome, DecisionRequest, ProposalStage, StageTransition,
    WorkflowError, next_stage, plan_decision,
};
