use thiserror::Error;

use crate::member::MemberId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("a group needs at least one member")]
    EmptyGroup,
    #[error("leader {0} is not a member of the group")]
    LeaderNotMember(MemberId),
    #[error("member {0} already belongs to the group")]
    DuplicateMember(MemberId),
    #[error("member {0} is not part of the group")]
    UnknownMember(MemberId),
    #[error("member {0} leads the group; assign another leader before removing them")]
    RemoveLeader(MemberId),
    #[error("unknown loan goal '{0}'")]
    UnknownLoanGoal(String),
    #[error("unknown proposal stage '{0}'")]
    UnknownStage(String),
    #[error("optional insurance slot {0} does not exist")]
    InsuranceSlot(usize),
    #[error("{field}: {message}")]
    InvalidPayload { field: String, message: String },
}

impl DomainError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            field: field.into(),
            message: message.into(),
        }
    }
}
