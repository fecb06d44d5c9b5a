use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::member::{Member, MemberId};

/// A lending group: co-liable members with one designated leader.
///
/// Always holds at least one member and the leader is always one of them;
/// every constructor and mutator (and deserialization) checks this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GroupRecord")]
pub struct Group {
    group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    leader_id: MemberId,
    members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contract_read_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRecord {
    group_id: String,
    #[serde(default)]
    name: Option<String>,
    leader_id: MemberId,
    members: Vec<Member>,
    #[serde(default)]
    contract_read_at: Option<DateTime<Utc>>,
}

impl TryFrom<GroupRecord> for Group {
    type Error = DomainError;

    fn try_from(record: GroupRecord) -> Result<Self, Self::Error> {
        let mut group = Group::new(record.group_id, record.members, record.leader_id)?;
        group.name = record.name;
        group.contract_read_at = record.contract_read_at;
        Ok(group)
    }
}

impl Group {
    pub fn new(
        group_id: impl Into<String>,
        members: Vec<Member>,
        leader_id: MemberId,
    ) -> Result<Self, DomainError> {
        if members.is_empty() {
            return Err(DomainError::EmptyGroup);
        }
        for (index, member) in members.iter().enumerate() {
            if members[..index].iter().any(|earlier| earlier.id == member.id) {
                return Err(DomainError::DuplicateMember(member.id));
            }
        }
        if !members.iter().any(|member| member.id == leader_id) {
            return Err(DomainError::LeaderNotMember(leader_id));
        }

        Ok(Self {
            group_id: group_id.into(),
            name: None,
            leader_id,
            members,
            contract_read_at: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Display name, falling back to the group id.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.group_id)
    }

    pub fn leader_id(&self) -> MemberId {
        self.leader_id
    }

    pub fn leader(&self) -> &Member {
        self.members
            .iter()
            .find(|member| member.id == self.leader_id)
            .unwrap_or(&self.members[0])
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member(&self, member_id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == member_id)
    }

    pub fn member_mut(&mut self, member_id: MemberId) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id == member_id)
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Member> {
        self.members.iter_mut()
    }

    pub fn add_member(&mut self, member: Member) -> Result<(), DomainError> {
        if self.member(member.id).is_some() {
            return Err(DomainError::DuplicateMember(member.id));
        }
        self.members.push(member);
        Ok(())
    }

    /// Removes a non-leader member. The leader (and so the last remaining
    /// member) cannot be removed.
    pub fn remove_member(&mut self, member_id: MemberId) -> Result<Member, DomainError> {
        if member_id == self.leader_id {
            return Err(DomainError::RemoveLeader(member_id));
        }
        let index = self
            .members
            .iter()
            .position(|member| member.id == member_id)
            .ok_or(DomainError::UnknownMember(member_id))?;
        Ok(self.members.remove(index))
    }

    pub fn set_leader(&mut self, member_id: MemberId) -> Result<(), DomainError> {
        if self.member(member_id).is_none() {
            return Err(DomainError::LeaderNotMember(member_id));
        }
        self.leader_id = member_id;
        Ok(())
    }

    pub fn contract_read_at(&self) -> Option<DateTime<Utc>> {
        self.contract_read_at
    }

    /// Records the first full read of the contract; later reads keep the
    /// original timestamp.
    pub fn mark_contract_read(&mut self, at: DateTime<Utc>) {
        self.contract_read_at.get_or_insert(at);
    }

    pub fn all_signed(&self) -> bool {
        self.members.iter().all(Member::is_signed)
    }
}
