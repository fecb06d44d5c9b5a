use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::completion::{
    CompletionResult, is_proposal_complete_with_evidence, missing_evidence, missing_fields,
    proposal_completion_with_evidence_min_clients,
};
use crate::contract::MemberGaps;
use crate::error::DomainError;
use crate::evidence::{MemberEvidence, required_evidence_keys};
use crate::group::Group;
use crate::loan::{LoanBook, LoanDetails, LoanGoal};
use crate::member::{Member, MemberId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    #[default]
    OnGoing,
    UnderEvaluation,
}

/// A proposal being assembled by a loan officer, before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftProposal {
    pub id: String,
    pub group_id: String,
    pub leader_name: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub group: Group,
    #[serde(default)]
    pub loan_details: LoanBook,
}

impl DraftProposal {
    pub fn from_group(id: impl Into<String>, group: Group, now: DateTime<Utc>) -> Self {
        let mut draft = Self {
            id: id.into(),
            group_id: String::new(),
            leader_name: String::new(),
            total_amount: Decimal::ZERO,
            status: DraftStatus::OnGoing,
            created_at: now,
            updated_at: now,
            group,
            loan_details: LoanBook::new(),
        };
        draft.refresh_summary(now);
        draft
    }

    /// Re-derives the header fields from the group after an edit.
    pub fn refresh_summary(&mut self, now: DateTime<Utc>) {
        self.group_id = self.group.group_id().to_string();
        self.leader_name = self.group.leader().full_name();
        self.total_amount = self
            .group
            .members()
            .iter()
            .filter_map(|member| member.personal.requested_amount)
            .sum();
        self.updated_at = now;
    }

    pub fn loan_details(&self, member_id: MemberId) -> Option<&LoanDetails> {
        self.loan_details.get(&member_id)
    }

    /// Loan terms for `member_id`, created empty on first access.
    pub fn loan_details_mut(&mut self, member_id: MemberId) -> &mut LoanDetails {
        self.loan_details.entry(member_id).or_default()
    }

    /// Removes a member together with their loan terms.
    pub fn remove_member(&mut self, member_id: MemberId) -> Result<Member, DomainError> {
        let member = self.group.remove_member(member_id)?;
        self.loan_details.remove(&member_id);
        Ok(member)
    }

    pub fn completion(&self) -> CompletionResult {
        proposal_completion_with_evidence_min_clients(&self.group, &self.loan_details)
    }

    pub fn is_complete(&self) -> bool {
        is_proposal_complete_with_evidence(&self.group, &self.loan_details)
    }

    /// Members with at least one missing field or photo.
    pub fn gaps(&self) -> Vec<MemberGaps> {
        self.group
            .members()
            .iter()
            .filter_map(|member| {
                let loan = self.loan_details(member.id);
                let gaps = MemberGaps {
                    member_id: member.id,
                    name: member.full_name(),
                    missing_fields: missing_fields(member, loan),
                    missing_evidence: missing_evidence(member, loan),
                };
                (!gaps.is_empty()).then_some(gaps)
            })
            .collect()
    }

    pub fn is_submitted(&self) -> bool {
        self.status == DraftStatus::UnderEvaluation
    }
}

/// Member entry of a submitted proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMember {
    #[serde(deserialize_with = "text_or_number")]
    pub member_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub loan_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_goal: Option<String>,
    #[serde(default, skip_serializing_if = "MemberEvidence::is_empty")]
    pub evidence: MemberEvidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_photos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl PayloadMember {
    /// Goals the resolver does not recognize fall back to the base
    /// requirement.
    pub fn loan_goal(&self) -> Option<LoanGoal> {
        self.loan_goal.as_deref().and_then(|goal| goal.parse().ok())
    }

    pub fn evidence_required_count(&self) -> u32 {
        required_evidence_keys(self.loan_goal()).len() as u32
    }

    /// Photos present for required keys. Payloads that only carry the flat
    /// photo list are credited one required key per non-empty photo.
    pub fn evidence_completed_count(&self) -> u32 {
        let required = required_evidence_keys(self.loan_goal());
        if !self.evidence.is_empty() {
            return self.evidence.count_present(&required);
        }

        let photos = self
            .evidence_photos
            .iter()
            .flatten()
            .filter(|photo| !photo.trim().is_empty())
            .count();
        photos.min(required.len()) as u32
    }

    fn from_member(member: &Member, loan: Option<&LoanDetails>) -> Self {
        let loan_amount = loan
            .and_then(|details| details.loan_value)
            .or(member.personal.requested_amount)
            .unwrap_or(Decimal::ZERO);
        let photos: Vec<String> = member
            .evidence
            .iter()
            .filter(|(_, item)| item.is_present())
            .map(|(_, item)| item.uri.clone())
            .collect();

        Self {
            member_id: member.id.to_string(),
            name: member.full_name(),
            phone: member.personal.contact1_number.clone(),
            id_number: member.personal.document_number.clone(),
            loan_amount,
            loan_goal: loan
                .and_then(|details| details.loan_goal)
                .map(|goal| goal.label().to_string()),
            evidence: member.evidence.clone(),
            evidence_photos: (!photos.is_empty()).then_some(photos),
            signature: member
                .signature
                .as_ref()
                .map(|signature| signature.data_url.clone()),
        }
    }
}

/// The package accepted by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPayload {
    pub group_id: String,
    pub group_name: String,
    pub leader_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_phone: Option<String>,
    pub members: Vec<PayloadMember>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_photos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<serde_json::Value>,
}

impl ProposalPayload {
    /// Builds the submission package from a draft. The whole draft travels
    /// along as `formData` for the back office.
    pub fn from_draft(
        draft: &DraftProposal,
        contract_text: Option<String>,
    ) -> serde_json::Result<Self> {
        let leader = draft.group.leader();
        let members: Vec<PayloadMember> = draft
            .group
            .members()
            .iter()
            .map(|member| PayloadMember::from_member(member, draft.loan_details(member.id)))
            .collect();
        let total_amount = members.iter().map(|member| member.loan_amount).sum();

        Ok(Self {
            group_id: draft.group_id.clone(),
            group_name: draft.group.name().to_string(),
            leader_name: leader.full_name(),
            leader_phone: leader.personal.contact1_number.clone(),
            members,
            total_amount,
            contract_text,
            evidence_photos: None,
            form_data: Some(serde_json::to_value(draft)?),
        })
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("groupId", &self.group_id)?;
        require_text("groupName", &self.group_name)?;
        require_text("leaderName", &self.leader_name)?;
        if self.total_amount.is_sign_negative() {
            return Err(DomainError::invalid("totalAmount", "must not be negative"));
        }
        if self.members.is_empty() {
            return Err(DomainError::invalid("members", "at least one member is required"));
        }

        let mut seen = HashSet::new();
        for (index, member) in self.members.iter().enumerate() {
            require_text(&format!("members[{index}].memberId"), &member.member_id)?;
            require_text(&format!("members[{index}].name"), &member.name)?;
            if member.loan_amount.is_sign_negative() {
                return Err(DomainError::invalid(
                    format!("members[{index}].loanAmount"),
                    "must not be negative",
                ));
            }
            if !seen.insert(member.member_id.trim()) {
                return Err(DomainError::invalid(
                    format!("members[{index}].memberId"),
                    format!("duplicate member id '{}'", member.member_id),
                ));
            }
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::completion::fixtures::complete_group;
    use crate::contract::ContractSignature;
    use crate::evidence::EvidenceKey;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap()
    }

    fn complete_draft() -> DraftProposal {
        let (group, loans) = complete_group(3);
        let mut draft = DraftProposal::from_group("proposal-1", group, now());
        draft.loan_details = loans;
        draft
    }

    #[test]
    fn summary_follows_the_group() {
        let mut draft = complete_draft();
        assert_eq!(draft.group_id, "GRP-TEST");
        assert_eq!(draft.leader_name, "Member1 Santos");
        assert_eq!(draft.total_amount, Decimal::from(12_000));

        draft.group.set_leader(2).unwrap();
        draft.group.member_mut(3).unwrap().personal.requested_amount = None;
        let later = now() + chrono::Duration::minutes(3);
        draft.refresh_summary(later);

        assert_eq!(draft.leader_name, "Member2 Santos");
        assert_eq!(draft.total_amount, Decimal::from(8_000));
        assert_eq!(draft.updated_at, later);
        assert_eq!(draft.created_at, now());
    }

    #[test]
    fn loan_details_are_created_lazily() {
        let group = Group::new("g", vec![Member::new(1, "Ana", "Costa")], 1).unwrap();
        let mut draft = DraftProposal::from_group("p", group, now());
        assert!(draft.loan_details(1).is_none());

        draft.loan_details_mut(1).installments = Some(6);
        assert_eq!(draft.loan_details(1).unwrap().installments, Some(6));
    }

    #[test]
    fn removing_a_member_drops_their_terms() {
        let mut draft = complete_draft();
        draft.remove_member(3).unwrap();
        assert!(draft.loan_details(3).is_none());
        assert_eq!(draft.group.len(), 2);
        assert!(!draft.is_complete());
        assert!(draft.remove_member(1).is_err());
    }

    #[test]
    fn gaps_list_only_incomplete_members() {
        let mut draft = complete_draft();
        assert!(draft.is_complete());
        assert!(draft.gaps().is_empty());

        draft
            .group
            .member_mut(2)
            .unwrap()
            .evidence
            .remove(EvidenceKey::IdBack);
        let gaps = draft.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].member_id, 2);
        assert_eq!(gaps[0].missing_evidence, vec![EvidenceKey::IdBack]);
        assert!(gaps[0].missing_fields.is_empty());
    }

    #[test]
    fn payload_from_draft() {
        let mut draft = complete_draft();
        draft.group.member_mut(1).unwrap().signature = Some(ContractSignature {
            data_url: "data:image/png;base64,AAAA".to_string(),
            signed_at: now(),
            signer_name: "Member1 Santos".to_string(),
            loan_amount: Some(Decimal::from(4_000)),
            first_payment_date: None,
            installments: Some(10),
        });
        draft.loan_details_mut(2).loan_value = None;
        draft.loan_details_mut(3).loan_goal = Some(LoanGoal::Investment);

        let payload = ProposalPayload::from_draft(&draft, Some("terms".into())).unwrap();
        payload.validate().unwrap();

        assert_eq!(payload.group_name, "GRP-TEST");
        assert_eq!(payload.leader_phone.as_deref(), Some("(555) 234-5678"));
        assert_eq!(payload.members.len(), 3);
        assert_eq!(payload.members[0].member_id, "1");
        assert_eq!(
            payload.members[0].signature.as_deref(),
            Some("data:image/png;base64,AAAA")
        );
        // falls back to the requested amount
        assert_eq!(payload.members[1].loan_amount, Decimal::from(4_000));
        assert_eq!(payload.members[2].loan_goal.as_deref(), Some("Investment"));
        assert_eq!(payload.members[2].evidence_required_count(), 10);
        assert_eq!(payload.members[2].evidence_completed_count(), 10);
        assert_eq!(payload.total_amount, Decimal::from(12_000));
        assert_eq!(payload.form_data.as_ref().unwrap()["id"], "proposal-1");
    }

    #[test]
    fn payload_wire_format() {
        let payload: ProposalPayload = serde_json::from_value(json!({
            "groupId": "GRP-9",
            "groupName": "Market street",
            "leaderName": "Luci Machado",
            "totalAmount": 7500.5,
            "members": [
                { "memberId": 1, "name": "Luci Machado", "loanAmount": 5000, "loanGoal": "Equipment purchase" },
                { "memberId": "2", "name": "Carlos Santos", "loanAmount": 2500.5,
                  "evidencePhotos": ["a.jpg", "", "b.jpg"] }
            ]
        }))
        .unwrap();

        payload.validate().unwrap();
        assert_eq!(payload.total_amount, Decimal::new(75_005, 1));
        assert_eq!(payload.members[0].member_id, "1");
        assert_eq!(payload.members[0].loan_goal(), Some(LoanGoal::EquipmentPurchase));
        assert_eq!(payload.members[0].evidence_required_count(), 10);
        assert_eq!(payload.members[0].evidence_completed_count(), 0);
        assert_eq!(payload.members[1].evidence_required_count(), 9);
        assert_eq!(payload.members[1].evidence_completed_count(), 2);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["totalAmount"], json!(7500.5));
        assert!(value.get("contractText").is_none());
    }

    #[test]
    fn payload_validation() {
        let valid = ProposalPayload::from_draft(&complete_draft(), None).unwrap();

        let mut empty_members = valid.clone();
        empty_members.members.clear();
        assert!(empty_members.validate().is_err());

        let mut negative = valid.clone();
        negative.members[0].loan_amount = Decimal::from(-1);
        assert_eq!(
            negative.validate(),
            Err(DomainError::invalid("members[0].loanAmount", "must not be negative"))
        );

        let mut blank_group = valid.clone();
        blank_group.group_id = "  ".into();
        assert!(blank_group.validate().is_err());

        let mut duplicate = valid;
        duplicate.members[1].member_id = "1".into();
        assert!(duplicate.validate().is_err());
    }

    #[test]
    fn draft_round_trips_through_json() {
        let draft = complete_draft();
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["status"], "on_going");
        let back: DraftProposal = serde_json::from_value(value).unwrap();
        assert_eq!(back, draft);
    }
}
