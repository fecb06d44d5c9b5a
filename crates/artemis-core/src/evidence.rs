use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::loan::LoanGoal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvidenceKey {
    ClientSelfie,
    IdFront,
    IdBack,
    ResidenceProofOfAddress,
    BusinessProofOfAddress,
    BusinessPhoto,
    InventoryPhoto,
    UtilityBillElectricity,
    UtilityBillWater,
    RenovationPhoto,
    NewMachineryPhoto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Identity,
    BusinessExistence,
    Conditional,
}

impl EvidenceKey {
    pub const ALL: [EvidenceKey; 11] = [
        EvidenceKey::ClientSelfie,
        EvidenceKey::IdFront,
        EvidenceKey::IdBack,
        EvidenceKey::ResidenceProofOfAddress,
        EvidenceKey::BusinessProofOfAddress,
        EvidenceKey::BusinessPhoto,
        EvidenceKey::InventoryPhoto,
        EvidenceKey::UtilityBillElectricity,
        EvidenceKey::UtilityBillWater,
        EvidenceKey::RenovationPhoto,
        EvidenceKey::NewMachineryPhoto,
    ];

    pub fn category(self) -> EvidenceCategory {
        match self {
            EvidenceKey::ClientSelfie
            | EvidenceKey::IdFront
            | EvidenceKey::IdBack
            | EvidenceKey::ResidenceProofOfAddress => EvidenceCategory::Identity,
            EvidenceKey::BusinessProofOfAddress
            | EvidenceKey::BusinessPhoto
            | EvidenceKey::InventoryPhoto
            | EvidenceKey::UtilityBillElectricity
            | EvidenceKey::UtilityBillWater => EvidenceCategory::BusinessExistence,
            EvidenceKey::RenovationPhoto | EvidenceKey::NewMachineryPhoto => {
                EvidenceCategory::Conditional
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EvidenceKey::ClientSelfie => "Client selfie",
            EvidenceKey::IdFront => "ID front",
            EvidenceKey::IdBack => "ID back",
            EvidenceKey::ResidenceProofOfAddress => "Residence proof of address",
            EvidenceKey::BusinessProofOfAddress => "Business proof of address",
            EvidenceKey::BusinessPhoto => "Business photo",
            EvidenceKey::InventoryPhoto => "Inventory photo",
            EvidenceKey::UtilityBillElectricity => "Utility bill (electricity)",
            EvidenceKey::UtilityBillWater => "Utility bill (water)",
            EvidenceKey::RenovationPhoto => "Renovation photo",
            EvidenceKey::NewMachineryPhoto => "New machinery photo",
        }
    }
}

/// Keys required for every member, whatever the loan goal.
pub const BASE_REQUIRED_EVIDENCE: [EvidenceKey; 9] = [
    EvidenceKey::ClientSelfie,
    EvidenceKey::IdFront,
    EvidenceKey::IdBack,
    EvidenceKey::ResidenceProofOfAddress,
    EvidenceKey::BusinessProofOfAddress,
    EvidenceKey::BusinessPhoto,
    EvidenceKey::InventoryPhoto,
    EvidenceKey::UtilityBillElectricity,
    EvidenceKey::UtilityBillWater,
];

/// Evidence a member must provide for the given loan goal.
///
/// Total over its input: an absent goal (or one that failed to parse upstream)
/// yields the base set.
pub fn required_evidence_keys(goal: Option<LoanGoal>) -> BTreeSet<EvidenceKey> {
    let mut keys: BTreeSet<EvidenceKey> = BASE_REQUIRED_EVIDENCE.into_iter().collect();
    match goal {
        Some(LoanGoal::Investment) => {
            keys.insert(EvidenceKey::RenovationPhoto);
        }
        Some(LoanGoal::EquipmentPurchase) => {
            keys.insert(EvidenceKey::NewMachineryPhoto);
        }
        Some(LoanGoal::InventoryPurchase) | Some(LoanGoal::Other) | None => {}
    }
    keys
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceItem {
    pub uri: String,
    pub captured_at: DateTime<Utc>,
}

impl EvidenceItem {
    pub fn is_present(&self) -> bool {
        !self.uri.is_empty()
    }
}

/// Captured photos of one member, keyed by evidence slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberEvidence(BTreeMap<EvidenceKey, EvidenceItem>);

impl MemberEvidence {
    /// Stores the capture for `key`, replacing any earlier one.
    pub fn capture(
        &mut self,
        key: EvidenceKey,
        uri: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) {
        self.0.insert(
            key,
            EvidenceItem {
                uri: uri.into(),
                captured_at,
            },
        );
    }

    pub fn remove(&mut self, key: EvidenceKey) -> Option<EvidenceItem> {
        self.0.remove(&key)
    }

    pub fn get(&self, key: EvidenceKey) -> Option<&EvidenceItem> {
        self.0.get(&key)
    }

    pub fn has(&self, key: EvidenceKey) -> bool {
        self.0.get(&key).is_some_and(EvidenceItem::is_present)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count_present<'a>(&self, keys: impl IntoIterator<Item = &'a EvidenceKey>) -> u32 {
        keys.into_iter().filter(|key| self.has(**key)).count() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = (EvidenceKey, &EvidenceItem)> {
        self.0.iter().map(|(key, item)| (*key, item))
    }
}
