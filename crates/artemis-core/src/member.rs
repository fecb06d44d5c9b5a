use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::ContractSignature;
use crate::evidence::MemberEvidence;

pub type MemberId = u64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalData {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub requested_amount: Option<Decimal>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub country_of_origin: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub home_address1: Option<String>,
    pub home_address2: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub contact1_type: Option<String>,
    pub contact1_number: Option<String>,
    pub contact2_type: Option<String>,
    pub contact2_number: Option<String>,
    pub contact3_type: Option<String>,
    pub contact3_number: Option<String>,
    pub reference_name1: Option<String>,
    pub reference_number1: Option<String>,
    pub reference_name2: Option<String>,
    pub reference_number2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessData {
    pub business_name: Option<String>,
    pub business_type: Option<String>,
    pub other_business_type: Option<String>,
    pub business_sector: Option<String>,
    pub multiple_business: bool,
    pub opening_month: Option<String>,
    pub opening_year: Option<String>,
    pub business_address1: Option<String>,
    pub business_address2: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub contact1_type: Option<String>,
    pub business_contact1: Option<String>,
    pub contact2_type: Option<String>,
    pub business_contact2: Option<String>,
}

/// Monthly profit & loss figures. Amounts are monthly unless named otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfitAndLoss {
    pub earnings_monthly: Option<Decimal>,
    pub monthly_sales1: Option<Decimal>,
    pub monthly_sales2: Option<Decimal>,
    pub monthly_sales3: Option<Decimal>,
    pub operational_costs_monthly_total: Option<Decimal>,
    pub personal_expenses_monthly_total: Option<Decimal>,
    pub extra_income: Option<Decimal>,
    pub home_rent: Option<Decimal>,
    pub monthly_savings: Option<Decimal>,
    pub financial_debts: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    #[serde(default)]
    pub personal: PersonalData,
    #[serde(default)]
    pub business: BusinessData,
    #[serde(default)]
    pub pnl: ProfitAndLoss,
    #[serde(default)]
    pub evidence: MemberEvidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<ContractSignature>,
}

impl Member {
    pub fn new(id: MemberId, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            personal: PersonalData {
                first_name: Some(first_name.into()),
                last_name: Some(last_name.into()),
                ..PersonalData::default()
            },
            business: BusinessData::default(),
            pnl: ProfitAndLoss::default(),
            evidence: MemberEvidence::default(),
            signature: None,
        }
    }

    pub fn full_name(&self) -> String {
        [&self.personal.first_name, &self.personal.last_name]
            .into_iter()
            .flatten()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_skips_missing_parts() {
        let mut member = Member::new(7, "Luci", "Machado");
        assert_eq!(member.full_name(), "Luci Machado");

        member.personal.last_name = Some("  ".to_string());
        assert_eq!(member.full_name(), "Luci");

        member.personal.first_name = None;
        assert_eq!(member.full_name(), "");
    }

    #[test]
    fn member_deserializes_with_sections_missing() {
        let member: Member = serde_json::from_value(serde_json::json!({
            "id": 3,
            "personal": { "firstName": "Maria", "homeAddress1": "555 Palm Drive" }
        }))
        .unwrap();

        assert_eq!(member.personal.home_address1.as_deref(), Some("555 Palm Drive"));
        assert_eq!(member.business, BusinessData::default());
        assert!(member.evidence.is_empty());
        assert!(!member.is_signed());
    }
}
