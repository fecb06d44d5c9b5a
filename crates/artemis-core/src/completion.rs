//! Completion scoring for members and proposals.
//!
//! Every mandatory field is judged by one predicate per field type
//! ([`Filled`]): text must be non-empty, numbers must be non-zero, dates and
//! enumerations must be present.

use std::ops::Add;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::evidence::{BASE_REQUIRED_EVIDENCE, EvidenceKey, required_evidence_keys};
use crate::group::Group;
use crate::loan::{LoanBook, LoanDetails, LoanGoal, LoanType};
use crate::member::Member;

/// Groups smaller than this are never complete; proposal denominators assume
/// at least this many members.
pub const MIN_GROUP_MEMBERS: usize = 3;

pub trait Filled {
    fn is_filled(&self) -> bool;
}

impl Filled for Option<String> {
    fn is_filled(&self) -> bool {
        self.as_deref().is_some_and(|value| !value.is_empty())
    }
}

impl Filled for Option<Decimal> {
    fn is_filled(&self) -> bool {
        self.is_some_and(|value| !value.is_zero())
    }
}

impl Filled for Option<u32> {
    fn is_filled(&self) -> bool {
        self.is_some_and(|value| value != 0)
    }
}

impl Filled for Option<NaiveDate> {
    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

impl Filled for Option<LoanType> {
    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

impl Filled for Option<LoanGoal> {
    fn is_filled(&self) -> bool {
        self.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Loan,
    Personal,
    Business,
    Financials,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Loan, Page::Personal, Page::Business, Page::Financials];

    pub fn mandatory_field_count(self) -> u32 {
        match self {
            Page::Loan => 5,
            Page::Personal => 12,
            Page::Business => 11,
            Page::Financials => 4,
        }
    }
}

type FieldCheck = (&'static str, bool);

fn loan_checks(details: &LoanDetails) -> [FieldCheck; 5] {
    [
        ("loanValue", details.loan_value.is_filled()),
        ("loanType", details.loan_type.is_filled()),
        ("installments", details.installments.is_filled()),
        ("firstPaymentDate", details.first_payment_date.is_filled()),
        ("loanGoal", details.loan_goal.is_filled()),
    ]
}

fn personal_checks(member: &Member) -> [FieldCheck; 12] {
    let personal = &member.personal;
    [
        ("firstName", personal.first_name.is_filled()),
        ("lastName", personal.last_name.is_filled()),
        ("documentType", personal.document_type.is_filled()),
        ("documentNumber", personal.document_number.is_filled()),
        ("countryOfOrigin", personal.country_of_origin.is_filled()),
        ("birthDate", personal.birth_date.is_filled()),
        ("homeAddress1", personal.home_address1.is_filled()),
        ("state", personal.state.is_filled()),
        ("city", personal.city.is_filled()),
        ("zipCode", personal.zip_code.is_filled()),
        ("contact1Type", personal.contact1_type.is_filled()),
        ("contact1Number", personal.contact1_number.is_filled()),
    ]
}

fn business_checks(member: &Member) -> [FieldCheck; 11] {
    let business = &member.business;
    [
        ("businessName", business.business_name.is_filled()),
        ("businessType", business.business_type.is_filled()),
        ("businessSector", business.business_sector.is_filled()),
        ("openingMonth", business.opening_month.is_filled()),
        ("openingYear", business.opening_year.is_filled()),
        ("businessAddress1", business.business_address1.is_filled()),
        ("state", business.state.is_filled()),
        ("city", business.city.is_filled()),
        ("zipCode", business.zip_code.is_filled()),
        ("contact1Type", business.contact1_type.is_filled()),
        ("businessContact1", business.business_contact1.is_filled()),
    ]
}

fn financial_checks(member: &Member) -> [FieldCheck; 4] {
    let pnl = &member.pnl;
    [
        ("earningsMonthly", pnl.earnings_monthly.is_filled()),
        ("monthlySales1", pnl.monthly_sales1.is_filled()),
        (
            "operationalCostsMonthlyTotal",
            pnl.operational_costs_monthly_total.is_filled(),
        ),
        (
            "personalExpensesMonthlyTotal",
            pnl.personal_expenses_monthly_total.is_filled(),
        ),
    ]
}

fn page_checks(page: Page, member: &Member, loan: Option<&LoanDetails>) -> Vec<FieldCheck> {
    match page {
        Page::Loan => match loan {
            Some(details) => loan_checks(details).to_vec(),
            None => loan_checks(&LoanDetails::default()).to_vec(),
        },
        Page::Personal => personal_checks(member).to_vec(),
        Page::Business => business_checks(member).to_vec(),
        Page::Financials => financial_checks(member).to_vec(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionResult {
    pub filled: u32,
    pub total: u32,
    pub percentage: u32,
}

impl CompletionResult {
    /// Percentage is rounded half-up and defined as 0 when there is nothing
    /// to fill.
    pub fn new(filled: u32, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            let filled = u64::from(filled);
            let total = u64::from(total);
            ((filled * 200 + total) / (total * 2)) as u32
        };
        Self {
            filled,
            total,
            percentage,
        }
    }

    /// Exactly complete. Compares counts, not the rounded percentage.
    pub fn is_full(&self) -> bool {
        self.total > 0 && self.filled == self.total
    }
}

impl Add for CompletionResult {
    type Output = CompletionResult;

    fn add(self, other: CompletionResult) -> CompletionResult {
        CompletionResult::new(self.filled + other.filled, self.total + other.total)
    }
}

impl std::iter::Sum for CompletionResult {
    fn sum<I: Iterator<Item = CompletionResult>>(iter: I) -> Self {
        iter.fold(CompletionResult::default(), Add::add)
    }
}

fn score(checks: &[FieldCheck]) -> CompletionResult {
    let filled = checks.iter().filter(|(_, filled)| *filled).count() as u32;
    CompletionResult::new(filled, checks.len() as u32)
}

pub fn page_completion(
    page: Page,
    member: &Member,
    loan: Option<&LoanDetails>,
) -> CompletionResult {
    score(&page_checks(page, member, loan))
}

pub fn member_completion(member: &Member, loan: Option<&LoanDetails>) -> CompletionResult {
    Page::ALL
        .into_iter()
        .map(|page| page_completion(page, member, loan))
        .sum()
}

pub fn fields_per_member() -> u32 {
    Page::ALL.into_iter().map(Page::mandatory_field_count).sum()
}

pub fn proposal_completion(group: &Group, loans: &LoanBook) -> CompletionResult {
    group
        .members()
        .iter()
        .map(|member| member_completion(member, loans.get(&member.id)))
        .sum()
}

/// Like [`proposal_completion`], but the denominator assumes at least
/// [`MIN_GROUP_MEMBERS`] members so small groups cannot reach 100 %.
pub fn proposal_completion_with_min_clients(group: &Group, loans: &LoanBook) -> CompletionResult {
    let raw = proposal_completion(group, loans);
    let denominator_members = group.len().max(MIN_GROUP_MEMBERS) as u32;
    CompletionResult::new(raw.filled, fields_per_member() * denominator_members)
}

pub fn is_proposal_complete(group: &Group, loans: &LoanBook) -> bool {
    group.len() >= MIN_GROUP_MEMBERS && proposal_completion_with_min_clients(group, loans).is_full()
}

pub fn member_evidence_completion(member: &Member, loan: Option<&LoanDetails>) -> CompletionResult {
    let required = required_evidence_keys(loan.and_then(|details| details.loan_goal));
    CompletionResult::new(member.evidence.count_present(&required), required.len() as u32)
}

pub fn member_completion_with_evidence(
    member: &Member,
    loan: Option<&LoanDetails>,
) -> CompletionResult {
    member_completion(member, loan) + member_evidence_completion(member, loan)
}

pub fn proposal_completion_with_evidence(group: &Group, loans: &LoanBook) -> CompletionResult {
    group
        .members()
        .iter()
        .map(|member| member_completion_with_evidence(member, loans.get(&member.id)))
        .sum()
}

/// Evidence-aware minimum-clients completion. Each missing member slot adds
/// the mandatory fields plus the base evidence requirement to the
/// denominator.
pub fn proposal_completion_with_evidence_min_clients(
    group: &Group,
    loans: &LoanBook,
) -> CompletionResult {
    let raw = proposal_completion_with_evidence(group, loans);
    let missing_slots = MIN_GROUP_MEMBERS.saturating_sub(group.len()) as u32;
    let per_missing_slot = fields_per_member() + BASE_REQUIRED_EVIDENCE.len() as u32;
    CompletionResult::new(raw.filled, raw.total + missing_slots * per_missing_slot)
}

/// Every member must be individually complete, fields and evidence alike;
/// aggregate credit from one member never covers for another.
pub fn is_proposal_complete_with_evidence(group: &Group, loans: &LoanBook) -> bool {
    group.len() >= MIN_GROUP_MEMBERS
        && group
            .members()
            .iter()
            .all(|member| member_completion_with_evidence(member, loans.get(&member.id)).is_full())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MissingField {
    pub page: Page,
    pub field: &'static str,
}

pub fn missing_fields(member: &Member, loan: Option<&LoanDetails>) -> Vec<MissingField> {
    Page::ALL
        .into_iter()
        .flat_map(|page| {
            page_checks(page, member, loan)
                .into_iter()
                .filter(|(_, filled)| !filled)
                .map(move |(field, _)| MissingField { page, field })
        })
        .collect()
}

pub fn missing_evidence(member: &Member, loan: Option<&LoanDetails>) -> Vec<EvidenceKey> {
    required_evidence_keys(loan.and_then(|details| details.loan_goal))
        .into_iter()
        .filter(|key| !member.evidence.has(*key))
        .collect()
}
