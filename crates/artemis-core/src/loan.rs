use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::completion::Filled;
use crate::error::DomainError;
use crate::member::MemberId;

pub const MIN_LOAN_VALUE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);
pub const MAX_LOAN_VALUE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);
pub const FIRST_PAYMENT_WINDOW_DAYS: i64 = 60;
pub const LATEST_FIRST_PAYMENT_DAY: u32 = 15;
pub const OPTIONAL_INSURANCE_SLOTS: usize = 3;

/// Loan terms per member, keyed by member id.
pub type LoanBook = BTreeMap<MemberId, LoanDetails>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanType {
    WorkingCapital,
    Investment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoanGoal {
    InventoryPurchase,
    EquipmentPurchase,
    Investment,
    Other,
}

impl LoanGoal {
    pub fn label(self) -> &'static str {
        match self {
            LoanGoal::InventoryPurchase => "Inventory purchase",
            LoanGoal::EquipmentPurchase => "Equipment purchase",
            LoanGoal::Investment => "Investment",
            LoanGoal::Other => "Other",
        }
    }
}

impl fmt::Display for LoanGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanGoal {
    type Err = DomainError;

    /// Accepts both the display labels and the short option values used by
    /// the configuration form ("inventory", "equipment", ...).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "inventory" | "inventory purchase" => Ok(LoanGoal::InventoryPurchase),
            "equipment" | "equipment purchase" => Ok(LoanGoal::EquipmentPurchase),
            "investment" => Ok(LoanGoal::Investment),
            "other" => Ok(LoanGoal::Other),
            _ => Err(DomainError::UnknownLoanGoal(value.to_string())),
        }
    }
}

impl TryFrom<String> for LoanGoal {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LoanGoal> for String {
    fn from(goal: LoanGoal) -> Self {
        goal.label().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanDetails {
    pub loan_value: Option<Decimal>,
    pub loan_type: Option<LoanType>,
    pub interest_rate_apr: Option<Decimal>,
    pub installments: Option<u32>,
    pub first_payment_date: Option<NaiveDate>,
    pub grace_period_days: Option<u32>,
    pub loan_goal: Option<LoanGoal>,
    pub other_goal: Option<String>,
    pub borrowers_insurance: bool,
    pub optional_insurances: [Option<String>; OPTIONAL_INSURANCE_SLOTS],
}

impl LoanDetails {
    /// Changing the goal away from `Other` drops the free-text description.
    pub fn set_goal(&mut self, goal: Option<LoanGoal>) {
        if goal != Some(LoanGoal::Other) {
            self.other_goal = None;
        }
        self.loan_goal = goal;
    }

    /// Sets optional insurance `slot` (1-based). Clearing a slot also clears
    /// every slot after it, since later insurances only apply on top of
    /// earlier ones.
    pub fn set_optional_insurance(
        &mut self,
        slot: usize,
        value: Option<String>,
    ) -> Result<(), DomainError> {
        if slot == 0 || slot > OPTIONAL_INSURANCE_SLOTS {
            return Err(DomainError::InsuranceSlot(slot));
        }

        let value = value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"));
        let index = slot - 1;

        if value.is_none() {
            for later in &mut self.optional_insurances[index..] {
                *later = None;
            }
        } else {
            self.optional_insurances[index] = value;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, "This field is required")
    }
}

/// Form-level checks for the loan terms tab. Errors are returned as values so
/// the caller can render them next to each field.
pub fn validate_loan_terms(details: &LoanDetails, today: NaiveDate) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match details.loan_value {
        None => errors.push(FieldError::required("loanValue")),
        Some(value) if value < MIN_LOAN_VALUE || value > MAX_LOAN_VALUE => {
            errors.push(FieldError::new(
                "loanValue",
                format!("Loan value must be between ${MIN_LOAN_VALUE} and ${MAX_LOAN_VALUE}"),
            ));
        }
        Some(_) => {}
    }

    if details.loan_type.is_none() {
        errors.push(FieldError::required("loanType"));
    }
    if !details.interest_rate_apr.is_filled() {
        errors.push(FieldError::required("interestRateApr"));
    }
    if !details.installments.is_filled() {
        errors.push(FieldError::required("installments"));
    }

    match details.first_payment_date {
        None => errors.push(FieldError::required("firstPaymentDate")),
        Some(date) => {
            let days_ahead = (date - today).num_days();
            if !(0..=FIRST_PAYMENT_WINDOW_DAYS).contains(&days_ahead)
                || date.day() > LATEST_FIRST_PAYMENT_DAY
            {
                errors.push(FieldError::new(
                    "firstPaymentDate",
                    format!(
                        "First payment date must be within {FIRST_PAYMENT_WINDOW_DAYS} days from today and on or before the {LATEST_FIRST_PAYMENT_DAY}th of the month."
                    ),
                ));
            }
        }
    }

    if details.loan_goal.is_none() {
        errors.push(FieldError::required("loanGoal"));
    }

    errors
}
