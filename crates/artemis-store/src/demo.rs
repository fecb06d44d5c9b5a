//! Seed data: a fully configured three-member proposal ready for the
//! contract step.

use artemis_core::{
    BusinessData, DomainError, DraftProposal, Group, LoanDetails, LoanGoal, LoanType, Member,
    MemberId, PersonalData, ProfitAndLoss, required_evidence_keys,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

pub const DEMO_PROPOSAL_ID: &str = "luci-machado-demo";
const DEMO_GROUP_ID: &str = "GRP-LUCI-001";

struct DemoMember {
    id: MemberId,
    first_name: &'static str,
    middle_name: &'static str,
    last_name: &'static str,
    amount: i64,
    document: (&'static str, &'static str),
    country: &'static str,
    birth_date: (i32, u32, u32),
    home: (&'static str, &'static str),
    phone: &'static str,
    business: (&'static str, &'static str, &'static str),
    opened: (&'static str, &'static str),
    business_address: (&'static str, &'static str),
    business_phone: (&'static str, &'static str),
    pnl: [i64; 4],
    installments: u32,
    goal: LoanGoal,
}

const MEMBERS: [DemoMember; 3] = [
    DemoMember {
        id: 1001,
        first_name: "Luci",
        middle_name: "Maria",
        last_name: "Machado",
        amount: 5_000,
        document: ("ssn", "123-45-6789"),
        country: "Brazil",
        birth_date: (1985, 3, 15),
        home: ("123 Main Street", "90001"),
        phone: "(555) 123-4567",
        business: ("Luci's Bakery", "Retail", "Food & Beverage"),
        opened: ("March", "2018"),
        business_address: ("456 Commerce St", "90002"),
        business_phone: ("Mobile", "(555) 987-6543"),
        pnl: [8_500, 12_000, 4_500, 2_500],
        installments: 12,
        goal: LoanGoal::InventoryPurchase,
    },
    DemoMember {
        id: 1002,
        first_name: "Carlos",
        middle_name: "Alberto",
        last_name: "Santos",
        amount: 4_000,
        document: ("passport", "AB1234567"),
        country: "Mexico",
        birth_date: (1990, 7, 22),
        home: ("789 Oak Avenue", "90003"),
        phone: "(555) 234-5678",
        business: ("Santos Auto Repair", "Service", "Other"),
        opened: ("June", "2019"),
        business_address: ("321 Industrial Blvd", "90004"),
        business_phone: ("Work", "(555) 876-5432"),
        pnl: [7_200, 9_500, 3_800, 2_200],
        installments: 10,
        goal: LoanGoal::EquipmentPurchase,
    },
    DemoMember {
        id: 1003,
        first_name: "Maria",
        middle_name: "Elena",
        last_name: "Rodriguez",
        amount: 3_500,
        document: ("dl_state_id", "D1234567"),
        country: "Guatemala",
        birth_date: (1988, 11, 8),
        home: ("555 Palm Drive", "90005"),
        phone: "(555) 345-6789",
        business: ("Maria's Textiles", "Retail", "Textiles"),
        opened: ("January", "2020"),
        business_address: ("888 Fashion Ave", "90006"),
        business_phone: ("Mobile", "(555) 765-4321"),
        pnl: [6_000, 8_000, 3_200, 1_800],
        installments: 8,
        goal: LoanGoal::InventoryPurchase,
    },
];

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

fn money(value: i64) -> Option<Decimal> {
    Some(Decimal::from(value))
}

/// The 15th of the month after `today`, which always satisfies the
/// first-payment window.
fn next_fifteenth(today: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 15)
}

impl DemoMember {
    fn member(&self, now: DateTime<Utc>) -> Member {
        let mut member = Member::new(self.id, self.first_name, self.last_name);
        member.personal = PersonalData {
            first_name: text(self.first_name),
            middle_name: text(self.middle_name),
            last_name: text(self.last_name),
            requested_amount: money(self.amount),
            document_type: text(self.document.0),
            document_number: text(self.document.1),
            country_of_origin: text(self.country),
            birth_date: NaiveDate::from_ymd_opt(
                self.birth_date.0,
                self.birth_date.1,
                self.birth_date.2,
            ),
            home_address1: text(self.home.0),
            state: text("CA"),
            city: text("Los Angeles"),
            zip_code: text(self.home.1),
            contact1_type: text("Mobile"),
            contact1_number: text(self.phone),
            ..PersonalData::default()
        };
        member.business = BusinessData {
            business_name: text(self.business.0),
            business_type: text(self.business.1),
            business_sector: text(self.business.2),
            opening_month: text(self.opened.0),
            opening_year: text(self.opened.1),
            business_address1: text(self.business_address.0),
            state: text("CA"),
            city: text("Los Angeles"),
            zip_code: text(self.business_address.1),
            contact1_type: text(self.business_phone.0),
            business_contact1: text(self.business_phone.1),
            ..BusinessData::default()
        };
        member.pnl = ProfitAndLoss {
            earnings_monthly: money(self.pnl[0]),
            monthly_sales1: money(self.pnl[1]),
            operational_costs_monthly_total: money(self.pnl[2]),
            personal_expenses_monthly_total: money(self.pnl[3]),
            ..ProfitAndLoss::default()
        };

        for key in required_evidence_keys(Some(self.goal)) {
            let uri = format!("demo://evidence/{}/{}", self.id, key.label());
            member.evidence.capture(key, uri, now);
        }
        member
    }

    fn terms(&self, today: NaiveDate) -> LoanDetails {
        LoanDetails {
            loan_value: money(self.amount),
            loan_type: Some(LoanType::WorkingCapital),
            interest_rate_apr: money(14),
            installments: Some(self.installments),
            first_payment_date: next_fifteenth(today),
            grace_period_days: Some(28),
            loan_goal: Some(self.goal),
            borrowers_insurance: true,
            ..LoanDetails::default()
        }
    }
}

pub fn demo_proposal(now: DateTime<Utc>) -> Result<DraftProposal, DomainError> {
    let members = MEMBERS.iter().map(|demo| demo.member(now)).collect();
    let group = Group::new(DEMO_GROUP_ID, members, MEMBERS[0].id)?;

    let mut draft = DraftProposal::from_group(DEMO_PROPOSAL_ID, group, now);
    for demo in &MEMBERS {
        *draft.loan_details_mut(demo.id) = demo.terms(now.date_naive());
    }
    Ok(draft)
}
