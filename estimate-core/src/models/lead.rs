use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FormAnswers, PriceBreakdown};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl ContactDetails {
    /// Reads the contact step's fields. `None` until name and e-mail are given.
    pub fn from_answers(answers: &FormAnswers) -> Option<Self> {
        Some(Self {
            name: answers.text("contact_name")?.to_string(),
            email: answers.text("contact_email")?.to_string(),
            phone: answers.text("contact_phone").map(str::to_string),
        })
    }
}

/// A submitted estimate as stored in the lead store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub owner_id: Option<String>,
    pub contact: ContactDetails,
    pub answers: FormAnswers,
    pub breakdown: PriceBreakdown,
    pub submitted_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// For recording new leads (no id or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub owner_id: Option<String>,
    pub contact: ContactDetails,
    pub answers: FormAnswers,
    pub breakdown: PriceBreakdown,
    pub submitted_on: NaiveDate,
}
