use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Gender, UserRole};

/// Read-only view of an account. Account management itself lives outside
/// this service; only what the analysis engine needs is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
    pub display_name: String,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn is_patient(&self) -> bool {
        self.role == UserRole::Patient
    }

    /// Age in whole years at `on`, if a birth date is on file.
    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if on < birth {
            return None;
        }
        let mut years = on.year() - birth.year();
        if (on.month(), on.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}
