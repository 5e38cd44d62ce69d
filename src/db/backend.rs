use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{DailyTargets, DonationKind, FastingReason, Madhab, Sex, WeeklyEntry};

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Flat per-date row: one boolean per prayer, everything else in `extras`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub user_id: String,
    pub date: NaiveDate,
    pub fajr: bool,
    pub dhuhr: bool,
    pub asr: bool,
    pub maghrib: bool,
    pub isha: bool,
    pub dhuha: bool,
    pub taraweeh: bool,
    pub tahajjud: bool,
    pub witr: bool,
    #[serde(default)]
    pub extras: Option<String>,
}

impl DailyRow {
    pub fn empty(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            fajr: false,
            dhuhr: false,
            asr: false,
            maghrib: false,
            isha: false,
            dhuha: false,
            taraweeh: false,
            tahajjud: false,
            witr: false,
            extras: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingRow {
    pub user_id: String,
    pub date: NaiveDate,
    pub sahur: bool,
    #[serde(default)]
    pub sahur_time: Option<NaiveTime>,
    pub fasting: bool,
    #[serde(default)]
    pub reason: Option<FastingReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecitationRow {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub surah: String,
    pub from_ayah: u32,
    pub to_ayah: u32,
    pub ayah_count: u32,
    pub created_at: NaiveDateTime,
}

/// Row of the shared charity/zakat collection. `kind` decides which view owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationRow {
    pub id: String,
    pub user_id: String,
    pub kind: DonationKind,
    pub amount: f64,
    pub channel: String,
    #[serde(default)]
    pub people: Option<u32>,
    #[serde(default)]
    pub amount_per_person: Option<f64>,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRow {
    pub user_id: String,
    #[serde(flatten)]
    pub entry: WeeklyEntry,
}

/// Agenda row with date and time stored as one combined timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub starts_at: String,
    pub category: String,
    pub reminder: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetsRow {
    pub user_id: String,
    #[serde(flatten)]
    pub targets: DailyTargets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub full_name: String,
    pub age: u32,
    pub sex: Sex,
    pub madhab: Madhab,
    pub created_at: NaiveDateTime,
}

// ─── Contract ────────────────────────────────────────────────────────────────

/// Persistence provider the ledger is built on.
///
/// Reads return `None`/empty for missing rows. `update_*` and `delete_*`
/// report whether a row matched; neither treats a miss as an error.
/// Donation operations take the set of kinds the caller is allowed to see.
pub trait Backend: Send + Sync {
    fn daily(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyRow>>;
    fn all_daily(&self, user_id: &str) -> Result<Vec<DailyRow>>;
    fn upsert_daily(&self, row: &DailyRow) -> Result<()>;

    fn fasting(&self, user_id: &str, date: NaiveDate) -> Result<Option<FastingRow>>;
    fn all_fasting(&self, user_id: &str) -> Result<Vec<FastingRow>>;
    fn upsert_fasting(&self, row: &FastingRow) -> Result<()>;

    fn recitations(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<RecitationRow>>;
    fn insert_recitation(&self, row: &RecitationRow) -> Result<()>;
    fn update_recitation(&self, row: &RecitationRow) -> Result<bool>;
    fn delete_recitation(&self, user_id: &str, id: &str) -> Result<bool>;

    fn donations(
        &self,
        user_id: &str,
        kinds: &[DonationKind],
        date: Option<NaiveDate>,
    ) -> Result<Vec<DonationRow>>;
    fn insert_donation(&self, row: &DonationRow) -> Result<()>;
    fn update_donation(&self, row: &DonationRow, kinds: &[DonationKind]) -> Result<bool>;
    fn delete_donation(&self, user_id: &str, id: &str, kinds: &[DonationKind]) -> Result<bool>;

    fn weekly(&self, user_id: &str, week: u8) -> Result<Option<WeeklyRow>>;
    fn upsert_weekly(&self, row: &WeeklyRow) -> Result<()>;

    fn agenda(&self, user_id: &str) -> Result<Vec<AgendaRow>>;
    fn insert_agenda(&self, row: &AgendaRow) -> Result<()>;
    fn update_agenda(&self, row: &AgendaRow) -> Result<bool>;
    fn delete_agenda(&self, user_id: &str, id: &str) -> Result<bool>;

    fn targets(&self, user_id: &str) -> Result<Option<TargetsRow>>;
    fn upsert_targets(&self, row: &TargetsRow) -> Result<()>;

    fn account_by_email(&self, email: &str) -> Result<Option<AccountRow>>;
    fn account_by_id(&self, id: &str) -> Result<Option<AccountRow>>;
    /// Returns `false` if the email is already taken.
    fn insert_account(&self, row: &AccountRow) -> Result<bool>;

    fn session(&self) -> Result<Option<String>>;
    fn set_session(&self, user_id: Option<&str>) -> Result<()>;
}

/// Fresh id for an append-only row.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
