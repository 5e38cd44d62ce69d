use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::backend::{
    AccountRow, AgendaRow, Backend, DailyRow, DonationRow, FastingRow, RecitationRow, TargetsRow,
    WeeklyRow,
};
use crate::ledger::keys::{Category, StorageKey};
use crate::models::DonationKind;

/// Key-value store of JSON blobs, one blob per category per user, kept in a
/// single file. Every write rewrites the file through a temporary sibling.
pub struct JsonFileBackend {
    path: PathBuf,
    blobs: Mutex<BTreeMap<String, String>>,
}

impl JsonFileBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let blobs = if path.exists() {
            let content =
                std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).with_context(|| format!("Parsing {:?}", path))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            blobs: Mutex::new(blobs),
        })
    }

    fn blobs(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, blobs: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(blobs).context("Serializing store")?;
        std::fs::write(&tmp, content).with_context(|| format!("Writing {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Replacing {:?}", self.path))?;
        Ok(())
    }

    /// Rows stored under `key`, undecoded. A missing blob has no rows.
    fn raw_rows(
        blobs: &BTreeMap<String, String>,
        key: &StorageKey,
    ) -> serde_json::Result<Vec<Value>> {
        match blobs.get(key.as_str()) {
            Some(text) => serde_json::from_str(text),
            None => Ok(Vec::new()),
        }
    }

    /// Splits rows into the ones that decode as `T` and the ones that don't.
    fn decode_rows<T: DeserializeOwned>(
        key: &StorageKey,
        rows: Vec<Value>,
    ) -> (Vec<T>, Vec<Value>) {
        let mut decoded = Vec::with_capacity(rows.len());
        let mut undecodable = Vec::new();
        for row in rows {
            match T::deserialize(&row) {
                Ok(item) => decoded.push(item),
                Err(e) => {
                    log::warn!("Skipping unreadable row in {} ({})", key, e);
                    undecodable.push(row);
                }
            }
        }
        (decoded, undecodable)
    }

    /// Reads the list stored under `key`, skipping rows that don't decode.
    /// A blob that isn't a JSON list reads as empty.
    fn read_list<T: DeserializeOwned>(
        blobs: &BTreeMap<String, String>,
        key: &StorageKey,
    ) -> Vec<T> {
        match Self::raw_rows(blobs, key) {
            Ok(rows) => Self::decode_rows(key, rows).0,
            Err(e) => {
                log::warn!("Blob {} is unreadable ({}), treating as empty", key, e);
                Vec::new()
            }
        }
    }

    fn list<T: DeserializeOwned>(&self, key: &StorageKey) -> Vec<T> {
        Self::read_list(&self.blobs(), key)
    }

    /// Read-modify-write of one list under the store lock.
    ///
    /// Rows that don't decode are written back untouched. A blob that isn't a
    /// JSON list is never overwritten.
    fn modify<T, R>(&self, key: &StorageKey, f: impl FnOnce(&mut Vec<T>) -> R) -> Result<R>
    where
        T: DeserializeOwned + Serialize,
    {
        let mut blobs = self.blobs();
        let rows = Self::raw_rows(&blobs, key)
            .with_context(|| format!("Blob {} is unreadable, refusing to overwrite it", key))?;
        let (mut list, mut rows) = Self::decode_rows::<T>(key, rows);
        let out = f(&mut list);
        for item in &list {
            rows.push(serde_json::to_value(item).context("Serializing row")?);
        }
        let text = serde_json::to_string(&rows).context("Serializing blob")?;
        blobs.insert(key.as_str().to_string(), text);
        self.persist(&blobs)?;
        Ok(out)
    }

    fn upsert_by<T, K>(&self, key: &StorageKey, row: &T, natural: impl Fn(&T) -> K) -> Result<()>
    where
        T: DeserializeOwned + Serialize + Clone,
        K: PartialEq,
    {
        let wanted = natural(row);
        self.modify(key, |list: &mut Vec<T>| {
            match list.iter().position(|r| natural(r) == wanted) {
                Some(i) => list[i] = row.clone(),
                None => list.push(row.clone()),
            }
        })
    }
}

fn key(user_id: &str, category: Category) -> StorageKey {
    StorageKey::collection(Some(user_id), category)
}

impl Backend for JsonFileBackend {
    fn daily(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyRow>> {
        let rows: Vec<DailyRow> = self.list(&key(user_id, Category::Daily));
        Ok(rows.into_iter().find(|r| r.date == date))
    }

    fn all_daily(&self, user_id: &str) -> Result<Vec<DailyRow>> {
        Ok(self.list(&key(user_id, Category::Daily)))
    }

    fn upsert_daily(&self, row: &DailyRow) -> Result<()> {
        self.upsert_by(&key(&row.user_id, Category::Daily), row, |r| r.date)
    }

    fn fasting(&self, user_id: &str, date: NaiveDate) -> Result<Option<FastingRow>> {
        let rows: Vec<FastingRow> = self.list(&key(user_id, Category::Fasting));
        Ok(rows.into_iter().find(|r| r.date == date))
    }

    fn all_fasting(&self, user_id: &str) -> Result<Vec<FastingRow>> {
        Ok(self.list(&key(user_id, Category::Fasting)))
    }

    fn upsert_fasting(&self, row: &FastingRow) -> Result<()> {
        self.upsert_by(&key(&row.user_id, Category::Fasting), row, |r| r.date)
    }

    fn recitations(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<RecitationRow>> {
        let rows: Vec<RecitationRow> = self.list(&key(user_id, Category::Recitation));
        Ok(rows
            .into_iter()
            .filter(|r| date.is_none_or(|d| r.date == d))
            .collect())
    }

    fn insert_recitation(&self, row: &RecitationRow) -> Result<()> {
        self.modify(&key(&row.user_id, Category::Recitation), |list: &mut Vec<RecitationRow>| {
            list.push(row.clone())
        })
    }

    fn update_recitation(&self, row: &RecitationRow) -> Result<bool> {
        self.modify(&key(&row.user_id, Category::Recitation), |list: &mut Vec<RecitationRow>| {
            match list.iter_mut().find(|r| r.id == row.id) {
                Some(existing) => {
                    *existing = RecitationRow {
                        created_at: existing.created_at,
                        ..row.clone()
                    };
                    true
                }
                None => false,
            }
        })
    }

    fn delete_recitation(&self, user_id: &str, id: &str) -> Result<bool> {
        self.modify(&key(user_id, Category::Recitation), |list: &mut Vec<RecitationRow>| {
            let before = list.len();
            list.retain(|r| r.id != id);
            list.len() != before
        })
    }

    fn donations(
        &self,
        user_id: &str,
        kinds: &[DonationKind],
        date: Option<NaiveDate>,
    ) -> Result<Vec<DonationRow>> {
        let rows: Vec<DonationRow> = self.list(&key(user_id, Category::Donations));
        Ok(rows
            .into_iter()
            .filter(|r| kinds.contains(&r.kind) && date.is_none_or(|d| r.date == d))
            .collect())
    }

    fn insert_donation(&self, row: &DonationRow) -> Result<()> {
        self.modify(&key(&row.user_id, Category::Donations), |list: &mut Vec<DonationRow>| {
            list.push(row.clone())
        })
    }

    fn update_donation(&self, row: &DonationRow, kinds: &[DonationKind]) -> Result<bool> {
        if !kinds.contains(&row.kind) {
            return Ok(false);
        }
        self.modify(&key(&row.user_id, Category::Donations), |list: &mut Vec<DonationRow>| {
            match list
                .iter_mut()
                .find(|r| r.id == row.id && kinds.contains(&r.kind))
            {
                Some(existing) => {
                    *existing = DonationRow {
                        created_at: existing.created_at,
                        ..row.clone()
                    };
                    true
                }
                None => false,
            }
        })
    }

    fn delete_donation(&self, user_id: &str, id: &str, kinds: &[DonationKind]) -> Result<bool> {
        self.modify(&key(user_id, Category::Donations), |list: &mut Vec<DonationRow>| {
            let before = list.len();
            list.retain(|r| !(r.id == id && kinds.contains(&r.kind)));
            list.len() != before
        })
    }

    fn weekly(&self, user_id: &str, week: u8) -> Result<Option<WeeklyRow>> {
        let rows: Vec<WeeklyRow> = self.list(&key(user_id, Category::Weekly));
        Ok(rows.into_iter().find(|r| r.entry.week == week))
    }

    fn upsert_weekly(&self, row: &WeeklyRow) -> Result<()> {
        self.upsert_by(&key(&row.user_id, Category::Weekly), row, |r| r.entry.week)
    }

    fn agenda(&self, user_id: &str) -> Result<Vec<AgendaRow>> {
        Ok(self.list(&key(user_id, Category::Agenda)))
    }

    fn insert_agenda(&self, row: &AgendaRow) -> Result<()> {
        self.modify(&key(&row.user_id, Category::Agenda), |list: &mut Vec<AgendaRow>| {
            list.push(row.clone())
        })
    }

    fn update_agenda(&self, row: &AgendaRow) -> Result<bool> {
        self.modify(&key(&row.user_id, Category::Agenda), |list: &mut Vec<AgendaRow>| {
            match list.iter_mut().find(|r| r.id == row.id) {
                Some(existing) => {
                    *existing = row.clone();
                    true
                }
                None => false,
            }
        })
    }

    fn delete_agenda(&self, user_id: &str, id: &str) -> Result<bool> {
        self.modify(&key(user_id, Category::Agenda), |list: &mut Vec<AgendaRow>| {
            let before = list.len();
            list.retain(|r| r.id != id);
            list.len() != before
        })
    }

    fn targets(&self, user_id: &str) -> Result<Option<TargetsRow>> {
        let rows: Vec<TargetsRow> = self.list(&key(user_id, Category::Targets));
        Ok(rows.into_iter().next())
    }

    fn upsert_targets(&self, row: &TargetsRow) -> Result<()> {
        self.modify(&key(&row.user_id, Category::Targets), |list: &mut Vec<TargetsRow>| {
            *list = vec![row.clone()];
        })
    }

    fn account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        let rows: Vec<AccountRow> = self.list(&StorageKey::shared(Category::Accounts));
        Ok(rows
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email)))
    }

    fn account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        let rows: Vec<AccountRow> = self.list(&StorageKey::shared(Category::Accounts));
        Ok(rows.into_iter().find(|a| a.id == id))
    }

    fn insert_account(&self, row: &AccountRow) -> Result<bool> {
        self.modify(&StorageKey::shared(Category::Accounts), |list: &mut Vec<AccountRow>| {
            if list.iter().any(|a| a.email.eq_ignore_ascii_case(&row.email)) {
                false
            } else {
                list.push(row.clone());
                true
            }
        })
    }

    fn session(&self) -> Result<Option<String>> {
        Ok(self
            .blobs()
            .get(StorageKey::shared(Category::Session).as_str())
            .cloned())
    }

    fn set_session(&self, user_id: Option<&str>) -> Result<()> {
        let key = StorageKey::shared(Category::Session);
        let mut blobs = self.blobs();
        match user_id {
            Some(id) => {
                blobs.insert(key.as_str().to_string(), id.to_string());
            }
            None => {
                blobs.remove(key.as_str());
            }
        }
        self.persist(&blobs)
    }
}
