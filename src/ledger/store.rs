use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::db::backend::{
    new_id, Backend, DailyRow, DonationRow, RecitationRow, TargetsRow, WeeklyRow,
};
use crate::error::LedgerError;
use crate::ledger::aggregate::Snapshot;
use crate::ledger::keys::{resolve_user, Category, StorageKey};
use crate::ledger::locks::KeyLocks;
use crate::ledger::normalize::{
    agenda_from_row, agenda_to_row, charity_from_row, donation_from_row, expand_fasting_day,
    expand_prayer_day, expand_supplementary_day, flatten_fasting_day, flatten_prayer_day,
    flatten_supplementary_day, recitation_from_row, zakat_from_row,
};
use crate::models::{
    AgendaItem, AgendaPatch, CharityEntry, CharityPatch, DailyTargets, DonationKind, FastingDay,
    FastingReason, NewAgendaItem, NewCharity, NewRecitation, NewZakat, Prayer, PrayerDay,
    PrayerMark, RecitationEntry, Sex, SupplementaryPrayer, SupplementaryPrayerDay, Totals,
    WeeklyEntry, ZakatPayment,
};

const CHARITY: &[DonationKind] = &[DonationKind::Charity];

/// Verses in Al-Baqarah, the longest surah.
const MAX_AYAH: u32 = 286;

/// One user's records, read and written through a [`Backend`].
///
/// Writes to a date, week, or the targets singleton run under that key's
/// lock, so overlapping writers see each other's changes. The snapshot
/// used for totals is cached until the next write through this ledger or an
/// explicit [`Ledger::refresh`]; changes made by other processes stay
/// invisible until then.
pub struct Ledger {
    backend: Arc<dyn Backend>,
    user_id: String,
    sex: Option<Sex>,
    locks: KeyLocks,
    cache: Mutex<SnapshotCache>,
}

/// The generation moves on every invalidation, so a load that started
/// before a write can't put its result back into the cache.
#[derive(Default)]
struct SnapshotCache {
    generation: u64,
    snapshot: Option<Snapshot>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn Backend>, user_id: Option<&str>, sex: Option<Sex>) -> Self {
        Self {
            backend,
            user_id: resolve_user(user_id).to_string(),
            sex,
            locks: KeyLocks::default(),
            cache: Mutex::new(SnapshotCache::default()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn sex(&self) -> Option<Sex> {
        self.sex
    }

    fn key(&self, category: Category, date: NaiveDate) -> StorageKey {
        StorageKey::dated(Some(&self.user_id), category, date)
    }

    fn cache(&self) -> MutexGuard<'_, SnapshotCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn daily_row(&self, date: NaiveDate) -> Result<DailyRow> {
        Ok(self
            .backend
            .daily(&self.user_id, date)?
            .unwrap_or_else(|| DailyRow::empty(&self.user_id, date)))
    }

    /// Locked read-modify-write of the daily row for `date`.
    fn modify_daily<T>(&self, date: NaiveDate, f: impl FnOnce(&mut DailyRow) -> T) -> Result<T> {
        let out = self.locks.with(&self.key(Category::Daily, date), || {
            let mut row = self.daily_row(date)?;
            let out = f(&mut row);
            self.backend.upsert_daily(&row)?;
            Ok::<_, anyhow::Error>(out)
        })?;
        log::debug!("Daily row {} updated for {}", date, self.user_id);
        self.invalidate();
        Ok(out)
    }

    // ─── Obligatory prayers ─────────────────────────────────────────────────

    pub fn prayer_day(&self, date: NaiveDate) -> Result<PrayerDay> {
        Ok(expand_prayer_day(&self.daily_row(date)?))
    }

    pub fn update_prayer_day(&self, day: &PrayerDay) -> Result<()> {
        for prayer in Prayer::all() {
            validate_mark(day.get(prayer))?;
        }
        self.modify_daily(day.date, |row| flatten_prayer_day(day, row))
    }

    /// Sets one prayer, leaving the rest of the day as currently stored.
    pub fn mark_prayer(
        &self,
        date: NaiveDate,
        prayer: Prayer,
        mark: PrayerMark,
    ) -> Result<PrayerDay> {
        validate_mark(&mark)?;
        self.modify_daily(date, |row| {
            let mut day = expand_prayer_day(row);
            *day.get_mut(prayer) = mark;
            flatten_prayer_day(&day, row);
            expand_prayer_day(row)
        })
    }

    // ─── Supplementary prayers ──────────────────────────────────────────────

    pub fn supplementary_day(&self, date: NaiveDate) -> Result<SupplementaryPrayerDay> {
        Ok(expand_supplementary_day(&self.daily_row(date)?))
    }

    pub fn update_supplementary_day(&self, day: &SupplementaryPrayerDay) -> Result<()> {
        self.modify_daily(day.date, |row| flatten_supplementary_day(day, row))
    }

    /// `rakaat: None` keeps the previously chosen count.
    pub fn mark_supplementary(
        &self,
        date: NaiveDate,
        kind: SupplementaryPrayer,
        performed: bool,
        rakaat: Option<u8>,
    ) -> Result<SupplementaryPrayerDay> {
        if rakaat == Some(0) {
            return Err(LedgerError::validation("Rakaat must be at least 1").into());
        }
        self.modify_daily(date, |row| {
            let mut day = expand_supplementary_day(row);
            let mark = day.get_mut(kind);
            mark.performed = performed;
            if let Some(n) = rakaat {
                mark.rakaat = n;
            }
            flatten_supplementary_day(&day, row);
            day
        })
    }

    // ─── Recitation ─────────────────────────────────────────────────────────

    pub fn recitations(&self, date: Option<NaiveDate>) -> Result<Vec<RecitationEntry>> {
        Ok(self
            .backend
            .recitations(&self.user_id, date)?
            .into_iter()
            .map(recitation_from_row)
            .collect())
    }

    pub fn add_recitation(&self, new: NewRecitation) -> Result<RecitationEntry> {
        validate_recitation(&new)?;
        let row = RecitationRow {
            id: new_id(),
            user_id: self.user_id.clone(),
            date: new.date,
            ayah_count: new.ayah_count(),
            surah: new.surah.trim().to_string(),
            from_ayah: new.from_ayah,
            to_ayah: new.to_ayah,
            created_at: now(),
        };
        self.backend.insert_recitation(&row)?;
        log::debug!("Recitation {} added for {}", row.id, self.user_id);
        self.invalidate();
        Ok(recitation_from_row(row))
    }

    /// Replaces every field of an existing entry. `false` if no entry has `id`.
    pub fn edit_recitation(&self, id: &str, new: NewRecitation) -> Result<bool> {
        validate_recitation(&new)?;
        let Some(existing) = self
            .backend
            .recitations(&self.user_id, None)?
            .into_iter()
            .find(|r| r.id == id)
        else {
            return Ok(false);
        };
        let row = RecitationRow {
            id: existing.id,
            user_id: self.user_id.clone(),
            date: new.date,
            ayah_count: new.ayah_count(),
            surah: new.surah.trim().to_string(),
            from_ayah: new.from_ayah,
            to_ayah: new.to_ayah,
            created_at: existing.created_at,
        };
        let found = self.backend.update_recitation(&row)?;
        self.invalidate();
        Ok(found)
    }

    pub fn delete_recitation(&self, id: &str) -> Result<()> {
        if !self.backend.delete_recitation(&self.user_id, id)? {
            log::debug!("Recitation {} already gone", id);
        }
        self.invalidate();
        Ok(())
    }

    // ─── Charity ────────────────────────────────────────────────────────────

    pub fn charity(&self, date: Option<NaiveDate>) -> Result<Vec<CharityEntry>> {
        Ok(self
            .backend
            .donations(&self.user_id, CHARITY, date)?
            .into_iter()
            .filter_map(charity_from_row)
            .collect())
    }

    pub fn add_charity(&self, new: NewCharity) -> Result<CharityEntry> {
        validate_amount(new.amount, "Charity amount")?;
        let row = DonationRow {
            id: new_id(),
            user_id: self.user_id.clone(),
            kind: DonationKind::Charity,
            amount: new.amount,
            channel: new.channel.as_str().to_string(),
            people: None,
            amount_per_person: None,
            date: new.date,
            time: None,
            notes: clean_text(new.notes),
            created_at: now(),
        };
        self.backend.insert_donation(&row)?;
        log::debug!("Charity {} added for {}", row.id, self.user_id);
        self.invalidate();
        charity_from_row(row).ok_or_else(|| anyhow::anyhow!("Charity row lost its tag"))
    }

    pub fn update_charity(&self, id: &str, patch: CharityPatch) -> Result<bool> {
        if let Some(amount) = patch.amount {
            validate_amount(amount, "Charity amount")?;
        }
        let Some(mut row) = self
            .backend
            .donations(&self.user_id, CHARITY, None)?
            .into_iter()
            .find(|r| r.id == id)
        else {
            return Ok(false);
        };
        if let Some(amount) = patch.amount {
            row.amount = amount;
        }
        if let Some(channel) = patch.channel {
            row.channel = channel.as_str().to_string();
        }
        if patch.notes.is_some() {
            row.notes = clean_text(patch.notes);
        }
        let found = self.backend.update_donation(&row, CHARITY)?;
        self.invalidate();
        Ok(found)
    }

    /// Removes a charity entry. Zakat rows with the same id are untouched.
    pub fn delete_charity(&self, id: &str) -> Result<()> {
        self.backend.delete_donation(&self.user_id, id, CHARITY)?;
        self.invalidate();
        Ok(())
    }

    // ─── Fasting ────────────────────────────────────────────────────────────

    pub fn fasting_day(&self, date: NaiveDate) -> Result<FastingDay> {
        Ok(self
            .backend
            .fasting(&self.user_id, date)?
            .map(|row| expand_fasting_day(&row))
            .unwrap_or_else(|| FastingDay::empty(date)))
    }

    pub fn update_fasting_day(&self, day: &FastingDay) -> Result<()> {
        self.validate_fasting(day)?;
        self.locks.with(&self.key(Category::Fasting, day.date), || {
            self.backend
                .upsert_fasting(&flatten_fasting_day(&self.user_id, day))
        })?;
        self.invalidate();
        Ok(())
    }

    fn modify_fasting(
        &self,
        date: NaiveDate,
        f: impl FnOnce(&mut FastingDay),
    ) -> Result<FastingDay> {
        let day = self.locks.with(&self.key(Category::Fasting, date), || {
            let mut day = self.fasting_day(date)?;
            f(&mut day);
            self.validate_fasting(&day)?;
            let row = flatten_fasting_day(&self.user_id, &day);
            self.backend.upsert_fasting(&row)?;
            Ok::<_, anyhow::Error>(expand_fasting_day(&row))
        })?;
        self.invalidate();
        Ok(day)
    }

    /// `Some(time)` records sahur at that time, `None` clears it.
    pub fn mark_sahur(&self, date: NaiveDate, time: Option<NaiveTime>) -> Result<FastingDay> {
        self.modify_fasting(date, |day| {
            day.sahur = time.is_some();
            day.sahur_time = time;
        })
    }

    /// `Ok(())` marks the day fasted; `Err(reason)` records why not.
    pub fn mark_fasting(
        &self,
        date: NaiveDate,
        outcome: std::result::Result<(), FastingReason>,
    ) -> Result<FastingDay> {
        self.modify_fasting(date, |day| match outcome {
            Ok(()) => {
                day.fasting = true;
                day.reason = None;
            }
            Err(reason) => {
                day.fasting = false;
                day.reason = Some(reason);
            }
        })
    }

    fn validate_fasting(&self, day: &FastingDay) -> Result<()> {
        if day.sahur && day.sahur_time.is_none() {
            return Err(LedgerError::validation("Sahur needs a time").into());
        }
        if let Some(reason) = day.reason.filter(|_| !day.fasting) {
            if !reason.is_allowed_for(self.sex) {
                return Err(LedgerError::validation(format!(
                    "'{}' is not a valid reason for this account",
                    reason.display_name()
                ))
                .into());
            }
        }
        Ok(())
    }

    // ─── Zakat ──────────────────────────────────────────────────────────────

    pub fn zakat_payments(&self) -> Result<Vec<ZakatPayment>> {
        let mut payments: Vec<ZakatPayment> = self
            .backend
            .donations(&self.user_id, &DonationKind::ZAKAT, None)?
            .into_iter()
            .filter_map(zakat_from_row)
            .collect();
        payments.sort_by(|a, b| (a.paid_on, a.paid_at).cmp(&(b.paid_on, b.paid_at)));
        Ok(payments)
    }

    pub fn add_zakat(&self, new: NewZakat) -> Result<ZakatPayment> {
        if new.people == 0 {
            return Err(LedgerError::validation("Zakat needs at least one person").into());
        }
        validate_amount(new.amount_per_person, "Amount per person")?;
        let row = DonationRow {
            id: new_id(),
            user_id: self.user_id.clone(),
            kind: new.kind.donation_kind(),
            amount: new.total_amount(),
            channel: new.channel.as_str().to_string(),
            people: Some(new.people),
            amount_per_person: Some(new.amount_per_person),
            date: new.paid_on,
            time: Some(new.paid_at),
            notes: clean_text(new.notes),
            created_at: now(),
        };
        self.backend.insert_donation(&row)?;
        log::debug!("Zakat {} added for {}", row.id, self.user_id);
        self.invalidate();
        zakat_from_row(row).ok_or_else(|| anyhow::anyhow!("Zakat row lost its tag"))
    }

    // ─── Weekly ─────────────────────────────────────────────────────────────

    pub fn weekly_entry(&self, week: u8) -> Result<WeeklyEntry> {
        Ok(self
            .backend
            .weekly(&self.user_id, week)?
            .map(|row| row.entry)
            .unwrap_or_else(|| WeeklyEntry::empty(week)))
    }

    pub fn update_weekly_entry(&self, entry: &WeeklyEntry) -> Result<()> {
        if entry.week == 0 {
            return Err(LedgerError::validation("Weeks are numbered from 1").into());
        }
        let row = WeeklyRow {
            user_id: self.user_id.clone(),
            entry: WeeklyEntry {
                sermon_note: clean_text(entry.sermon_note.clone()),
                ..entry.clone()
            },
        };
        self.locks.with(
            &StorageKey::weekly(Some(&self.user_id), entry.week),
            || self.backend.upsert_weekly(&row),
        )?;
        self.invalidate();
        Ok(())
    }

    // ─── Agenda ─────────────────────────────────────────────────────────────

    /// All agenda items, earliest first.
    pub fn agenda(&self) -> Result<Vec<AgendaItem>> {
        let mut items: Vec<AgendaItem> = self
            .backend
            .agenda(&self.user_id)?
            .into_iter()
            .filter_map(agenda_from_row)
            .collect();
        items.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        Ok(items)
    }

    pub fn add_agenda(&self, new: NewAgendaItem) -> Result<AgendaItem> {
        if new.title.trim().is_empty() {
            return Err(LedgerError::validation("Agenda needs a title").into());
        }
        let item = AgendaItem {
            id: new_id(),
            title: new.title.trim().to_string(),
            date: new.date,
            time: new.time,
            category: new.category,
            reminder: new.reminder,
            notes: clean_text(new.notes),
        };
        self.backend.insert_agenda(&agenda_to_row(&self.user_id, &item))?;
        log::debug!("Agenda {} added for {}", item.id, self.user_id);
        self.invalidate();
        Ok(item)
    }

    pub fn update_agenda(&self, id: &str, patch: AgendaPatch) -> Result<bool> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(LedgerError::validation("Agenda needs a title").into());
        }
        let Some(mut item) = self.agenda()?.into_iter().find(|a| a.id == id) else {
            return Ok(false);
        };
        if let Some(title) = patch.title {
            item.title = title.trim().to_string();
        }
        if let Some(date) = patch.date {
            item.date = date;
        }
        if let Some(time) = patch.time {
            item.time = time;
        }
        if let Some(category) = patch.category {
            item.category = category;
        }
        if let Some(reminder) = patch.reminder {
            item.reminder = reminder;
        }
        if patch.notes.is_some() {
            item.notes = clean_text(patch.notes);
        }
        let found = self
            .backend
            .update_agenda(&agenda_to_row(&self.user_id, &item))?;
        self.invalidate();
        Ok(found)
    }

    pub fn delete_agenda(&self, id: &str) -> Result<()> {
        self.backend.delete_agenda(&self.user_id, id)?;
        self.invalidate();
        Ok(())
    }

    // ─── Targets ────────────────────────────────────────────────────────────

    pub fn targets(&self) -> Result<DailyTargets> {
        Ok(self
            .backend
            .targets(&self.user_id)?
            .map(|row| row.targets)
            .unwrap_or_default())
    }

    pub fn set_targets(&self, targets: DailyTargets) -> Result<DailyTargets> {
        let targets = targets.normalized();
        if targets.verse_target == Some(0) {
            return Err(LedgerError::validation("Verse target must be at least 1").into());
        }
        if let Some(amount) = targets.charity_target {
            validate_amount(amount, "Charity target")?;
        }
        let row = TargetsRow {
            user_id: self.user_id.clone(),
            targets: targets.clone(),
        };
        self.locks.with(
            &StorageKey::collection(Some(&self.user_id), Category::Targets),
            || self.backend.upsert_targets(&row),
        )?;
        self.invalidate();
        Ok(targets)
    }

    // ─── Snapshot ───────────────────────────────────────────────────────────

    /// Cached view of every record; loads on first use after invalidation.
    pub fn snapshot(&self) -> Result<Snapshot> {
        if let Some(snapshot) = self.cache().snapshot.as_ref() {
            return Ok(snapshot.clone());
        }
        self.refresh()
    }

    /// Reloads the snapshot from the backend. The result is cached only if
    /// no write invalidated the cache while it was loading.
    pub fn refresh(&self) -> Result<Snapshot> {
        let generation = self.cache().generation;
        let snapshot = self.load_snapshot()?;
        let mut cache = self.cache();
        if cache.generation == generation {
            cache.snapshot = Some(snapshot.clone());
        } else {
            log::debug!("Snapshot for {} went stale while loading", self.user_id);
        }
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        let mut cache = self.cache();
        cache.generation = cache.generation.wrapping_add(1);
        cache.snapshot = None;
    }

    fn load_snapshot(&self) -> Result<Snapshot> {
        let user = &self.user_id;
        Ok(Snapshot {
            prayer_days: self
                .backend
                .all_daily(user)?
                .iter()
                .map(expand_prayer_day)
                .collect(),
            fasting_days: self
                .backend
                .all_fasting(user)?
                .iter()
                .map(expand_fasting_day)
                .collect(),
            recitations: self.recitations(None)?,
            donations: self
                .backend
                .donations(
                    user,
                    &[
                        DonationKind::Charity,
                        DonationKind::ZakatFitrah,
                        DonationKind::ZakatMaal,
                    ],
                    None,
                )?
                .into_iter()
                .filter_map(donation_from_row)
                .collect(),
            agenda: self.agenda()?,
        })
    }

    pub fn totals(&self) -> Result<Totals> {
        Ok(Totals::compute(&self.snapshot()?))
    }
}

fn validate_mark(mark: &PrayerMark) -> Result<()> {
    if !mark.performed && mark.reason.as_deref().is_some_and(|r| r.trim().is_empty()) {
        return Err(LedgerError::validation("A skip reason cannot be blank").into());
    }
    Ok(())
}

fn validate_recitation(new: &NewRecitation) -> Result<()> {
    if new.surah.trim().is_empty() {
        return Err(LedgerError::validation("Surah is required").into());
    }
    if new.from_ayah == 0 {
        return Err(LedgerError::validation("Verses are numbered from 1").into());
    }
    if new.to_ayah > MAX_AYAH {
        return Err(LedgerError::validation(format!(
            "No surah has more than {} verses",
            MAX_AYAH
        ))
        .into());
    }
    if new.to_ayah < new.from_ayah {
        return Err(LedgerError::validation(format!(
            "End verse {} is before start verse {}",
            new.to_ayah, new.from_ayah
        ))
        .into());
    }
    Ok(())
}

fn validate_amount(amount: f64, what: &str) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::validation(format!("{} must be greater than zero", what)).into());
    }
    Ok(())
}

/// Stored timestamps keep whole seconds only.
fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::backend::{AccountRow, AgendaRow, FastingRow};
    use crate::db::json_file::JsonFileBackend;
    use crate::db::sqlite::SqliteBackend;
    use crate::models::{AgendaCategory, CharityChannel, ZakatChannel, ZakatKind};
    use std::sync::Barrier;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn sqlite_ledger() -> Ledger {
        Ledger::new(Arc::new(SqliteBackend::open_in_memory().unwrap()), Some("u1"), None)
    }

    fn is_validation(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Validation(_)))
    }

    fn check_defaults(ledger: &Ledger) {
        let d = date("2026-03-07");
        assert_eq!(ledger.prayer_day(d).unwrap(), PrayerDay::empty(d));
        assert_eq!(
            ledger.supplementary_day(d).unwrap(),
            SupplementaryPrayerDay::empty(d)
        );
        assert_eq!(ledger.fasting_day(d).unwrap(), FastingDay::empty(d));
        assert_eq!(ledger.weekly_entry(2).unwrap(), WeeklyEntry::empty(2));
        assert_eq!(ledger.targets().unwrap(), DailyTargets::default());
        assert!(ledger.recitations(Some(d)).unwrap().is_empty());
        assert!(ledger.charity(Some(d)).unwrap().is_empty());
        assert!(ledger.zakat_payments().unwrap().is_empty());
        assert!(ledger.agenda().unwrap().is_empty());
        assert_eq!(ledger.totals().unwrap(), Totals::default());
    }

    #[test]
    fn missing_records_read_as_defaults_on_both_backends() {
        check_defaults(&sqlite_ledger());

        let dir = tempfile::tempdir().unwrap();
        let json = JsonFileBackend::open(&dir.path().join("ledger.json")).unwrap();
        check_defaults(&Ledger::new(Arc::new(json), None, None));
    }

    #[test]
    fn sequential_marks_on_one_date_keep_both_changes() {
        let ledger = sqlite_ledger();
        let d = date("2026-03-03");
        ledger.mark_prayer(d, Prayer::Fajr, PrayerMark::done()).unwrap();
        ledger
            .mark_prayer(d, Prayer::Dhuhr, PrayerMark::skipped("meeting"))
            .unwrap();
        ledger
            .mark_supplementary(d, SupplementaryPrayer::Dhuha, true, Some(4))
            .unwrap();

        let day = ledger.prayer_day(d).unwrap();
        assert_eq!(day.fajr, PrayerMark::done());
        assert_eq!(day.dhuhr, PrayerMark::skipped("meeting"));
        let sunnah = ledger.supplementary_day(d).unwrap();
        assert!(sunnah.dhuha.performed);
        assert_eq!(sunnah.dhuha.rakaat, 4);
    }

    #[test]
    fn whole_day_updates() {
        let dir = tempfile::tempdir().unwrap();
        let json = JsonFileBackend::open(&dir.path().join("ledger.json")).unwrap();
        let ledger = Ledger::new(Arc::new(json), Some("u1"), None);
        let d = date("2026-03-05");

        let mut day = PrayerDay::empty(d);
        day.maghrib = PrayerMark::done();
        day.isha = PrayerMark::skipped("sick");
        ledger.update_prayer_day(&day).unwrap();
        assert_eq!(ledger.prayer_day(d).unwrap(), day);

        let mut sunnah = ledger.supplementary_day(d).unwrap();
        sunnah.taraweeh.performed = true;
        sunnah.taraweeh.rakaat = 20;
        ledger.update_supplementary_day(&sunnah).unwrap();
        assert_eq!(ledger.supplementary_day(d).unwrap(), sunnah);
        assert_eq!(ledger.prayer_day(d).unwrap(), day);

        day.fajr = PrayerMark::skipped("  ");
        assert!(is_validation(&ledger.update_prayer_day(&day).unwrap_err()));
    }

    #[test]
    fn concurrent_marks_on_one_date_are_not_lost() {
        let ledger = sqlite_ledger();
        for round in 0..10u32 {
            let d = date("2026-03-01") + chrono::Duration::days(round as i64);
            let barrier = Barrier::new(9);
            std::thread::scope(|s| {
                for prayer in Prayer::all() {
                    let (ledger, barrier) = (&ledger, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        let mark = if prayer == Prayer::Asr {
                            PrayerMark::skipped("travel")
                        } else {
                            PrayerMark::done()
                        };
                        ledger.mark_prayer(d, prayer, mark).unwrap();
                    });
                }
                for kind in SupplementaryPrayer::all() {
                    let (ledger, barrier) = (&ledger, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        ledger.mark_supplementary(d, kind, true, Some(11)).unwrap();
                    });
                }
            });

            let day = ledger.prayer_day(d).unwrap();
            assert_eq!(day.performed_count(), 4, "round {}", round);
            assert_eq!(day.asr, PrayerMark::skipped("travel"));
            let sunnah = ledger.supplementary_day(d).unwrap();
            for kind in SupplementaryPrayer::all() {
                assert!(sunnah.get(kind).performed);
                assert_eq!(sunnah.get(kind).rakaat, 11);
            }
        }
    }

    #[test]
    fn recitation_count_is_derived() {
        let ledger = sqlite_ledger();
        let entry = ledger
            .add_recitation(NewRecitation {
                date: date("2026-03-02"),
                surah: "Al-Mulk".into(),
                from_ayah: 5,
                to_ayah: 12,
            })
            .unwrap();
        assert_eq!(entry.ayah_count, 8);
        assert_eq!(ledger.recitations(Some(date("2026-03-02"))).unwrap(), vec![entry.clone()]);

        assert!(ledger
            .edit_recitation(
                &entry.id,
                NewRecitation {
                    date: date("2026-03-02"),
                    surah: "Al-Mulk".into(),
                    from_ayah: 1,
                    to_ayah: 30,
                },
            )
            .unwrap());
        assert_eq!(ledger.totals().unwrap().verses, 30);
        assert_eq!(ledger.recitations(None).unwrap()[0].created_at, entry.created_at);

        assert!(!ledger
            .edit_recitation(
                "missing",
                NewRecitation {
                    date: date("2026-03-02"),
                    surah: "Al-Mulk".into(),
                    from_ayah: 1,
                    to_ayah: 3,
                },
            )
            .unwrap());

        ledger.delete_recitation(&entry.id).unwrap();
        ledger.delete_recitation(&entry.id).unwrap();
        assert!(ledger.recitations(None).unwrap().is_empty());
    }

    #[test]
    fn invalid_input_is_rejected_before_storage() {
        let ledger = sqlite_ledger();
        let err = ledger
            .add_recitation(NewRecitation {
                date: date("2026-03-02"),
                surah: "Yasin".into(),
                from_ayah: 12,
                to_ayah: 5,
            })
            .unwrap_err();
        assert!(is_validation(&err));

        let err = ledger
            .add_recitation(NewRecitation {
                date: date("2026-03-02"),
                surah: "Al-Baqarah".into(),
                from_ayah: 1,
                to_ayah: u32::MAX,
            })
            .unwrap_err();
        assert!(is_validation(&err));

        let err = ledger
            .add_charity(NewCharity {
                date: date("2026-03-02"),
                amount: 0.0,
                channel: CharityChannel::Online,
                notes: None,
            })
            .unwrap_err();
        assert!(is_validation(&err));

        assert!(ledger.recitations(None).unwrap().is_empty());
        assert!(ledger.charity(None).unwrap().is_empty());
    }

    #[test]
    fn zakat_total_and_tag_separation() {
        let ledger = sqlite_ledger();
        let charity = ledger
            .add_charity(NewCharity {
                date: date("2026-03-10"),
                amount: 25_000.0,
                channel: CharityChannel::Masjid,
                notes: Some("  kotak amal ".into()),
            })
            .unwrap();
        assert_eq!(charity.notes.as_deref(), Some("kotak amal"));

        let zakat = ledger
            .add_zakat(NewZakat {
                kind: ZakatKind::Fitrah,
                paid_on: date("2026-03-28"),
                paid_at: time("07:15"),
                channel: ZakatChannel::Masjid,
                people: 4,
                amount_per_person: 12_500.0,
                notes: None,
            })
            .unwrap();
        assert_eq!(zakat.total_amount, 50_000.0);
        ledger
            .add_zakat(NewZakat {
                kind: ZakatKind::Maal,
                paid_on: date("2026-03-29"),
                paid_at: time("09:00"),
                channel: ZakatChannel::Laz,
                people: 1,
                amount_per_person: 75_000.0,
                notes: None,
            })
            .unwrap();

        let totals = ledger.totals().unwrap();
        assert_eq!(totals.charity, 25_000.0);
        assert_eq!(totals.zakat, 125_000.0);
        assert_eq!(ledger.charity(None).unwrap().len(), 1);
        assert_eq!(ledger.zakat_payments().unwrap().len(), 2);

        ledger.delete_charity(&zakat.id).unwrap();
        assert_eq!(ledger.zakat_payments().unwrap().len(), 2);
        assert!(!ledger
            .update_charity(&zakat.id, CharityPatch {
                amount: Some(1.0),
                ..CharityPatch::default()
            })
            .unwrap());
    }

    #[test]
    fn charity_patch_touches_only_given_fields() {
        let ledger = sqlite_ledger();
        let entry = ledger
            .add_charity(NewCharity {
                date: date("2026-03-10"),
                amount: 10_000.0,
                channel: CharityChannel::Direct,
                notes: Some("tetangga".into()),
            })
            .unwrap();
        assert!(ledger
            .update_charity(&entry.id, CharityPatch {
                amount: Some(15_000.0),
                ..CharityPatch::default()
            })
            .unwrap());
        let stored = &ledger.charity(Some(date("2026-03-10"))).unwrap()[0];
        assert_eq!(stored.amount, 15_000.0);
        assert_eq!(stored.channel, CharityChannel::Direct);
        assert_eq!(stored.notes.as_deref(), Some("tetangga"));
    }

    #[test]
    fn fasting_reason_depends_on_sex() {
        let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let male = Ledger::new(Arc::clone(&backend), Some("m"), Some(Sex::Male));
        let female = Ledger::new(backend, Some("f"), Some(Sex::Female));
        let d = date("2026-03-04");

        let err = male
            .mark_fasting(d, Err(FastingReason::Menstruation))
            .unwrap_err();
        assert!(is_validation(&err));
        assert_eq!(male.fasting_day(d).unwrap(), FastingDay::empty(d));

        let day = female
            .mark_fasting(d, Err(FastingReason::Menstruation))
            .unwrap();
        assert_eq!(day.reason, Some(FastingReason::Menstruation));

        let day = female.mark_fasting(d, Ok(())).unwrap();
        assert!(day.fasting);
        assert_eq!(day.reason, None);
    }

    #[test]
    fn sahur_needs_a_time_and_keeps_fasting_flag() {
        let ledger = sqlite_ledger();
        let d = date("2026-03-04");
        ledger.mark_fasting(d, Ok(())).unwrap();
        let day = ledger.mark_sahur(d, Some(time("03:50"))).unwrap();
        assert!(day.sahur && day.fasting);
        assert_eq!(day.sahur_time, Some(time("03:50")));

        let mut broken = day.clone();
        broken.sahur_time = None;
        assert!(is_validation(&ledger.update_fasting_day(&broken).unwrap_err()));

        let day = ledger.mark_sahur(d, None).unwrap();
        assert!(!day.sahur);
        assert_eq!(day.sahur_time, None);
        assert_eq!(ledger.totals().unwrap().fasting_days, 1);
    }

    #[test]
    fn agenda_sorted_and_patchable() {
        let ledger = sqlite_ledger();
        let add = |title: &str, d: &str, t: &str| {
            ledger
                .add_agenda(NewAgendaItem {
                    title: title.into(),
                    date: date(d),
                    time: time(t),
                    category: AgendaCategory::Kajian,
                    reminder: true,
                    notes: None,
                })
                .unwrap()
        };
        add("Bukber", "2026-03-12", "18:00");
        let first = add("Kajian subuh", "2026-03-10", "05:00");
        add("Tarawih", "2026-03-10", "19:30");

        let titles: Vec<_> = ledger.agenda().unwrap().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["Kajian subuh", "Tarawih", "Bukber"]);

        assert!(ledger
            .update_agenda(&first.id, AgendaPatch {
                date: Some(date("2026-03-13")),
                ..AgendaPatch::default()
            })
            .unwrap());
        let last = ledger.agenda().unwrap().pop().unwrap();
        assert_eq!(last.id, first.id);
        assert_eq!(last.time, time("05:00"));

        ledger.delete_agenda(&first.id).unwrap();
        ledger.delete_agenda(&first.id).unwrap();
        assert_eq!(ledger.agenda().unwrap().len(), 2);
        assert!(!ledger.update_agenda("missing", AgendaPatch::default()).unwrap());
    }

    #[test]
    fn weekly_and_targets_upsert() {
        let ledger = sqlite_ledger();
        let mut week = ledger.weekly_entry(3).unwrap();
        week.friday_prayer = true;
        week.sermon_note = Some("Sabar dan syukur".into());
        ledger.update_weekly_entry(&week).unwrap();
        week.family_visit = true;
        ledger.update_weekly_entry(&week).unwrap();
        assert_eq!(ledger.weekly_entry(3).unwrap(), week);
        assert!(is_validation(
            &ledger.update_weekly_entry(&WeeklyEntry::empty(0)).unwrap_err()
        ));

        let saved = ledger
            .set_targets(DailyTargets {
                daily_recitation: false,
                verse_target: Some(100),
                daily_charity: true,
                charity_target: Some(10_000.0),
                ..DailyTargets::default()
            })
            .unwrap();
        assert_eq!(saved.verse_target, None);
        assert_eq!(ledger.targets().unwrap(), saved);
    }

    #[test]
    fn snapshot_cached_until_invalidated() {
        let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let reader = Ledger::new(Arc::clone(&backend), Some("u1"), None);
        let writer = Ledger::new(backend, Some("u1"), None);
        let d = date("2026-03-01");

        assert_eq!(reader.totals().unwrap().prayers, 0);
        writer.mark_prayer(d, Prayer::Isha, PrayerMark::done()).unwrap();
        assert_eq!(reader.totals().unwrap().prayers, 0);
        reader.refresh().unwrap();
        assert_eq!(reader.totals().unwrap().prayers, 1);

        reader.mark_prayer(d, Prayer::Fajr, PrayerMark::done()).unwrap();
        assert_eq!(reader.totals().unwrap().prayers, 2);
    }

    /// Pauses the first `all_daily` after reading, until the test lets it go.
    struct PausingBackend {
        inner: SqliteBackend,
        armed: std::sync::atomic::AtomicBool,
        loaded: Barrier,
        resume: Barrier,
    }

    impl PausingBackend {
        fn new() -> Self {
            Self {
                inner: SqliteBackend::open_in_memory().unwrap(),
                armed: std::sync::atomic::AtomicBool::new(true),
                loaded: Barrier::new(2),
                resume: Barrier::new(2),
            }
        }
    }

    impl Backend for PausingBackend {
        fn daily(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyRow>> {
            self.inner.daily(user_id, date)
        }
        fn all_daily(&self, user_id: &str) -> Result<Vec<DailyRow>> {
            let rows = self.inner.all_daily(user_id)?;
            if self.armed.swap(false, std::sync::atomic::Ordering::SeqCst) {
                self.loaded.wait();
                self.resume.wait();
            }
            Ok(rows)
        }
        fn upsert_daily(&self, row: &DailyRow) -> Result<()> {
            self.inner.upsert_daily(row)
        }
        fn fasting(&self, user_id: &str, date: NaiveDate) -> Result<Option<FastingRow>> {
            self.inner.fasting(user_id, date)
        }
        fn all_fasting(&self, user_id: &str) -> Result<Vec<FastingRow>> {
            self.inner.all_fasting(user_id)
        }
        fn upsert_fasting(&self, row: &FastingRow) -> Result<()> {
            self.inner.upsert_fasting(row)
        }
        fn recitations(
            &self,
            user_id: &str,
            date: Option<NaiveDate>,
        ) -> Result<Vec<RecitationRow>> {
            self.inner.recitations(user_id, date)
        }
        fn insert_recitation(&self, row: &RecitationRow) -> Result<()> {
            self.inner.insert_recitation(row)
        }
        fn update_recitation(&self, row: &RecitationRow) -> Result<bool> {
            self.inner.update_recitation(row)
        }
        fn delete_recitation(&self, user_id: &str, id: &str) -> Result<bool> {
            self.inner.delete_recitation(user_id, id)
        }
        fn donations(
            &self,
            user_id: &str,
            kinds: &[DonationKind],
            date: Option<NaiveDate>,
        ) -> Result<Vec<DonationRow>> {
            self.inner.donations(user_id, kinds, date)
        }
        fn insert_donation(&self, row: &DonationRow) -> Result<()> {
            self.inner.insert_donation(row)
        }
        fn update_donation(&self, row: &DonationRow, kinds: &[DonationKind]) -> Result<bool> {
            self.inner.update_donation(row, kinds)
        }
        fn delete_donation(&self, user_id: &str, id: &str, kinds: &[DonationKind]) -> Result<bool> {
            self.inner.delete_donation(user_id, id, kinds)
        }
        fn weekly(&self, user_id: &str, week: u8) -> Result<Option<WeeklyRow>> {
            self.inner.weekly(user_id, week)
        }
        fn upsert_weekly(&self, row: &WeeklyRow) -> Result<()> {
            self.inner.upsert_weekly(row)
        }
        fn agenda(&self, user_id: &str) -> Result<Vec<AgendaRow>> {
            self.inner.agenda(user_id)
        }
        fn insert_agenda(&self, row: &AgendaRow) -> Result<()> {
            self.inner.insert_agenda(row)
        }
        fn update_agenda(&self, row: &AgendaRow) -> Result<bool> {
            self.inner.update_agenda(row)
        }
        fn delete_agenda(&self, user_id: &str, id: &str) -> Result<bool> {
            self.inner.delete_agenda(user_id, id)
        }
        fn targets(&self, user_id: &str) -> Result<Option<TargetsRow>> {
            self.inner.targets(user_id)
        }
        fn upsert_targets(&self, row: &TargetsRow) -> Result<()> {
            self.inner.upsert_targets(row)
        }
        fn account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
            self.inner.account_by_email(email)
        }
        fn account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
            self.inner.account_by_id(id)
        }
        fn insert_account(&self, row: &AccountRow) -> Result<bool> {
            self.inner.insert_account(row)
        }
        fn session(&self) -> Result<Option<String>> {
            self.inner.session()
        }
        fn set_session(&self, user_id: Option<&str>) -> Result<()> {
            self.inner.set_session(user_id)
        }
    }

    #[test]
    fn write_during_refresh_is_not_hidden_by_the_cache() {
        let backend = Arc::new(PausingBackend::new());
        let ledger = Ledger::new(backend.clone(), Some("u1"), None);
        let d = date("2026-03-01");

        std::thread::scope(|s| {
            let reader = s.spawn(|| ledger.refresh().unwrap());
            backend.loaded.wait();
            ledger.mark_prayer(d, Prayer::Fajr, PrayerMark::done()).unwrap();
            backend.resume.wait();
            let loaded = reader.join().unwrap();
            assert!(loaded.prayer_days.is_empty());
        });
        assert_eq!(ledger.totals().unwrap().prayers, 1);
    }

    #[test]
    fn users_do_not_see_each_other() {
        let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let a = Ledger::new(Arc::clone(&backend), Some("a"), None);
        let b = Ledger::new(backend, Some("b"), None);
        a.add_charity(NewCharity {
            date: date("2026-03-01"),
            amount: 5_000.0,
            channel: CharityChannel::Online,
            notes: None,
        })
        .unwrap();
        assert!(b.charity(None).unwrap().is_empty());
        assert_eq!(b.totals().unwrap().charity, 0.0);
    }
}
