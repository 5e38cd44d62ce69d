use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::db::backend::{
    AccountRow, AgendaRow, Backend, DailyRow, DonationRow, FastingRow, RecitationRow, TargetsRow,
    WeeklyRow,
};
use crate::db::migrations::run_migrations;
use crate::models::{DailyTargets, DonationKind, FastingReason, Madhab, Sex, WeeklyEntry};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const STAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S";

const SESSION_KEY: &str = "session_user";

fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn fmt_time(t: NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}

fn fmt_stamp(t: NaiveDateTime) -> String {
    t.format(STAMP_FMT).to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn parse_stamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, STAMP_FMT).ok()
}

/// Placeholders `?{start}, ?{start+1}, …` for an IN list.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("Opening database at {:?}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ─── Row decoding ────────────────────────────────────────────────────────────

fn daily_from_row(row: &Row) -> rusqlite::Result<(String, String, [bool; 9], Option<String>)> {
    let mut flags = [false; 9];
    for (i, flag) in flags.iter_mut().enumerate() {
        *flag = row.get::<_, i64>(2 + i)? != 0;
    }
    Ok((row.get(0)?, row.get(1)?, flags, row.get(11)?))
}

fn daily_decode(raw: (String, String, [bool; 9], Option<String>)) -> Option<DailyRow> {
    let (user_id, date, f, extras) = raw;
    let Some(date) = parse_date(&date) else {
        log::warn!("Skipping daily row with bad date '{}'", date);
        return None;
    };
    Some(DailyRow {
        user_id,
        date,
        fajr: f[0],
        dhuhr: f[1],
        asr: f[2],
        maghrib: f[3],
        isha: f[4],
        dhuha: f[5],
        taraweeh: f[6],
        tahajjud: f[7],
        witr: f[8],
        extras,
    })
}

const DAILY_COLUMNS: &str = "user_id, date, fajr, dhuhr, asr, maghrib, isha,
                             dhuha, taraweeh, tahajjud, witr, extras";

type FastingRaw = (String, String, bool, Option<String>, bool, Option<String>);

fn fasting_from_row(row: &Row) -> rusqlite::Result<FastingRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get::<_, i64>(2)? != 0,
        row.get(3)?,
        row.get::<_, i64>(4)? != 0,
        row.get(5)?,
    ))
}

fn fasting_decode(raw: FastingRaw) -> Option<FastingRow> {
    let (user_id, date, sahur, sahur_time, fasting, reason) = raw;
    let Some(date) = parse_date(&date) else {
        log::warn!("Skipping fasting row with bad date '{}'", date);
        return None;
    };
    Some(FastingRow {
        user_id,
        date,
        sahur,
        sahur_time: sahur_time.as_deref().and_then(parse_time),
        fasting,
        reason: reason.as_deref().and_then(|r| FastingReason::from_str(r).ok()),
    })
}

type RecitationRaw = (String, String, String, String, i64, i64, i64, String);

fn recitation_from_row(row: &Row) -> rusqlite::Result<RecitationRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn recitation_decode(raw: RecitationRaw) -> Option<RecitationRow> {
    let (id, user_id, date, surah, from, to, count, created_at) = raw;
    let (Some(date), Some(created_at)) = (parse_date(&date), parse_stamp(&created_at)) else {
        log::warn!("Skipping recitation {} with bad timestamps", id);
        return None;
    };
    Some(RecitationRow {
        id,
        user_id,
        date,
        surah,
        from_ayah: u32::try_from(from).ok()?,
        to_ayah: u32::try_from(to).ok()?,
        ayah_count: u32::try_from(count).ok()?,
        created_at,
    })
}

const DONATION_COLUMNS: &str = "id, user_id, kind, amount, channel, people, amount_per_person,
                                date, time, notes, created_at";

type DonationRaw = (
    String,
    String,
    String,
    f64,
    String,
    Option<i64>,
    Option<f64>,
    String,
    Option<String>,
    Option<String>,
    String,
);

fn donation_from_row(row: &Row) -> rusqlite::Result<DonationRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn donation_decode(raw: DonationRaw) -> Option<DonationRow> {
    let (id, user_id, kind, amount, channel, people, per_person, date, time, notes, created_at) =
        raw;
    let Ok(kind) = DonationKind::from_str(&kind) else {
        log::warn!("Skipping donation {} with unknown kind '{}'", id, kind);
        return None;
    };
    let (Some(date), Some(created_at)) = (parse_date(&date), parse_stamp(&created_at)) else {
        log::warn!("Skipping donation {} with bad timestamps", id);
        return None;
    };
    Some(DonationRow {
        id,
        user_id,
        kind,
        amount,
        channel,
        people: people.and_then(|p| u32::try_from(p).ok()),
        amount_per_person: per_person,
        date,
        time: time.as_deref().and_then(parse_time),
        notes,
        created_at,
    })
}

fn agenda_from_row(row: &Row) -> rusqlite::Result<AgendaRow> {
    Ok(AgendaRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        starts_at: row.get(3)?,
        category: row.get(4)?,
        reminder: row.get::<_, i64>(5)? != 0,
        notes: row.get(6)?,
    })
}

type AccountRaw = (String, String, String, String, String, i64, String, String, String);

fn account_from_row(row: &Row) -> rusqlite::Result<AccountRaw> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn account_decode(raw: AccountRaw) -> Option<AccountRow> {
    let (id, email, password_hash, salt, full_name, age, sex, madhab, created_at) = raw;
    let (Ok(sex), Ok(madhab), Some(created_at)) = (
        Sex::from_str(&sex),
        Madhab::from_str(&madhab),
        parse_stamp(&created_at),
    ) else {
        log::warn!("Account {} has an unreadable profile", id);
        return None;
    };
    Some(AccountRow {
        id,
        email,
        password_hash,
        salt,
        full_name,
        age: u32::try_from(age).unwrap_or(0),
        sex,
        madhab,
        created_at,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, salt, full_name, age, sex, madhab, created_at";

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteBackend {
    fn daily(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyRow>> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM daily_records WHERE user_id = ?1 AND date = ?2",
                    DAILY_COLUMNS
                ),
                params![user_id, fmt_date(date)],
                daily_from_row,
            )
            .optional()?;
        Ok(raw.and_then(daily_decode))
    }

    fn all_daily(&self, user_id: &str) -> Result<Vec<DailyRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_records WHERE user_id = ?1 ORDER BY date",
            DAILY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![user_id], daily_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(daily_decode).collect())
    }

    fn upsert_daily(&self, row: &DailyRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO daily_records
                (user_id, date, fajr, dhuhr, asr, maghrib, isha,
                 dhuha, taraweeh, tahajjud, witr, extras)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(user_id, date) DO UPDATE SET
                fajr = ?3, dhuhr = ?4, asr = ?5, maghrib = ?6, isha = ?7,
                dhuha = ?8, taraweeh = ?9, tahajjud = ?10, witr = ?11, extras = ?12",
            params![
                row.user_id,
                fmt_date(row.date),
                row.fajr,
                row.dhuhr,
                row.asr,
                row.maghrib,
                row.isha,
                row.dhuha,
                row.taraweeh,
                row.tahajjud,
                row.witr,
                row.extras,
            ],
        )?;
        Ok(())
    }

    fn fasting(&self, user_id: &str, date: NaiveDate) -> Result<Option<FastingRow>> {
        let conn = self.conn();
        let raw = conn
            .query_row(
                "SELECT user_id, date, sahur, sahur_time, fasting, reason
                 FROM fasting_days WHERE user_id = ?1 AND date = ?2",
                params![user_id, fmt_date(date)],
                fasting_from_row,
            )
            .optional()?;
        Ok(raw.and_then(fasting_decode))
    }

    fn all_fasting(&self, user_id: &str) -> Result<Vec<FastingRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, date, sahur, sahur_time, fasting, reason
             FROM fasting_days WHERE user_id = ?1 ORDER BY date",
        )?;
        let rows = stmt
            .query_map(params![user_id], fasting_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(fasting_decode).collect())
    }

    fn upsert_fasting(&self, row: &FastingRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO fasting_days (user_id, date, sahur, sahur_time, fasting, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, date) DO UPDATE SET
                sahur = ?3, sahur_time = ?4, fasting = ?5, reason = ?6",
            params![
                row.user_id,
                fmt_date(row.date),
                row.sahur,
                row.sahur_time.map(fmt_time),
                row.fasting,
                row.reason.map(|r| r.as_str()),
            ],
        )?;
        Ok(())
    }

    fn recitations(&self, user_id: &str, date: Option<NaiveDate>) -> Result<Vec<RecitationRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, date, surah, from_ayah, to_ayah, ayah_count, created_at
             FROM recitations
             WHERE user_id = ?1 AND (?2 IS NULL OR date = ?2)
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![user_id, date.map(fmt_date)], recitation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(recitation_decode).collect())
    }

    fn insert_recitation(&self, row: &RecitationRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO recitations
                (id, user_id, date, surah, from_ayah, to_ayah, ayah_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.id,
                row.user_id,
                fmt_date(row.date),
                row.surah,
                row.from_ayah,
                row.to_ayah,
                row.ayah_count,
                fmt_stamp(row.created_at),
            ],
        )?;
        Ok(())
    }

    fn update_recitation(&self, row: &RecitationRow) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE recitations
             SET date = ?3, surah = ?4, from_ayah = ?5, to_ayah = ?6, ayah_count = ?7
             WHERE id = ?1 AND user_id = ?2",
            params![
                row.id,
                row.user_id,
                fmt_date(row.date),
                row.surah,
                row.from_ayah,
                row.to_ayah,
                row.ayah_count,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_recitation(&self, user_id: &str, id: &str) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM recitations WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn donations(
        &self,
        user_id: &str,
        kinds: &[DonationKind],
        date: Option<NaiveDate>,
    ) -> Result<Vec<DonationRow>> {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM donations
             WHERE user_id = ?1 AND (?2 IS NULL OR date = ?2) AND kind IN ({})
             ORDER BY date, created_at, id",
            DONATION_COLUMNS,
            placeholders(3, kinds.len())
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(user_id.to_string()), Box::new(date.map(fmt_date))];
        values.extend(
            kinds
                .iter()
                .map(|k| Box::new(k.as_str()) as Box<dyn rusqlite::ToSql>),
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
                donation_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows.into_iter().filter_map(donation_decode).collect())
    }

    fn insert_donation(&self, row: &DonationRow) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO donations ({})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                DONATION_COLUMNS
            ),
            params![
                row.id,
                row.user_id,
                row.kind.as_str(),
                row.amount,
                row.channel,
                row.people,
                row.amount_per_person,
                fmt_date(row.date),
                row.time.map(fmt_time),
                row.notes,
                fmt_stamp(row.created_at),
            ],
        )?;
        Ok(())
    }

    fn update_donation(&self, row: &DonationRow, kinds: &[DonationKind]) -> Result<bool> {
        if !kinds.contains(&row.kind) {
            return Ok(false);
        }
        let sql = format!(
            "UPDATE donations
             SET amount = ?3, channel = ?4, people = ?5, amount_per_person = ?6,
                 date = ?7, time = ?8, notes = ?9
             WHERE id = ?1 AND user_id = ?2 AND kind IN ({})",
            placeholders(10, kinds.len())
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(row.id.clone()),
            Box::new(row.user_id.clone()),
            Box::new(row.amount),
            Box::new(row.channel.clone()),
            Box::new(row.people),
            Box::new(row.amount_per_person),
            Box::new(fmt_date(row.date)),
            Box::new(row.time.map(fmt_time)),
            Box::new(row.notes.clone()),
        ];
        values.extend(
            kinds
                .iter()
                .map(|k| Box::new(k.as_str()) as Box<dyn rusqlite::ToSql>),
        );
        let changed = self.conn().execute(
            &sql,
            rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
        )?;
        Ok(changed > 0)
    }

    fn delete_donation(&self, user_id: &str, id: &str, kinds: &[DonationKind]) -> Result<bool> {
        if kinds.is_empty() {
            return Ok(false);
        }
        let sql = format!(
            "DELETE FROM donations WHERE id = ?1 AND user_id = ?2 AND kind IN ({})",
            placeholders(3, kinds.len())
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(id.to_string()), Box::new(user_id.to_string())];
        values.extend(
            kinds
                .iter()
                .map(|k| Box::new(k.as_str()) as Box<dyn rusqlite::ToSql>),
        );
        let changed = self.conn().execute(
            &sql,
            rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
        )?;
        Ok(changed > 0)
    }

    fn weekly(&self, user_id: &str, week: u8) -> Result<Option<WeeklyRow>> {
        self.conn()
            .query_row(
                "SELECT friday_prayer, sermon_note, study_circle, family_visit, social_service
                 FROM weekly_entries WHERE user_id = ?1 AND week = ?2",
                params![user_id, week],
                |row| {
                    Ok(WeeklyRow {
                        user_id: user_id.to_string(),
                        entry: WeeklyEntry {
                            week,
                            friday_prayer: row.get::<_, i64>(0)? != 0,
                            sermon_note: row.get(1)?,
                            study_circle: row.get::<_, i64>(2)? != 0,
                            family_visit: row.get::<_, i64>(3)? != 0,
                            social_service: row.get::<_, i64>(4)? != 0,
                        },
                    })
                },
            )
            .optional()
            .map_err(anyhow::Error::from)
    }

    fn upsert_weekly(&self, row: &WeeklyRow) -> Result<()> {
        let e = &row.entry;
        self.conn().execute(
            "INSERT INTO weekly_entries
                (user_id, week, friday_prayer, sermon_note, study_circle, family_visit, social_service)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, week) DO UPDATE SET
                friday_prayer = ?3, sermon_note = ?4, study_circle = ?5,
                family_visit = ?6, social_service = ?7",
            params![
                row.user_id,
                e.week,
                e.friday_prayer,
                e.sermon_note,
                e.study_circle,
                e.family_visit,
                e.social_service,
            ],
        )?;
        Ok(())
    }

    fn agenda(&self, user_id: &str) -> Result<Vec<AgendaRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, starts_at, category, reminder, notes
             FROM agenda_items WHERE user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], agenda_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn insert_agenda(&self, row: &AgendaRow) -> Result<()> {
        self.conn().execute(
            "INSERT INTO agenda_items (id, user_id, title, starts_at, category, reminder, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.id,
                row.user_id,
                row.title,
                row.starts_at,
                row.category,
                row.reminder,
                row.notes,
            ],
        )?;
        Ok(())
    }

    fn update_agenda(&self, row: &AgendaRow) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE agenda_items
             SET title = ?3, starts_at = ?4, category = ?5, reminder = ?6, notes = ?7
             WHERE id = ?1 AND user_id = ?2",
            params![
                row.id,
                row.user_id,
                row.title,
                row.starts_at,
                row.category,
                row.reminder,
                row.notes,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_agenda(&self, user_id: &str, id: &str) -> Result<bool> {
        let changed = self.conn().execute(
            "DELETE FROM agenda_items WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    }

    fn targets(&self, user_id: &str) -> Result<Option<TargetsRow>> {
        self.conn()
            .query_row(
                "SELECT prayers_on_time, daily_recitation, daily_charity, full_fast,
                        verse_target, charity_target
                 FROM daily_targets WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(TargetsRow {
                        user_id: user_id.to_string(),
                        targets: DailyTargets {
                            prayers_on_time: row.get::<_, i64>(0)? != 0,
                            daily_recitation: row.get::<_, i64>(1)? != 0,
                            daily_charity: row.get::<_, i64>(2)? != 0,
                            full_fast: row.get::<_, i64>(3)? != 0,
                            verse_target: row
                                .get::<_, Option<i64>>(4)?
                                .and_then(|v| u32::try_from(v).ok()),
                            charity_target: row.get(5)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(anyhow::Error::from)
    }

    fn upsert_targets(&self, row: &TargetsRow) -> Result<()> {
        let t = &row.targets;
        self.conn().execute(
            "INSERT INTO daily_targets
                (user_id, prayers_on_time, daily_recitation, daily_charity, full_fast,
                 verse_target, charity_target)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                prayers_on_time = ?2, daily_recitation = ?3, daily_charity = ?4,
                full_fast = ?5, verse_target = ?6, charity_target = ?7",
            params![
                row.user_id,
                t.prayers_on_time,
                t.daily_recitation,
                t.daily_charity,
                t.full_fast,
                t.verse_target,
                t.charity_target,
            ],
        )?;
        Ok(())
    }

    fn account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        let raw = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM accounts WHERE email = ?1", ACCOUNT_COLUMNS),
                params![email],
                account_from_row,
            )
            .optional()?;
        Ok(raw.and_then(account_decode))
    }

    fn account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        let raw = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(raw.and_then(account_decode))
    }

    fn insert_account(&self, row: &AccountRow) -> Result<bool> {
        let inserted = self.conn().execute(
            &format!(
                "INSERT OR IGNORE INTO accounts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                ACCOUNT_COLUMNS
            ),
            params![
                row.id,
                row.email,
                row.password_hash,
                row.salt,
                row.full_name,
                row.age,
                row.sex.as_str(),
                row.madhab.as_str(),
                fmt_stamp(row.created_at),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn session(&self) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT value FROM app_meta WHERE key = ?1",
                params![SESSION_KEY],
                |row| row.get(0),
            )
            .optional()
            .map(Option::flatten)
            .map_err(anyhow::Error::from)
    }

    fn set_session(&self, user_id: Option<&str>) -> Result<()> {
        let conn = self.conn();
        match user_id {
            Some(id) => conn.execute(
                "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                params![SESSION_KEY, id],
            )?,
            None => conn.execute("DELETE FROM app_meta WHERE key = ?1", params![SESSION_KEY])?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FMT).unwrap()
    }

    fn stamp() -> NaiveDateTime {
        date("2026-03-01").and_hms_opt(4, 30, 0).unwrap()
    }

    fn donation(id: &str, kind: DonationKind, amount: f64) -> DonationRow {
        DonationRow {
            id: id.to_string(),
            user_id: "u1".to_string(),
            kind,
            amount,
            channel: "masjid".to_string(),
            people: None,
            amount_per_person: None,
            date: date("2026-03-01"),
            time: None,
            notes: None,
            created_at: stamp(),
        }
    }

    #[test]
    fn daily_upsert_replaces_by_natural_key() {
        let db = SqliteBackend::open_in_memory().unwrap();
        let mut row = DailyRow::empty("u1", date("2026-03-01"));
        row.fajr = true;
        db.upsert_daily(&row).unwrap();
        row.isha = true;
        row.extras = Some("{\"asr_reason\":\"sick\"}".into());
        db.upsert_daily(&row).unwrap();

        assert_eq!(db.all_daily("u1").unwrap().len(), 1);
        assert_eq!(db.daily("u1", date("2026-03-01")).unwrap(), Some(row));
        assert_eq!(db.daily("u2", date("2026-03-01")).unwrap(), None);
    }

    #[test]
    fn donation_kind_filter_applies_to_every_operation() {
        let db = SqliteBackend::open_in_memory().unwrap();
        db.insert_donation(&donation("c1", DonationKind::Charity, 10_000.0))
            .unwrap();
        db.insert_donation(&donation("z1", DonationKind::ZakatFitrah, 45_000.0))
            .unwrap();

        let charity = db.donations("u1", &[DonationKind::Charity], None).unwrap();
        assert_eq!(charity.len(), 1);
        assert_eq!(charity[0].id, "c1");

        assert!(!db.delete_donation("u1", "z1", &[DonationKind::Charity]).unwrap());
        assert_eq!(db.donations("u1", &DonationKind::ZAKAT, None).unwrap().len(), 1);
        assert!(db.delete_donation("u1", "z1", &DonationKind::ZAKAT).unwrap());
        assert!(!db.delete_donation("u1", "z1", &DonationKind::ZAKAT).unwrap());
    }

    #[test]
    fn duplicate_email_is_ignored_case_insensitively() {
        let db = SqliteBackend::open_in_memory().unwrap();
        let account = AccountRow {
            id: "a1".into(),
            email: "fatimah@example.com".into(),
            password_hash: "h".into(),
            salt: "s".into(),
            full_name: "Fatimah Az-Zahra".into(),
            age: 24,
            sex: Sex::Female,
            madhab: Madhab::Nu,
            created_at: stamp(),
        };
        assert!(db.insert_account(&account).unwrap());
        let again = AccountRow {
            id: "a2".into(),
            email: "FATIMAH@example.com".into(),
            ..account
        };
        assert!(!db.insert_account(&again).unwrap());
        assert_eq!(
            db.account_by_email("Fatimah@Example.com").unwrap().map(|a| a.id),
            Some("a1".to_string())
        );
    }

    #[test]
    fn session_slot_set_and_clear() {
        let db = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(db.session().unwrap(), None);
        db.set_session(Some("u1")).unwrap();
        assert_eq!(db.session().unwrap().as_deref(), Some("u1"));
        db.set_session(None).unwrap();
        assert_eq!(db.session().unwrap(), None);
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amal.db");
        {
            let db = SqliteBackend::open(&path).unwrap();
            db.set_session(Some("u9")).unwrap();
        }
        let db = SqliteBackend::open(&path).unwrap();
        assert_eq!(db.session().unwrap().as_deref(), Some("u9"));
    }
}
