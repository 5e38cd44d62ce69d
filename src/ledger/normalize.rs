//! Conversions between domain records and their storage rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

use crate::db::backend::{AgendaRow, DailyRow, DonationRow, FastingRow, RecitationRow};
use crate::ledger::side_channel::{AuxKey, AuxValue, SideChannel};
use crate::models::{
    AgendaCategory, AgendaItem, CharityChannel, CharityEntry, Donation, DonationKind, FastingDay,
    Prayer, PrayerDay, PrayerMark, RecitationEntry, SupplementaryMark, SupplementaryPrayer,
    SupplementaryPrayerDay, ZakatChannel, ZakatKind, ZakatPayment,
};

// ─── Daily row ───────────────────────────────────────────────────────────────

fn prayer_column(row: &DailyRow, prayer: Prayer) -> bool {
    match prayer {
        Prayer::Fajr => row.fajr,
        Prayer::Dhuhr => row.dhuhr,
        Prayer::Asr => row.asr,
        Prayer::Maghrib => row.maghrib,
        Prayer::Isha => row.isha,
    }
}

fn prayer_column_mut(row: &mut DailyRow, prayer: Prayer) -> &mut bool {
    match prayer {
        Prayer::Fajr => &mut row.fajr,
        Prayer::Dhuhr => &mut row.dhuhr,
        Prayer::Asr => &mut row.asr,
        Prayer::Maghrib => &mut row.maghrib,
        Prayer::Isha => &mut row.isha,
    }
}

fn supplementary_column(row: &DailyRow, kind: SupplementaryPrayer) -> bool {
    match kind {
        SupplementaryPrayer::Dhuha => row.dhuha,
        SupplementaryPrayer::Taraweeh => row.taraweeh,
        SupplementaryPrayer::Tahajjud => row.tahajjud,
        SupplementaryPrayer::Witr => row.witr,
    }
}

fn supplementary_column_mut(row: &mut DailyRow, kind: SupplementaryPrayer) -> &mut bool {
    match kind {
        SupplementaryPrayer::Dhuha => &mut row.dhuha,
        SupplementaryPrayer::Taraweeh => &mut row.taraweeh,
        SupplementaryPrayer::Tahajjud => &mut row.tahajjud,
        SupplementaryPrayer::Witr => &mut row.witr,
    }
}

/// Row → PrayerDay. A performed prayer never carries a reason, whatever the
/// side channel still holds.
pub fn expand_prayer_day(row: &DailyRow) -> PrayerDay {
    let extras = SideChannel::parse(row.extras.as_deref());
    let mut day = PrayerDay::empty(row.date);
    for prayer in Prayer::all() {
        let performed = prayer_column(row, prayer);
        *day.get_mut(prayer) = PrayerMark {
            performed,
            reason: if performed {
                None
            } else {
                extras.reason(prayer)
            },
        };
    }
    day
}

/// Writes every prayer of `day` into `row`, patching only the reason keys of
/// the side channel.
pub fn flatten_prayer_day(day: &PrayerDay, row: &mut DailyRow) {
    let mut extras = SideChannel::parse(row.extras.as_deref());
    for prayer in Prayer::all() {
        let mark = day.get(prayer);
        *prayer_column_mut(row, prayer) = mark.performed;
        let key = AuxKey::Reason(prayer);
        match (&mark.reason, mark.performed) {
            (Some(reason), false) if !reason.trim().is_empty() => {
                extras.set(key, AuxValue::Text(reason.clone()))
            }
            _ => extras.remove(key),
        }
    }
    row.extras = extras.encode();
}

pub fn expand_supplementary_day(row: &DailyRow) -> SupplementaryPrayerDay {
    let extras = SideChannel::parse(row.extras.as_deref());
    let mut day = SupplementaryPrayerDay::empty(row.date);
    for kind in SupplementaryPrayer::all() {
        *day.get_mut(kind) = SupplementaryMark {
            performed: supplementary_column(row, kind),
            rakaat: extras.rakaat(kind).unwrap_or(kind.default_rakaat()),
        };
    }
    day
}

/// Rakaat are written whether or not the prayer was performed, so the chosen
/// count survives toggling.
pub fn flatten_supplementary_day(day: &SupplementaryPrayerDay, row: &mut DailyRow) {
    let mut extras = SideChannel::parse(row.extras.as_deref());
    for kind in SupplementaryPrayer::all() {
        let mark = day.get(kind);
        *supplementary_column_mut(row, kind) = mark.performed;
        let rakaat = if mark.rakaat == 0 {
            kind.default_rakaat()
        } else {
            mark.rakaat
        };
        extras.set(AuxKey::Rakaat(kind), AuxValue::Count(rakaat));
    }
    row.extras = extras.encode();
}

// ─── Fasting ─────────────────────────────────────────────────────────────────

pub fn expand_fasting_day(row: &FastingRow) -> FastingDay {
    FastingDay {
        date: row.date,
        sahur: row.sahur,
        sahur_time: if row.sahur { row.sahur_time } else { None },
        fasting: row.fasting,
        reason: if row.fasting { None } else { row.reason },
    }
}

pub fn flatten_fasting_day(user_id: &str, day: &FastingDay) -> FastingRow {
    FastingRow {
        user_id: user_id.to_string(),
        date: day.date,
        sahur: day.sahur,
        sahur_time: if day.sahur { day.sahur_time } else { None },
        fasting: day.fasting,
        reason: if day.fasting { None } else { day.reason },
    }
}

// ─── Recitation ──────────────────────────────────────────────────────────────

pub fn recitation_from_row(row: RecitationRow) -> RecitationEntry {
    // The stored count is derived; trust the range when the two disagree.
    let ayah_count = if row.to_ayah >= row.from_ayah {
        row.to_ayah - row.from_ayah + 1
    } else {
        row.ayah_count
    };
    RecitationEntry {
        id: row.id,
        date: row.date,
        surah: row.surah,
        from_ayah: row.from_ayah,
        to_ayah: row.to_ayah,
        ayah_count,
        created_at: row.created_at,
    }
}

// ─── Donations ───────────────────────────────────────────────────────────────

/// Decodes one row of the shared collection into exactly one view.
pub fn donation_from_row(row: DonationRow) -> Option<Donation> {
    match row.kind {
        DonationKind::Charity => charity_from_row(row).map(Donation::Charity),
        DonationKind::ZakatFitrah | DonationKind::ZakatMaal => {
            zakat_from_row(row).map(Donation::Zakat)
        }
    }
}

pub fn charity_from_row(row: DonationRow) -> Option<CharityEntry> {
    if row.kind != DonationKind::Charity {
        return None;
    }
    let channel = CharityChannel::from_str(&row.channel).unwrap_or_else(|_| {
        log::warn!("Charity {} has unknown channel '{}'", row.id, row.channel);
        CharityChannel::Direct
    });
    Some(CharityEntry {
        id: row.id,
        date: row.date,
        amount: row.amount,
        channel,
        notes: row.notes,
        created_at: row.created_at,
    })
}

pub fn zakat_from_row(row: DonationRow) -> Option<ZakatPayment> {
    let kind = match row.kind {
        DonationKind::ZakatFitrah => ZakatKind::Fitrah,
        DonationKind::ZakatMaal => ZakatKind::Maal,
        DonationKind::Charity => return None,
    };
    let channel = ZakatChannel::from_str(&row.channel).unwrap_or_else(|_| {
        log::warn!("Zakat {} has unknown channel '{}'", row.id, row.channel);
        ZakatChannel::Masjid
    });
    let people = row.people.unwrap_or(1).max(1);
    let (amount_per_person, total_amount) = match row.amount_per_person {
        Some(per) if per > 0.0 => (per, people as f64 * per),
        _ => (row.amount / people as f64, row.amount),
    };
    Some(ZakatPayment {
        id: row.id,
        kind,
        paid_on: row.date,
        paid_at: row
            .time
            .unwrap_or_else(|| row.created_at.time()),
        channel,
        people,
        amount_per_person,
        total_amount,
        notes: row.notes,
    })
}

// ─── Agenda ──────────────────────────────────────────────────────────────────

const AGENDA_STAMP_FMT: &str = "%Y-%m-%dT%H:%M:%S";

/// `YYYY-MM-DDTHH:MM:00`, zero-padded so it always splits back cleanly.
pub fn combine_agenda_start(date: NaiveDate, time: NaiveTime) -> String {
    format!("{}T{}:00", date.format("%Y-%m-%d"), time.format("%H:%M"))
}

pub fn split_agenda_start(stamp: &str) -> Option<(NaiveDate, NaiveTime)> {
    let stamp = stamp.trim();
    let parsed = NaiveDateTime::parse_from_str(stamp, AGENDA_STAMP_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(stamp)
                .ok()
                .map(|dt| dt.naive_local())
        })?;
    Some((parsed.date(), parsed.time()))
}

pub fn agenda_from_row(row: AgendaRow) -> Option<AgendaItem> {
    let Some((date, time)) = split_agenda_start(&row.starts_at) else {
        log::warn!("Agenda {} has unreadable start '{}'", row.id, row.starts_at);
        return None;
    };
    let category = AgendaCategory::from_str(&row.category).unwrap_or(AgendaCategory::Ibadah);
    Some(AgendaItem {
        id: row.id,
        title: row.title,
        date,
        time,
        category,
        reminder: row.reminder,
        notes: row.notes,
    })
}

pub fn agenda_to_row(user_id: &str, item: &AgendaItem) -> AgendaRow {
    AgendaRow {
        id: item.id.clone(),
        user_id: user_id.to_string(),
        title: item.title.clone(),
        starts_at: combine_agenda_start(item.date, item.time),
        category: item.category.as_str().to_string(),
        reminder: item.reminder,
        notes: item.notes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row() -> DailyRow {
        DailyRow::empty("u1", date("2026-03-05"))
    }

    #[test]
    fn flatten_then_expand_is_identity() {
        let mut day = PrayerDay::empty(date("2026-03-05"));
        day.fajr = PrayerMark::done();
        day.dhuhr = PrayerMark::skipped("travelling");
        day.maghrib = PrayerMark::done();
        day.isha = PrayerMark::skipped("asleep");

        let mut flat = row();
        flatten_prayer_day(&day, &mut flat);
        assert_eq!(expand_prayer_day(&flat), day);
    }

    #[test]
    fn performing_clears_the_stored_reason() {
        let mut day = PrayerDay::empty(date("2026-03-05"));
        day.asr = PrayerMark::skipped("work");
        let mut flat = row();
        flatten_prayer_day(&day, &mut flat);
        assert!(flat.extras.as_deref().unwrap_or("").contains("asr_reason"));

        day.asr = PrayerMark::done();
        flatten_prayer_day(&day, &mut flat);
        assert_eq!(flat.extras, None);
    }

    #[test]
    fn expand_hides_stale_reason_of_performed_prayer() {
        let mut flat = row();
        flat.fajr = true;
        flat.extras = Some(r#"{"fajr_reason":"stale"}"#.into());
        assert_eq!(expand_prayer_day(&flat).fajr, PrayerMark::done());
    }

    #[test]
    fn rakaat_remembered_across_toggle() {
        let mut sunnah = SupplementaryPrayerDay::empty(date("2026-03-05"));
        sunnah.taraweeh = SupplementaryMark {
            performed: true,
            rakaat: 20,
        };
        let mut flat = row();
        flatten_supplementary_day(&sunnah, &mut flat);

        sunnah.taraweeh.performed = false;
        flatten_supplementary_day(&sunnah, &mut flat);

        let back = expand_supplementary_day(&flat);
        assert!(!back.taraweeh.performed);
        assert_eq!(back.taraweeh.rakaat, 20);
        assert_eq!(back.witr.rakaat, 3);
    }

    #[test]
    fn supplementary_flatten_keeps_prayer_reasons() {
        let mut day = PrayerDay::empty(date("2026-03-05"));
        day.isha = PrayerMark::skipped("fever");
        let mut flat = row();
        flatten_prayer_day(&day, &mut flat);
        flatten_supplementary_day(&SupplementaryPrayerDay::empty(flat.date), &mut flat);
        assert_eq!(expand_prayer_day(&flat), day);
    }

    #[test]
    fn agenda_round_trip() {
        let time = NaiveTime::parse_from_str("19:30", "%H:%M").unwrap();
        let stamp = combine_agenda_start(date("2026-03-10"), time);
        assert_eq!(stamp, "2026-03-10T19:30:00");

        let (d, t) = split_agenda_start(&stamp).unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2026-03-10");
        assert_eq!(t.format("%H:%M").to_string(), "19:30");
    }

    #[test]
    fn agenda_split_accepts_offsets_and_rejects_garbage() {
        let (d, t) = split_agenda_start("2026-03-10T07:05:00+07:00").unwrap();
        assert_eq!(d, date("2026-03-10"));
        assert_eq!(t.format("%H:%M").to_string(), "07:05");
        assert!(split_agenda_start("tomorrow evening").is_none());
    }

    #[test]
    fn fasting_reason_dropped_when_fasting() {
        let day = FastingDay {
            date: date("2026-03-05"),
            sahur: false,
            sahur_time: NaiveTime::from_hms_opt(3, 45, 0),
            fasting: true,
            reason: Some(crate::models::FastingReason::Illness),
        };
        let flat = flatten_fasting_day("u1", &day);
        assert_eq!(flat.reason, None);
        assert_eq!(flat.sahur_time, None);
    }

    #[test]
    fn zakat_total_recomputed_from_parts() {
        let row = DonationRow {
            id: "z".into(),
            user_id: "u1".into(),
            kind: DonationKind::ZakatFitrah,
            amount: 1.0,
            channel: "laz".into(),
            people: Some(4),
            amount_per_person: Some(45_000.0),
            date: date("2026-03-28"),
            time: NaiveTime::from_hms_opt(8, 0, 0),
            notes: None,
            created_at: date("2026-03-28").and_hms_opt(8, 1, 0).unwrap(),
        };
        let zakat = zakat_from_row(row.clone()).unwrap();
        assert_eq!(zakat.total_amount, 180_000.0);
        assert_eq!(zakat.channel, ZakatChannel::Laz);
        assert!(charity_from_row(row).is_none());
    }
}
