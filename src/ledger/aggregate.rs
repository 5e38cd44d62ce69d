use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    AgendaItem, CharityEntry, DailyTargets, DaySummary, Donation, FastingDay, PrayerDay,
    RecitationEntry, TargetProgress, Totals, ZakatPayment,
};

/// Everything one user has recorded, loaded in a single pass.
///
/// Charity and zakat come from one shared collection; each row appears in
/// `donations` exactly once, as whichever variant its tag names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub prayer_days: Vec<PrayerDay>,
    pub fasting_days: Vec<FastingDay>,
    pub recitations: Vec<RecitationEntry>,
    pub donations: Vec<Donation>,
    pub agenda: Vec<AgendaItem>,
}

impl Snapshot {
    pub fn charity(&self) -> impl Iterator<Item = &CharityEntry> {
        self.donations.iter().filter_map(|d| match d {
            Donation::Charity(c) => Some(c),
            Donation::Zakat(_) => None,
        })
    }

    pub fn zakat(&self) -> impl Iterator<Item = &ZakatPayment> {
        self.donations.iter().filter_map(|d| match d {
            Donation::Zakat(z) => Some(z),
            Donation::Charity(_) => None,
        })
    }
}

pub fn total_fasting_days(days: &[FastingDay]) -> u32 {
    days.iter().filter(|d| d.fasting).count() as u32
}

pub fn total_prayers(days: &[PrayerDay]) -> u32 {
    days.iter().map(|d| d.performed_count() as u32).sum()
}

/// Saturates instead of overflowing on absurd stored counts.
pub fn total_verses(entries: &[RecitationEntry]) -> u32 {
    entries
        .iter()
        .fold(0u32, |acc, e| acc.saturating_add(e.ayah_count))
}

pub fn total_charity(donations: &[Donation]) -> f64 {
    donations
        .iter()
        .map(|d| match d {
            Donation::Charity(c) => c.amount,
            Donation::Zakat(_) => 0.0,
        })
        .sum()
}

pub fn total_zakat(donations: &[Donation]) -> f64 {
    donations
        .iter()
        .map(|d| match d {
            Donation::Zakat(z) => z.total_amount,
            Donation::Charity(_) => 0.0,
        })
        .sum()
}

impl Totals {
    pub fn compute(snapshot: &Snapshot) -> Self {
        Self {
            fasting_days: total_fasting_days(&snapshot.fasting_days),
            prayers: total_prayers(&snapshot.prayer_days),
            verses: total_verses(&snapshot.recitations),
            charity: total_charity(&snapshot.donations),
            zakat: total_zakat(&snapshot.donations),
        }
    }
}

impl DaySummary {
    pub fn for_date(snapshot: &Snapshot, date: NaiveDate) -> Self {
        let mut summary = DaySummary::empty(date);
        summary.fasting = snapshot
            .fasting_days
            .iter()
            .any(|d| d.date == date && d.fasting);
        summary.prayers_done = snapshot
            .prayer_days
            .iter()
            .find(|d| d.date == date)
            .map(PrayerDay::performed_count)
            .unwrap_or(0);
        summary.verses = snapshot
            .recitations
            .iter()
            .filter(|r| r.date == date)
            .fold(0u32, |acc, r| acc.saturating_add(r.ayah_count));
        for charity in snapshot.charity().filter(|c| c.date == date) {
            summary.charity_count += 1;
            summary.charity_amount += charity.amount;
        }
        summary.agenda_count = snapshot.agenda.iter().filter(|a| a.date == date).count() as u32;
        summary
    }
}

impl TargetProgress {
    pub fn evaluate(targets: &DailyTargets, day: &DaySummary) -> Self {
        let on = |enabled: bool, met: bool| enabled.then_some(met);
        let charity_met = match targets.charity_target {
            Some(target) => day.charity_amount >= target,
            None => day.charity_count > 0,
        };
        Self {
            prayers: on(targets.prayers_on_time, day.prayers_done >= 5),
            recitation: on(
                targets.daily_recitation,
                day.verses >= targets.verse_target.unwrap_or(1),
            ),
            charity: on(targets.daily_charity, charity_met),
            fasting: on(targets.full_fast, day.fasting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CharityChannel, PrayerMark, ZakatChannel, ZakatKind};
    use chrono::NaiveTime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fasting(d: &str, fasting: bool) -> FastingDay {
        FastingDay {
            fasting,
            ..FastingDay::empty(date(d))
        }
    }

    fn recitation(count: u32) -> RecitationEntry {
        RecitationEntry {
            id: format!("r{}", count),
            date: date("2026-03-01"),
            surah: "Al-Baqarah".into(),
            from_ayah: 1,
            to_ayah: count,
            ayah_count: count,
            created_at: date("2026-03-01").and_hms_opt(21, 0, 0).unwrap(),
        }
    }

    fn charity(amount: f64) -> Donation {
        Donation::Charity(CharityEntry {
            id: "c".into(),
            date: date("2026-03-01"),
            amount,
            channel: CharityChannel::Online,
            notes: None,
            created_at: date("2026-03-01").and_hms_opt(12, 0, 0).unwrap(),
        })
    }

    fn zakat(total: f64) -> Donation {
        Donation::Zakat(ZakatPayment {
            id: "z".into(),
            kind: ZakatKind::Fitrah,
            paid_on: date("2026-03-28"),
            paid_at: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            channel: ZakatChannel::Masjid,
            people: 1,
            amount_per_person: total,
            total_amount: total,
            notes: None,
        })
    }

    #[test]
    fn verse_totals_saturate() {
        let snapshot = Snapshot {
            recitations: vec![recitation(u32::MAX), recitation(u32::MAX)],
            ..Snapshot::default()
        };
        assert_eq!(Totals::compute(&snapshot).verses, u32::MAX);
        assert_eq!(DaySummary::for_date(&snapshot, date("2026-03-01")).verses, u32::MAX);
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        assert_eq!(Totals::compute(&Snapshot::default()), Totals::default());
    }

    #[test]
    fn counts_fasting_days_and_verses() {
        let days = [
            fasting("2026-03-01", true),
            fasting("2026-03-02", false),
            fasting("2026-03-03", true),
        ];
        assert_eq!(total_fasting_days(&days), 2);
        assert_eq!(
            total_verses(&[recitation(5), recitation(10), recitation(3)]),
            18
        );
    }

    #[test]
    fn prayers_counted_per_flag() {
        let mut a = PrayerDay::empty(date("2026-03-01"));
        a.fajr = PrayerMark::done();
        a.isha = PrayerMark::done();
        let mut b = PrayerDay::empty(date("2026-03-02"));
        for p in crate::models::Prayer::all() {
            *b.get_mut(p) = PrayerMark::done();
        }
        assert_eq!(total_prayers(&[a, b]), 7);
    }

    #[test]
    fn zakat_totals_add_up() {
        assert_eq!(total_zakat(&[zakat(50_000.0), zakat(75_000.0)]), 125_000.0);
    }

    #[test]
    fn charity_and_zakat_never_mix() {
        let snapshot = Snapshot {
            donations: vec![charity(20_000.0), zakat(45_000.0)],
            ..Snapshot::default()
        };
        let totals = Totals::compute(&snapshot);
        assert_eq!(totals.charity, 20_000.0);
        assert_eq!(totals.zakat, 45_000.0);
        assert_eq!(snapshot.charity().count(), 1);
        assert_eq!(snapshot.zakat().count(), 1);
    }

    #[test]
    fn targets_only_judged_when_enabled() {
        let mut day = DaySummary::empty(date("2026-03-01"));
        day.prayers_done = 5;
        day.verses = 30;
        let targets = DailyTargets {
            verse_target: Some(50),
            ..DailyTargets::default()
        };
        let progress = TargetProgress::evaluate(&targets, &day);
        assert_eq!(progress.prayers, Some(true));
        assert_eq!(progress.recitation, Some(false));
        assert_eq!(progress.charity, None);
        assert_eq!(progress.fasting, Some(false));
        assert_eq!(progress.enabled(), 3);
        assert_eq!(progress.met(), 1);
    }
}
