use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use hijri_date::HijriDate;

use crate::config::settings::RamadanConfig;

/// Islamic month names (index 0 = Muharram = month 1)
const HIJRI_MONTH_NAMES: &[&str] = &[
    "Muharram",
    "Safar",
    "Rabiul Awal",
    "Rabiul Akhir",
    "Jumadil Awal",
    "Jumadil Akhir",
    "Rajab",
    "Sya'ban",
    "Ramadhan",
    "Syawal",
    "Dzulqa'dah",
    "Dzulhijjah",
];

fn hijri_month_name(month: usize) -> &'static str {
    if (1..=12).contains(&month) {
        HIJRI_MONTH_NAMES[month - 1]
    } else {
        "Unknown"
    }
}

pub struct HijriInfo {
    pub day: usize,
    pub month: usize,
    pub year: usize,
    pub month_name: String,
}

impl HijriInfo {
    pub fn formatted(&self) -> String {
        format!("{} {} {}", self.day, self.month_name, self.year)
    }
}

/// `offset_days` adjusts for local moon sighting (-1 if a day behind Saudi Arabia).
pub fn to_hijri(date: NaiveDate, offset_days: i32) -> Result<HijriInfo> {
    let adjusted = date + Duration::days(offset_days as i64);
    let hd = HijriDate::from_gr(
        adjusted.year() as usize,
        adjusted.month() as usize,
        adjusted.day() as usize,
    )
    .map_err(|e| anyhow::anyhow!("Hijri conversion error: {}", e))?;

    let month = hd.month();
    Ok(HijriInfo {
        day: hd.day(),
        month,
        year: hd.year(),
        month_name: hijri_month_name(month).to_string(),
    })
}

/// Hijri date for `date`, or an empty string when it is out of the converter's range.
pub fn hijri_string(date: NaiveDate, offset_days: i32) -> String {
    match to_hijri(date, offset_days) {
        Ok(info) => info.formatted(),
        Err(e) => {
            log::debug!("No Hijri date for {}: {}", date, e);
            String::new()
        }
    }
}

/// The configured month of fasting: day 1 is `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamadanCalendar {
    pub start: NaiveDate,
    pub days: u32,
}

impl RamadanCalendar {
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self { start, days }
    }

    pub fn from_config(config: &RamadanConfig) -> Self {
        Self::new(config.start_date, config.days)
    }

    /// 1-based day of Ramadan, `None` outside the month.
    pub fn day_number(&self, date: NaiveDate) -> Option<u32> {
        let offset = (date - self.start).num_days();
        if offset < 0 || offset >= self.days as i64 {
            return None;
        }
        Some(offset as u32 + 1)
    }

    /// Days until day 1, or `None` once it has begun.
    pub fn days_until(&self, date: NaiveDate) -> Option<u32> {
        let offset = (self.start - date).num_days();
        (offset > 0).then_some(offset as u32)
    }

    pub fn date_of(&self, day: u32) -> Option<NaiveDate> {
        (1..=self.days)
            .contains(&day)
            .then(|| self.start + Duration::days(day as i64 - 1))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (1..=self.days).filter_map(|d| self.date_of(d))
    }

    /// Number of 7-day weeks, the last one possibly short.
    pub fn weeks(&self) -> u8 {
        self.days.div_ceil(7) as u8
    }

    pub fn week_of(&self, date: NaiveDate) -> Option<u8> {
        self.day_number(date).map(|d| ((d - 1) / 7 + 1) as u8)
    }

    pub fn week_dates(&self, week: u8) -> Vec<NaiveDate> {
        self.dates()
            .filter(|d| self.week_of(*d) == Some(week))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn calendar() -> RamadanCalendar {
        RamadanCalendar::new(date("2026-02-28"), 30)
    }

    #[test]
    fn day_numbers() {
        let cal = calendar();
        assert_eq!(cal.day_number(date("2026-02-28")), Some(1));
        assert_eq!(cal.day_number(date("2026-03-10")), Some(11));
        assert_eq!(cal.day_number(date("2026-03-29")), Some(30));
        assert_eq!(cal.day_number(date("2026-03-30")), None);
        assert_eq!(cal.day_number(date("2026-02-27")), None);
        assert_eq!(cal.days_until(date("2026-02-25")), Some(3));
        assert_eq!(cal.days_until(date("2026-03-01")), None);
    }

    #[test]
    fn weeks_cover_the_month() {
        let cal = calendar();
        assert_eq!(cal.weeks(), 5);
        assert_eq!(cal.week_of(date("2026-03-06")), Some(1));
        assert_eq!(cal.week_of(date("2026-03-07")), Some(2));
        assert_eq!(cal.week_dates(5).len(), 2);
        assert_eq!(cal.dates().count(), 30);
    }

    #[test]
    fn ramadan_start_is_ramadan() {
        let info = to_hijri(date("2026-03-01"), 0).unwrap();
        assert_eq!(info.month, 9);
        assert_eq!(info.month_name, "Ramadhan");
    }
}
