use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Running totals across every record a user owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub fasting_days: u32,
    pub prayers: u32,
    pub verses: u32,
    pub charity: f64,
    pub zakat: f64,
}

/// What happened on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub fasting: bool,
    pub prayers_done: u8,
    pub verses: u32,
    pub charity_count: u32,
    pub charity_amount: f64,
    pub agenda_count: u32,
}

impl DaySummary {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            fasting: false,
            prayers_done: 0,
            verses: 0,
            charity_count: 0,
            charity_amount: 0.0,
            agenda_count: 0,
        }
    }
}

/// Which enabled daily targets a day met. `None` means the target is off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetProgress {
    pub prayers: Option<bool>,
    pub recitation: Option<bool>,
    pub charity: Option<bool>,
    pub fasting: Option<bool>,
}

impl TargetProgress {
    pub fn enabled(&self) -> u32 {
        [self.prayers, self.recitation, self.charity, self.fasting]
            .iter()
            .filter(|t| t.is_some())
            .count() as u32
    }

    pub fn met(&self) -> u32 {
        [self.prayers, self.recitation, self.charity, self.fasting]
            .iter()
            .filter(|t| **t == Some(true))
            .count() as u32
    }
}
