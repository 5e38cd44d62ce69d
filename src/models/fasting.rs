use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::Sex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FastingReason {
    Menstruation,
    Illness,
    Travel,
    Other,
}

impl FastingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FastingReason::Menstruation => "menstruation",
            FastingReason::Illness => "illness",
            FastingReason::Travel => "travel",
            FastingReason::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FastingReason::Menstruation => "Haid",
            FastingReason::Illness => "Sakit",
            FastingReason::Travel => "Safar",
            FastingReason::Other => "Lainnya",
        }
    }

    /// Reasons a user of the given sex may record.
    pub fn allowed_for(sex: Option<Sex>) -> Vec<FastingReason> {
        let mut reasons = Vec::new();
        if sex == Some(Sex::Female) {
            reasons.push(FastingReason::Menstruation);
        }
        reasons.extend([
            FastingReason::Illness,
            FastingReason::Travel,
            FastingReason::Other,
        ]);
        reasons
    }

    pub fn is_allowed_for(&self, sex: Option<Sex>) -> bool {
        *self != FastingReason::Menstruation || sex == Some(Sex::Female)
    }
}

impl std::fmt::Display for FastingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for FastingReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "menstruation" | "haid" => Ok(FastingReason::Menstruation),
            "illness" | "sick" | "sakit" => Ok(FastingReason::Illness),
            "travel" | "safar" | "musafir" => Ok(FastingReason::Travel),
            "other" | "lainnya" => Ok(FastingReason::Other),
            _ => Err(anyhow::anyhow!("Unknown fasting reason: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastingDay {
    pub date: NaiveDate,
    pub sahur: bool,
    pub sahur_time: Option<NaiveTime>,
    pub fasting: bool,
    pub reason: Option<FastingReason>,
}

impl FastingDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sahur: false,
            sahur_time: None,
            fasting: false,
            reason: None,
        }
    }
}
