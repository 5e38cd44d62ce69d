use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub fn all() -> [Prayer; 5] {
        [
            Prayer::Fajr,
            Prayer::Dhuhr,
            Prayer::Asr,
            Prayer::Maghrib,
            Prayer::Isha,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Subuh",
            Prayer::Dhuhr => "Dzuhur",
            Prayer::Asr => "Ashar",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isya",
        }
    }
}

impl std::fmt::Display for Prayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Prayer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fajr" | "subuh" => Ok(Prayer::Fajr),
            "dhuhr" | "zuhr" | "dzuhur" => Ok(Prayer::Dhuhr),
            "asr" | "ashar" => Ok(Prayer::Asr),
            "maghrib" => Ok(Prayer::Maghrib),
            "isha" | "isya" => Ok(Prayer::Isha),
            _ => Err(anyhow::anyhow!("Unknown prayer: {}", s)),
        }
    }
}

/// Devotional prayers tracked alongside the obligatory five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplementaryPrayer {
    Dhuha,
    Taraweeh,
    Tahajjud,
    Witr,
}

impl SupplementaryPrayer {
    pub fn all() -> [SupplementaryPrayer; 4] {
        [
            SupplementaryPrayer::Dhuha,
            SupplementaryPrayer::Taraweeh,
            SupplementaryPrayer::Tahajjud,
            SupplementaryPrayer::Witr,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplementaryPrayer::Dhuha => "dhuha",
            SupplementaryPrayer::Taraweeh => "taraweeh",
            SupplementaryPrayer::Tahajjud => "tahajjud",
            SupplementaryPrayer::Witr => "witr",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SupplementaryPrayer::Dhuha => "Dhuha",
            SupplementaryPrayer::Taraweeh => "Tarawih",
            SupplementaryPrayer::Tahajjud => "Tahajud",
            SupplementaryPrayer::Witr => "Witir",
        }
    }

    pub fn default_rakaat(&self) -> u8 {
        match self {
            SupplementaryPrayer::Dhuha => 2,
            SupplementaryPrayer::Taraweeh => 8,
            SupplementaryPrayer::Tahajjud => 2,
            SupplementaryPrayer::Witr => 3,
        }
    }
}

impl std::fmt::Display for SupplementaryPrayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for SupplementaryPrayer {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dhuha" => Ok(SupplementaryPrayer::Dhuha),
            "taraweeh" | "tarawih" => Ok(SupplementaryPrayer::Taraweeh),
            "tahajjud" | "tahajud" => Ok(SupplementaryPrayer::Tahajjud),
            "witr" | "witir" => Ok(SupplementaryPrayer::Witr),
            _ => Err(anyhow::anyhow!("Unknown supplementary prayer: {}", s)),
        }
    }
}

/// Whether one obligatory prayer was performed, and why not if it wasn't.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrayerMark {
    pub performed: bool,
    pub reason: Option<String>,
}

impl PrayerMark {
    pub fn done() -> Self {
        Self {
            performed: true,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            performed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerDay {
    pub date: NaiveDate,
    pub fajr: PrayerMark,
    pub dhuhr: PrayerMark,
    pub asr: PrayerMark,
    pub maghrib: PrayerMark,
    pub isha: PrayerMark,
}

impl PrayerDay {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            fajr: PrayerMark::default(),
            dhuhr: PrayerMark::default(),
            asr: PrayerMark::default(),
            maghrib: PrayerMark::default(),
            isha: PrayerMark::default(),
        }
    }

    pub fn get(&self, prayer: Prayer) -> &PrayerMark {
        match prayer {
            Prayer::Fajr => &self.fajr,
            Prayer::Dhuhr => &self.dhuhr,
            Prayer::Asr => &self.asr,
            Prayer::Maghrib => &self.maghrib,
            Prayer::Isha => &self.isha,
        }
    }

    pub fn get_mut(&mut self, prayer: Prayer) -> &mut PrayerMark {
        match prayer {
            Prayer::Fajr => &mut self.fajr,
            Prayer::Dhuhr => &mut self.dhuhr,
            Prayer::Asr => &mut self.asr,
            Prayer::Maghrib => &mut self.maghrib,
            Prayer::Isha => &mut self.isha,
        }
    }

    pub fn performed_count(&self) -> u8 {
        Prayer::all()
            .iter()
            .filter(|p| self.get(**p).performed)
            .count() as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryMark {
    pub performed: bool,
    pub rakaat: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementaryPrayerDay {
    pub date: NaiveDate,
    pub dhuha: SupplementaryMark,
    pub taraweeh: SupplementaryMark,
    pub tahajjud: SupplementaryMark,
    pub witr: SupplementaryMark,
}

impl SupplementaryPrayerDay {
    pub fn empty(date: NaiveDate) -> Self {
        let mark = |kind: SupplementaryPrayer| SupplementaryMark {
            performed: false,
            rakaat: kind.default_rakaat(),
        };
        Self {
            date,
            dhuha: mark(SupplementaryPrayer::Dhuha),
            taraweeh: mark(SupplementaryPrayer::Taraweeh),
            tahajjud: mark(SupplementaryPrayer::Tahajjud),
            witr: mark(SupplementaryPrayer::Witr),
        }
    }

    pub fn get(&self, kind: SupplementaryPrayer) -> &SupplementaryMark {
        match kind {
            SupplementaryPrayer::Dhuha => &self.dhuha,
            SupplementaryPrayer::Taraweeh => &self.taraweeh,
            SupplementaryPrayer::Tahajjud => &self.tahajjud,
            SupplementaryPrayer::Witr => &self.witr,
        }
    }

    pub fn get_mut(&mut self, kind: SupplementaryPrayer) -> &mut SupplementaryMark {
        match kind {
            SupplementaryPrayer::Dhuha => &mut self.dhuha,
            SupplementaryPrayer::Taraweeh => &mut self.taraweeh,
            SupplementaryPrayer::Tahajjud => &mut self.tahajjud,
            SupplementaryPrayer::Witr => &mut self.witr,
        }
    }
}
