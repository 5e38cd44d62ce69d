use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tag distinguishing rows of the shared donations collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationKind {
    Charity,
    ZakatFitrah,
    ZakatMaal,
}

impl DonationKind {
    pub const ZAKAT: [DonationKind; 2] = [DonationKind::ZakatFitrah, DonationKind::ZakatMaal];

    pub fn as_str(&self) -> &'static str {
        match self {
            DonationKind::Charity => "charity",
            DonationKind::ZakatFitrah => "zakat_fitrah",
            DonationKind::ZakatMaal => "zakat_maal",
        }
    }
}

impl FromStr for DonationKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charity" => Ok(DonationKind::Charity),
            "zakat_fitrah" => Ok(DonationKind::ZakatFitrah),
            "zakat_maal" => Ok(DonationKind::ZakatMaal),
            _ => Err(anyhow::anyhow!("Unknown donation kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharityChannel {
    Masjid,
    Online,
    Direct,
}

impl CharityChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CharityChannel::Masjid => "masjid",
            CharityChannel::Online => "online",
            CharityChannel::Direct => "direct",
        }
    }
}

impl FromStr for CharityChannel {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "masjid" | "mosque" => Ok(CharityChannel::Masjid),
            "online" => Ok(CharityChannel::Online),
            "direct" | "langsung" => Ok(CharityChannel::Direct),
            _ => Err(anyhow::anyhow!("Unknown charity channel: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZakatChannel {
    Masjid,
    Laz,
    Online,
}

impl ZakatChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZakatChannel::Masjid => "masjid",
            ZakatChannel::Laz => "laz",
            ZakatChannel::Online => "online",
        }
    }
}

impl FromStr for ZakatChannel {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "masjid" | "mosque" => Ok(ZakatChannel::Masjid),
            "laz" => Ok(ZakatChannel::Laz),
            "online" => Ok(ZakatChannel::Online),
            _ => Err(anyhow::anyhow!("Unknown zakat channel: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZakatKind {
    Fitrah,
    Maal,
}

impl ZakatKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ZakatKind::Fitrah => "Zakat Fitrah",
            ZakatKind::Maal => "Zakat Maal",
        }
    }

    pub fn donation_kind(&self) -> DonationKind {
        match self {
            ZakatKind::Fitrah => DonationKind::ZakatFitrah,
            ZakatKind::Maal => DonationKind::ZakatMaal,
        }
    }
}

impl FromStr for ZakatKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fitrah" => Ok(ZakatKind::Fitrah),
            "maal" | "mal" => Ok(ZakatKind::Maal),
            _ => Err(anyhow::anyhow!("Unknown zakat type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharityEntry {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub channel: CharityChannel,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCharity {
    pub date: NaiveDate,
    pub amount: f64,
    pub channel: CharityChannel,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharityPatch {
    pub amount: Option<f64>,
    pub channel: Option<CharityChannel>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZakatPayment {
    pub id: String,
    pub kind: ZakatKind,
    pub paid_on: NaiveDate,
    pub paid_at: NaiveTime,
    pub channel: ZakatChannel,
    pub people: u32,
    pub amount_per_person: f64,
    pub total_amount: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewZakat {
    pub kind: ZakatKind,
    pub paid_on: NaiveDate,
    pub paid_at: NaiveTime,
    pub channel: ZakatChannel,
    pub people: u32,
    pub amount_per_person: f64,
    pub notes: Option<String>,
}

impl NewZakat {
    pub fn total_amount(&self) -> f64 {
        self.people as f64 * self.amount_per_person
    }
}

/// One row of the shared donations collection, decoded by its tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Donation {
    Charity(CharityEntry),
    Zakat(ZakatPayment),
}
