use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaCategory {
    Ibadah,
    Kajian,
    Sosial,
}

impl AgendaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaCategory::Ibadah => "ibadah",
            AgendaCategory::Kajian => "kajian",
            AgendaCategory::Sosial => "sosial",
        }
    }
}

impl FromStr for AgendaCategory {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ibadah" => Ok(AgendaCategory::Ibadah),
            "kajian" => Ok(AgendaCategory::Kajian),
            "sosial" => Ok(AgendaCategory::Sosial),
            _ => Err(anyhow::anyhow!("Unknown agenda category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub category: AgendaCategory,
    pub reminder: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAgendaItem {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub category: AgendaCategory,
    pub reminder: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgendaPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub category: Option<AgendaCategory>,
    pub reminder: Option<bool>,
    pub notes: Option<String>,
}
