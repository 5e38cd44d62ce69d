use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeeklyEntry {
    pub week: u8,
    pub friday_prayer: bool,
    pub sermon_note: Option<String>,
    pub study_circle: bool,
    pub family_visit: bool,
    pub social_service: bool,
}

impl WeeklyEntry {
    pub fn empty(week: u8) -> Self {
        Self {
            week,
            ..Self::default()
        }
    }
}
