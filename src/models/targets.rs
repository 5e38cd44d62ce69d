use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTargets {
    pub prayers_on_time: bool,
    pub daily_recitation: bool,
    pub daily_charity: bool,
    pub full_fast: bool,
    pub verse_target: Option<u32>,
    pub charity_target: Option<f64>,
}

impl Default for DailyTargets {
    fn default() -> Self {
        Self {
            prayers_on_time: true,
            daily_recitation: true,
            daily_charity: false,
            full_fast: true,
            verse_target: None,
            charity_target: None,
        }
    }
}

impl DailyTargets {
    /// Drops thresholds whose toggle is off.
    pub fn normalized(mut self) -> Self {
        if !self.daily_recitation {
            self.verse_target = None;
        }
        if !self.daily_charity {
            self.charity_target = None;
        }
        self
    }
}
