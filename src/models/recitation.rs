use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecitationEntry {
    pub id: String,
    pub date: NaiveDate,
    pub surah: String,
    pub from_ayah: u32,
    pub to_ayah: u32,
    pub ayah_count: u32,
    pub created_at: NaiveDateTime,
}

/// Fields supplied when logging or editing a recitation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecitation {
    pub date: NaiveDate,
    pub surah: String,
    pub from_ayah: u32,
    pub to_ayah: u32,
}

impl NewRecitation {
    /// Inclusive verse count; zero when the range is inverted.
    pub fn ayah_count(&self) -> u32 {
        if self.to_ayah < self.from_ayah {
            0
        } else {
            self.to_ayah - self.from_ayah + 1
        }
    }
}
