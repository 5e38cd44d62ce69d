pub mod account;
pub mod agenda;
pub mod donation;
pub mod fasting;
pub mod prayer;
pub mod recitation;
pub mod stats;
pub mod targets;
pub mod weekly;

pub use account::{Madhab, Sex, UserProfile};
pub use agenda::{AgendaCategory, AgendaItem, AgendaPatch, NewAgendaItem};
pub use donation::{
    CharityChannel, CharityEntry, CharityPatch, Donation, DonationKind, NewCharity, NewZakat,
    ZakatChannel, ZakatKind, ZakatPayment,
};
pub use fasting::{FastingDay, FastingReason};
pub use prayer::{
    Prayer, PrayerDay, PrayerMark, SupplementaryMark, SupplementaryPrayer, SupplementaryPrayerDay,
};
pub use recitation::{NewRecitation, RecitationEntry};
pub use stats::{DaySummary, TargetProgress, Totals};
pub use targets::DailyTargets;
pub use weekly::WeeklyEntry;
