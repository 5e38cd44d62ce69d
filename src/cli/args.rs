use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "amal", version, author, about = "A terminal ledger for Ramadan worship")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for without echo when omitted; pass it here for scripts
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Everything recorded for one day
    Day {
        /// YYYY-MM-DD, today, yesterday, or a Ramadan day like d5
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark an obligatory prayer as done or skipped
    Pray {
        /// Prayer name (fajr, dhuhr, asr, maghrib, isha) or all
        prayer: String,
        /// Mark as not performed, with a reason
        #[arg(long, value_name = "REASON")]
        skip: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark a supplementary prayer (dhuha, taraweeh, tahajjud, witr)
    Sunnah {
        kind: String,
        /// Number of rakaat performed
        #[arg(long)]
        rakaat: Option<u8>,
        /// Unmark instead
        #[arg(long)]
        undo: bool,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record the day's fast, or why it was not kept
    Fast {
        /// menstruation, illness, travel or other
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record sahur at HH:MM
    Sahur {
        /// Defaults to now
        time: Option<String>,
        /// Clear sahur for the day
        #[arg(long, conflicts_with = "time")]
        clear: bool,
        #[arg(long)]
        date: Option<String>,
    },
    /// Quran recitation log
    Tilawah {
        #[command(subcommand)]
        action: TilawahCommands,
    },
    /// Charity log
    Sedekah {
        #[command(subcommand)]
        action: SedekahCommands,
    },
    /// Zakat payments
    Zakat {
        #[command(subcommand)]
        action: ZakatCommands,
    },
    /// Weekly checklist (Friday prayer, study circle, family visit, social service)
    Week(WeekArgs),
    /// Planned activities
    Agenda {
        #[command(subcommand)]
        action: AgendaCommands,
    },
    /// Show or change daily targets
    Targets(TargetsArgs),
    /// Totals for the whole month
    Stats,
    /// Month grid with each day's progress
    Calendar,
    /// Print a summary of everything recorded
    Export {
        /// Dump all records as JSON instead
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TilawahCommands {
    /// Log a range of verses
    Add {
        surah: String,
        from: u32,
        to: u32,
        #[arg(long)]
        date: Option<String>,
    },
    /// List entries for a day, or all with --all
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "date")]
        all: bool,
    },
    /// Replace an entry
    Edit {
        /// Entry id or a unique prefix of it
        id: String,
        surah: String,
        from: u32,
        to: u32,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SedekahCommands {
    Add {
        /// Amount in Rupiah
        amount: f64,
        /// masjid, online or direct
        #[arg(long, default_value = "masjid")]
        channel: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "date")]
        all: bool,
    },
    /// Change some fields of an entry
    Edit {
        id: String,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ZakatCommands {
    Add {
        /// fitrah or maal
        kind: String,
        /// Number of people paid for
        #[arg(long, default_value = "1")]
        people: u32,
        /// Rupiah per person
        #[arg(long)]
        per_person: f64,
        /// masjid, laz or online
        #[arg(long, default_value = "masjid")]
        channel: String,
        /// HH:MM, defaults to now
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum AgendaCommands {
    Add {
        title: String,
        #[arg(long)]
        date: Option<String>,
        /// HH:MM
        #[arg(long)]
        time: String,
        /// ibadah, kajian or sosial
        #[arg(long, default_value = "ibadah")]
        category: String,
        #[arg(long)]
        no_reminder: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        time: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        reminder: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    /// Full name
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: u32,
    /// male or female
    #[arg(long)]
    pub sex: String,
    /// nu or muhammadiyah
    #[arg(long, default_value = "nu")]
    pub madhab: String,
    /// Prompted for without echo when omitted; pass it here for scripts
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args, Debug)]
pub struct WeekArgs {
    /// Week of Ramadan; defaults to the current one
    pub week: Option<u8>,
    #[arg(long)]
    pub friday: Option<bool>,
    /// Friday sermon note
    #[arg(long)]
    pub sermon: Option<String>,
    #[arg(long)]
    pub kajian: Option<bool>,
    #[arg(long)]
    pub family: Option<bool>,
    #[arg(long)]
    pub social: Option<bool>,
}

#[derive(Args, Debug)]
pub struct TargetsArgs {
    #[arg(long)]
    pub prayers: Option<bool>,
    #[arg(long)]
    pub recitation: Option<bool>,
    #[arg(long)]
    pub charity: Option<bool>,
    #[arg(long)]
    pub fasting: Option<bool>,
    /// Verses per day counted as meeting the recitation target
    #[arg(long)]
    pub verses: Option<u32>,
    /// Rupiah per day counted as meeting the charity target
    #[arg(long)]
    pub amount: Option<f64>,
}
