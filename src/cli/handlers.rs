use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, NaiveTime, Timelike};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};
use std::str::FromStr;

use crate::auth::{IdentityProvider, NewAccount};
use crate::cli::args::{
    AgendaCommands, RegisterArgs, SedekahCommands, TargetsArgs, TilawahCommands, WeekArgs,
    ZakatCommands,
};
use crate::error::LedgerError;
use crate::ledger::Ledger;
use crate::models::{
    AgendaCategory, AgendaPatch, CharityChannel, CharityPatch, DaySummary, FastingReason,
    NewAgendaItem, NewCharity, NewRecitation, NewZakat, Prayer, PrayerDay, PrayerMark,
    SupplementaryPrayer, TargetProgress, UserProfile, ZakatChannel, ZakatKind,
};
use crate::utils::format::{check, format_rupiah, format_time, pad, progress_bar};
use crate::utils::hijri::{hijri_string, RamadanCalendar};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

/// What every ledger command needs besides its own arguments.
pub struct Context<'a> {
    pub ledger: &'a Ledger,
    pub calendar: RamadanCalendar,
    pub hijri_offset: i32,
    pub profile: Option<&'a UserProfile>,
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub fn handle_register(identity: &dyn IdentityProvider, args: &RegisterArgs) -> Result<()> {
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt_password("  Password: ")?,
    };
    let session = identity.sign_up(NewAccount {
        email: args.email.clone(),
        password,
        full_name: args.name.clone(),
        age: args.age,
        sex: parse_choice(&args.sex, "sex", "male, female")?,
        madhab: parse_choice(&args.madhab, "madhab", "nu, muhammadiyah")?,
    })?;
    println_colored!(GREEN, "  ✓ Registered and signed in as {}", session.email);
    Ok(())
}

pub fn handle_login(
    identity: &dyn IdentityProvider,
    email: &str,
    password: Option<&str>,
) -> Result<()> {
    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_password("  Password: ")?,
    };
    let session = identity.sign_in(email, &password)?;
    println_colored!(GREEN, "  ✓ Signed in as {}", session.email);
    Ok(())
}

pub fn handle_logout(identity: &dyn IdentityProvider) -> Result<()> {
    let session = identity.session()?.ok_or(LedgerError::NotSignedIn)?;
    identity.sign_out()?;
    println_colored!(DIM, "  Signed out {}", session.email);
    Ok(())
}

pub fn handle_whoami(identity: &dyn IdentityProvider) -> Result<()> {
    let session = identity.session()?.ok_or(LedgerError::NotSignedIn)?;
    let profile = identity
        .profile(&session.user_id)?
        .ok_or(LedgerError::NotSignedIn)?;
    println!();
    println_colored!(GOLD, "  {}", profile.full_name);
    println!("  Email:   {}", profile.email);
    println!("  Age:     {}", profile.age);
    println!("  Sex:     {}", profile.sex.as_str());
    println!("  Madhab:  {}", profile.madhab.as_str().to_uppercase());
    println_colored!(DIM, "  Member since {}", profile.created_at.format("%Y-%m-%d"));
    println!();
    Ok(())
}

// ─── Day view ────────────────────────────────────────────────────────────────

pub fn handle_day(ctx: &Context, date: Option<&str>) -> Result<()> {
    let date = parse_date(date, &ctx.calendar)?;
    let ledger = ctx.ledger;
    let prayers = ledger.prayer_day(date)?;
    let sunnah = ledger.supplementary_day(date)?;
    let fasting = ledger.fasting_day(date)?;
    let recitations = ledger.recitations(Some(date))?;
    let charity = ledger.charity(Some(date))?;
    let agenda: Vec<_> = ledger
        .agenda()?
        .into_iter()
        .filter(|a| a.date == date)
        .collect();

    println!();
    let name = ctx.profile.map(|p| p.first_name()).unwrap_or("Saudara");
    println_colored!(GOLD, "  Ramadhan Mubarak, {}!", name);
    println_colored!(
        DIM,
        "  {}  {}  {}",
        date.format("%A, %d %B %Y"),
        hijri_string(date, ctx.hijri_offset),
        day_label(&ctx.calendar, date)
    );
    println!();

    println_colored!(BOLD, "  Sholat wajib  {}/5", prayers.performed_count());
    for prayer in Prayer::all() {
        let mark = prayers.get(prayer);
        match (&mark.reason, mark.performed) {
            (_, true) => println_colored!(GREEN, "    ✓ {}", prayer.display_name()),
            (Some(reason), false) => {
                println_colored!(RED, "    ✗ {}  ({})", pad(prayer.display_name(), 8), reason)
            }
            (None, false) => println_colored!(DIM, "    · {}", prayer.display_name()),
        }
    }

    println_colored!(BOLD, "  Sholat sunnah");
    for kind in SupplementaryPrayer::all() {
        let mark = sunnah.get(kind);
        let color = if mark.performed { GREEN } else { DIM };
        println_colored!(
            color,
            "    {} {}  {} rakaat",
            check(mark.performed),
            pad(kind.display_name(), 9),
            mark.rakaat
        );
    }

    println_colored!(BOLD, "  Puasa");
    match (fasting.fasting, fasting.reason) {
        (true, _) => println_colored!(GREEN, "    ✓ Berpuasa"),
        (false, Some(reason)) => println_colored!(AMBER, "    ✗ Tidak berpuasa ({})", reason),
        (false, None) => println_colored!(DIM, "    · Belum dicatat"),
    }
    match fasting.sahur_time {
        Some(t) if fasting.sahur => println_colored!(GREEN, "    ✓ Sahur {}", format_time(t)),
        _ => println_colored!(DIM, "    · Sahur"),
    }

    let verses: u32 = recitations.iter().map(|r| r.ayah_count).sum();
    println_colored!(BOLD, "  Tilawah  {} ayat", verses);
    for r in &recitations {
        println!(
            "    {}  {} {}-{}",
            short_id(&r.id),
            pad(&r.surah, 16),
            r.from_ayah,
            r.to_ayah
        );
    }

    let given: f64 = charity.iter().map(|c| c.amount).sum();
    println_colored!(BOLD, "  Sedekah  {}", format_rupiah(given));
    for c in &charity {
        println!(
            "    {}  {}  {}",
            short_id(&c.id),
            pad(&format_rupiah(c.amount), 14),
            c.channel.as_str()
        );
    }

    if !agenda.is_empty() {
        println_colored!(BOLD, "  Agenda");
        for a in &agenda {
            println!("    {}  {}  {}", format_time(a.time), a.title, a.category.as_str());
        }
    }

    let snapshot = ledger.snapshot()?;
    let summary = DaySummary::for_date(&snapshot, date);
    let progress = TargetProgress::evaluate(&ledger.targets()?, &summary);
    println!();
    println_colored!(
        AMBER,
        "  Target harian  {}  {}/{}",
        progress_bar(progress.met(), progress.enabled(), 8),
        progress.met(),
        progress.enabled()
    );
    println!();
    Ok(())
}

// ─── Prayers ─────────────────────────────────────────────────────────────────

pub fn handle_pray(
    ctx: &Context,
    prayer: &str,
    skip: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let date = parse_date(date, &ctx.calendar)?;
    let mark = match skip {
        Some(reason) => PrayerMark::skipped(reason.trim()),
        None => PrayerMark::done(),
    };
    if prayer.trim().eq_ignore_ascii_case("all") {
        let mut day = PrayerDay::empty(date);
        for p in Prayer::all() {
            *day.get_mut(p) = mark.clone();
        }
        ctx.ledger.update_prayer_day(&day)?;
        println_colored!(GREEN, "  ✓ All five prayers recorded for {}", date);
        return Ok(());
    }
    let prayer: Prayer =
        parse_choice(prayer, "prayer", "fajr, dhuhr, asr, maghrib, isha, all")?;
    let day = ctx.ledger.mark_prayer(date, prayer, mark)?;
    if day.get(prayer).performed {
        println_colored!(GREEN, "  ✓ {} marked as done", prayer.display_name());
    } else {
        println_colored!(RED, "  ✗ {} marked as not performed", prayer.display_name());
    }
    println_colored!(DIM, "  {}: {}/5 prayers", date, day.performed_count());
    Ok(())
}

pub fn handle_sunnah(
    ctx: &Context,
    kind: &str,
    rakaat: Option<u8>,
    undo: bool,
    date: Option<&str>,
) -> Result<()> {
    let kind: SupplementaryPrayer =
        parse_choice(kind, "prayer", "dhuha, taraweeh, tahajjud, witr")?;
    let date = parse_date(date, &ctx.calendar)?;
    let day = ctx.ledger.mark_supplementary(date, kind, !undo, rakaat)?;
    let mark = day.get(kind);
    if mark.performed {
        println_colored!(
            GREEN,
            "  ✓ {} marked, {} rakaat",
            kind.display_name(),
            mark.rakaat
        );
    } else {
        println_colored!(DIM, "  · {} unmarked", kind.display_name());
    }
    Ok(())
}

// ─── Fasting ─────────────────────────────────────────────────────────────────

pub fn handle_fast(ctx: &Context, reason: Option<&str>, date: Option<&str>) -> Result<()> {
    let date = parse_date(date, &ctx.calendar)?;
    let outcome = match reason {
        None => Ok(()),
        Some(r) => {
            let allowed = FastingReason::allowed_for(ctx.ledger.sex())
                .iter()
                .map(FastingReason::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            Err(parse_choice::<FastingReason>(r, "reason", &allowed)?)
        }
    };
    let day = ctx.ledger.mark_fasting(date, outcome)?;
    match day.reason {
        None => println_colored!(GREEN, "  ✓ Fast recorded for {}", date),
        Some(reason) => println_colored!(AMBER, "  ✗ Not fasting on {}: {}", date, reason),
    }
    Ok(())
}

pub fn handle_sahur(
    ctx: &Context,
    time: Option<&str>,
    clear: bool,
    date: Option<&str>,
) -> Result<()> {
    let date = parse_date(date, &ctx.calendar)?;
    let time = if clear {
        None
    } else {
        Some(match time {
            Some(t) => parse_time(t)?,
            None => now_minute(),
        })
    };
    let day = ctx.ledger.mark_sahur(date, time)?;
    match day.sahur_time {
        Some(t) => println_colored!(GREEN, "  ✓ Sahur at {} on {}", format_time(t), date),
        None => println_colored!(DIM, "  · Sahur cleared for {}", date),
    }
    Ok(())
}

// ─── Tilawah ─────────────────────────────────────────────────────────────────

pub fn handle_tilawah(ctx: &Context, action: &TilawahCommands) -> Result<()> {
    let ledger = ctx.ledger;
    match action {
        TilawahCommands::Add {
            surah,
            from,
            to,
            date,
        } => {
            let entry = ledger.add_recitation(NewRecitation {
                date: parse_date(date.as_deref(), &ctx.calendar)?,
                surah: surah.clone(),
                from_ayah: *from,
                to_ayah: *to,
            })?;
            println_colored!(
                GREEN,
                "  ✓ {} {}-{} logged, {} ayat",
                entry.surah,
                entry.from_ayah,
                entry.to_ayah,
                entry.ayah_count
            );
        }
        TilawahCommands::List { date, all } => {
            let filter = if *all {
                None
            } else {
                Some(parse_date(date.as_deref(), &ctx.calendar)?)
            };
            let entries = ledger.recitations(filter)?;
            println!();
            if entries.is_empty() {
                println_colored!(DIM, "  No recitation logged");
            }
            for e in &entries {
                println!(
                    "  {}  {}  {} {}-{}  ({} ayat)",
                    short_id(&e.id),
                    e.date,
                    pad(&e.surah, 16),
                    e.from_ayah,
                    e.to_ayah,
                    e.ayah_count
                );
            }
            let total: u32 = entries.iter().map(|e| e.ayah_count).sum();
            println_colored!(BOLD, "  Total: {} ayat", total);
            println!();
        }
        TilawahCommands::Edit {
            id,
            surah,
            from,
            to,
            date,
        } => {
            let entries = ledger.recitations(None)?;
            let id = resolve_id(entries.iter().map(|e| e.id.as_str()), id)?;
            let current = entries.iter().find(|e| e.id == id).map(|e| e.date);
            let date = match (date, current) {
                (None, Some(d)) => d,
                (date, _) => parse_date(date.as_deref(), &ctx.calendar)?,
            };
            ledger.edit_recitation(
                &id,
                NewRecitation {
                    date,
                    surah: surah.clone(),
                    from_ayah: *from,
                    to_ayah: *to,
                },
            )?;
            println_colored!(GREEN, "  ✓ Entry {} updated", short_id(&id));
        }
        TilawahCommands::Delete { id } => {
            let entries = ledger.recitations(None)?;
            let id = resolve_id(entries.iter().map(|e| e.id.as_str()), id)?;
            ledger.delete_recitation(&id)?;
            println_colored!(DIM, "  Entry {} deleted", short_id(&id));
        }
    }
    Ok(())
}

// ─── Sedekah ─────────────────────────────────────────────────────────────────

pub fn handle_sedekah(ctx: &Context, action: &SedekahCommands) -> Result<()> {
    let ledger = ctx.ledger;
    match action {
        SedekahCommands::Add {
            amount,
            channel,
            notes,
            date,
        } => {
            let entry = ledger.add_charity(NewCharity {
                date: parse_date(date.as_deref(), &ctx.calendar)?,
                amount: *amount,
                channel: parse_choice(channel, "channel", "masjid, online, direct")?,
                notes: notes.clone(),
            })?;
            println_colored!(
                GREEN,
                "  ✓ {} via {} recorded",
                format_rupiah(entry.amount),
                entry.channel.as_str()
            );
        }
        SedekahCommands::List { date, all } => {
            let filter = if *all {
                None
            } else {
                Some(parse_date(date.as_deref(), &ctx.calendar)?)
            };
            let entries = ledger.charity(filter)?;
            println!();
            if entries.is_empty() {
                println_colored!(DIM, "  No charity recorded");
            }
            for e in &entries {
                println!(
                    "  {}  {}  {}  {}  {}",
                    short_id(&e.id),
                    e.date,
                    pad(&format_rupiah(e.amount), 14),
                    pad(e.channel.as_str(), 7),
                    e.notes.as_deref().unwrap_or("")
                );
            }
            let total: f64 = entries.iter().map(|e| e.amount).sum();
            println_colored!(BOLD, "  Total: {}", format_rupiah(total));
            println!();
        }
        SedekahCommands::Edit {
            id,
            amount,
            channel,
            notes,
        } => {
            let entries = ledger.charity(None)?;
            let id = resolve_id(entries.iter().map(|e| e.id.as_str()), id)?;
            let channel = channel
                .as_deref()
                .map(|c| parse_choice::<CharityChannel>(c, "channel", "masjid, online, direct"))
                .transpose()?;
            ledger.update_charity(
                &id,
                CharityPatch {
                    amount: *amount,
                    channel,
                    notes: notes.clone(),
                },
            )?;
            println_colored!(GREEN, "  ✓ Entry {} updated", short_id(&id));
        }
        SedekahCommands::Delete { id } => {
            let entries = ledger.charity(None)?;
            let id = resolve_id(entries.iter().map(|e| e.id.as_str()), id)?;
            ledger.delete_charity(&id)?;
            println_colored!(DIM, "  Entry {} deleted", short_id(&id));
        }
    }
    Ok(())
}

// ─── Zakat ───────────────────────────────────────────────────────────────────

pub fn handle_zakat(ctx: &Context, action: &ZakatCommands) -> Result<()> {
    let ledger = ctx.ledger;
    match action {
        ZakatCommands::Add {
            kind,
            people,
            per_person,
            channel,
            time,
            notes,
            date,
        } => {
            let kind: ZakatKind = parse_choice(kind, "zakat kind", "fitrah, maal")?;
            let channel: ZakatChannel = parse_choice(channel, "channel", "masjid, laz, online")?;
            let payment = ledger.add_zakat(NewZakat {
                kind,
                paid_on: parse_date(date.as_deref(), &ctx.calendar)?,
                paid_at: match time {
                    Some(t) => parse_time(t)?,
                    None => now_minute(),
                },
                channel,
                people: *people,
                amount_per_person: *per_person,
                notes: notes.clone(),
            })?;
            println_colored!(
                GREEN,
                "  ✓ Zakat {} for {} people: {}",
                payment.kind.display_name(),
                payment.people,
                format_rupiah(payment.total_amount)
            );
        }
        ZakatCommands::List => {
            let payments = ledger.zakat_payments()?;
            println!();
            println_colored!(GOLD, "  Zakat");
            if payments.is_empty() {
                println_colored!(DIM, "  No zakat recorded");
            }
            for p in &payments {
                println!(
                    "  {} {}  {}  {} × {}  = {}  {}",
                    p.paid_on,
                    format_time(p.paid_at),
                    pad(p.kind.display_name(), 6),
                    p.people,
                    format_rupiah(p.amount_per_person),
                    format_rupiah(p.total_amount),
                    p.channel.as_str()
                );
            }
            let total: f64 = payments.iter().map(|p| p.total_amount).sum();
            println_colored!(BOLD, "  Total: {}", format_rupiah(total));
            println!();
        }
    }
    Ok(())
}

// ─── Weekly ──────────────────────────────────────────────────────────────────

pub fn handle_week(ctx: &Context, args: &WeekArgs) -> Result<()> {
    let weeks = ctx.calendar.weeks();
    let week = match args.week {
        Some(w) => w,
        None => ctx.calendar.week_of(today()).unwrap_or(1),
    };
    if week == 0 || week > weeks {
        return Err(LedgerError::validation(format!("Week must be between 1 and {}", weeks)).into());
    }

    let mut entry = ctx.ledger.weekly_entry(week)?;
    let changed = args.friday.is_some()
        || args.sermon.is_some()
        || args.kajian.is_some()
        || args.family.is_some()
        || args.social.is_some();
    if changed {
        if let Some(v) = args.friday {
            entry.friday_prayer = v;
        }
        if let Some(note) = &args.sermon {
            entry.sermon_note = Some(note.clone());
        }
        if let Some(v) = args.kajian {
            entry.study_circle = v;
        }
        if let Some(v) = args.family {
            entry.family_visit = v;
        }
        if let Some(v) = args.social {
            entry.social_service = v;
        }
        ctx.ledger.update_weekly_entry(&entry)?;
        entry = ctx.ledger.weekly_entry(week)?;
    }

    let dates = ctx.calendar.week_dates(week);
    println!();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => {
            println_colored!(GOLD, "  Pekan {}  ({} – {})", week, first, last)
        }
        _ => println_colored!(GOLD, "  Pekan {}", week),
    }
    println!("  {} Sholat Jumat", check(entry.friday_prayer));
    if let Some(note) = &entry.sermon_note {
        println_colored!(DIM, "      {}", note);
    }
    println!("  {} Kajian", check(entry.study_circle));
    println!("  {} Silaturahmi", check(entry.family_visit));
    println!("  {} Bakti sosial", check(entry.social_service));
    println!();
    Ok(())
}

// ─── Agenda ──────────────────────────────────────────────────────────────────

pub fn handle_agenda(ctx: &Context, action: &AgendaCommands) -> Result<()> {
    let ledger = ctx.ledger;
    match action {
        AgendaCommands::Add {
            title,
            date,
            time,
            category,
            no_reminder,
            notes,
        } => {
            let item = ledger.add_agenda(NewAgendaItem {
                title: title.clone(),
                date: parse_date(date.as_deref(), &ctx.calendar)?,
                time: parse_time(time)?,
                category: parse_choice(category, "category", "ibadah, kajian, sosial")?,
                reminder: !no_reminder,
                notes: notes.clone(),
            })?;
            println_colored!(
                GREEN,
                "  ✓ {} on {} at {}",
                item.title,
                item.date,
                format_time(item.time)
            );
        }
        AgendaCommands::List => {
            let items = ledger.agenda()?;
            let today = today();
            println!();
            println_colored!(GOLD, "  Agenda");
            if items.is_empty() {
                println_colored!(DIM, "  Nothing planned");
            }
            for a in &items {
                let line = format!(
                    "  {}  {} {}  {}  {}{}",
                    short_id(&a.id),
                    a.date,
                    format_time(a.time),
                    pad(a.category.as_str(), 7),
                    a.title,
                    if a.reminder { "  ⏰" } else { "" }
                );
                if a.date < today {
                    println_colored!(DIM, "{}", line);
                } else {
                    println!("{}", line);
                }
            }
            println!();
        }
        AgendaCommands::Edit {
            id,
            title,
            date,
            time,
            category,
            reminder,
            notes,
        } => {
            let items = ledger.agenda()?;
            let id = resolve_id(items.iter().map(|a| a.id.as_str()), id)?;
            let patch = AgendaPatch {
                title: title.clone(),
                date: date
                    .as_deref()
                    .map(|d| parse_date(Some(d), &ctx.calendar))
                    .transpose()?,
                time: time.as_deref().map(parse_time).transpose()?,
                category: category
                    .as_deref()
                    .map(|c| {
                        parse_choice::<AgendaCategory>(c, "category", "ibadah, kajian, sosial")
                    })
                    .transpose()?,
                reminder: *reminder,
                notes: notes.clone(),
            };
            ledger.update_agenda(&id, patch)?;
            println_colored!(GREEN, "  ✓ Agenda {} updated", short_id(&id));
        }
        AgendaCommands::Delete { id } => {
            let items = ledger.agenda()?;
            let id = resolve_id(items.iter().map(|a| a.id.as_str()), id)?;
            ledger.delete_agenda(&id)?;
            println_colored!(DIM, "  Agenda {} deleted", short_id(&id));
        }
    }
    Ok(())
}

// ─── Targets ─────────────────────────────────────────────────────────────────

pub fn handle_targets(ctx: &Context, args: &TargetsArgs) -> Result<()> {
    let mut targets = ctx.ledger.targets()?;
    let changed = args.prayers.is_some()
        || args.recitation.is_some()
        || args.charity.is_some()
        || args.fasting.is_some()
        || args.verses.is_some()
        || args.amount.is_some();
    if changed {
        if let Some(v) = args.prayers {
            targets.prayers_on_time = v;
        }
        if let Some(v) = args.recitation {
            targets.daily_recitation = v;
        }
        if let Some(v) = args.charity {
            targets.daily_charity = v;
        }
        if let Some(v) = args.fasting {
            targets.full_fast = v;
        }
        if args.verses.is_some() {
            targets.verse_target = args.verses;
        }
        if args.amount.is_some() {
            targets.charity_target = args.amount;
        }
        targets = ctx.ledger.set_targets(targets)?;
    }

    println!();
    println_colored!(GOLD, "  Target harian");
    println!("  {} Sholat 5 waktu", check(targets.prayers_on_time));
    match targets.verse_target {
        Some(n) => println!("  {} Tilawah {} ayat", check(targets.daily_recitation), n),
        None => println!("  {} Tilawah", check(targets.daily_recitation)),
    }
    match targets.charity_target {
        Some(amount) => println!(
            "  {} Sedekah {}",
            check(targets.daily_charity),
            format_rupiah(amount)
        ),
        None => println!("  {} Sedekah", check(targets.daily_charity)),
    }
    println!("  {} Puasa penuh", check(targets.full_fast));
    println!();
    Ok(())
}

// ─── Stats ───────────────────────────────────────────────────────────────────

pub fn handle_stats(ctx: &Context) -> Result<()> {
    let totals = ctx.ledger.totals()?;
    let days = ctx.calendar.days;

    println!();
    println_colored!(GOLD, "  Statistik Ramadhan  {}", day_label(&ctx.calendar, today()));
    println!();
    println_colored!(
        BOLD,
        "  Puasa     {}  {}/{} hari",
        progress_bar(totals.fasting_days, days, 20),
        totals.fasting_days,
        days
    );
    println_colored!(
        BOLD,
        "  Sholat    {}  {}/{} waktu",
        progress_bar(totals.prayers, days * 5, 20),
        totals.prayers,
        days * 5
    );
    println!("  Tilawah   {} ayat", totals.verses);
    println!("  Sedekah   {}", format_rupiah(totals.charity));
    println!("  Zakat     {}", format_rupiah(totals.zakat));
    println!();
    Ok(())
}

// ─── Calendar ────────────────────────────────────────────────────────────────

pub fn handle_calendar(ctx: &Context) -> Result<()> {
    let snapshot = ctx.ledger.snapshot()?;
    let targets = ctx.ledger.targets()?;
    let today = today();

    println!();
    println_colored!(GOLD, "  Kalender Ramadhan");
    println_colored!(DIM, "  ● = 5/5, ◕ = 3-4, ◑ = 1-2, ○ = 0/5, ✦ = targets met");
    for week in 1..=ctx.calendar.weeks() {
        println!();
        print!("  ");
        for date in ctx.calendar.week_dates(week) {
            let day = ctx.calendar.day_number(date).unwrap_or(0);
            let summary = DaySummary::for_date(&snapshot, date);
            let progress = TargetProgress::evaluate(&targets, &summary);
            let (color, icon) = match summary.prayers_done {
                5 => (GREEN, "●"),
                3 | 4 => (AMBER, "◕"),
                1 | 2 => (AMBER, "◑"),
                _ => (DIM, "○"),
            };
            let star = if progress.enabled() > 0 && progress.met() == progress.enabled() {
                "✦"
            } else {
                " "
            };
            let marker = if date == today { BOLD } else { "" };
            print!("{}{:>2}{}{}{}\x1b[0m  ", marker, day, color, icon, star);
        }
        println!();
    }
    println!();
    Ok(())
}

// ─── Export ──────────────────────────────────────────────────────────────────

pub fn handle_export(ctx: &Context, json: bool) -> Result<()> {
    let snapshot = ctx.ledger.refresh()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let totals = ctx.ledger.totals()?;
    let name = ctx.profile.map(|p| p.full_name.as_str()).unwrap_or("Guest");
    println!("# amal — Ramadhan Summary");
    println!("# {}", today());
    println!();
    println!("Name:  {}", name);
    println!("Start: {} ({} days)", ctx.calendar.start, ctx.calendar.days);
    println!();
    println!("## Daily");
    for date in ctx.calendar.dates() {
        let s = DaySummary::for_date(&snapshot, date);
        println!(
            "  {}  {}/5  {}  puasa:{}  tilawah:{}  sedekah:{}",
            date,
            s.prayers_done,
            progress_bar(s.prayers_done as u32, 5, 5),
            check(s.fasting),
            s.verses,
            format_rupiah(s.charity_amount)
        );
    }
    println!();
    println!("## Zakat");
    for z in snapshot.zakat() {
        println!(
            "  {}  {}  {}",
            z.paid_on,
            z.kind.display_name(),
            format_rupiah(z.total_amount)
        );
    }
    println!();
    println!("## Summary");
    println!("  Fasting days: {}", totals.fasting_days);
    println!("  Prayers:      {}", totals.prayers);
    println!("  Verses:       {}", totals.verses);
    println!("  Charity:      {}", format_rupiah(totals.charity));
    println!("  Zakat:        {}", format_rupiah(totals.zakat));
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now_minute() -> NaiveTime {
    let now = Local::now().time();
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now)
}

fn day_label(calendar: &RamadanCalendar, date: NaiveDate) -> String {
    match (calendar.day_number(date), calendar.days_until(date)) {
        (Some(n), _) => format!("Hari ke-{}", n),
        (None, Some(n)) => format!("Menuju Ramadhan, {} hari lagi", n),
        (None, None) => "Ramadhan telah berlalu".to_string(),
    }
}

/// Accepts YYYY-MM-DD, `today`, `yesterday`, or `dN` for day N of Ramadan.
fn parse_date(input: Option<&str>, calendar: &RamadanCalendar) -> Result<NaiveDate> {
    let Some(input) = input.map(str::trim) else {
        return Ok(today());
    };
    match input {
        "today" => return Ok(today()),
        "yesterday" => return Ok(today() - Duration::days(1)),
        _ => {}
    }
    if let Some(n) = input.strip_prefix('d').and_then(|n| n.parse::<u32>().ok()) {
        return calendar.date_of(n).ok_or_else(|| {
            LedgerError::validation(format!("Ramadan has days 1 to {}", calendar.days)).into()
        });
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        LedgerError::validation(format!("Invalid date '{}'. Use YYYY-MM-DD", input)).into()
    })
}

fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| {
        LedgerError::validation(format!("Invalid time '{}'. Use HH:MM", input)).into()
    })
}

fn parse_choice<T: FromStr>(input: &str, what: &str, options: &str) -> Result<T> {
    T::from_str(input.trim()).map_err(|_| {
        LedgerError::validation(format!("Unknown {} '{}'. Use: {}", what, input, options)).into()
    })
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Expands a unique id prefix to the full id.
fn resolve_id<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Result<String> {
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(LedgerError::validation(format!("No entry with id '{}'", prefix)).into()),
        _ => Err(LedgerError::validation(format!(
            "'{}' matches {} entries, give more of the id",
            prefix,
            matches.len()
        ))
        .into()),
    }
}

enum Typed {
    More,
    Done,
    Cancelled,
}

fn apply_key(buf: &mut String, key: KeyEvent) -> Typed {
    if key.kind != KeyEventKind::Press {
        return Typed::More;
    }
    match key.code {
        KeyCode::Enter => Typed::Done,
        KeyCode::Esc => Typed::Cancelled,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Typed::Cancelled,
        KeyCode::Char(c) => {
            buf.push(c);
            Typed::More
        }
        KeyCode::Backspace => {
            buf.pop();
            Typed::More
        }
        _ => Typed::More,
    }
}

fn read_hidden() -> Result<String> {
    let mut buf = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut buf, key) {
                Typed::More => {}
                Typed::Done => return Ok(buf),
                Typed::Cancelled => anyhow::bail!("Cancelled"),
            }
        }
    }
}

/// Reads a password without echoing it. Piped input is read as a plain line.
fn prompt_password(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().lock().read_line(&mut buf)?;
        return Ok(buf.trim_end_matches(['\r', '\n']).to_string());
    }
    terminal::enable_raw_mode()?;
    let typed = read_hidden();
    terminal::disable_raw_mode()?;
    println!();
    typed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> RamadanCalendar {
        RamadanCalendar::new(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(), 30)
    }

    #[test]
    fn dates_by_day_number() {
        let cal = calendar();
        assert_eq!(
            parse_date(Some("d1"), &cal).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert_eq!(
            parse_date(Some("2026-03-10"), &cal).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
        );
        assert!(parse_date(Some("d31"), &cal).is_err());
        assert!(parse_date(Some("10/03/2026"), &cal).is_err());
        assert_eq!(parse_date(None, &cal).unwrap(), today());
    }

    #[test]
    fn id_prefixes() {
        let ids = ["abc123", "abd456", "xyz"];
        assert_eq!(resolve_id(ids.into_iter(), "abc").unwrap(), "abc123");
        assert!(resolve_id(ids.into_iter(), "ab").is_err());
        assert!(resolve_id(ids.into_iter(), "q").is_err());
    }

    #[test]
    fn choices_report_options() {
        let err = parse_choice::<Prayer>("brunch", "prayer", "fajr, dhuhr").unwrap_err();
        assert_eq!(err.to_string(), "Unknown prayer 'brunch'. Use: fajr, dhuhr");
        assert_eq!(parse_choice::<Prayer>(" Subuh ", "prayer", "").unwrap(), Prayer::Fajr);
    }

    #[test]
    fn hidden_input_editing() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        let mut buf = String::new();
        for c in "sabr!".chars() {
            assert!(matches!(apply_key(&mut buf, key(KeyCode::Char(c))), Typed::More));
        }
        apply_key(&mut buf, key(KeyCode::Backspace));
        assert_eq!(buf, "sabr");
        assert!(matches!(apply_key(&mut buf, key(KeyCode::Enter)), Typed::Done));

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(apply_key(&mut buf, ctrl_c), Typed::Cancelled));
        assert_eq!(buf, "sabr");
    }
}
