mod auth;
mod cli;
mod config;
mod db;
mod error;
mod ledger;
mod models;
mod utils;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::process::ExitCode;

use auth::{IdentityProvider, LocalIdentity};
use cli::args::{Cli, Commands};
use cli::handlers::{self, Context};
use config::AppConfig;
use error::LedgerError;
use ledger::Ledger;
use utils::hijri::RamadanCalendar;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<LedgerError>() {
                Some(user_error) => eprintln!("\x1b[31m  ✗ {}\x1b[0m", user_error),
                None => {
                    log::error!("{:#}", err);
                    eprintln!("\x1b[31m  ✗ {:#}\x1b[0m", err);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load().context("Loading config")?;
    if !AppConfig::config_path()?.exists() {
        config.save().context("Writing default config")?;
        log::debug!("Wrote default config to {:?}", AppConfig::config_path()?);
    }
    let backend = db::open_backend(&config).context("Opening store")?;
    let identity = LocalIdentity::new(backend.clone());

    // Account commands don't need a ledger
    let command = match cli.command {
        Some(Commands::Register(args)) => return handlers::handle_register(&identity, &args),
        Some(Commands::Login { email, password }) => {
            return handlers::handle_login(&identity, &email, password.as_deref());
        }
        Some(Commands::Logout) => return handlers::handle_logout(&identity),
        Some(Commands::Whoami) => return handlers::handle_whoami(&identity),
        Some(cmd) => cmd,
        None => Commands::Day { date: None },
    };

    let profile = match identity.session()? {
        Some(session) => identity.profile(&session.user_id)?,
        None => None,
    };
    let ledger = Ledger::new(
        backend,
        profile.as_ref().map(|p| p.id.as_str()),
        profile.as_ref().map(|p| p.sex),
    );
    let ctx = Context {
        ledger: &ledger,
        calendar: RamadanCalendar::from_config(&config.ramadan),
        hijri_offset: config.ramadan.hijri_offset,
        profile: profile.as_ref(),
    };

    match command {
        Commands::Day { date } => handlers::handle_day(&ctx, date.as_deref()),
        Commands::Pray { prayer, skip, date } => {
            handlers::handle_pray(&ctx, &prayer, skip.as_deref(), date.as_deref())
        }
        Commands::Sunnah {
            kind,
            rakaat,
            undo,
            date,
        } => handlers::handle_sunnah(&ctx, &kind, rakaat, undo, date.as_deref()),
        Commands::Fast { reason, date } => {
            handlers::handle_fast(&ctx, reason.as_deref(), date.as_deref())
        }
        Commands::Sahur { time, clear, date } => {
            handlers::handle_sahur(&ctx, time.as_deref(), clear, date.as_deref())
        }
        Commands::Tilawah { action } => handlers::handle_tilawah(&ctx, &action),
        Commands::Sedekah { action } => handlers::handle_sedekah(&ctx, &action),
        Commands::Zakat { action } => handlers::handle_zakat(&ctx, &action),
        Commands::Week(args) => handlers::handle_week(&ctx, &args),
        Commands::Agenda { action } => handlers::handle_agenda(&ctx, &action),
        Commands::Targets(args) => handlers::handle_targets(&ctx, &args),
        Commands::Stats => handlers::handle_stats(&ctx),
        Commands::Calendar => handlers::handle_calendar(&ctx),
        Commands::Export { json } => handlers::handle_export(&ctx, json),
        Commands::Register(_) | Commands::Login { .. } | Commands::Logout | Commands::Whoami => {
            unreachable!()
        }
    }
}
