use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS daily_records (
            user_id   TEXT NOT NULL,
            date      TEXT NOT NULL,
            fajr      INTEGER NOT NULL DEFAULT 0,
            dhuhr     INTEGER NOT NULL DEFAULT 0,
            asr       INTEGER NOT NULL DEFAULT 0,
            maghrib   INTEGER NOT NULL DEFAULT 0,
            isha      INTEGER NOT NULL DEFAULT 0,
            dhuha     INTEGER NOT NULL DEFAULT 0,
            taraweeh  INTEGER NOT NULL DEFAULT 0,
            tahajjud  INTEGER NOT NULL DEFAULT 0,
            witr      INTEGER NOT NULL DEFAULT 0,
            extras    TEXT,
            PRIMARY KEY (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS fasting_days (
            user_id     TEXT NOT NULL,
            date        TEXT NOT NULL,
            sahur       INTEGER NOT NULL DEFAULT 0,
            sahur_time  TEXT,
            fasting     INTEGER NOT NULL DEFAULT 0,
            reason      TEXT,
            PRIMARY KEY (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS recitations (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            date        TEXT NOT NULL,
            surah       TEXT NOT NULL,
            from_ayah   INTEGER NOT NULL,
            to_ayah     INTEGER NOT NULL,
            ayah_count  INTEGER NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_recitations_user_date ON recitations(user_id, date);

        CREATE TABLE IF NOT EXISTS donations (
            id                 TEXT PRIMARY KEY,
            user_id            TEXT NOT NULL,
            kind               TEXT NOT NULL
                               CHECK(kind IN ('charity','zakat_fitrah','zakat_maal')),
            amount             REAL NOT NULL,
            channel            TEXT NOT NULL,
            people             INTEGER,
            amount_per_person  REAL,
            date               TEXT NOT NULL,
            time               TEXT,
            notes              TEXT,
            created_at         TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_donations_user_kind ON donations(user_id, kind);

        CREATE TABLE IF NOT EXISTS weekly_entries (
            user_id         TEXT NOT NULL,
            week            INTEGER NOT NULL,
            friday_prayer   INTEGER NOT NULL DEFAULT 0,
            sermon_note     TEXT,
            study_circle    INTEGER NOT NULL DEFAULT 0,
            family_visit    INTEGER NOT NULL DEFAULT 0,
            social_service  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, week)
        );

        CREATE TABLE IF NOT EXISTS agenda_items (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            title      TEXT NOT NULL,
            starts_at  TEXT NOT NULL,
            category   TEXT NOT NULL,
            reminder   INTEGER NOT NULL DEFAULT 1,
            notes      TEXT
        );

        CREATE TABLE IF NOT EXISTS daily_targets (
            user_id           TEXT PRIMARY KEY,
            prayers_on_time   INTEGER NOT NULL,
            daily_recitation  INTEGER NOT NULL,
            daily_charity     INTEGER NOT NULL,
            full_fast         INTEGER NOT NULL,
            verse_target      INTEGER,
            charity_target    REAL
        );

        CREATE TABLE IF NOT EXISTS accounts (
            id             TEXT PRIMARY KEY,
            email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash  TEXT NOT NULL,
            salt           TEXT NOT NULL,
            full_name      TEXT NOT NULL,
            age            INTEGER NOT NULL,
            sex            TEXT NOT NULL CHECK(sex IN ('male','female')),
            madhab         TEXT NOT NULL CHECK(madhab IN ('nu','muhammadiyah')),
            created_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}
