//! SQL schema for the Prana SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! Two constraints carry booking-lifecycle invariants that would otherwise
//! be check-then-act races:
//!   - `bookings_one_seat_per_client`: at most one non-cancelled booking per
//!     (session, client) pair.
//!   - the `subscriptions` CHECK keeps `visits_remaining` inside
//!     `[0, visits_total]` for finite plans.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    profile_id    TEXT PRIMARY KEY,
    first_name    TEXT NOT NULL,
    last_name     TEXT,
    phone         TEXT NOT NULL UNIQUE,
    email         TEXT,
    role          TEXT NOT NULL DEFAULT 'client',   -- 'client' | 'admin'
    lead_status   TEXT NOT NULL DEFAULT 'booked',
    balance       INTEGER NOT NULL DEFAULT 0,
    notes         TEXT,
    password_hash TEXT,            -- argon2 PHC string; NULL for leads
    created_at    TEXT NOT NULL    -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS coaches (
    coach_id TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    bio      TEXT,
    phone    TEXT
);

CREATE TABLE IF NOT EXISTS class_types (
    class_type_id TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    color         TEXT,
    description   TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id    TEXT PRIMARY KEY,
    class_type_id TEXT NOT NULL REFERENCES class_types(class_type_id),
    coach_id      TEXT NOT NULL REFERENCES coaches(coach_id),
    start_time    TEXT NOT NULL,
    end_time      TEXT NOT NULL,
    capacity      INTEGER NOT NULL CHECK (capacity >= 1)
);

CREATE TABLE IF NOT EXISTS plans (
    plan_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    visits_total  INTEGER,         -- NULL = unlimited
    duration_days INTEGER NOT NULL CHECK (duration_days >= 1),
    price         INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id  TEXT PRIMARY KEY,
    client_id        TEXT NOT NULL REFERENCES profiles(profile_id),
    plan_id          TEXT NOT NULL REFERENCES plans(plan_id),
    visits_total     INTEGER,      -- copied from the plan at grant time
    visits_remaining INTEGER,
    activation_date  TEXT NOT NULL,  -- ISO 8601 date
    end_date         TEXT NOT NULL,
    is_active        INTEGER NOT NULL DEFAULT 1,
    CHECK (
      (visits_total IS NULL AND visits_remaining IS NULL) OR
      (visits_remaining >= 0 AND visits_remaining <= visits_total)
    )
);

CREATE TABLE IF NOT EXISTS bookings (
    booking_id      TEXT PRIMARY KEY,
    session_id      TEXT NOT NULL REFERENCES sessions(session_id) ON DELETE CASCADE,
    client_id       TEXT NOT NULL REFERENCES profiles(profile_id),
    subscription_id TEXT REFERENCES subscriptions(subscription_id) ON DELETE SET NULL,
    status          TEXT NOT NULL DEFAULT 'booked',  -- 'booked' | 'completed' | 'cancelled'
    created_at      TEXT NOT NULL
);

-- One seat per client per session. Cancelled rows stay behind for history
-- and do not block re-booking.
CREATE UNIQUE INDEX IF NOT EXISTS bookings_one_seat_per_client
    ON bookings(session_id, client_id) WHERE status != 'cancelled';

CREATE TABLE IF NOT EXISTS studio_settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS news (
    post_id      TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    body         TEXT NOT NULL,
    published_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS aggregator_visits (
    visit_id        TEXT PRIMARY KEY,
    aggregator_name TEXT NOT NULL,
    client_name     TEXT NOT NULL,
    price           INTEGER NOT NULL,
    notes           TEXT,
    website_url     TEXT,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS bookings_session_idx      ON bookings(session_id);
CREATE INDEX IF NOT EXISTS bookings_client_idx       ON bookings(client_id);
CREATE INDEX IF NOT EXISTS sessions_start_idx        ON sessions(start_time);
CREATE INDEX IF NOT EXISTS subscriptions_client_idx  ON subscriptions(client_id);

PRAGMA user_version = 1;
";
