//! v001 -- Initial schema creation.
//!
//! Creates the four tables: `doctors`, `connections`, `appointments` and
//! `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Doctors
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS doctors (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name      TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    specialization TEXT NOT NULL,
    phone          TEXT NOT NULL,
    npi_id         TEXT NOT NULL UNIQUE,          -- login identifier
    state          TEXT NOT NULL,
    address        TEXT NOT NULL,
    password_hash  TEXT NOT NULL,                 -- pbkdf2:sha256:<iter>$<salt>$<hash>
    avatar_path    TEXT,                          -- relative to the upload root
    created_at     TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Connections (one row per unordered pair, checked by the application)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS connections (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    doctor1_id  INTEGER NOT NULL,                 -- requesting side
    doctor2_id  INTEGER NOT NULL,                 -- responding side
    status      TEXT NOT NULL DEFAULT 'pending',  -- pending | accepted | rejected
    created_at  TEXT NOT NULL,

    FOREIGN KEY (doctor1_id) REFERENCES doctors(id),
    FOREIGN KEY (doctor2_id) REFERENCES doctors(id)
);

CREATE INDEX IF NOT EXISTS idx_connections_doctor1 ON connections(doctor1_id);
CREATE INDEX IF NOT EXISTS idx_connections_doctor2 ON connections(doctor2_id);

-- ----------------------------------------------------------------
-- Appointments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS appointments (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id    INTEGER NOT NULL,
    receiver_id  INTEGER NOT NULL,
    date_time    TEXT NOT NULL,                   -- naive local time, no zone
    status       TEXT NOT NULL DEFAULT 'pending', -- pending | accepted | cancelled
    priority     TEXT NOT NULL DEFAULT 'normal',  -- emergency | urgent | normal
    created_at   TEXT NOT NULL,

    FOREIGN KEY (sender_id) REFERENCES doctors(id),
    FOREIGN KEY (receiver_id) REFERENCES doctors(id)
);

CREATE INDEX IF NOT EXISTS idx_appointments_sender ON appointments(sender_id);
CREATE INDEX IF NOT EXISTS idx_appointments_receiver ON appointments(receiver_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id    INTEGER NOT NULL,
    receiver_id  INTEGER NOT NULL,
    content      TEXT NOT NULL,
    file_path    TEXT,                            -- relative to the upload root
    created_at   TEXT NOT NULL,

    FOREIGN KEY (sender_id) REFERENCES doctors(id),
    FOREIGN KEY (receiver_id) REFERENCES doctors(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_pair_ts
    ON messages(sender_id, receiver_id, created_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
