//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `products`, `profiles`, `rfqs` and
//! `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Products
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS products (
    id                 TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name               TEXT NOT NULL,
    slug               TEXT NOT NULL UNIQUE,
    category           TEXT NOT NULL,
    short_description  TEXT NOT NULL DEFAULT '',
    full_description   TEXT NOT NULL DEFAULT '',
    images             TEXT NOT NULL DEFAULT '[]',  -- JSON array, first = main
    video_url          TEXT,
    featured           INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    moq                INTEGER NOT NULL,
    export_highlight   TEXT NOT NULL DEFAULT '',
    payment_terms      TEXT NOT NULL DEFAULT '[]',  -- JSON array
    customization_note TEXT NOT NULL DEFAULT '',
    created_at         TEXT NOT NULL,               -- RFC-3339, UTC, microseconds
    updated_at         TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Profiles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    user_id      TEXT PRIMARY KEY NOT NULL,   -- UUID issued by the identity provider
    username     TEXT NOT NULL,
    email        TEXT NOT NULL,
    phone        TEXT NOT NULL DEFAULT '',
    company_name TEXT,
    country      TEXT NOT NULL DEFAULT '',
    state        TEXT NOT NULL DEFAULT '',
    city         TEXT NOT NULL DEFAULT '',
    user_code    TEXT NOT NULL,
    role         TEXT NOT NULL DEFAULT 'user',
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- RFQs
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS rfqs (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_id      TEXT NOT NULL,               -- owning buyer
    product_id   TEXT NOT NULL,
    quantity     INTEGER NOT NULL,
    target_price TEXT,
    country      TEXT NOT NULL,
    message      TEXT NOT NULL,
    status       TEXT NOT NULL DEFAULT 'Pending',
    version      INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,

    FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE RESTRICT
);

CREATE INDEX IF NOT EXISTS idx_rfqs_user_created
    ON rfqs(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    rfq_id      TEXT NOT NULL,
    sender_type TEXT NOT NULL,                -- 'admin' | 'user'
    sender_id   TEXT NOT NULL,
    text        TEXT NOT NULL,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (rfq_id) REFERENCES rfqs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_rfq_ts
    ON messages(rfq_id, created_at ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
