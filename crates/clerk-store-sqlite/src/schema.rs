//! SQL schema for the Clerk SQLite store.
//!
//! Natural-key columns use `NOCASE` so lookups and the unique indexes agree
//! on case-insensitive matching.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    account_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name          TEXT    NOT NULL,
    plan_id               INTEGER,
    address               TEXT    NOT NULL DEFAULT '',
    city                  TEXT    NOT NULL DEFAULT '',
    state                 TEXT    NOT NULL DEFAULT '',
    zip                   TEXT    NOT NULL DEFAULT '',
    country               TEXT    NOT NULL DEFAULT '',
    processor_customer_id TEXT,
    created_at            TEXT    NOT NULL,
    updated_at            TEXT    NOT NULL
);

-- A contact is keyed by company name, or by first + last name when the
-- company name is empty.
CREATE TABLE IF NOT EXISTS contacts (
    contact_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id            INTEGER NOT NULL REFERENCES accounts(account_id),
    name                  TEXT    NOT NULL DEFAULT '' COLLATE NOCASE,
    first_name            TEXT    NOT NULL DEFAULT '' COLLATE NOCASE,
    last_name             TEXT    NOT NULL DEFAULT '' COLLATE NOCASE,
    email                 TEXT    NOT NULL DEFAULT '',
    phone                 TEXT    NOT NULL DEFAULT '',
    website               TEXT    NOT NULL DEFAULT '',
    address               TEXT    NOT NULL DEFAULT '',
    city                  TEXT    NOT NULL DEFAULT '',
    state                 TEXT    NOT NULL DEFAULT '',
    zip                   TEXT    NOT NULL DEFAULT '',
    country               TEXT    NOT NULL DEFAULT '',
    account_number        TEXT    NOT NULL DEFAULT '',
    processor_customer_id TEXT,
    created_at            TEXT    NOT NULL,
    updated_at            TEXT    NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS contacts_company_key
    ON contacts(account_id, name) WHERE name <> '';
CREATE UNIQUE INDEX IF NOT EXISTS contacts_person_key
    ON contacts(account_id, first_name, last_name) WHERE name = '';

CREATE TABLE IF NOT EXISTS categories (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id  INTEGER NOT NULL REFERENCES accounts(account_id),
    name        TEXT    NOT NULL COLLATE NOCASE,
    kind        TEXT    NOT NULL CHECK (kind IN ('expense', 'income')),
    tax_tag     TEXT    NOT NULL DEFAULT '',
    visible     INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL,
    UNIQUE (account_id, name, kind)
);

CREATE TABLE IF NOT EXISTS labels (
    label_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(account_id),
    name       TEXT    NOT NULL COLLATE NOCASE CHECK (length(name) BETWEEN 1 AND 255),
    system     INTEGER NOT NULL DEFAULT 0,
    created_at TEXT    NOT NULL,
    updated_at TEXT    NOT NULL,
    UNIQUE (account_id, name)
);

CREATE TABLE IF NOT EXISTS ledger (
    ledger_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id          INTEGER NOT NULL REFERENCES accounts(account_id),
    date                TEXT    NOT NULL,   -- YYYY-MM-DD
    amount              TEXT    NOT NULL,   -- canonical decimal, 2 places
    note                TEXT    NOT NULL DEFAULT '',
    contact_id          INTEGER NOT NULL REFERENCES contacts(contact_id),
    category_id         INTEGER NOT NULL REFERENCES categories(category_id),
    added_by            INTEGER NOT NULL DEFAULT 0,
    processor_charge_id TEXT,
    shoeboxed_id        TEXT,
    freshbooks_id       TEXT,
    airbnb_hash         TEXT,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);

-- Ordered label list of each entry; duplicates allowed.
CREATE TABLE IF NOT EXISTS ledger_labels (
    ledger_id INTEGER NOT NULL REFERENCES ledger(ledger_id),
    position  INTEGER NOT NULL,
    label_id  INTEGER NOT NULL REFERENCES labels(label_id),
    PRIMARY KEY (ledger_id, position)
);

-- Legacy association table, derived from ledger_labels. One row per distinct
-- (ledger_id, label_id).
CREATE TABLE IF NOT EXISTS labels_to_ledger (
    ledger_id  INTEGER NOT NULL REFERENCES ledger(ledger_id),
    label_id   INTEGER NOT NULL REFERENCES labels(label_id),
    account_id INTEGER NOT NULL,
    created_at TEXT    NOT NULL,
    updated_at TEXT    NOT NULL,
    UNIQUE (ledger_id, label_id)
);

CREATE INDEX IF NOT EXISTS ledger_account_idx        ON ledger(account_id);
CREATE INDEX IF NOT EXISTS ledger_labels_label_idx   ON ledger_labels(label_id);
CREATE INDEX IF NOT EXISTS labels_to_ledger_label_idx ON labels_to_ledger(label_id);

PRAGMA user_version = 1;
";
