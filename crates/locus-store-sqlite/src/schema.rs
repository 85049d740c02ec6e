//! SQL schema for the Locus SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Written by the import side only.
CREATE TABLE IF NOT EXISTS businesses (
    business_id       TEXT PRIMARY KEY,
    name              TEXT,
    category          TEXT,
    address           TEXT,
    formatted_address TEXT,
    city              TEXT,
    latitude          REAL,
    longitude         REAL,
    has_phone         INTEGER NOT NULL DEFAULT 0,
    has_website       INTEGER NOT NULL DEFAULT 0,
    weekly_minutes    INTEGER,
    types             TEXT NOT NULL DEFAULT '[]',   -- JSON array
    tags              TEXT NOT NULL DEFAULT '{}',   -- JSON object
    external_category TEXT,
    external_subtype  TEXT
);

-- One row per (business, input_hash); re-submission resets the row.
CREATE TABLE IF NOT EXISTS enrichment_requests (
    request_id    TEXT PRIMARY KEY,
    business_id   TEXT NOT NULL REFERENCES businesses(business_id),
    provider      TEXT NOT NULL,
    input_hash    TEXT NOT NULL,
    input_payload TEXT NOT NULL,
    status        TEXT NOT NULL CHECK (status IN ('running', 'completed', 'error')),
    error         TEXT,
    created_at    TEXT NOT NULL,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    UNIQUE (business_id, input_hash)
);

-- Append-only audit trail.
CREATE TABLE IF NOT EXISTS enrichment_responses (
    response_id       TEXT PRIMARY KEY,
    request_id        TEXT NOT NULL REFERENCES enrichment_requests(request_id),
    model             TEXT,
    raw_response      TEXT NOT NULL,
    parsed_response   TEXT NOT NULL,
    prompt_tokens     INTEGER,
    completion_tokens INTEGER,
    cost_cents        REAL,
    created_at        TEXT NOT NULL
);

-- Replaced wholesale on every validated enrichment.
CREATE TABLE IF NOT EXISTS business_facts (
    business_id        TEXT PRIMARY KEY REFERENCES businesses(business_id),
    size_class         TEXT CHECK (size_class IN ('micro', 'small', 'medium', 'large')),
    is_chain           INTEGER,
    website_url        TEXT,
    social             TEXT NOT NULL DEFAULT '{}',
    marketing_attitude REAL CHECK (marketing_attitude BETWEEN 0 AND 1),
    umbrella_affinity  REAL CHECK (umbrella_affinity BETWEEN 0 AND 1),
    ad_budget_band     TEXT CHECK (ad_budget_band IN ('low', 'medium', 'high')),
    budget_source      TEXT,
    confidence         REAL CHECK (confidence BETWEEN 0 AND 1),
    provenance         TEXT,
    source_provider    TEXT,
    source_model       TEXT,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS business_metrics (
    business_id                 TEXT PRIMARY KEY REFERENCES businesses(business_id),
    density_neighbors           INTEGER NOT NULL,
    density_score               REAL NOT NULL,
    geo_label                   TEXT NOT NULL,
    geo_source                  TEXT NOT NULL,
    size_class                  TEXT,
    is_chain                    INTEGER,
    ad_budget_band              TEXT,
    umbrella_affinity           REAL,
    digital_presence            REAL NOT NULL,
    digital_presence_confidence REAL NOT NULL,
    marketing_attitude          REAL,
    facts_confidence            REAL,
    updated_at                  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS anchor_points (
    anchor_id TEXT PRIMARY KEY,
    name      TEXT,
    latitude  REAL NOT NULL,
    longitude REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS road_segments (
    road_id TEXT PRIMARY KEY,
    class   TEXT NOT NULL,
    path    TEXT NOT NULL             -- JSON array of {lat, lon}
);

CREATE TABLE IF NOT EXISTS zones (
    zone_id  TEXT PRIMARY KEY,
    label    TEXT NOT NULL,
    kind     TEXT,
    priority INTEGER NOT NULL,
    polygon  TEXT NOT NULL            -- JSON array of {lat, lon}
);

CREATE INDEX IF NOT EXISTS requests_business_idx ON enrichment_requests(business_id);
CREATE INDEX IF NOT EXISTS responses_request_idx ON enrichment_responses(request_id);
CREATE INDEX IF NOT EXISTS facts_updated_idx     ON business_facts(updated_at);

PRAGMA user_version = 1;
";
