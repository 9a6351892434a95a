//! SQL schema for the Bloom SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// No foreign key cascades: deleting an area detaches its plants and removes
/// its coordinates explicitly in `SqliteStore::delete_area`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Ids come from the source data.
CREATE TABLE IF NOT EXISTS sites (
    id         INTEGER PRIMARY KEY,
    latitude   REAL    NOT NULL,
    longitude  REAL    NOT NULL,
    elevation  INTEGER NOT NULL
);

-- AUTOINCREMENT so ids of deleted areas are never handed out again.
CREATE TABLE IF NOT EXISTS areas (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    description  TEXT,
    created_at   TEXT NOT NULL    -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS area_coordinates (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    area_id       INTEGER NOT NULL REFERENCES areas(id),
    latitude      REAL    NOT NULL,
    longitude     REAL    NOT NULL,
    vertex_order  INTEGER NOT NULL,   -- 0..n along the boundary
    UNIQUE (area_id, vertex_order)
);

CREATE TABLE IF NOT EXISTS plants (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id  INTEGER NOT NULL REFERENCES sites(id),
    area_id  INTEGER REFERENCES areas(id),
    species  TEXT    NOT NULL,
    UNIQUE (site_id, species)
);

-- Append-only. plant_id is NULL when the import found no matching plant.
CREATE TABLE IF NOT EXISTS observations (
    id                INTEGER PRIMARY KEY,
    site_id           INTEGER NOT NULL REFERENCES sites(id),
    plant_id          INTEGER REFERENCES plants(id),
    phenophase_id     INTEGER NOT NULL,
    observation_date  TEXT    NOT NULL,   -- YYYY-MM-DD
    is_blooming       INTEGER NOT NULL,
    description       TEXT
);

CREATE INDEX IF NOT EXISTS plants_area_idx        ON plants(area_id);
CREATE INDEX IF NOT EXISTS observations_plant_idx ON observations(plant_id);

PRAGMA user_version = 1;
";
