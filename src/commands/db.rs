use crate::error::LedgerError;
use crate::models::counters::CounterSnapshot;
use crate::models::entity::TrackedEntity;
use crate::models::rollup::{LatestCounts, MonthlyRollup};
use crate::models::traffic::DailyTrafficRecord;
use rusqlite::{params, Connection, OpenFlags, Result, Row};
use std::fs;
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 1;

pub const DEFAULT_DB_PATH: &str = "data/github_metrics.sqlite3";

/// Creates both metric tables if absent. Safe to call on every startup.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("database schema version {version} is newer than {DB_SCHEMA_VERSION}");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS traffic_views_daily (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            date TEXT NOT NULL,
            views INTEGER NOT NULL,
            uniques INTEGER NOT NULL,
            PRIMARY KEY (owner, repo, date)
        );

        CREATE TABLE IF NOT EXISTS repo_counts_daily (
            owner TEXT NOT NULL,
            repo TEXT NOT NULL,
            date TEXT NOT NULL,
            stars INTEGER NOT NULL,
            forks INTEGER NOT NULL,
            watchers INTEGER NOT NULL,
            PRIMARY KEY (owner, repo, date)
        );
        ",
    )
}

/// Opens (creating if needed) the database file and brings its schema up to date.
pub fn open_store(db_path: &Path) -> std::result::Result<Connection, LedgerError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Opens an existing database for reading only. Never creates the file or
/// touches the schema.
pub fn open_store_read_only(db_path: &Path) -> std::result::Result<Connection, LedgerError> {
    if !db_path.is_file() {
        let shown = db_path.display();
        return Err(LedgerError::Config(format!("Database not found: {shown}")));
    }

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Insert-or-replace each day for `entity`. The whole batch commits or none of it does.
pub fn upsert_traffic(
    conn: &Connection,
    entity: &TrackedEntity,
    records: &[DailyTrafficRecord],
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "
            INSERT INTO traffic_views_daily (owner, repo, date, views, uniques)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(owner, repo, date) DO UPDATE SET
                views = excluded.views,
                uniques = excluded.uniques
            ",
        )?;

        for record in records {
            stmt.execute(params![
                entity.owner,
                entity.repo,
                record.date,
                to_sql_count(record.views),
                to_sql_count(record.uniques),
            ])?;
        }
    }
    tx.commit()
}

pub fn upsert_counters(
    conn: &Connection,
    entity: &TrackedEntity,
    snapshot: &CounterSnapshot,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "
        INSERT INTO repo_counts_daily (owner, repo, date, stars, forks, watchers)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(owner, repo, date) DO UPDATE SET
            stars = excluded.stars,
            forks = excluded.forks,
            watchers = excluded.watchers
        ",
        params![
            entity.owner,
            entity.repo,
            snapshot.date,
            to_sql_count(snapshot.stars),
            to_sql_count(snapshot.forks),
            to_sql_count(snapshot.watchers),
        ],
    )?;
    tx.commit()
}

/// Stored daily rows for one entity, oldest first.
pub fn load_traffic(
    conn: &Connection,
    entity: &TrackedEntity,
) -> Result<Vec<DailyTrafficRecord>> {
    let mut stmt = conn.prepare(
        "
        SELECT date, views, uniques
        FROM traffic_views_daily
        WHERE owner = ?1 AND repo = ?2
        ORDER BY date ASC
        ",
    )?;

    let rows = stmt.query_map(params![entity.owner, entity.repo], |row| {
        Ok(DailyTrafficRecord {
            date: row.get(0)?,
            views: count_at(row, 1)?,
            uniques: count_at(row, 2)?,
        })
    })?;

    rows.collect()
}

/// Per entity and `YYYY-MM`: summed views and summed daily uniques.
pub fn monthly_rollup(conn: &Connection) -> Result<Vec<MonthlyRollup>> {
    let mut stmt = conn.prepare(
        "
        SELECT owner, repo, substr(date, 1, 7) AS ym,
               SUM(views) AS views,
               SUM(uniques) AS sum_daily_uniques
        FROM traffic_views_daily
        GROUP BY owner, repo, ym
        ORDER BY owner, repo, ym
        ",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(MonthlyRollup {
            entity: entity_at(row)?,
            year_month: row.get(2)?,
            total_views: count_at(row, 3)?,
            summed_daily_uniques: count_at(row, 4)?,
        })
    })?;

    rows.collect()
}

/// The most recent counter snapshot of every entity.
pub fn latest_counts(conn: &Connection) -> Result<Vec<LatestCounts>> {
    let mut stmt = conn.prepare(
        "
        SELECT c.owner, c.repo, c.date, c.stars, c.forks, c.watchers
        FROM repo_counts_daily c
        JOIN (
            SELECT owner, repo, MAX(date) AS max_date
            FROM repo_counts_daily
            GROUP BY owner, repo
        ) latest
          ON latest.owner = c.owner
         AND latest.repo = c.repo
         AND latest.max_date = c.date
        ORDER BY c.owner, c.repo
        ",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(LatestCounts {
            entity: entity_at(row)?,
            date: row.get(2)?,
            stars: count_at(row, 3)?,
            forks: count_at(row, 4)?,
            watchers: count_at(row, 5)?,
        })
    })?;

    rows.collect()
}

fn entity_at(row: &Row<'_>) -> Result<TrackedEntity> {
    Ok(TrackedEntity {
        owner: row.get(0)?,
        repo: row.get(1)?,
    })
}

// SQLite integers are signed; counts are never negative.
fn count_at(row: &Row<'_>, idx: usize) -> Result<u64> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}

fn to_sql_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
