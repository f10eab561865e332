use std::path::{Path, PathBuf};

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::models::{RawRecord, TransactionKind};
use crate::source::RecordSource;

pub const DB_FILE: &str = "runway.db";

/// Columns carry no declared type so each row keeps whatever the writer
/// stored, the same way loosely-shaped documents do.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS expenses (
    id TEXT PRIMARY KEY,
    date,
    amount,
    category,
    account_id,
    description,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS earnings (
    id TEXT PRIMARY KEY,
    date,
    amount,
    category,
    account_id,
    description,
    created_at TEXT DEFAULT (datetime('now'))
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Value mapping
// ---------------------------------------------------------------------------

fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
        SqlValue::Integer(i) => json!(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
    }
}

/// Dates read back in the shape they were written: numbers stay epoch
/// milliseconds, and timestamp objects kept as JSON text become objects again.
fn date_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Text(s) if s.starts_with('{') => match serde_json::from_str(&s) {
            Ok(obj @ Value::Object(_)) => obj,
            _ => Value::String(s),
        },
        other => sql_to_json(other),
    }
}

fn json_to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

/// Timestamp objects are stored whole as JSON text so `nanoseconds` survives.
fn date_to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        Some(obj @ Value::Object(_)) => SqlValue::Text(obj.to_string()),
        other => json_to_sql(other),
    }
}

// ---------------------------------------------------------------------------
// Reads / writes
// ---------------------------------------------------------------------------

pub fn fetch_collection(conn: &Connection, kind: TransactionKind) -> Result<Vec<RawRecord>> {
    let sql = format!(
        "SELECT id, date, amount, category, account_id, description FROM {} ORDER BY rowid",
        kind.collection()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        let id: Option<String> = row.get(0)?;
        let mut doc = Map::new();
        doc.insert("date".into(), date_to_json(row.get(1)?));
        doc.insert("amount".into(), sql_to_json(row.get(2)?));
        doc.insert("category".into(), sql_to_json(row.get(3)?));
        doc.insert("accountId".into(), sql_to_json(row.get(4)?));
        doc.insert("description".into(), sql_to_json(row.get(5)?));
        Ok(RawRecord::new(id, Value::Object(doc)))
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

pub fn insert_record(conn: &Connection, kind: TransactionKind, record: &RawRecord) -> Result<()> {
    let sql = format!(
        "INSERT OR REPLACE INTO {} (id, date, amount, category, account_id, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        kind.collection()
    );
    let doc = &record.doc;
    conn.execute(
        &sql,
        rusqlite::params![
            record.id,
            date_to_sql(doc.get("date")),
            json_to_sql(doc.get("amount")),
            json_to_sql(doc.get("category")),
            json_to_sql(doc.get("accountId")),
            json_to_sql(doc.get("description")),
        ],
    )?;
    Ok(())
}

/// Record source over `runway.db`. Each fetch opens its own connection so
/// both collections can be read in parallel.
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DB_FILE),
        }
    }

    fn fetch(&self, kind: TransactionKind) -> Result<Vec<RawRecord>> {
        if !self.path.exists() {
            return Err(crate::error::RunwayError::Other(format!(
                "database not found at {} (run `runway init`)",
                self.path.display()
            )));
        }
        let conn = get_connection(&self.path)?;
        fetch_collection(&conn, kind)
    }
}

impl RecordSource for SqliteSource {
    fn fetch_expenses(&self) -> Result<Vec<RawRecord>> {
        self.fetch(TransactionKind::Expense)
    }

    fn fetch_earnings(&self) -> Result<Vec<RawRecord>> {
        self.fetch(TransactionKind::Earning)
    }

    fn describe(&self) -> String {
        format!("sqlite ({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use chrono::{TimeZone, Utc};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join(DB_FILE)).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["expenses", "earnings"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_loose_columns_keep_their_types() {
        let (_dir, conn) = test_db();
        let ts = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        insert_record(
            &conn,
            TransactionKind::Expense,
            &RawRecord::new(
                Some("e1".into()),
                json!({"date": {"seconds": ts.timestamp(), "nanoseconds": 0}, "amount": 12.5,
                       "category": "Food", "accountId": "chk"}),
            ),
        )
        .unwrap();
        insert_record(
            &conn,
            TransactionKind::Expense,
            &RawRecord::new(Some("e2".into()), json!({"date": "2025-04-02", "amount": "$3.00"})),
        )
        .unwrap();

        let raws = fetch_collection(&conn, TransactionKind::Expense).unwrap();
        assert_eq!(raws.len(), 2);
        let first = normalize(&raws[0], TransactionKind::Expense, 0);
        assert_eq!(first.date, ts);
        assert_eq!(first.amount, 12.5);
        assert_eq!(first.account_id.as_deref(), Some("chk"));
        let second = normalize(&raws[1], TransactionKind::Expense, 1);
        assert_eq!(second.amount, 3.0);
        assert_eq!(second.category, "Uncategorized");
        assert_eq!(second.description, "No description");
        assert!(fetch_collection(&conn, TransactionKind::Earning).unwrap().is_empty());
    }

    #[test]
    fn test_dates_read_back_as_written() {
        let (_dir, conn) = test_db();
        let docs = [
            json!({"date": 1_736_078_400_000_i64}),
            json!({"date": {"seconds": 1_736_078_400, "nanoseconds": 500_000_000}}),
            json!({"date": {"_seconds": 1_736_078_400, "_nanoseconds": 0}}),
            json!({"date": "2025-01-05"}),
        ];
        for (i, doc) in docs.iter().enumerate() {
            insert_record(
                &conn,
                TransactionKind::Expense,
                &RawRecord::new(Some(format!("e{i}")), doc.clone()),
            )
            .unwrap();
        }
        let raws = fetch_collection(&conn, TransactionKind::Expense).unwrap();
        let dates: Vec<&Value> = raws.iter().map(|r| &r.doc["date"]).collect();
        let expected: Vec<&Value> = docs.iter().map(|d| &d["date"]).collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn test_source_reads_both_collections() {
        let (dir, conn) = test_db();
        insert_record(
            &conn,
            TransactionKind::Earning,
            &RawRecord::new(Some("r1".into()), json!({"amount": 100, "category": "Sales"})),
        )
        .unwrap();
        let source = SqliteSource::new(dir.path());
        assert!(source.fetch_expenses().unwrap().is_empty());
        assert_eq!(source.fetch_earnings().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteSource::new(dir.path());
        assert!(source.fetch_expenses().is_err());
    }
}
