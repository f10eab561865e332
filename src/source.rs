use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::thread;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::db::{self, SqliteSource};
use crate::error::{Result, RunwayError};
use crate::models::{MonthKey, RawRecord, TransactionKind, TransactionRecord};
use crate::normalize::normalize_all;
use crate::settings::{Settings, SourceKind};

/// Read side of a record store: two independent collections of
/// loosely-shaped documents.
pub trait RecordSource: Sync {
    fn fetch_expenses(&self) -> Result<Vec<RawRecord>>;
    fn fetch_earnings(&self) -> Result<Vec<RawRecord>>;

    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// JSON directory source
// ---------------------------------------------------------------------------

/// A directory holding `expenses.json` and `earnings.json`, each an array of
/// documents with an optional `id` field.
pub struct JsonSource {
    dir: PathBuf,
}

impl JsonSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path(&self, kind: TransactionKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.collection()))
    }

    fn fetch(&self, kind: TransactionKind) -> Result<Vec<RawRecord>> {
        let content = std::fs::read_to_string(self.path(kind))?;
        let docs: Vec<Value> = serde_json::from_str(&content)?;
        Ok(docs
            .into_iter()
            .map(|mut doc| {
                let id = doc
                    .as_object_mut()
                    .and_then(|map| map.remove("id"))
                    .and_then(|id| match id {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    });
                RawRecord::new(id, doc)
            })
            .collect())
    }

    /// Create an empty collection file for each kind that has none yet.
    pub fn ensure_collections(&self) -> Result<()> {
        for kind in [TransactionKind::Expense, TransactionKind::Earning] {
            if !self.path(kind).exists() {
                self.write(kind, &[])?;
            }
        }
        Ok(())
    }

    pub fn write(&self, kind: TransactionKind, records: &[RawRecord]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let docs: Vec<Value> = records
            .iter()
            .map(|r| {
                let mut doc = r.doc.clone();
                if let (Some(map), Some(id)) = (doc.as_object_mut(), &r.id) {
                    map.insert("id".into(), Value::String(id.clone()));
                }
                doc
            })
            .collect();
        let json = serde_json::to_string_pretty(&docs)?;
        std::fs::write(self.path(kind), format!("{json}\n"))?;
        Ok(())
    }
}

impl RecordSource for JsonSource {
    fn fetch_expenses(&self) -> Result<Vec<RawRecord>> {
        self.fetch(TransactionKind::Expense)
    }

    fn fetch_earnings(&self) -> Result<Vec<RawRecord>> {
        self.fetch(TransactionKind::Earning)
    }

    fn describe(&self) -> String {
        format!("json ({})", self.dir.display())
    }
}

pub fn open_source(settings: &Settings) -> Box<dyn RecordSource> {
    let dir = PathBuf::from(&settings.data_dir);
    match settings.source {
        SourceKind::Sqlite => Box::new(SqliteSource::new(&dir)),
        SourceKind::Json => Box::new(JsonSource::new(&dir)),
    }
}

/// Write documents into the configured store, replacing records with the
/// same id (SQLite) or the whole collection (JSON).
pub fn store_records(settings: &Settings, kind: TransactionKind, records: &[RawRecord]) -> Result<()> {
    let dir = PathBuf::from(&settings.data_dir);
    match settings.source {
        SourceKind::Sqlite => {
            let mut conn = db::get_connection(&dir.join(db::DB_FILE))?;
            db::init_db(&conn)?;
            let tx = conn.transaction()?;
            for record in records {
                db::insert_record(&tx, kind, record)?;
            }
            tx.commit()?;
            Ok(())
        }
        SourceKind::Json => JsonSource::new(&dir).write(kind, records),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Normalized records for one view session.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub expenses: Vec<TransactionRecord>,
    pub earnings: Vec<TransactionRecord>,
}

impl LoadedRecords {
    pub fn all(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.expenses.iter().chain(self.earnings.iter())
    }

    pub fn len(&self) -> usize {
        self.expenses.len() + self.earnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct account ids, sorted.
    pub fn accounts(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.all().filter_map(|r| r.account_id.as_deref()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct calendar months present in the data, chronological.
    pub fn months(&self) -> Vec<MonthKey> {
        let set: BTreeSet<MonthKey> = self.all().map(|r| r.month_key()).collect();
        set.into_iter().collect()
    }

    pub fn date_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let min = self.all().map(|r| r.date).min()?;
        let max = self.all().map(|r| r.date).max()?;
        Some((min, max))
    }
}

/// Fetch both collections in parallel and normalize them. Either fetch
/// failing fails the whole load; no partial result is returned.
pub fn load_records(source: &dyn RecordSource) -> Result<LoadedRecords> {
    let (expenses, earnings) = thread::scope(|s| {
        let expenses = s.spawn(|| source.fetch_expenses());
        let earnings = s.spawn(|| source.fetch_earnings());
        (join(expenses, "expenses"), join(earnings, "earnings"))
    });

    let (expenses, earnings) = match (expenses, earnings) {
        (Ok(e), Ok(r)) => (e, r),
        (Err(e), _) => return Err(RunwayError::Load(format!("expenses: {e}"))),
        (_, Err(e)) => return Err(RunwayError::Load(format!("earnings: {e}"))),
    };

    let loaded = LoadedRecords {
        expenses: normalize_all(&expenses, TransactionKind::Expense),
        earnings: normalize_all(&earnings, TransactionKind::Earning),
    };
    log::info!(
        "Loaded {} expense(s) and {} earning(s) from {}",
        loaded.expenses.len(),
        loaded.earnings.len(),
        source.describe()
    );
    Ok(loaded)
}

fn join(
    handle: thread::ScopedJoinHandle<'_, Result<Vec<RawRecord>>>,
    what: &str,
) -> Result<Vec<RawRecord>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(RunwayError::Other(format!("{what} fetch panicked"))))
}
