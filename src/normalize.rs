use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::models::{
    RawRecord, TransactionKind, TransactionRecord, DEFAULT_CATEGORY, DEFAULT_DESCRIPTION,
};

/// Length of derived ids, matching the 20-character document ids the stores use.
const DERIVED_ID_LEN: usize = 20;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

/// Parse a loosely formatted amount string: `$1,234.50`, `"12"`, `(40.00)`.
/// Empty input is 0, anything unparsable is 0.
pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    let value = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        -inner.trim().parse::<f64>().unwrap_or(0.0)
    } else {
        s.parse().unwrap_or(0.0)
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn coerce_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s),
        _ => 0.0,
    }
}

/// Parse a date string: RFC 3339, a naive date-time (taken as UTC), or a
/// plain `YYYY-MM-DD` (UTC midnight).
pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Database timestamps arrive as `{"seconds": .., "nanoseconds": ..}`
/// (admin exports prefix both keys with an underscore).
fn parse_timestamp_object(map: &serde_json::Map<String, Value>) -> Option<DateTime<Utc>> {
    let seconds = map
        .get("seconds")
        .or_else(|| map.get("_seconds"))
        .and_then(Value::as_i64)?;
    let nanos = map
        .get("nanoseconds")
        .or_else(|| map.get("_nanoseconds"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    DateTime::from_timestamp(seconds, u32::try_from(nanos).ok()?)
}

fn coerce_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Object(map) => parse_timestamp_object(map),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn coerce_account(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        other => non_empty_str(other),
    }
}

/// Stable id for documents that arrive without one. The collection and the
/// document's position in it are hashed in, so identical documents still get
/// distinct ids.
fn derive_id(doc: &Value, kind: TransactionKind, position: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.collection().as_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(doc.to_string().as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(DERIVED_ID_LEN);
    id
}

// ---------------------------------------------------------------------------
// Normalization boundary
// ---------------------------------------------------------------------------

/// Coerce a raw document into a `TransactionRecord`. Never fails: missing or
/// malformed fields fall back to their defaults. `position` is the document's
/// index within its collection.
pub fn normalize(raw: &RawRecord, kind: TransactionKind, position: usize) -> TransactionRecord {
    let doc = &raw.doc;
    let field = |name: &str| doc.get(name);

    let id = raw
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| derive_id(doc, kind, position));

    let date = coerce_date(field("date")).unwrap_or_else(|| {
        log::debug!("{} {id}: missing or unreadable date, using epoch", kind.label());
        // DateTime<Utc>::default() is the Unix epoch
        DateTime::<Utc>::default()
    });

    TransactionRecord {
        id,
        kind,
        date,
        amount: coerce_amount(field("amount")),
        category: non_empty_str(field("category")).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        account_id: coerce_account(field("accountId")),
        description: non_empty_str(field("description"))
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    }
}

pub fn normalize_all(raws: &[RawRecord], kind: TransactionKind) -> Vec<TransactionRecord> {
    raws
        .iter()
        .enumerate()
        .map(|(i, r)| normalize(r, kind, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{SecondsFormat, TimeZone};
    use serde_json::json;

    fn raw(doc: Value) -> RawRecord {
        RawRecord::new(Some("doc1".to_string()), doc)
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("$1,234.50"), 1234.5);
        assert_eq!(parse_amount("(40.00)"), -40.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("  12 "), 12.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
    }

    #[test]
    fn test_defaults_for_empty_document() {
        let rec = normalize(&raw(json!({})), TransactionKind::Expense, 0);
        assert_eq!(rec.amount, 0.0);
        assert_eq!(rec.category, "Uncategorized");
        assert_eq!(rec.description, "No description");
        assert_eq!(rec.account_id, None);
        assert_eq!(rec.date, DateTime::<Utc>::default());
        assert_eq!(rec.id, "doc1");
    }

    #[test]
    fn test_empty_strings_fall_back_to_defaults() {
        let rec = normalize(
            &raw(json!({"category": "", "description": "", "accountId": ""})),
            TransactionKind::Earning,
            0,
        );
        assert_eq!(rec.category, "Uncategorized");
        assert_eq!(rec.description, "No description");
        assert_eq!(rec.account_id, None);
    }

    #[test]
    fn test_timestamp_object_and_string_dates_agree() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 12, 30, 0).unwrap();
        let ts = normalize(
            &raw(json!({"date": {"seconds": expected.timestamp(), "nanoseconds": 0}})),
            TransactionKind::Expense,
            0,
        );
        let admin = normalize(
            &raw(json!({"date": {"_seconds": expected.timestamp(), "_nanoseconds": 0}})),
            TransactionKind::Expense,
            0,
        );
        let text = normalize(&raw(json!({"date": "2025-03-14T12:30:00Z"})), TransactionKind::Expense, 0);
        let naive = normalize(&raw(json!({"date": "2025-03-14T12:30"})), TransactionKind::Expense, 0);
        let millis = normalize(
            &raw(json!({"date": expected.timestamp_millis()})),
            TransactionKind::Expense,
            0,
        );
        assert_eq!(ts.date, expected);
        assert_eq!(admin.date, expected);
        assert_eq!(text.date, expected);
        assert_eq!(naive.date, expected);
        assert_eq!(millis.date, expected);
    }

    #[test]
    fn test_date_only_string_is_utc_midnight() {
        let rec = normalize(&raw(json!({"date": "2025-01-31"})), TransactionKind::Expense, 0);
        assert_eq!(rec.date, Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unparsable_fields_are_coerced() {
        let rec = normalize(
            &raw(json!({"date": "next tuesday", "amount": {"value": 3}, "category": 7})),
            TransactionKind::Expense,
            0,
        );
        assert_eq!(rec.date, DateTime::<Utc>::default());
        assert_eq!(rec.amount, 0.0);
        assert_eq!(rec.category, "Uncategorized");
    }

    #[test]
    fn test_numeric_strings_and_account_numbers() {
        let rec = normalize(
            &raw(json!({"amount": "$2,400", "accountId": 42})),
            TransactionKind::Expense,
            0,
        );
        assert_eq!(rec.amount, 2400.0);
        assert_eq!(rec.account_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_missing_id_is_derived_and_stable() {
        let doc = json!({"amount": 5, "category": "Food"});
        let a = normalize(&RawRecord::new(None, doc.clone()), TransactionKind::Expense, 0);
        let b = normalize(&RawRecord::new(None, doc.clone()), TransactionKind::Expense, 0);
        assert_eq!(a.id.len(), 20);
        assert_eq!(a.id, b.id);
        let other = normalize(
            &RawRecord::new(None, json!({"amount": 6, "category": "Food"})),
            TransactionKind::Expense,
            0,
        );
        assert_ne!(a.id, other.id);
    }

    #[test]
    fn test_identical_documents_get_distinct_ids() {
        let coffee = json!({"date": "2025-03-01", "amount": 4.5, "category": "Meals"});
        let raws = vec![
            RawRecord::new(None, coffee.clone()),
            RawRecord::new(None, coffee.clone()),
        ];
        let expenses = normalize_all(&raws, TransactionKind::Expense);
        assert_ne!(expenses[0].id, expenses[1].id);

        let earnings = normalize_all(&raws[..1], TransactionKind::Earning);
        assert_ne!(expenses[0].id, earnings[0].id);
    }

    /// Render a record back into document shape.
    fn to_raw(record: &TransactionRecord) -> RawRecord {
        let doc = json!({
            "date": record.date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            "amount": record.amount,
            "category": record.category,
            "accountId": record.account_id,
            "description": record.description,
        });
        RawRecord::new(Some(record.id.clone()), doc)
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let docs = vec![
            json!({"date": "2025-02-03T04:05:06.789Z", "amount": 19.99, "category": "Food",
                   "accountId": "acct-1", "description": "Lunch"}),
            json!({"date": {"seconds": 1_700_000_000, "nanoseconds": 123_456_789}, "amount": "7"}),
            json!({}),
            json!({"amount": -0.5, "accountId": 3}),
        ];
        for doc in docs {
            let once = normalize(&RawRecord::new(None, doc), TransactionKind::Earning, 0);
            let twice = normalize(&to_raw(&once), TransactionKind::Earning, 0);
            assert_eq!(once, twice);
        }
    }
}
