//! Customer record model and normalization of raw warehouse rows.
//!
//! Warehouse rows arrive as flat JSON objects whose column names may contain
//! spaces and whose scalars may be encoded as strings. [`Homeowner::from_raw`]
//! turns one such row into a typed record without ever failing on a bad
//! value: anything that cannot be coerced becomes `None`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// A flat, string-keyed row as returned by a [`crate::loader::DataLoader`].
pub type RawRecord = serde_json::Map<String, Value>;

/// Legacy column removed from the top-10 listing.
pub const LEGACY_AREA_COLUMN: &str = "area";

/// One customer row with RFM-D scores.
///
/// Serialized field names match the warehouse columns, including the mixed
/// case of `R_score`, `RFMD_score`, `Trade` and `Post_code`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Homeowner {
    /// Unique customer identifier.
    pub customer_id: String,
    /// Date of the first recorded transaction.
    pub first_transaction: Option<NaiveDate>,
    /// Date of the most recent transaction.
    pub last_transaction: Option<NaiveDate>,
    /// Number of transactions.
    pub frequency: Option<u64>,
    /// Total spend.
    pub monetary: Option<f64>,
    /// Days since the last transaction.
    pub recency: Option<i64>,
    /// Days between first and last transaction.
    pub duration: Option<i64>,
    /// Customer class (e.g. `HomeOwner`, `Corporate`).
    pub segment: Option<String>,
    /// Recency sub-score.
    #[serde(rename = "R_score")]
    pub r_score: Option<i32>,
    /// Frequency sub-score.
    #[serde(rename = "F_score")]
    pub f_score: Option<i32>,
    /// Monetary sub-score.
    #[serde(rename = "M_score")]
    pub m_score: Option<i32>,
    /// Duration sub-score.
    #[serde(rename = "D_score")]
    pub d_score: Option<i32>,
    /// Composite RFM-D score.
    #[serde(rename = "RFMD_score")]
    pub rfmd_score: Option<f64>,
    /// Cluster id.
    pub cluster: Option<i64>,
    /// Trade category.
    #[serde(rename = "Trade")]
    pub trade: Option<String>,
    /// Postal code.
    #[serde(rename = "Post_code")]
    pub post_code: Option<String>,
    /// Sub-region label.
    pub sub_region: Option<String>,
    /// Region label.
    pub region: Option<String>,
    /// Source columns outside the record schema, keyed by normalized name.
    #[serde(skip)]
    pub extra: BTreeMap<String, Value>,
}

/// Normalizes a warehouse column name: spaces become underscores.
#[must_use]
pub fn normalize_column(name: &str) -> String {
    name.replace(' ', "_")
}

impl Homeowner {
    /// Creates a record with only the identifier set.
    #[must_use]
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            first_transaction: None,
            last_transaction: None,
            frequency: None,
            monetary: None,
            recency: None,
            duration: None,
            segment: None,
            r_score: None,
            f_score: None,
            m_score: None,
            d_score: None,
            rfmd_score: None,
            cluster: None,
            trade: None,
            post_code: None,
            sub_region: None,
            region: None,
            extra: BTreeMap::new(),
        }
    }

    /// Builds a record from a raw row.
    ///
    /// Column names are normalized first. Returns `None` only when the row
    /// has no usable `customer_id`.
    #[must_use]
    pub fn from_raw(raw: RawRecord) -> Option<Self> {
        let mut row: BTreeMap<String, Value> = raw
            .into_iter()
            .map(|(k, v)| (normalize_column(&k), v))
            .collect();

        let customer_id = row.remove("customer_id").as_ref().and_then(coerce_text)?;

        Some(Self {
            customer_id,
            first_transaction: take(&mut row, "first_transaction", coerce_date),
            last_transaction: take(&mut row, "last_transaction", coerce_date),
            frequency: take(&mut row, "frequency", coerce_int)
                .and_then(|v| u64::try_from(v).ok()),
            monetary: take(&mut row, "monetary", coerce_float),
            recency: take(&mut row, "recency", coerce_int),
            duration: take(&mut row, "duration", coerce_int),
            segment: take(&mut row, "segment", coerce_text),
            r_score: take(&mut row, "R_score", coerce_small_int),
            f_score: take(&mut row, "F_score", coerce_small_int),
            m_score: take(&mut row, "M_score", coerce_small_int),
            d_score: take(&mut row, "D_score", coerce_small_int),
            rfmd_score: take(&mut row, "RFMD_score", coerce_float),
            cluster: take(&mut row, "cluster", coerce_int),
            trade: take(&mut row, "Trade", coerce_text),
            post_code: take(&mut row, "Post_code", coerce_text),
            sub_region: take(&mut row, "sub_region", coerce_text),
            region: take(&mut row, "region", coerce_text),
            extra: row,
        })
    }

    /// The four component scores in Recency, Frequency, Monetary, Duration
    /// order.
    #[must_use]
    pub const fn component_scores(&self) -> [Option<i32>; 4] {
        [self.r_score, self.f_score, self.m_score, self.d_score]
    }
}

fn take<T>(
    row: &mut BTreeMap<String, Value>,
    key: &str,
    coerce: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    row.remove(key).as_ref().and_then(coerce)
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    f.is_finite().then_some(f)
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_int(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value
        && let Some(i) = n.as_i64()
    {
        return Some(i);
    }
    if let Value::String(s) = value
        && let Ok(i) = s.trim().parse::<i64>()
    {
        return Some(i);
    }
    // Integral floats such as `3.0` come from nullable integer columns.
    let f = coerce_float(value)?;
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

fn coerce_small_int(value: &Value) -> Option<i32> {
    coerce_int(value).and_then(|v| i32::try_from(v).ok())
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date(s),
        _ => None,
    }
}

/// Parses a date or timestamp string, keeping only the calendar date.
///
/// Returns `None` for anything unrecognized.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
