//! CSV encoding of the daily and reflection snapshots.
//!
//! Rows are read leniently so snapshots written by earlier revisions (old
//! column names, missing columns, float-formatted counts, blank cells)
//! still load. Anything that cannot be read faithfully is an error; rows
//! are never partially recovered.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::daily_record::DailyRecord;
use crate::models::reflection::WeeklyReflection;

pub const DAILY_HEADER: [&str; 17] = [
    "date",
    "sleep_hours",
    "sleep_evidence_url",
    "breakfast_url",
    "breakfast_desc",
    "lunch_url",
    "lunch_desc",
    "dinner_url",
    "dinner_desc",
    "late_night_url",
    "late_night_desc",
    "sugary_drinks",
    "steps",
    "steps_evidence_url",
    "screen_time",
    "screen_evidence_url",
    "reflection",
];

pub const REFLECTION_HEADER: [&str; 2] = ["date", "reflection"];

const SNAPSHOT_DATE_FORMAT: &str = "%Y-%m-%d 00:00:00";

/// Calendar years accepted anywhere a date is parsed.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("row {row}: {source}")]
    Csv {
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: {message}")]
    Value { row: u64, message: String },

    #[error("failed to encode snapshot: {0}")]
    Encode(String),
}

/// Field order must match `DAILY_HEADER`.
///
/// Earlier revisions named the evidence columns without the `_url` suffix.
/// Those are read into separate `legacy_*` fields, never written, because a
/// snapshot written by both revisions carries both names in its header.
#[derive(Debug, Serialize, Deserialize)]
struct DailyRow {
    date: String,
    #[serde(default, deserialize_with = "decimal_cell")]
    sleep_hours: Option<f64>,
    #[serde(default)]
    sleep_evidence_url: String,
    #[serde(default)]
    breakfast_url: String,
    #[serde(default)]
    breakfast_desc: String,
    #[serde(default)]
    lunch_url: String,
    #[serde(default)]
    lunch_desc: String,
    #[serde(default)]
    dinner_url: String,
    #[serde(default)]
    dinner_desc: String,
    #[serde(default)]
    late_night_url: String,
    #[serde(default)]
    late_night_desc: String,
    #[serde(default, deserialize_with = "count_cell")]
    sugary_drinks: Option<u32>,
    #[serde(default, deserialize_with = "count_cell")]
    steps: Option<u32>,
    #[serde(default)]
    steps_evidence_url: String,
    #[serde(default, deserialize_with = "decimal_cell")]
    screen_time: Option<f64>,
    #[serde(default)]
    screen_evidence_url: String,
    #[serde(default)]
    reflection: String,

    #[serde(default, rename = "sleep_evidence", skip_serializing)]
    legacy_sleep_evidence: Option<String>,
    #[serde(default, rename = "breakfast", skip_serializing)]
    legacy_breakfast: Option<String>,
    #[serde(default, rename = "lunch", skip_serializing)]
    legacy_lunch: Option<String>,
    #[serde(default, rename = "dinner", skip_serializing)]
    legacy_dinner: Option<String>,
    #[serde(default, rename = "late_night", skip_serializing)]
    legacy_late_night: Option<String>,
    #[serde(default, rename = "steps_evidence", skip_serializing)]
    legacy_steps_evidence: Option<String>,
    #[serde(default, rename = "screen_evidence", skip_serializing)]
    legacy_screen_evidence: Option<String>,
}

/// The current column unless it is blank, then the legacy one.
fn merge_url(current: String, legacy: Option<String>) -> String {
    if !current.trim().is_empty() {
        return current;
    }
    legacy.filter(|l| !l.trim().is_empty()).unwrap_or(current)
}

#[derive(Debug, Serialize, Deserialize)]
struct ReflectionRow {
    date: String,
    #[serde(default)]
    reflection: String,
}

impl From<&DailyRecord> for DailyRow {
    fn from(r: &DailyRecord) -> Self {
        Self {
            date: r.date.format(SNAPSHOT_DATE_FORMAT).to_string(),
            sleep_hours: r.sleep_hours,
            sleep_evidence_url: r.sleep_evidence_url.clone(),
            breakfast_url: r.breakfast_url.clone(),
            breakfast_desc: r.breakfast_desc.clone(),
            lunch_url: r.lunch_url.clone(),
            lunch_desc: r.lunch_desc.clone(),
            dinner_url: r.dinner_url.clone(),
            dinner_desc: r.dinner_desc.clone(),
            late_night_url: r.late_night_url.clone(),
            late_night_desc: r.late_night_desc.clone(),
            sugary_drinks: r.sugary_drinks,
            steps: r.steps,
            steps_evidence_url: r.steps_evidence_url.clone(),
            screen_time: r.screen_time,
            screen_evidence_url: r.screen_evidence_url.clone(),
            reflection: r.reflection.clone(),
            legacy_sleep_evidence: None,
            legacy_breakfast: None,
            legacy_lunch: None,
            legacy_dinner: None,
            legacy_late_night: None,
            legacy_steps_evidence: None,
            legacy_screen_evidence: None,
        }
    }
}

impl DailyRow {
    fn into_record(self, row: u64) -> Result<DailyRecord, SnapshotError> {
        let date = parse_snapshot_date(&self.date)
            .map_err(|message| SnapshotError::Value { row, message })?;
        Ok(DailyRecord {
            date,
            sleep_hours: self.sleep_hours,
            sleep_evidence_url: merge_url(self.sleep_evidence_url, self.legacy_sleep_evidence),
            breakfast_url: merge_url(self.breakfast_url, self.legacy_breakfast),
            breakfast_desc: self.breakfast_desc,
            lunch_url: merge_url(self.lunch_url, self.legacy_lunch),
            lunch_desc: self.lunch_desc,
            dinner_url: merge_url(self.dinner_url, self.legacy_dinner),
            dinner_desc: self.dinner_desc,
            late_night_url: merge_url(self.late_night_url, self.legacy_late_night),
            late_night_desc: self.late_night_desc,
            sugary_drinks: self.sugary_drinks,
            steps: self.steps,
            steps_evidence_url: merge_url(self.steps_evidence_url, self.legacy_steps_evidence),
            screen_time: self.screen_time,
            screen_evidence_url: merge_url(self.screen_evidence_url, self.legacy_screen_evidence),
            reflection: self.reflection,
        })
    }
}

pub fn encode_daily(records: &[DailyRecord]) -> Result<String, SnapshotError> {
    encode(&DAILY_HEADER, records.iter().map(DailyRow::from))
}

pub fn decode_daily(text: &str) -> Result<Vec<DailyRecord>, SnapshotError> {
    let mut reader = reader(text);
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<DailyRow>().enumerate() {
        let row_no = i as u64 + 1;
        let row = row.map_err(|source| SnapshotError::Csv { row: row_no, source })?;
        records.push(row.into_record(row_no)?);
    }
    Ok(records)
}

pub fn encode_reflections(reflections: &[WeeklyReflection]) -> Result<String, SnapshotError> {
    encode(
        &REFLECTION_HEADER,
        reflections.iter().map(|r| ReflectionRow {
            date: r.week_start.format(SNAPSHOT_DATE_FORMAT).to_string(),
            reflection: r.reflection.clone(),
        }),
    )
}

pub fn decode_reflections(text: &str) -> Result<Vec<WeeklyReflection>, SnapshotError> {
    let mut reader = reader(text);
    let mut reflections = Vec::new();
    for (i, row) in reader.deserialize::<ReflectionRow>().enumerate() {
        let row_no = i as u64 + 1;
        let row = row.map_err(|source| SnapshotError::Csv { row: row_no, source })?;
        let week_start = parse_snapshot_date(&row.date)
            .map_err(|message| SnapshotError::Value { row: row_no, message })?;
        reflections.push(WeeklyReflection {
            week_start,
            reflection: row.reflection,
        });
    }
    Ok(reflections)
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes())
}

/// Header is written explicitly so an empty collection still gets one.
fn encode<R: Serialize>(
    header: &[&str],
    rows: impl Iterator<Item = R>,
) -> Result<String, SnapshotError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| SnapshotError::Encode(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SnapshotError::Encode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Accepts a bare date or a date with a time of day; the time is dropped.
/// Years outside 0001..=9999 are rejected.
pub fn parse_snapshot_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
            .into_iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|dt| dt.date())
    });
    match date {
        Some(date) if YEAR_RANGE.contains(&date.year()) => Ok(date),
        Some(_) => Err(format!("date {:?} is outside years 0001-9999", raw)),
        None => Err(format!("malformed date {:?}", raw)),
    }
}

fn is_blank(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.eq_ignore_ascii_case("nan")
}

fn parse_decimal(raw: &str) -> Result<Option<f64>, String> {
    if is_blank(raw) {
        return Ok(None);
    }
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {:?}", raw))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("expected a non-negative number, got {}", raw));
    }
    Ok(Some(value))
}

fn parse_count(raw: &str) -> Result<Option<u32>, String> {
    let Some(value) = parse_decimal(raw)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(format!("expected a whole count, got {}", raw));
    }
    Ok(Some(value as u32))
}

fn decimal_cell<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_decimal(&raw).map_err(serde::de::Error::custom)
}

fn count_cell<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_count(&raw).map_err(serde::de::Error::custom)
}
