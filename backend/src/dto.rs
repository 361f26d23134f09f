//! Request/response shapes for the JSON API.
//!
//! Conventions:
//! - `*Form` / `*Request` → parsed from the client (multipart or JSON)
//! - `*Response` → serialized to the client
//! - Range and length checks go through `validator` derives

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::daily_record::DailyRecord;
use crate::models::reflection::{ReflectionSubmission, WeeklyReflection};
use crate::models::summary::{MealWeek, Overview, WeekSummary};
use crate::services::calendar::{sleep_hours_between, week_end};
use crate::store::snapshot::parse_snapshot_date;

fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    parse_snapshot_date(raw.trim())
        .map_err(|_| AppError::Validation(format!("{} must be a date like 2024-06-10", field)))
}

fn parse_time(field: &str, raw: &str) -> AppResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::Validation(format!("{} must be a time like 23:30", field)))
}

fn parse_decimal(field: &str, raw: &str) -> AppResult<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::Validation(format!("{} must be a number", field)))
}

fn parse_count(field: &str, raw: &str) -> AppResult<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        AppError::Validation(format!("{} must be a non-negative whole number", field))
    })
}

/// Optional date-range filter on GET /api/daily-records
#[derive(Debug, Default, Deserialize)]
pub struct DailyRecordQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DailyRecordQuery {
    /// Inclusive bounds; blank values are treated as absent.
    pub fn bounds(&self) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        let parse = |field: &str, raw: &Option<String>| {
            raw.as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| parse_date(field, v))
                .transpose()
        };
        let start = parse("start_date", &self.start_date)?;
        let end = parse("end_date", &self.end_date)?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AppError::Validation(
                    "start_date must not be after end_date".into(),
                ));
            }
        }
        Ok((start, end))
    }
}

/// Text fields of the daily multipart form, parsed but not yet checked.
///
/// Blank inputs stay `None` / empty. Evidence files travel separately.
#[derive(Debug, Default, Validate)]
pub struct DailyRecordForm {
    pub date: Option<NaiveDate>,
    pub bed_time: Option<NaiveTime>,
    pub wake_time: Option<NaiveTime>,
    #[validate(range(min = 0.0, max = 24.0, message = "sleep_hours must be between 0 and 24"))]
    pub sleep_hours: Option<f64>,
    #[validate(length(max = 5000, message = "breakfast_desc too long"))]
    pub breakfast_desc: String,
    #[validate(length(max = 5000, message = "lunch_desc too long"))]
    pub lunch_desc: String,
    #[validate(length(max = 5000, message = "dinner_desc too long"))]
    pub dinner_desc: String,
    #[validate(length(max = 5000, message = "late_night_desc too long"))]
    pub late_night_desc: String,
    pub sugary_drinks: Option<u32>,
    pub steps: Option<u32>,
    #[validate(range(min = 0.0, max = 24.0, message = "screen_time must be between 0 and 24"))]
    pub screen_time: Option<f64>,
    #[validate(length(max = 5000, message = "reflection too long"))]
    pub reflection: String,
}

impl DailyRecordForm {
    /// Apply one text part. Returns false for names the form does not know.
    pub fn set_field(&mut self, name: &str, value: &str) -> AppResult<bool> {
        let blank = value.trim().is_empty();
        match name {
            "date" if !blank => self.date = Some(parse_date(name, value)?),
            "bed_time" if !blank => self.bed_time = Some(parse_time(name, value)?),
            "wake_time" if !blank => self.wake_time = Some(parse_time(name, value)?),
            "sleep_hours" if !blank => self.sleep_hours = Some(parse_decimal(name, value)?),
            "screen_time" if !blank => self.screen_time = Some(parse_decimal(name, value)?),
            "sugary_drinks" if !blank => self.sugary_drinks = Some(parse_count(name, value)?),
            "steps" if !blank => self.steps = Some(parse_count(name, value)?),
            "breakfast_desc" => self.breakfast_desc = value.trim().to_string(),
            "lunch_desc" => self.lunch_desc = value.trim().to_string(),
            "dinner_desc" => self.dinner_desc = value.trim().to_string(),
            "late_night_desc" => self.late_night_desc = value.trim().to_string(),
            "reflection" => self.reflection = value.trim().to_string(),
            "date" | "bed_time" | "wake_time" | "sleep_hours" | "screen_time"
            | "sugary_drinks" | "steps" => {}
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Validate and build the record, with `today` standing in for a missing date.
    ///
    /// Bed and wake time, when both present, win over a direct `sleep_hours`.
    pub fn into_record(self, today: NaiveDate) -> AppResult<DailyRecord> {
        self.validate()?;

        let sleep_hours = match (self.bed_time, self.wake_time) {
            (Some(bed), Some(wake)) => Some(sleep_hours_between(bed, wake)),
            (None, None) => self.sleep_hours,
            _ => {
                return Err(AppError::Validation(
                    "bed_time and wake_time must be given together".into(),
                ))
            }
        };

        Ok(DailyRecord {
            sleep_hours,
            breakfast_desc: self.breakfast_desc,
            lunch_desc: self.lunch_desc,
            dinner_desc: self.dinner_desc,
            late_night_desc: self.late_night_desc,
            sugary_drinks: self.sugary_drinks,
            steps: self.steps,
            screen_time: self.screen_time,
            reflection: self.reflection,
            ..DailyRecord::blank(self.date.unwrap_or(today))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitDailyResponse {
    pub record: DailyRecord,
    /// A record for the same date existed and was overwritten.
    pub replaced: bool,
    pub uploaded_evidence: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DailyRecordListResponse {
    pub records: Vec<DailyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// POST /api/reflections
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReflectionRequest {
    /// Any day of the week being reflected on; defaults to today.
    pub date: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "reflection too long"))]
    pub reflection: String,
}

impl SubmitReflectionRequest {
    pub fn into_submission(self, today: NaiveDate) -> AppResult<ReflectionSubmission> {
        self.validate()?;
        let date = match self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => parse_date("date", raw)?,
            None => today,
        };
        Ok(ReflectionSubmission {
            date,
            reflection: self.reflection.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitReflectionResponse {
    pub reflection: WeeklyReflection,
    pub week_end: NaiveDate,
    pub replaced: bool,
}

impl SubmitReflectionResponse {
    pub fn new(reflection: WeeklyReflection, replaced: bool) -> Self {
        Self {
            week_end: week_end(reflection.week_start),
            reflection,
            replaced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReflectionListResponse {
    pub reflections: Vec<WeeklyReflection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyStatsResponse {
    pub weeks: Vec<WeekSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    #[serde(flatten)]
    pub overview: Overview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MealsResponse {
    pub weeks: Vec<MealWeek>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
