use chrono::NaiveDate;
use serde::Serialize;

use super::daily_record::{DailyRecord, MealEntry};

/// Aggregates for one ISO week of daily records.
///
/// Sums feed the weekly cumulative charts, averages the weekly table.
/// Averages are `None` when no record in the week carries that value.
#[derive(Debug, Clone, Serialize)]
pub struct WeekSummary {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub days: Vec<DailyRecord>,
    pub sum_sleep_hours: f64,
    pub sum_steps: u64,
    pub sum_sugary_drinks: u64,
    pub avg_sleep_hours: Option<f64>,
    pub avg_steps: Option<f64>,
    pub avg_sugary_drinks: Option<f64>,
    pub avg_screen_time: Option<f64>,
    pub reflection: String,
    pub display: WeekDisplay,
}

/// Rounded strings for the table; absent averages show as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekDisplay {
    pub sum_sleep_hours: String,
    pub sum_steps: String,
    pub avg_sleep_hours: String,
    pub avg_steps: String,
    pub avg_sugary_drinks: String,
    pub avg_screen_time: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Averages {
    pub avg_sleep_hours: Option<f64>,
    pub avg_steps: Option<f64>,
    pub avg_sugary_drinks: Option<f64>,
    pub avg_screen_time: Option<f64>,
}

/// Chart series in date order. Gaps are `null` so the x axis stays aligned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailySeries {
    pub dates: Vec<NaiveDate>,
    pub sleep_hours: Vec<Option<f64>>,
    pub steps: Vec<Option<u32>>,
    pub sugary_drinks: Vec<Option<u32>>,
    pub screen_time: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WeeklySeries {
    pub week_starts: Vec<NaiveDate>,
    pub sleep_hours: Vec<f64>,
    pub steps: Vec<u64>,
    pub sugary_drinks: Vec<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Overview {
    pub record_count: usize,
    pub averages: Averages,
    pub daily: DailySeries,
    pub weekly: WeeklySeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealWeek {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub days: Vec<MealDay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealDay {
    pub date: NaiveDate,
    pub breakfast: MealEntry,
    pub lunch: MealEntry,
    pub dinner: MealEntry,
    pub late_night: MealEntry,
}
