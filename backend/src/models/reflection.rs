use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One reflection per ISO week, keyed by the week's Monday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReflection {
    pub week_start: NaiveDate,
    pub reflection: String,
}

/// An incoming reflection. `date` can be any day of the week it belongs to.
#[derive(Debug, Clone)]
pub struct ReflectionSubmission {
    pub date: NaiveDate,
    pub reflection: String,
}
