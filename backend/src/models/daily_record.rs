use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's log. `date` is the unique key of the daily collection.
///
/// Text and URL fields use the empty string for "not provided"; numeric
/// fields use `None`, which aggregation skips rather than counting as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub sleep_hours: Option<f64>,
    pub sleep_evidence_url: String,
    pub breakfast_url: String,
    pub breakfast_desc: String,
    pub lunch_url: String,
    pub lunch_desc: String,
    pub dinner_url: String,
    pub dinner_desc: String,
    pub late_night_url: String,
    pub late_night_desc: String,
    pub sugary_drinks: Option<u32>,
    pub steps: Option<u32>,
    pub steps_evidence_url: String,
    pub screen_time: Option<f64>,
    pub screen_evidence_url: String,
    /// Only populated by the earliest form; later forms leave it blank.
    pub reflection: String,
}

impl DailyRecord {
    /// A record for `date` with every other field blank.
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            date,
            sleep_hours: None,
            sleep_evidence_url: String::new(),
            breakfast_url: String::new(),
            breakfast_desc: String::new(),
            lunch_url: String::new(),
            lunch_desc: String::new(),
            dinner_url: String::new(),
            dinner_desc: String::new(),
            late_night_url: String::new(),
            late_night_desc: String::new(),
            sugary_drinks: None,
            steps: None,
            steps_evidence_url: String::new(),
            screen_time: None,
            screen_evidence_url: String::new(),
            reflection: String::new(),
        }
    }

    pub fn set_evidence_url(&mut self, category: EvidenceCategory, url: String) {
        let slot = match category {
            EvidenceCategory::Sleep => &mut self.sleep_evidence_url,
            EvidenceCategory::Breakfast => &mut self.breakfast_url,
            EvidenceCategory::Lunch => &mut self.lunch_url,
            EvidenceCategory::Dinner => &mut self.dinner_url,
            EvidenceCategory::LateNight => &mut self.late_night_url,
            EvidenceCategory::Steps => &mut self.steps_evidence_url,
            EvidenceCategory::Screen => &mut self.screen_evidence_url,
        };
        *slot = url;
    }

    /// Photo first, then description, else nothing.
    pub fn meal_entry(&self, meal: Meal) -> MealEntry {
        let (url, desc) = match meal {
            Meal::Breakfast => (&self.breakfast_url, &self.breakfast_desc),
            Meal::Lunch => (&self.lunch_url, &self.lunch_desc),
            Meal::Dinner => (&self.dinner_url, &self.dinner_desc),
            Meal::LateNight => (&self.late_night_url, &self.late_night_desc),
        };
        if !url.trim().is_empty() {
            MealEntry::Photo(url.clone())
        } else if !desc.trim().is_empty() {
            MealEntry::Description(desc.clone())
        } else {
            MealEntry::None
        }
    }
}

/// What a piece of uploaded evidence proves. The key doubles as the
/// object-name segment and, with an `_evidence` suffix, the form field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Sleep,
    Breakfast,
    Lunch,
    Dinner,
    LateNight,
    Steps,
    Screen,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 7] = [
        Self::Sleep,
        Self::Breakfast,
        Self::Lunch,
        Self::Dinner,
        Self::LateNight,
        Self::Steps,
        Self::Screen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::LateNight => "late_night",
            Self::Steps => "steps",
            Self::Screen => "screen",
        }
    }

    /// Multipart field carrying this category's file, e.g. `lunch_evidence`.
    pub fn from_form_field(field: &str) -> Option<Self> {
        let key = field.strip_suffix("_evidence")?;
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
    LateNight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MealEntry {
    Photo(String),
    Description(String),
    None,
}
