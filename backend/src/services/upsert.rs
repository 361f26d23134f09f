use crate::models::daily_record::DailyRecord;
use crate::models::reflection::{ReflectionSubmission, WeeklyReflection};
use crate::services::calendar::week_start;

/// Result of an upsert: the new collection and whether an entry was replaced.
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub records: Vec<T>,
    pub replaced: bool,
}

/// Insert `incoming`, dropping every existing record with the same date.
///
/// The replacement is a full overwrite: nothing from the old record is
/// carried over, so a resubmission must repeat every field it wants kept.
/// The replacing record goes to the end of the collection. `existing` is
/// left untouched; persisting the result is the caller's job.
pub fn upsert_daily(existing: &[DailyRecord], incoming: DailyRecord) -> Upserted<DailyRecord> {
    let mut records: Vec<DailyRecord> = existing
        .iter()
        .filter(|r| r.date != incoming.date)
        .cloned()
        .collect();
    let replaced = records.len() != existing.len();
    records.push(incoming);
    Upserted { records, replaced }
}

/// Store `incoming` under the Monday of its week.
///
/// An existing reflection for that week is updated in place and keeps its
/// position; otherwise a new entry is appended.
pub fn upsert_reflection(
    existing: &[WeeklyReflection],
    incoming: ReflectionSubmission,
) -> Upserted<WeeklyReflection> {
    let target = week_start(incoming.date);
    let mut records = existing.to_vec();

    // Older snapshots may key a week by a non-Monday date; the key is
    // rewritten to the Monday on update.
    let replaced = match records.iter_mut().find(|r| week_start(r.week_start) == target) {
        Some(found) => {
            found.week_start = target;
            found.reflection = incoming.reflection;
            true
        }
        None => {
            records.push(WeeklyReflection {
                week_start: target,
                reflection: incoming.reflection,
            });
            false
        }
    };

    Upserted { records, replaced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(day: NaiveDate, steps: u32) -> DailyRecord {
        DailyRecord {
            steps: Some(steps),
            ..DailyRecord::blank(day)
        }
    }

    #[test]
    fn appends_when_date_is_new() {
        let existing = vec![record(date(2024, 6, 9), 100)];
        let out = upsert_daily(&existing, record(date(2024, 6, 10), 200));
        assert!(!out.replaced);
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[1].date, date(2024, 6, 10));
    }

    #[test]
    fn resubmission_replaces_without_merging() {
        let mut first = record(date(2024, 6, 10), 5000);
        first.sleep_hours = Some(7.5);
        first.breakfast_desc = "oatmeal".into();
        first.breakfast_url = "https://x/b.png".into();

        let stored = upsert_daily(&[], first).records;
        let out = upsert_daily(&stored, record(date(2024, 6, 10), 8000));

        assert!(out.replaced);
        assert_eq!(out.records.len(), 1);
        let kept = &out.records[0];
        assert_eq!(kept.steps, Some(8000));
        assert_eq!(kept.sleep_hours, None);
        assert!(kept.breakfast_desc.is_empty());
        assert!(kept.breakfast_url.is_empty());
    }

    #[test]
    fn replacement_moves_to_the_end_and_leaves_input_alone() {
        let existing = vec![
            record(date(2024, 6, 10), 1),
            record(date(2024, 6, 11), 2),
            record(date(2024, 6, 12), 3),
        ];
        let out = upsert_daily(&existing, record(date(2024, 6, 10), 9));
        let dates: Vec<_> = out.records.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 6, 11), date(2024, 6, 12), date(2024, 6, 10)]
        );
        assert_eq!(existing[0].steps, Some(1));
    }

    #[test]
    fn legacy_duplicates_collapse_to_one() {
        let existing = vec![
            record(date(2024, 6, 10), 1),
            record(date(2024, 6, 10), 2),
        ];
        let out = upsert_daily(&existing, record(date(2024, 6, 10), 3));
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].steps, Some(3));
    }

    #[test]
    fn last_submission_per_date_wins() {
        let submissions = [
            (date(2024, 6, 10), 1),
            (date(2024, 6, 11), 2),
            (date(2024, 6, 10), 3),
            (date(2024, 6, 12), 4),
            (date(2024, 6, 11), 5),
            (date(2024, 6, 10), 6),
        ];
        let mut stored = Vec::new();
        for (day, steps) in submissions {
            stored = upsert_daily(&stored, record(day, steps)).records;
        }
        assert_eq!(stored.len(), 3);
        let steps_for = |d| stored.iter().find(|r| r.date == d).and_then(|r| r.steps);
        assert_eq!(steps_for(date(2024, 6, 10)), Some(6));
        assert_eq!(steps_for(date(2024, 6, 11)), Some(5));
        assert_eq!(steps_for(date(2024, 6, 12)), Some(4));
    }

    #[test]
    fn repeated_upsert_is_idempotent_in_size() {
        let base = vec![record(date(2024, 6, 9), 1)];
        let once = upsert_daily(&base, record(date(2024, 6, 10), 10)).records;
        let twice = upsert_daily(&once, record(date(2024, 6, 10), 10)).records;
        assert_eq!(once.len(), twice.len());
        assert_eq!(once, twice);
    }

    #[test]
    fn reflection_is_keyed_by_monday_and_updated_in_place() {
        let first = upsert_reflection(
            &[],
            ReflectionSubmission {
                date: date(2024, 6, 12),
                reflection: "slept badly".into(),
            },
        );
        assert!(!first.replaced);
        assert_eq!(first.records[0].week_start, date(2024, 6, 10));

        let second = upsert_reflection(
            &first.records,
            ReflectionSubmission {
                date: date(2024, 6, 14),
                reflection: "better by friday".into(),
            },
        );
        assert!(second.replaced);
        assert_eq!(second.records.len(), 1);
        assert_eq!(second.records[0].week_start, date(2024, 6, 10));
        assert_eq!(second.records[0].reflection, "better by friday");
    }

    #[test]
    fn reflection_update_preserves_position() {
        let existing = vec![
            WeeklyReflection {
                week_start: date(2024, 6, 3),
                reflection: "a".into(),
            },
            WeeklyReflection {
                week_start: date(2024, 6, 10),
                reflection: "b".into(),
            },
            WeeklyReflection {
                week_start: date(2024, 6, 17),
                reflection: "c".into(),
            },
        ];
        let out = upsert_reflection(
            &existing,
            ReflectionSubmission {
                date: date(2024, 6, 16),
                reflection: "b2".into(),
            },
        );
        let texts: Vec<_> = out.records.iter().map(|r| r.reflection.as_str()).collect();
        assert_eq!(texts, vec!["a", "b2", "c"]);
    }

    #[test]
    fn reflection_matches_legacy_non_monday_key() {
        let existing = vec![WeeklyReflection {
            week_start: date(2024, 6, 11),
            reflection: "old".into(),
        }];
        let out = upsert_reflection(
            &existing,
            ReflectionSubmission {
                date: date(2024, 6, 13),
                reflection: "new".into(),
            },
        );
        assert!(out.replaced);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].reflection, "new");
        assert_eq!(out.records[0].week_start, date(2024, 6, 10));
        assert_eq!(existing[0].week_start, date(2024, 6, 11));
    }
}
