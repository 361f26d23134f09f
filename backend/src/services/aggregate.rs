use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::daily_record::{DailyRecord, Meal};
use crate::models::reflection::WeeklyReflection;
use crate::models::summary::{
    Averages, DailySeries, MealDay, MealWeek, Overview, WeekDisplay, WeekSummary, WeeklySeries,
};
use crate::services::calendar::{round_to, week_end, week_start};

/// Running sum and count over the values that are present.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    sum: f64,
    count: usize,
}

impl Tally {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tallies {
    sleep: Tally,
    steps: Tally,
    drinks: Tally,
    screen: Tally,
}

impl Tallies {
    fn over<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Self {
        let mut t = Self::default();
        for r in records {
            t.sleep.add(r.sleep_hours);
            t.steps.add(r.steps.map(f64::from));
            t.drinks.add(r.sugary_drinks.map(f64::from));
            t.screen.add(r.screen_time);
        }
        t
    }

    fn averages(self) -> Averages {
        Averages {
            avg_sleep_hours: self.sleep.mean(),
            avg_steps: self.steps.mean(),
            avg_sugary_drinks: self.drinks.mean(),
            avg_screen_time: self.screen.mean(),
        }
    }
}

/// Records grouped by week start, ascending, each group sorted by date.
fn group_by_week(records: &[DailyRecord]) -> BTreeMap<NaiveDate, Vec<&DailyRecord>> {
    let mut weeks: BTreeMap<NaiveDate, Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        weeks.entry(week_start(record.date)).or_default().push(record);
    }
    for days in weeks.values_mut() {
        days.sort_by_key(|r| r.date);
    }
    weeks
}

/// Per-week sums and averages, left-joined with the week's reflection.
///
/// Daily records drive the grouping: a week appears only if it has at least
/// one record, and a week with no reflection gets an empty string.
pub fn weekly_aggregate(
    records: &[DailyRecord],
    reflections: &[WeeklyReflection],
) -> Vec<WeekSummary> {
    let mut reflection_by_week: BTreeMap<NaiveDate, &str> = BTreeMap::new();
    for r in reflections {
        // Later entries win if a legacy snapshot holds two for one week.
        reflection_by_week.insert(week_start(r.week_start), r.reflection.as_str());
    }

    group_by_week(records)
        .into_iter()
        .map(|(start, days)| {
            let tallies = Tallies::over(days.iter().copied());
            let averages = tallies.averages();
            let sum_steps: u64 = days.iter().filter_map(|r| r.steps).map(u64::from).sum();
            let sum_sugary_drinks: u64 = days
                .iter()
                .filter_map(|r| r.sugary_drinks)
                .map(u64::from)
                .sum();

            WeekSummary {
                week_start: start,
                week_end: week_end(start),
                days: days.into_iter().cloned().collect(),
                sum_sleep_hours: tallies.sleep.sum,
                sum_steps,
                sum_sugary_drinks,
                display: WeekDisplay {
                    sum_sleep_hours: format_hours(Some(tallies.sleep.sum)),
                    sum_steps: sum_steps.to_string(),
                    avg_sleep_hours: format_hours(averages.avg_sleep_hours),
                    avg_steps: format_count(averages.avg_steps),
                    avg_sugary_drinks: format_hours(averages.avg_sugary_drinks),
                    avg_screen_time: format_hours(averages.avg_screen_time),
                },
                avg_sleep_hours: averages.avg_sleep_hours,
                avg_steps: averages.avg_steps,
                avg_sugary_drinks: averages.avg_sugary_drinks,
                avg_screen_time: averages.avg_screen_time,
                reflection: reflection_by_week
                    .get(&start)
                    .map(|s| (*s).to_owned())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

/// Overall averages plus the daily and weekly-cumulative chart series.
pub fn overview(records: &[DailyRecord]) -> Overview {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let daily = DailySeries {
        dates: sorted.iter().map(|r| r.date).collect(),
        sleep_hours: sorted.iter().map(|r| r.sleep_hours).collect(),
        steps: sorted.iter().map(|r| r.steps).collect(),
        sugary_drinks: sorted.iter().map(|r| r.sugary_drinks).collect(),
        screen_time: sorted.iter().map(|r| r.screen_time).collect(),
    };

    let mut weekly = WeeklySeries::default();
    for week in weekly_aggregate(records, &[]) {
        weekly.week_starts.push(week.week_start);
        weekly.sleep_hours.push(week.sum_sleep_hours);
        weekly.steps.push(week.sum_steps);
        weekly.sugary_drinks.push(week.sum_sugary_drinks);
    }

    Overview {
        record_count: records.len(),
        averages: Tallies::over(records).averages(),
        daily,
        weekly,
    }
}

/// Meals per day, grouped by week, resolved to photo / description / none.
pub fn meals_by_week(records: &[DailyRecord]) -> Vec<MealWeek> {
    group_by_week(records)
        .into_iter()
        .map(|(start, days)| MealWeek {
            week_start: start,
            week_end: week_end(start),
            days: days
                .into_iter()
                .map(|r| MealDay {
                    date: r.date,
                    breakfast: r.meal_entry(Meal::Breakfast),
                    lunch: r.meal_entry(Meal::Lunch),
                    dinner: r.meal_entry(Meal::Dinner),
                    late_night: r.meal_entry(Meal::LateNight),
                })
                .collect(),
        })
        .collect()
}

fn format_hours(value: Option<f64>) -> String {
    format!("{:.1}", round_to(value.unwrap_or(0.0), 1))
}

fn format_count(value: Option<f64>) -> String {
    format!("{:.0}", round_to(value.unwrap_or(0.0), 0))
}
