use axum::{extract::State, Json};

use crate::dto::{MealsResponse, OverviewResponse, WeeklyStatsResponse};
use crate::error::AppResult;
use crate::services::aggregate;
use crate::AppState;

/// Weekly table and cumulative charts. Weeks come from the daily records;
/// reflections are joined in where one exists.
pub async fn weekly_stats(State(state): State<AppState>) -> AppResult<Json<WeeklyStatsResponse>> {
    let (daily, reflections) = tokio::join!(
        state.records.load_daily_records(),
        state.records.load_weekly_reflections()
    );
    let warnings = [daily.warning(), reflections.warning()]
        .into_iter()
        .flatten()
        .collect();

    let weeks = aggregate::weekly_aggregate(&daily.records, &reflections.records);
    Ok(Json(WeeklyStatsResponse { weeks, warnings }))
}

pub async fn overview(State(state): State<AppState>) -> AppResult<Json<OverviewResponse>> {
    let daily = state.records.load_daily_records().await;
    Ok(Json(OverviewResponse {
        overview: aggregate::overview(&daily.records),
        warning: daily.warning(),
    }))
}

pub async fn weekly_meals(State(state): State<AppState>) -> AppResult<Json<MealsResponse>> {
    let daily = state.records.load_daily_records().await;
    Ok(Json(MealsResponse {
        weeks: aggregate::meals_by_week(&daily.records),
        warning: daily.warning(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use tower::ServiceExt;

    use crate::models::daily_record::DailyRecord;
    use crate::models::reflection::WeeklyReflection;
    use crate::store::REFLECTION_SNAPSHOT;
    use crate::test_support::{get, read_json, test_state};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn empty_store_gives_empty_weeks() {
        let (state, _blob) = test_state().await;
        let app = crate::app_router(state);

        let resp = app.clone().oneshot(get("/api/stats/weekly")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert!(body["weeks"].as_array().unwrap().is_empty());
        assert!(body.get("warnings").is_none());

        let body = read_json(app.oneshot(get("/api/stats/overview")).await.unwrap()).await;
        assert_eq!(body["record_count"], 0);
        assert!(body["averages"]["avg_steps"].is_null());
    }

    #[tokio::test]
    async fn weekly_sums_averages_and_reflection_join() {
        let (state, _blob) = test_state().await;
        state
            .records
            .save_daily_records(&[
                DailyRecord {
                    steps: Some(3000),
                    sleep_hours: Some(7.3),
                    lunch_desc: "salad".into(),
                    ..DailyRecord::blank(date(11))
                },
                DailyRecord {
                    steps: Some(7000),
                    lunch_url: "https://x/lunch.png".into(),
                    ..DailyRecord::blank(date(13))
                },
                DailyRecord {
                    steps: Some(100),
                    ..DailyRecord::blank(date(17))
                },
            ])
            .await
            .unwrap();
        state
            .records
            .save_weekly_reflections(&[WeeklyReflection {
                week_start: date(10),
                reflection: "steady".into(),
            }])
            .await
            .unwrap();
        let app = crate::app_router(state);

        let body = read_json(app.clone().oneshot(get("/api/stats/weekly")).await.unwrap()).await;
        let weeks = body["weeks"].as_array().unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0]["week_start"], "2024-06-10");
        assert_eq!(weeks[0]["sum_steps"], 10000);
        assert_eq!(weeks[0]["avg_steps"], 5000.0);
        assert_eq!(weeks[0]["reflection"], "steady");
        assert_eq!(weeks[0]["display"]["avg_sleep_hours"], "7.3");
        assert_eq!(weeks[1]["week_start"], "2024-06-17");
        assert_eq!(weeks[1]["reflection"], "");

        let body = read_json(app.oneshot(get("/api/meals/weekly")).await.unwrap()).await;
        let days = body["weeks"][0]["days"].as_array().unwrap();
        assert_eq!(days[0]["lunch"]["kind"], "description");
        assert_eq!(days[0]["lunch"]["value"], "salad");
        assert_eq!(days[1]["lunch"]["kind"], "photo");
        assert_eq!(days[1]["dinner"]["kind"], "none");
    }

    #[tokio::test]
    async fn unreadable_reflections_still_render_weeks() {
        let (state, blob) = test_state().await;
        state
            .records
            .save_daily_records(&[DailyRecord::blank(date(11))])
            .await
            .unwrap();
        blob.put_text(REFLECTION_SNAPSHOT, "date,reflection\nnot-a-date,x\n").await;
        let app = crate::app_router(state);

        let body = read_json(app.oneshot(get("/api/stats/weekly")).await.unwrap()).await;
        assert_eq!(body["weeks"].as_array().unwrap().len(), 1);
        assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
    }
}
