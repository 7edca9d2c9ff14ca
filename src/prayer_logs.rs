use chrono::Utc;
use log::{info, warn};
use rocket::{get, post, serde::json::Json, FromForm, State};
use serde::Deserialize;

use crate::{
    data_access,
    error::{ApiError, ApiResult},
    history::{self, HistoryPage, HistoryQuery},
    models::{Prayer, PrayerLog, PrayerStatus},
    stats::{self, StatsReport},
    utils::parse_day,
    AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerStatusInput {
    pub user_id: Option<String>,
    pub prayer_id: Option<i64>,
    pub status: Option<String>,
    pub date: Option<String>,
}

#[derive(FromForm)]
pub struct DayLogsQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    pub date: Option<String>,
}

#[derive(FromForm)]
pub struct HistoryParams {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    #[field(name = "startDate")]
    pub start_date: Option<String>,
    #[field(name = "endDate")]
    pub end_date: Option<String>,
}

impl HistoryParams {
    fn validate(&self) -> Result<HistoryQuery, ApiError> {
        HistoryQuery::parse(
            self.user_id.as_deref(),
            self.page.as_deref(),
            self.limit.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
    }
}

#[post("/", data = "<input>")]
pub async fn post_status(state: &State<AppState>, input: Json<PrayerStatusInput>) -> ApiResult<PrayerLog> {
    let user_id = input.user_id.as_deref().map(str::trim).filter(|v| !v.is_empty());
    let (Some(user_id), Some(prayer_id), Some(raw_status)) =
        (user_id, input.prayer_id, input.status.as_deref())
    else {
        return Err(ApiError::bad_request("Missing fields"));
    };

    let status: PrayerStatus = raw_status.parse().map_err(|e: String| {
        warn!("Rejected status {raw_status:?} from user {user_id}");
        ApiError::bad_request(e)
    })?;
    let date = match input.date.as_deref() {
        Some(raw) => parse_day(raw).ok_or_else(|| ApiError::bad_request("Invalid date"))?,
        None => Utc::now().date_naive(),
    };
    if !data_access::prayer_exists(&state.db, prayer_id).await? {
        return Err(ApiError::bad_request("Unknown prayer"));
    }
    if data_access::get_user(&state.db, user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let log = data_access::upsert_prayer_log(&state.db, user_id, prayer_id, date, status).await?;
    info!("User {} marked prayer {} on {} as {}", user_id, prayer_id, date, status);
    Ok(Json(log))
}

#[get("/?<query..>")]
pub async fn day_logs(state: &State<AppState>, query: DayLogsQuery) -> ApiResult<Vec<PrayerLog>> {
    let user_id = query.user_id.as_deref().filter(|v| !v.is_empty());
    let raw_date = query.date.as_deref().filter(|v| !v.is_empty());
    let (Some(user_id), Some(raw_date)) = (user_id, raw_date) else {
        return Ok(Json(Vec::new()));
    };
    let date = parse_day(raw_date).ok_or_else(|| ApiError::bad_request("Invalid date"))?;
    Ok(Json(data_access::get_logs_for_day(&state.db, user_id, date).await?))
}

#[get("/history?<params..>")]
pub async fn history_page(state: &State<AppState>, params: HistoryParams) -> ApiResult<HistoryPage> {
    let query = params.validate()?;
    Ok(Json(history::load_history(&state.db, &query).await?))
}

/// Statistics and leaderboard over the same page of days `history_page` returns.
#[get("/stats?<params..>")]
pub async fn statistics(state: &State<AppState>, params: HistoryParams) -> ApiResult<StatsReport> {
    let query = params.validate()?;
    let page = history::load_history(&state.db, &query).await?;
    Ok(Json(stats::build_report(&page.data, &page.prayers)))
}

#[get("/")]
pub async fn list_prayers(state: &State<AppState>) -> ApiResult<Vec<Prayer>> {
    Ok(Json(data_access::get_prayers(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use crate::data_access::{self, tests::day, tests::seed_user};
    use crate::models::PrayerStatus;
    use crate::test_support::client;
    use rocket::http::{ContentType, Status};
    use serde_json::{json, Value};

    #[rocket::async_test]
    async fn posting_twice_keeps_the_latest_status() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "me@example.com", None).await;

        for status in ["LATE", "ON_TIME"] {
            let res = client
                .post("/api/prayer-logs")
                .header(ContentType::JSON)
                .body(json!({ "userId": me.id, "prayerId": 1, "status": status, "date": "2024-08-15" }).to_string())
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::Ok);
        }

        assert_eq!(data_access::count_logs(&db, &me.id).await.unwrap(), 1);
        let res = client
            .get(format!("/api/prayer-logs?userId={}&date=2024-08-15", me.id))
            .dispatch()
            .await;
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["status"], "ON_TIME");
        assert_eq!(body[0]["date"], "2024-08-15");
        assert_eq!(body[0]["prayerId"], 1);
    }

    #[rocket::async_test]
    async fn invalid_status_payloads_are_rejected() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "me@example.com", None).await;

        let cases = [
            json!({ "userId": me.id, "prayerId": 1 }),
            json!({ "userId": me.id, "prayerId": 1, "status": "EARLY", "date": "2024-08-15" }),
            json!({ "userId": me.id, "prayerId": 9, "status": "LATE", "date": "2024-08-15" }),
            json!({ "userId": me.id, "prayerId": 1, "status": "LATE", "date": "15/08/2024" }),
        ];
        for case in cases {
            let res = client
                .post("/api/prayer-logs")
                .header(ContentType::JSON)
                .body(case.to_string())
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::BadRequest, "payload {case}");
        }
        assert_eq!(data_access::count_logs(&db, &me.id).await.unwrap(), 0);
    }

    #[rocket::async_test]
    async fn history_pages_by_distinct_day() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "me@example.com", Some("Me")).await;
        let friend = seed_user(&db, "yahya@example.com", Some("Yahya")).await;
        data_access::add_friendship(&db, &me.id, &friend.id).await.unwrap();
        for d in 1..=10 {
            data_access::upsert_prayer_log(&db, &me.id, 1, day(2024, 9, d), PrayerStatus::OnTime)
                .await
                .unwrap();
        }
        for d in [2, 5, 9] {
            data_access::upsert_prayer_log(&db, &friend.id, 2, day(2024, 9, d), PrayerStatus::Jamaah)
                .await
                .unwrap();
        }

        let res = client
            .get(format!("/api/prayer-logs/history?userId={}", me.id))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let body: Value = res.into_json().await.unwrap();

        let dates: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["date"].as_str().unwrap())
            .collect();
        assert_eq!(
            dates,
            ["2024-09-10", "2024-09-09", "2024-09-08", "2024-09-07", "2024-09-06", "2024-09-05", "2024-09-04"]
        );
        assert_eq!(
            body["pagination"],
            json!({ "page": 1, "limit": 7, "total": 10, "totalPages": 2, "hasNext": true, "hasPrev": false })
        );
        assert_eq!(body["prayers"].as_array().unwrap().len(), 5);
        assert_eq!(
            body["data"][1]["friends"],
            json!([{ "friendId": friend.id, "friendName": "Yahya", "logs": [{ "prayerId": 2, "status": "JAMAAH" }] }])
        );
        assert_eq!(body["data"][1]["user"]["logs"], json!([{ "prayerId": 1, "status": "ON_TIME" }]));
    }

    #[rocket::async_test]
    async fn history_honours_the_date_filter() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "me@example.com", None).await;
        for d in 1..=10 {
            data_access::upsert_prayer_log(&db, &me.id, 5, day(2024, 9, d), PrayerStatus::Late)
                .await
                .unwrap();
        }

        let res = client
            .get(format!(
                "/api/prayer-logs/history?userId={}&page=1&limit=7&startDate=2024-09-03&endDate=2024-09-05",
                me.id
            ))
            .dispatch()
            .await;
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["totalPages"], 1);
    }

    #[rocket::async_test]
    async fn history_rejects_bad_input() {
        let (client, _db, _dir) = client().await;

        let res = client
            .get("/api/prayer-logs/history?userId=u&startDate=2024-09-05&endDate=2024-09-01")
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::BadRequest);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["error"], "Invalid date range");

        let res = client.get("/api/prayer-logs/history").dispatch().await;
        assert_eq!(res.status(), Status::BadRequest);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["error"], "Missing userId");

        for params in ["page=-1", "page=abc", "page=0", "limit=-5", "limit=0", "limit=x7"] {
            let res = client
                .get(format!("/api/prayer-logs/history?userId=u&{params}"))
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::BadRequest, "{params}");
            let res = client
                .get(format!("/api/prayer-logs/stats?userId=u&{params}"))
                .dispatch()
                .await;
            assert_eq!(res.status(), Status::BadRequest, "stats {params}");
        }
    }

    #[rocket::async_test]
    async fn stats_cover_the_history_page() {
        let (client, db, _dir) = client().await;
        let me = seed_user(&db, "me@example.com", None).await;
        for prayer in 1..=5 {
            data_access::upsert_prayer_log(&db, &me.id, prayer, day(2024, 10, 1), PrayerStatus::Jamaah)
                .await
                .unwrap();
        }

        let res = client
            .get(format!("/api/prayer-logs/stats?userId={}", me.id))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body["statistics"]["totalDays"], 1);
        assert_eq!(body["statistics"]["jamaah"], json!({ "count": 5, "percentage": 100 }));
        assert_eq!(body["statistics"]["overallCompletion"], 100);
        assert_eq!(
            body["leaderboard"],
            json!([{ "name": "You", "points": 15, "isCurrentUser": true }])
        );
    }

    #[rocket::async_test]
    async fn prayers_reference_list() {
        let (client, _db, _dir) = client().await;
        let res = client.get("/api/prayers").dispatch().await;
        let body: Value = res.into_json().await.unwrap();
        assert_eq!(body[0], json!({ "id": 1, "name": "Fajr" }));
        assert_eq!(body[4], json!({ "id": 5, "name": "Isha" }));
    }
}
