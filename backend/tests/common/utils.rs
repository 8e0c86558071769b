use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Fixed timestamp `minutes` after a reference point, for ordering tests
pub fn minutes_after_epoch(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}
