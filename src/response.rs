//! Standard response envelope helpers: `{ "data": ..., "meta": ... }`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (status, Json(SuccessOne { data, meta: None }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_one_keeps_status_and_omits_meta() {
        let (status, Json(body)) = success_one(StatusCode::CREATED, json!({ "id": 7 }));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(serde_json::to_value(body).unwrap(), json!({ "data": { "id": 7 } }));
    }

    #[test]
    fn test_success_many_counts_rows() {
        let (status, Json(body)) = success_many(vec![1, 2, 3]);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::to_value(body).unwrap(), json!({ "data": [1, 2, 3], "meta": { "count": 3 } }));
    }
}
