use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope. Errors use the same shape through `AppError`.
pub fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({
        "code": 200,
        "message": "success",
        "data": data,
        "timestamp": Utc::now().timestamp_millis(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: i64,
    pub current: i64,
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let Json(body) = ok(json!({ "id": 1 }));
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "success");
        assert_eq!(body["data"]["id"], 1);
        assert!(body["timestamp"].is_i64());
    }

    #[test]
    fn page_serializes_records() {
        let page = Page {
            records: vec![1, 2, 3],
            total: 3,
            current: 1,
            size: 10,
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["total"], 3);
        assert_eq!(value["records"].as_array().unwrap().len(), 3);
    }
}
