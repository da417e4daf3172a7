//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(handlers::health))

        // Dispatch
        .route("/api/alert/send", post(handlers::send_alert))

        // Configs
        .route("/api/alert/config/add", post(handlers::add_alert_config))
        .route("/api/alert/config/list", get(handlers::list_alert_configs))

        // Records
        .route("/api/alert/record/list", get(handlers::list_alert_records))

        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::alerting::{
        AlertDispatcher, AlertRecordStore, ChannelSender, ChannelSenders, SendError,
    };
    use crate::config::ChannelsConfig;
    use crate::db::{MemoryStore, Stores};
    use crate::error::{Error, Result};
    use crate::models::{AlertRecord, NewAlertRecord, Recipient, Role};

    struct AlwaysOk;

    #[async_trait]
    impl ChannelSender for AlwaysOk {
        fn channel_type(&self) -> &'static str {
            "ok"
        }

        async fn send(
            &self,
            _destination: &str,
            _subject: Option<&str>,
            _body: &str,
        ) -> std::result::Result<(), SendError> {
            Ok(())
        }
    }

    /// Record store whose writes always fail
    struct BrokenRecords;

    #[async_trait]
    impl AlertRecordStore for BrokenRecords {
        async fn insert_record(&self, _record: NewAlertRecord) -> Result<AlertRecord> {
            Err(Error::internal("disk full"))
        }

        async fn list_records(
            &self,
            _device_id: Option<&str>,
            _limit: i64,
        ) -> Result<Vec<AlertRecord>> {
            Ok(vec![])
        }
    }

    fn senders() -> ChannelSenders {
        ChannelSenders {
            email: Arc::new(AlwaysOk),
            chat: Arc::new(AlwaysOk),
            sms: Arc::new(AlwaysOk),
        }
    }

    fn app_with(stores: Stores) -> Router {
        let dispatcher = AlertDispatcher::new(&stores, senders(), &ChannelsConfig::default());
        create_router(AppState {
            dispatcher: Arc::new(dispatcher),
            stores,
        })
    }

    fn app() -> Router {
        let store = MemoryStore::with_recipients(vec![Recipient {
            email: Some("a@x.com".to_string()),
            phone: Some("111".to_string()),
            role: Role::Admin,
        }]);
        app_with(Stores::shared(Arc::new(store)))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_config_add_list_send_and_records() {
        let app = app();

        let (status, body) = call(
            &app,
            "POST",
            "/api/alert/config/add",
            Some(json!({
                "name": "cpu high",
                "device_id": "D1",
                "metric": "cpu_usage",
                "threshold": 90,
                "channels": ["email", "sms", "wechat"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 1);

        let (_, body) = call(&app, "GET", "/api/alert/config/list", None).await;
        assert_eq!(
            body["data"],
            json!([{
                "id": 1, "name": "cpu high", "device_id": "D1",
                "metric": "cpu_usage", "threshold": 90.0, "enabled": true
            }])
        );

        let (status, body) = call(
            &app,
            "POST",
            "/api/alert/send",
            Some(json!({
                "device_id": "D1",
                "alert_config_id": 1,
                "metric": "cpu_usage",
                "metric_value": 97.5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["results"],
            json!({ "email_a@x.com": true, "sms_111": true, "wechat": false })
        );
        assert_eq!(body["data"]["send_status"], "success");

        let (_, body) = call(&app, "GET", "/api/alert/record/list?device_id=D1", None).await;
        let records = body["data"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["alert_level"], "warning");
        assert_eq!(records[0]["metric_value"], 97.5);
        assert_eq!(records[0]["message"], "device D1 metric cpu_usage abnormal: 97.5");

        let (_, body) = call(&app, "GET", "/api/alert/record/list?device_id=D9", None).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_send_unknown_config_is_not_found() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/alert/send",
            Some(json!({
                "device_id": "D1",
                "alert_config_id": 42,
                "metric": "cpu_usage",
                "metric_value": 1
            })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_add_config_validation() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/alert/config/add",
            Some(json!({ "name": "", "device_id": "D1", "metric": "m", "threshold": 1 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_reports_results() {
        let shared = Arc::new(MemoryStore::with_recipients(vec![Recipient {
            email: Some("a@x.com".to_string()),
            phone: None,
            role: Role::Operator,
        }]));
        let stores = Stores {
            configs: shared.clone(),
            records: Arc::new(BrokenRecords),
            directory: shared,
        };
        let app = app_with(stores);

        call(
            &app,
            "POST",
            "/api/alert/config/add",
            Some(json!({
                "name": "n",
                "device_id": "D1",
                "metric": "m",
                "threshold": 1,
                "channels": ["email"]
            })),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/alert/send",
            Some(json!({
                "device_id": "D1",
                "alert_config_id": 1,
                "metric": "m",
                "metric_value": 2
            })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["data"]["results"], json!({ "email_a@x.com": true }));
    }
}
