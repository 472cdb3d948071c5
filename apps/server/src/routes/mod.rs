mod health;
mod monitors;
mod settings;
mod telemetry;

macros_utils::routes! {
    mount health,
    mount monitors,
    mount settings,
    mount telemetry,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use async_trait::async_trait;
    use echowatch_service::config::Config;
    use echowatch_service::monitoring::{ProbeFailure, Prober};
    use echowatch_service::telemetry::HubMessage;
    use echowatch_service::ServiceContext;
    use serde_json::{Value, json};

    struct AlwaysUp;

    #[async_trait]
    impl Prober for AlwaysUp {
        async fn probe(&self, _: &str, _: usize, _: Duration) -> Result<Duration, ProbeFailure> {
            Ok(Duration::from_millis(1))
        }
    }

    async fn context(dir: &tempfile::TempDir) -> ServiceContext {
        let mut config = Config::default();
        config.database.path = dir.path().join("server.db");
        ServiceContext::build(&config, Arc::new(AlwaysUp)).await.unwrap()
    }

    #[actix_web::test]
    async fn test_monitor_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir).await;
        let mut events = context.hub.register();
        let app = test::init_service(
            App::new().app_data(web::Data::new(context.clone())).configure(super::routes),
        )
        .await;

        for address in ["zulu.lan", "alpha.lan"] {
            let req = test::TestRequest::post()
                .uri("/api/monitors")
                .set_json(json!({ "address": address, "label": "lab" }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
        assert!(matches!(events.try_recv().as_deref(), Some(HubMessage::MonitorsChanged)));

        let req = test::TestRequest::get().uri("/api/monitors?sort=address&direction=desc").to_request();
        let listed: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        let addresses: Vec<&str> = listed.iter().map(|m| m["address"].as_str().unwrap()).collect();
        assert_eq!(addresses, vec!["zulu.lan", "alpha.lan"]);
        assert_eq!(listed[0]["last_status"], "unknown");

        let id = listed[0]["id"].as_str().unwrap().to_string();
        let req = test::TestRequest::delete().uri(&format!("/api/monitors/{id}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete().uri(&format!("/api/monitors/{id}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_bad_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir).await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(context)).configure(super::routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/monitors?sort=password").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/monitors")
            .set_json(json!({ "address": "has space" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_settings_replace() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir).await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(context)).configure(super::routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/settings").to_request();
        let current: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(current["pingIntervalSec"], 30);

        let replacement = json!({
            "pingIntervalSec": 15,
            "icmpPayloadSize": 64,
            "pingTimeoutSec": 3,
            "autoRefreshSec": 5,
        });
        let req = test::TestRequest::put().uri("/api/settings").set_json(&replacement).to_request();
        let stored: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stored, replacement);

        let invalid = json!({
            "pingIntervalSec": 0,
            "icmpPayloadSize": 64,
            "pingTimeoutSec": 3,
            "autoRefreshSec": 5,
        });
        let req = test::TestRequest::put().uri("/api/settings").set_json(&invalid).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/settings").to_request();
        let current: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(current["pingIntervalSec"], 15);
    }

    #[actix_web::test]
    async fn test_health_reports_engine_state() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(&dir).await;
        let app = test::init_service(
            App::new().app_data(web::Data::new(context)).configure(super::routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/").to_request();
        let health: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["engineRunning"], false);
    }
}
