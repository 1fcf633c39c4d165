//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试（wire 格式）
//! - 端到端测试：配置 → 组装 relay → ingestion → httpmock destination
//! - 管理 API 与 ingestion 的联动

#[cfg(test)]
mod contract_tests {
    use contracts::{DispatchSummary, InboundPayload, StatusPolicy};
    use serde_json::json;

    #[test]
    fn test_summary_wire_names() {
        let summary = DispatchSummary {
            total: 2,
            successful: 1,
            failed: 1,
        };
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            json!({"totalDestinations": 2, "successful": 1, "failed": 1})
        );
    }

    #[test]
    fn test_status_policy_config_names() {
        assert_eq!(
            serde_json::to_value(StatusPolicy::AnyResponse).unwrap(),
            json!("any_response")
        );
        assert_eq!(
            serde_json::from_value::<StatusPolicy>(json!("success_only")).unwrap(),
            StatusPolicy::SuccessOnly
        );
    }

    #[test]
    fn test_payload_must_be_object() {
        assert!(InboundPayload::from_slice(br#"{"x":1}"#).is_ok());
        assert!(InboundPayload::from_slice(b"[1]").is_err());
        assert!(InboundPayload::from_slice(b"\"x\"").is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::{Duration, Instant};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::RelayBlueprint;
    use fanout_relay_cli::{build_app, RelayApp};
    use httpmock::{Method, MockServer};
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    const INGEST: &str = "/server/incoming_data";

    /// A1/T1 owns d1 (GET) and d2 (POST), A2/T2 owns nothing
    fn scenario_config(server: &MockServer, timeout_ms: u64) -> RelayBlueprint {
        let toml = format!(
            r#"
[dispatch]
timeout_ms = {timeout_ms}

[[accounts]]
account_id = "A1"
email = "a1@example.com"
account_name = "Account One"
app_secret_token = "T1"

[[accounts]]
account_id = "A2"
email = "a2@example.com"
account_name = "Account Two"
app_secret_token = "T2"

[[destinations]]
account_id = "A1"
url = "{d1}"
http_method = "GET"
headers = {{ "X-Api-Key" = "k1" }}

[[destinations]]
account_id = "A1"
url = "{d2}"
http_method = "POST"
"#,
            d1 = server.url("/d1"),
            d2 = server.url("/d2"),
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    fn app(blueprint: &RelayBlueprint) -> RelayApp {
        build_app(blueprint).unwrap()
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("cl-x-token", token);
        }
        let body = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// End-to-end: T1 → A1 → [GET d1, POST d2]
    ///
    /// 验证：
    /// 1. GET destination 收到 query string，携带配置的 header
    /// 2. POST destination 收到原样的 JSON body
    /// 3. 调用方收到 {2, 2, 0}
    #[tokio::test]
    async fn test_fan_out_scenario() {
        let server = MockServer::start_async().await;
        let d1 = server
            .mock_async(|when, then| {
                when.method(Method::GET)
                    .path("/d1")
                    .query_param("x", "1")
                    .header("x-api-key", "k1");
                then.status(200);
            })
            .await;
        let d2 = server
            .mock_async(|when, then| {
                when.method(Method::POST)
                    .path("/d2")
                    .header("content-type", "application/json")
                    .json_body(json!({"x": 1}));
                then.status(201);
            })
            .await;

        let app = app(&scenario_config(&server, 5_000));
        let (status, body) = call(&app.router, "POST", INGEST, Some("T1"), Some(json!({"x": 1}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Data processed successfully",
                "accountId": "A1",
                "stats": {"totalDestinations": 2, "successful": 2, "failed": 0}
            })
        );
        d1.assert_async().await;
        d2.assert_async().await;

        let snapshot = app.metrics.snapshot();
        assert_eq!(snapshot.waves, 1);
        assert_eq!(snapshot.completed, 2);
    }

    #[tokio::test]
    async fn test_unknown_token_sends_nothing() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let app = app(&scenario_config(&server, 5_000));

        for token in [Some("t1"), Some("T1 "), Some("nope"), None] {
            let (status, body) =
                call(&app.router, "POST", INGEST, token, Some(json!({"x": 1}))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({"message": "Unauthenticated"}));
        }

        assert_eq!(any.hits_async().await, 0);
        assert_eq!(app.metrics.snapshot().waves, 0);
    }

    #[tokio::test]
    async fn test_no_destinations() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let app = app(&scenario_config(&server, 5_000));
        let (status, body) = call(&app.router, "POST", INGEST, Some("T2"), Some(json!({"x": 1}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Data received successfully, but no destinations found for this account",
                "accountId": "A2"
            })
        );
        assert_eq!(any.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_slow_destination_is_a_partial_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(Method::GET).path("/d1");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(Method::POST).path("/d2");
                then.status(200).delay(Duration::from_secs(3));
            })
            .await;

        let app = app(&scenario_config(&server, 200));
        let started = Instant::now();
        let (status, body) = call(&app.router, "POST", INGEST, Some("T1"), Some(json!({"x": 1}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["stats"],
            json!({"totalDestinations": 2, "successful": 1, "failed": 1})
        );
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(app.metrics.snapshot().timeouts, 1);
    }

    #[tokio::test]
    async fn test_error_status_counts_per_policy() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.any_request();
                then.status(500);
            })
            .await;

        let mut blueprint = scenario_config(&server, 5_000);
        let app_any = app(&blueprint);
        let (_, body) = call(&app_any.router, "POST", INGEST, Some("T1"), Some(json!({}))).await;
        assert_eq!(body["stats"]["successful"], 2);

        blueprint.dispatch.status_policy = contracts::StatusPolicy::SuccessOnly;
        let app_strict = app(&blueprint);
        let (_, body) = call(&app_strict.router, "POST", INGEST, Some("T1"), Some(json!({}))).await;
        assert_eq!(body["stats"]["successful"], 0);
        assert_eq!(body["stats"]["failed"], 2);
    }

    /// 管理 API 创建的 account / destination 立即参与 ingestion；
    /// 删除 account 后 token 失效。
    #[tokio::test]
    async fn test_management_api_drives_ingestion() {
        let server = MockServer::start_async().await;
        let hook = server
            .mock_async(|when, then| {
                when.method(Method::PUT)
                    .path("/hook")
                    .header("x-tenant", "acme")
                    .json_body(json!({"temp": 21.5, "ok": true}));
                then.status(204);
            })
            .await;

        let app = app(&RelayBlueprint::default());

        let (status, body) = call(
            &app.router,
            "POST",
            "/api/accounts",
            None,
            Some(json!({"email": "acme@example.com", "accountName": "Acme"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let account_id = body["account"]["accountId"].as_str().unwrap().to_string();
        let token = body["account"]["appSecretToken"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app.router,
            "POST",
            "/api/destinations",
            None,
            Some(json!({
                "url": server.url("/hook"),
                "httpMethod": "PUT",
                "headers": {"X-Tenant": "acme"},
                "accountId": account_id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let payload = json!({"temp": 21.5, "ok": true});
        let (status, body) =
            call(&app.router, "POST", INGEST, Some(&token), Some(payload.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accountId"], account_id.as_str());
        assert_eq!(
            body["stats"],
            json!({"totalDestinations": 1, "successful": 1, "failed": 0})
        );
        hook.assert_async().await;

        let (status, _) = call(
            &app.router,
            "DELETE",
            &format!("/api/accounts/{account_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.directory.counts().await, (0, 0));

        let (status, _) = call(&app.router, "POST", INGEST, Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(hook.hits_async().await, 1);
    }

    /// 通过真实 TCP listener 与 reqwest 客户端走一遍完整链路
    #[tokio::test]
    async fn test_served_over_tcp() {
        let upstream = MockServer::start_async().await;
        let d1 = upstream
            .mock_async(|when, then| {
                when.method(Method::GET).path("/d1").query_param("x", "1");
                then.status(200);
            })
            .await;
        let d2 = upstream
            .mock_async(|when, then| {
                when.method(Method::POST).path("/d2").json_body(json!({"x": 1}));
                then.status(200);
            })
            .await;

        let app = app(&scenario_config(&upstream, 5_000));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app.router).await.unwrap();
        });

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{addr}{INGEST}"))
            .header("cl-x-token", "T1")
            .json(&json!({"x": 1}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["stats"]["successful"], 2);
        d1.assert_async().await;
        d2.assert_async().await;

        let welcome: Value = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(welcome["message"], "Welcome to Data Pusher API");

        server.abort();
    }
}
