//! Endpoint tests against the full router with an ephemeral store.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::routing::post;
use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};

use inv_store::TenantStore;
use openinv_api::{build_router, ApiState, AuthClient};

fn server_with_auth(auth: AuthClient) -> TestServer {
    let state = ApiState {
        store: Arc::new(TenantStore::new()),
        auth,
    };
    TestServer::new(build_router(state)).unwrap()
}

fn server() -> TestServer {
    server_with_auth(AuthClient::new(None, Duration::from_millis(500)).unwrap())
}

async fn provision(server: &TestServer, id: &str, attributes: Value) {
    let res = server
        .post("/api/internal/v1/inventory/devices")
        .json(&json!({ "id": id, "attributes": attributes }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
}

fn link_header(res: &axum_test::TestResponse) -> String {
    res.header("link").to_str().unwrap().to_string()
}

fn bearer_for_tenant(tenant: &str) -> HeaderValue {
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &json!({ "sub": "tester", "tenant_id": tenant }),
        &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

#[tokio::test]
async fn test_provision_and_get_device() {
    let server = server();

    let res = server
        .post("/api/internal/v1/inventory/devices")
        .json(&json!({
            "id": "some-device-id",
            "description": "test device",
            "attributes": [
                { "name": "sn", "value": "sn-001", "description": "serial" },
                { "name": "cores", "value": 4 }
            ]
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(
        res.header("location").to_str().unwrap(),
        "devices/some-device-id"
    );

    let res = server.get("/api/v1/devices/some-device-id").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(!res.header("etag").is_empty());

    let device: Value = res.json();
    assert_eq!(device["id"], "some-device-id");
    let attrs = device["attributes"].as_array().unwrap();
    assert_eq!(attrs.len(), 2);
    // unscoped submissions land in the inventory scope
    assert!(attrs.iter().all(|a| a["scope"] == "inventory"));
}

#[tokio::test]
async fn test_get_unknown_device_is_404() {
    let server = server();
    let res = server.get("/api/v1/devices/nope").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provision_rejects_empty_id() {
    let server = server();
    let res = server
        .post("/api/internal/v1/inventory/devices")
        .json(&json!({ "id": "", "attributes": [] }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resubmission_merges_attributes() {
    let server = server();
    provision(
        &server,
        "dev-1",
        json!([{ "name": "sn", "value": "one" }, { "name": "mac", "value": "m1" }]),
    )
    .await;
    provision(
        &server,
        "dev-1",
        json!([
            { "name": "sn", "value": "two", "description": "updated" },
            { "name": "ip", "value": "10.0.0.1" }
        ]),
    )
    .await;

    let device: Value = server.get("/api/v1/devices/dev-1").await.json();
    let attrs = device["attributes"].as_array().unwrap();
    assert_eq!(attrs.len(), 3);
    let sn = attrs.iter().find(|a| a["name"] == "sn").unwrap();
    assert_eq!(sn["value"], "two");
    assert_eq!(sn["description"], "updated");
}

#[tokio::test]
async fn test_regex_filters_over_constructed_population() {
    let server = server();

    // 9 devices matching A1: 5 infix, 3 prefix, 1 suffix
    for i in 0..5 {
        provision(
            &server,
            &format!("mid-{}", i),
            json!([{ "name": "sn", "value": format!("xxxx_A1_{:04}", i) }]),
        )
        .await;
    }
    for i in 0..3 {
        provision(
            &server,
            &format!("head-{}", i),
            json!([{ "name": "sn", "value": format!("A1_{:010}", i) }]),
        )
        .await;
    }
    provision(&server, "tail-0", json!([{ "name": "sn", "value": "yyyyyyyy_A1" }])).await;

    // 3 devices matching B1
    for i in 0..3 {
        provision(
            &server,
            &format!("b-{}", i),
            json!([{ "name": "sn", "value": format!("B1_{:010}", i) }]),
        )
        .await;
    }
    // 3 unrelated devices
    for i in 0..3 {
        provision(
            &server,
            &format!("other-{}", i),
            json!([{ "name": "sn", "value": format!("zz{:08}", i) }]),
        )
        .await;
    }

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sn", "~A1")
        .await
        .json();
    assert_eq!(devices.len(), 9);

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sn", "regex:A1")
        .await
        .json();
    assert_eq!(devices.len(), 9);

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sn", "~^A1")
        .await
        .json();
    assert_eq!(devices.len(), 3);

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sn", "~B1")
        .await
        .json();
    assert_eq!(devices.len(), 3);
}

#[tokio::test]
async fn test_anchored_regex_validation_patterns() {
    let server = server();
    provision(
        &server,
        "d1",
        json!([
            { "name": "mac", "value": "de:ad:be:ef:00:01" },
            { "name": "ip", "value": "192.0.0.1" }
        ]),
    )
    .await;
    provision(
        &server,
        "d2",
        json!([
            { "name": "mac", "value": "not really a mac" },
            { "name": "ip", "value": "invalid" }
        ]),
    )
    .await;

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("mac", r"~^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$")
        .await
        .json();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["id"], "d1");

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param(
            "ip",
            r"~^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
        )
        .await
        .json();
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn test_numeric_equality_filter() {
    let server = server();
    provision(&server, "d1", json!([{ "name": "users_logged_in", "value": 100 }])).await;
    provision(&server, "d2", json!([{ "name": "users_logged_in", "value": 523 }])).await;

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("users_logged_in", "100")
        .await
        .json();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["id"], "d1");
}

#[tokio::test]
async fn test_invalid_filter_regex_is_400() {
    let server = server();
    let res = server
        .get("/api/v1/devices")
        .add_query_param("sn", "~[")
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

fn sorted_numbers(devices: &[Value]) -> Vec<f64> {
    devices
        .iter()
        .filter_map(|d| {
            d["attributes"]
                .as_array()
                .unwrap()
                .iter()
                .find(|a| a["name"] == "number")
                .and_then(|a| a["value"].as_f64())
        })
        .collect()
}

#[tokio::test]
async fn test_sorting_by_numeric_attribute() {
    let server = server();

    for i in 0..20 {
        provision(
            &server,
            &format!("plain-{:02}", i),
            json!([{ "name": "sn", "value": format!("sn{:02}", i) }]),
        )
        .await;
    }
    for n in [100, 1000, 1, 999] {
        provision(
            &server,
            &format!("numbered-{}", n),
            json!([{ "name": "number", "value": n }]),
        )
        .await;
    }

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sort", "number:asc")
        .add_query_param("per_page", "100")
        .await
        .json();
    assert_eq!(devices.len(), 24);
    assert_eq!(sorted_numbers(&devices), vec![1.0, 100.0, 999.0, 1000.0]);

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("sort", "number:desc")
        .add_query_param("per_page", "100")
        .await
        .json();
    assert_eq!(sorted_numbers(&devices), vec![1000.0, 999.0, 100.0, 1.0]);
}

#[tokio::test]
async fn test_pagination_links_and_total_count() {
    let server = server();
    for i in 0..25 {
        provision(&server, &format!("dev-{:02}", i), json!([])).await;
    }

    let res = server
        .get("/api/v1/devices")
        .add_query_param("page", "1")
        .add_query_param("per_page", "10")
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("x-total-count").to_str().unwrap(), "25");

    let devices: Vec<Value> = res.json();
    assert_eq!(devices.len(), 10);

    let links = link_header(&res);
    let next = links
        .split(", ")
        .find(|l| l.contains("rel=\"next\""))
        .expect("next link on a non-final page");
    assert!(next.contains("page=2"));
    assert!(next.contains("per_page=10"));

    let res = server
        .get("/api/v1/devices")
        .add_query_param("page", "3")
        .add_query_param("per_page", "10")
        .await;
    let devices: Vec<Value> = res.json();
    assert_eq!(devices.len(), 5);
    assert!(!link_header(&res).contains("rel=\"next\""));
}

#[tokio::test]
async fn test_group_membership_is_exclusive() {
    let server = server();
    provision(&server, "dev-1", json!([])).await;

    let res = server
        .put("/api/v1/devices/dev-1/group")
        .json(&json!({ "group": "groupA" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

    let groups: Vec<String> = server.get("/api/v1/groups").await.json();
    assert_eq!(groups, vec!["groupA"]);

    // moving to groupB leaves groupA empty, and empty groups do not exist
    let res = server
        .put("/api/v1/devices/dev-1/group")
        .json(&json!({ "group": "groupB" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

    let a_members: Vec<String> = server.get("/api/v1/groups/groupA/devices").await.json();
    let b_members: Vec<String> = server.get("/api/v1/groups/groupB/devices").await.json();
    assert_eq!(a_members.len(), 0);
    assert_eq!(b_members, vec!["dev-1"]);

    let groups: Vec<String> = server.get("/api/v1/groups").await.json();
    assert_eq!(groups, vec!["groupB"]);

    let devices: Vec<Value> = server
        .get("/api/v1/devices")
        .add_query_param("has_group", "true")
        .await
        .json();
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn test_unassign_wrong_group_is_404_and_keeps_membership() {
    let server = server();
    provision(&server, "dev-1", json!([])).await;
    server
        .put("/api/v1/devices/dev-1/group")
        .json(&json!({ "group": "groupA" }))
        .await;

    let res = server.delete("/api/v1/devices/dev-1/group/groupB").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let group: Value = server.get("/api/v1/devices/dev-1/group").await.json();
    assert_eq!(group["group"], "groupA");

    let res = server.delete("/api/v1/devices/dev-1/group/groupA").await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

    let group: Value = server.get("/api/v1/devices/dev-1/group").await.json();
    assert_eq!(group["group"], Value::Null);
}

#[tokio::test]
async fn test_group_name_charset_is_enforced() {
    let server = server();
    provision(&server, "dev-1", json!([])).await;

    let res = server
        .put("/api/v1/devices/dev-1/group")
        .json(&json!({ "group": "no spaces allowed" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tag_update_cycles_etag() {
    let server = server();
    provision(&server, "dev-1", json!([{ "name": "sn", "value": "x" }])).await;

    let res = server
        .patch("/api/v1/devices/dev-1/tags")
        .json(&json!([{ "name": "n_1", "value": "v_1", "description": "desc_1" }]))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let etag_one = res.header("etag").to_str().unwrap().to_string();

    // the device endpoint reports the same revision
    let res = server.get("/api/v1/devices/dev-1").await;
    assert_eq!(res.header("etag").to_str().unwrap(), etag_one);

    // replace with the current revision succeeds and yields a new one
    let res = server
        .put("/api/v1/devices/dev-1/tags")
        .add_header(
            header::IF_MATCH,
            HeaderValue::from_str(&etag_one).unwrap(),
        )
        .json(&json!([{ "name": "n_1", "value": "v_2" }]))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let etag_two = res.header("etag").to_str().unwrap().to_string();
    assert_ne!(etag_one, etag_two);

    let device: Value = server.get("/api/v1/devices/dev-1").await.json();
    let tags: Vec<&Value> = device["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["scope"] == "tags")
        .collect();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["value"], "v_2");
}

#[tokio::test]
async fn test_stale_if_match_is_412_and_changes_nothing() {
    let server = server();
    provision(&server, "dev-1", json!([])).await;

    let res = server
        .patch("/api/v1/devices/dev-1/tags")
        .json(&json!([{ "name": "n_5", "value": "v_5" }]))
        .await;
    let current = res.header("etag").to_str().unwrap().to_string();

    let res = server
        .patch("/api/v1/devices/dev-1/tags")
        .add_header(
            header::IF_MATCH,
            HeaderValue::from_static("241496e0-cbbb-4a83-90e9-70b4dd0e645a"),
        )
        .json(&json!([{ "name": "n_5", "value": "overwritten" }]))
        .await;
    assert_eq!(res.status_code(), StatusCode::PRECONDITION_FAILED);

    let res = server.get("/api/v1/devices/dev-1").await;
    assert_eq!(res.header("etag").to_str().unwrap(), current);
    let device: Value = res.json();
    let tag = device["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "n_5")
        .unwrap()
        .clone();
    assert_eq!(tag["value"], "v_5");
}

#[tokio::test]
async fn test_replacing_forty_tags_keeps_first_twenty() {
    let server = server();
    provision(&server, "dev-1", json!([])).await;

    let tags: Vec<Value> = (0..40)
        .map(|i| json!({ "name": format!("t{:02}", i), "value": "v" }))
        .collect();
    let res = server.put("/api/v1/devices/dev-1/tags").json(&tags).await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let device: Value = server.get("/api/v1/devices/dev-1").await.json();
    let stored: Vec<String> = device["attributes"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["scope"] == "tags")
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(stored.len(), 20);
    let expected: Vec<String> = (0..20).map(|i| format!("t{:02}", i)).collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_tags_update_on_unknown_device_is_404() {
    let server = server();
    let res = server
        .patch("/api/v1/devices/ghost/tags")
        .json(&json!([{ "name": "a", "value": "1" }]))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tenant_create_is_idempotent_and_rejects_empty() {
    let server = server();

    let res = server
        .post("/api/internal/v1/inventory/tenants")
        .json(&json!({ "tenant_id": "foobar" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .post("/api/internal/v1/inventory/tenants")
        .json(&json!({ "tenant_id": "foobar" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = server
        .post("/api/internal/v1/inventory/tenants")
        .json(&json!({ "tenant_id": "" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tenant_namespaces_are_isolated() {
    let server = server();

    server
        .post("/api/internal/v1/inventory/tenants")
        .json(&json!({ "tenant_id": "acme" }))
        .await;
    let res = server
        .post("/api/internal/v1/inventory/devices")
        .add_query_param("tenant_id", "acme")
        .json(&json!({ "id": "acme-dev", "attributes": [] }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    // visible inside the tenant
    let res = server
        .get("/api/v1/devices/acme-dev")
        .add_header(header::AUTHORIZATION, bearer_for_tenant("acme"))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    // invisible from the default namespace and from another tenant
    let res = server.get("/api/v1/devices/acme-dev").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let res = server
        .get("/api/v1/devices/acme-dev")
        .add_header(header::AUTHORIZATION, bearer_for_tenant("globex"))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/verify", addr)
}

#[tokio::test]
async fn test_auth_verify_mirrors_upstream_decision() {
    let accept = spawn_upstream(Router::new().route(
        "/verify",
        post(|| async { StatusCode::OK }),
    ))
    .await;
    let server =
        server_with_auth(AuthClient::new(Some(accept), Duration::from_millis(500)).unwrap());
    let res = server
        .post("/api/internal/v1/inventory/auth/verify")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer some-token"),
        )
        .add_header(
            HeaderName::from_static("x-original-uri"),
            HeaderValue::from_static("/api/v1/devices"),
        )
        .add_header(
            HeaderName::from_static("x-original-method"),
            HeaderValue::from_static("GET"),
        )
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);

    let reject = spawn_upstream(Router::new().route(
        "/verify",
        post(|| async { StatusCode::FORBIDDEN }),
    ))
    .await;
    let server =
        server_with_auth(AuthClient::new(Some(reject), Duration::from_millis(500)).unwrap());
    let res = server
        .post("/api/internal/v1/inventory/auth/verify")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer some-token"),
        )
        .await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_auth_verify_times_out_as_bad_gateway() {
    let slow = spawn_upstream(Router::new().route(
        "/verify",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }),
    ))
    .await;
    let server =
        server_with_auth(AuthClient::new(Some(slow), Duration::from_millis(200)).unwrap());

    let res = server
        .post("/api/internal/v1/inventory/auth/verify")
        .add_header(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer some-token"),
        )
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_auth_verify_requires_authorization_header() {
    let server = server();
    let res = server.post("/api/internal/v1/inventory/auth/verify").await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
}
