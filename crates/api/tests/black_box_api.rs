use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use storefront_infra::AppConfig;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory store), bound to an ephemeral port.
        let app = storefront_api::app::build_app(&AppConfig::default())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
struct As {
    user_id: String,
    role: &'static str,
}

impl As {
    fn admin() -> Self {
        Self {
            user_id: Uuid::now_v7().to_string(),
            role: "admin",
        }
    }

    fn customer() -> Self {
        Self {
            user_id: Uuid::now_v7().to_string(),
            role: "customer",
        }
    }

    fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("x-user-id", &self.user_id).header("x-user-role", self.role)
    }
}

async fn send(who: &As, req: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let res = who.apply(req).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn create_product(srv: &TestServer, admin: &As, sku: &str, stock: i64) -> String {
    let (status, body) = send(
        admin,
        srv.client.post(srv.url("/products")).json(&json!({
            "sku": sku,
            "name": format!("Product {sku}"),
            "price": 1500,
            "stock": stock,
            "stock_min": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body={body}");
    body["product"]["id"].as_str().unwrap().to_string()
}

fn order_body(product_id: &str, quantity: i64) -> Value {
    json!({
        "order_type": "online",
        "delivery_option": "pickup",
        "customer": { "name": "Lucia", "email": "lucia@example.com" },
        "items": [{ "product_id": product_id, "quantity": quantity }],
    })
}

async fn place_order(srv: &TestServer, who: &As, product_id: &str, quantity: i64) -> (StatusCode, Value) {
    send(who, srv.client.post(srv.url("/orders")).json(&order_body(product_id, quantity))).await
}

async fn stock(srv: &TestServer, who: &As, product_id: &str) -> Value {
    let (status, body) = send(who, srv.client.get(srv.url(&format!("/products/{product_id}/stock")))).await;
    assert_eq!(status, StatusCode::OK);
    body["stock"].clone()
}

#[tokio::test]
async fn health_needs_no_identity() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthenticated");

    let admin = As::admin();
    let (status, body) = send(&admin, srv.client.get(srv.url("/whoami"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"].as_str().unwrap(), admin.user_id);
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn customers_cannot_manage_the_catalog() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();
    let customer = As::customer();
    let product_id = create_product(&srv, &admin, "MUG", 10).await;

    let (status, body) = send(
        &customer,
        srv.client
            .post(srv.url(&format!("/products/{product_id}/adjustments")))
            .json(&json!({ "type": "entrada", "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &customer,
        srv.client.post(srv.url("/products")).json(&json!({ "sku": "X", "name": "X", "price": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn reservation_scenario_over_http() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();
    let customer = As::customer();
    let product_id = create_product(&srv, &admin, "MUG", 10).await;

    let (status, body) = send(
        &customer,
        srv.client
            .post(srv.url("/inventory/availability"))
            .json(&json!({ "items": [{ "product_id": product_id, "quantity": 5 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], true);

    let (status, first) = place_order(&srv, &customer, &product_id, 5).await;
    assert_eq!(status, StatusCode::CREATED, "body={first}");
    assert_eq!(first["order"]["status"], "pending");
    assert_eq!(stock(&srv, &customer, &product_id).await["available"], 5);

    let (status, body) = place_order(&srv, &customer, &product_id, 6).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["available"], 5);

    let first_id = first["order"]["id"].as_str().unwrap();
    let (status, body) = send(
        &customer,
        srv.client.post(srv.url(&format!("/orders/{first_id}/cancel"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "cancelled");
    assert_eq!(stock(&srv, &customer, &product_id).await["available"], 10);

    let (status, _) = place_order(&srv, &customer, &product_id, 6).await;
    assert_eq!(status, StatusCode::CREATED);
    let level = stock(&srv, &customer, &product_id).await;
    assert_eq!(level["reserved"], 6);
    assert_eq!(level["available"], 4);
}

#[tokio::test]
async fn completed_orders_cannot_be_cancelled() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();
    let customer = As::customer();
    let product_id = create_product(&srv, &admin, "MUG", 10).await;

    let (_, order) = place_order(&srv, &customer, &product_id, 3).await;
    let id = order["order"]["id"].as_str().unwrap();

    let (status, body) = send(&admin, srv.client.post(srv.url(&format!("/orders/{id}/complete")))).await;
    assert_eq!(status, StatusCode::OK, "body={body}");
    assert_eq!(body["order"]["status"], "completed");

    let (status, body) = send(&admin, srv.client.post(srv.url(&format!("/orders/{id}/cancel")))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_transition");
    assert!(body["message"].as_str().unwrap().contains("completed"));

    let level = stock(&srv, &admin, &product_id).await;
    assert_eq!(level["stock"], 7);
    assert_eq!(level["reserved"], 0);

    let (status, body) = send(
        &admin,
        srv.client.get(srv.url(&format!("/products/{product_id}/movements"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movement_type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["reserva", "venta"]);
}

#[tokio::test]
async fn delete_and_restore_round_trip() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();
    let customer = As::customer();
    let product_id = create_product(&srv, &admin, "MUG", 10).await;
    let (_, order) = place_order(&srv, &customer, &product_id, 4).await;
    let id = order["order"]["id"].as_str().unwrap();

    let (status, _) = send(&admin, srv.client.delete(srv.url(&format!("/orders/{id}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock(&srv, &admin, &product_id).await["reserved"], 0);

    let (status, _) = send(&admin, srv.client.get(srv.url(&format!("/orders/{id}")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(
        &admin,
        srv.client.get(srv.url(&format!("/orders/{id}?include_deleted=true"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["order"]["deleted_at"].is_null());

    let (status, body) = send(&admin, srv.client.post(srv.url(&format!("/orders/{id}/restore")))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["order"]["deleted_at"].is_null());
    assert_eq!(stock(&srv, &admin, &product_id).await["reserved"], 4);
}

#[tokio::test]
async fn customers_only_list_their_own_orders() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();
    let alice = As::customer();
    let bob = As::customer();
    let product_id = create_product(&srv, &admin, "MUG", 10).await;

    let (_, order) = place_order(&srv, &alice, &product_id, 1).await;
    place_order(&srv, &bob, &product_id, 1).await;
    let alice_order = order["order"]["id"].as_str().unwrap();

    let (_, body) = send(&alice, srv.client.get(srv.url("/orders"))).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = send(&admin, srv.client.get(srv.url("/orders?status=pending"))).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, _) = send(&bob, srv.client.get(srv.url(&format!("/orders/{alice_order}")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let admin = As::admin();

    let (status, body) = send(&admin, srv.client.get(srv.url("/orders/not-a-uuid"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = send(&admin, srv.client.get(srv.url("/orders?status=shipped"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let product_id = create_product(&srv, &admin, "MUG", 10).await;
    let (status, _) = place_order(&srv, &admin, &product_id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
