//! In-memory mock of the commerce API
//!
//! A minimal stand-in for the service under test, used by the integration
//! tests and the `mock_store` binary. State lives behind a mutex for the
//! lifetime of the server; nothing persists. Responses are compact JSON,
//! matching the wire format the text-scan extractor was written against.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::common::{Error, Result};

/// Handle to a running mock store
///
/// Dropping the handle shuts the server down.
pub struct MockStore {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockStore {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockStore {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Bind and serve the mock store; port 0 picks an ephemeral port
pub async fn start(addr: SocketAddr) -> Result<MockStore> {
    let state = Arc::new(Mutex::new(StoreState::seeded()));

    let make_service = make_service_fn(move |_| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(state.clone(), req)))
        }
    });

    let server = Server::try_bind(&addr)
        .map_err(|e| Error::MockStore(e.to_string()))?
        .serve(make_service);
    let addr = server.local_addr();

    let (tx, rx) = oneshot::channel::<()>();
    let graceful = server.with_graceful_shutdown(async {
        rx.await.ok();
    });

    tokio::spawn(async move {
        if let Err(e) = graceful.await {
            error!(error = %e, "mock store server error");
        }
    });

    Ok(MockStore {
        addr,
        shutdown: Some(tx),
    })
}

#[derive(Debug, Clone)]
struct Product {
    id: u64,
    sku: Option<String>,
    name: String,
    slug: String,
    description: Option<String>,
    price: f64,
    quantity: i64,
}

#[derive(Debug, Clone)]
struct User {
    id: u64,
    username: String,
    email: Option<String>,
}

#[derive(Debug, Clone)]
struct CartItem {
    id: u64,
    product_id: u64,
    quantity: i64,
    price: f64,
}

#[derive(Debug, Clone)]
struct OrderItem {
    product_id: u64,
    quantity: i64,
    price: f64,
}

#[derive(Debug, Clone)]
struct Order {
    id: u64,
    user_id: u64,
    status: String,
    items: Vec<OrderItem>,
}

impl Order {
    fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.price * i.quantity as f64)
            .sum()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    products: Vec<Product>,
    users: Vec<User>,
    orders: Vec<Order>,
    carts: HashMap<u64, Vec<CartItem>>,
    next_product_id: u64,
    next_user_id: u64,
    next_order_id: u64,
    next_cart_item_id: u64,
}

impl StoreState {
    /// Two catalog products exist up front, like a freshly provisioned
    /// store; scripts reference product ids 1 and 2 directly.
    fn seeded() -> Self {
        Self {
            products: vec![
                Product {
                    id: 1,
                    sku: Some("ONION-Y-001".to_string()),
                    name: "Yellow Onion".to_string(),
                    slug: "yellow-onion".to_string(),
                    description: Some("Fresh yellow onion, locally grown".to_string()),
                    price: 1.99,
                    quantity: 100,
                },
                Product {
                    id: 2,
                    sku: Some("ONION-R-001".to_string()),
                    name: "Red Onion".to_string(),
                    slug: "red-onion".to_string(),
                    description: Some("Sweet red onion, perfect for salads".to_string()),
                    price: 2.49,
                    quantity: 75,
                },
            ],
            next_product_id: 3,
            next_user_id: 1,
            next_order_id: 1,
            next_cart_item_id: 1,
            ..Self::default()
        }
    }

    fn product(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn unique_slug(&self, name: &str) -> String {
        let base = slugify(name);
        if !self.products.iter().any(|p| p.slug == base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.products.iter().any(|p| p.slug == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Deserialize)]
struct NewProduct {
    sku: Option<String>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: f64,
    quantity: i64,
}

#[derive(Deserialize)]
struct NewUser {
    username: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct AddCartItem {
    #[serde(rename = "productId")]
    product_id: u64,
    quantity: i64,
}

#[derive(Deserialize)]
struct NewOrder {
    username: String,
    items: Vec<NewOrderItem>,
}

#[derive(Deserialize)]
struct NewOrderItem {
    #[serde(rename = "productId")]
    product_id: u64,
    quantity: i64,
}

#[derive(Deserialize)]
struct PaymentRequest {
    #[serde(rename = "orderId")]
    order_id: u64,
}

async fn handle(
    state: Arc<Mutex<StoreState>>,
    req: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(_) => return Ok(text(StatusCode::BAD_REQUEST, "unreadable body")),
    };
    let body = String::from_utf8_lossy(&bytes).to_string();

    debug!(%method, %path, "mock store request");

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut state = state.lock().expect("mock store state poisoned");

    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["greet"]) => text(StatusCode::OK, "Hello, World!"),
        (&Method::GET, ["greet", name]) => text(StatusCode::OK, &format!("Hello, {name}!")),

        (&Method::GET, ["products"]) => {
            let list: Vec<Value> = state.products.iter().map(product_json).collect();
            ok_json(Value::Array(list))
        }
        (&Method::POST, ["products"]) => create_product(&mut state, &body),
        (&Method::GET, ["products", id]) => match id.parse().ok().and_then(|id| state.product(id)) {
            Some(product) => ok_json(product_json(product)),
            None => not_found("Product not found"),
        },

        (&Method::POST, ["users"]) => create_user(&mut state, &body),
        (&Method::GET, ["users", id]) => {
            match id.parse::<u64>().ok().and_then(|id| state.users.iter().find(|u| u.id == id)) {
                Some(user) => ok_json(user_json(user)),
                None => not_found("User not found"),
            }
        }

        (&Method::GET, ["users", user_id, "cart"]) => match user_id.parse::<u64>() {
            Ok(user_id) => ok_json(cart_json(&state, user_id)),
            Err(_) => not_found("User not found"),
        },
        (&Method::POST, ["users", user_id, "cart", "items"]) => match user_id.parse() {
            Ok(user_id) => add_cart_item(&mut state, user_id, &body),
            Err(_) => not_found("User not found"),
        },
        (&Method::DELETE, ["users", user_id, "cart"]) => match user_id.parse::<u64>() {
            Ok(user_id) => {
                state.carts.remove(&user_id);
                ok_json(cart_json(&state, user_id))
            }
            Err(_) => not_found("User not found"),
        },
        (&Method::POST, ["users", user_id, "cart", "checkout"]) => match user_id.parse() {
            Ok(user_id) => checkout_cart(&mut state, user_id),
            Err(_) => not_found("User not found"),
        },

        (&Method::POST, ["orders"]) => create_order(&mut state, &body),
        (&Method::GET, ["orders", id]) => {
            match id.parse::<u64>().ok().and_then(|id| state.orders.iter().find(|o| o.id == id)) {
                Some(order) => ok_json(order_json(order)),
                None => not_found("Order not found"),
            }
        }

        (&Method::POST, ["api", "payments", "create-intent"]) => {
            create_payment_intent(&state, &body)
        }
        (&Method::POST, ["api", "payments", "create-checkout"]) => {
            create_checkout_session(&state, &body)
        }
        (&Method::POST, ["api", "payments", "webhook"]) => handle_webhook(&mut state, &body),

        _ => not_found("Not Found"),
    };

    Ok(response)
}

fn create_product(state: &mut StoreState, body: &str) -> Response<Body> {
    let new: NewProduct = match serde_json::from_str(body) {
        Ok(new) => new,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid product: {e}")),
    };

    if let Some(sku) = &new.sku {
        if state.products.iter().any(|p| p.sku.as_deref() == Some(sku.as_str())) {
            return problem(
                StatusCode::CONFLICT,
                "Product Already Exists",
                "A product with the same SKU already exists.",
                "https://example.com/errors/product-already-exists",
            );
        }
    }

    let product = Product {
        id: state.next_product_id,
        slug: state.unique_slug(&new.name),
        sku: new.sku,
        name: new.name,
        description: new.description,
        price: new.price,
        quantity: new.quantity,
    };
    state.next_product_id += 1;

    let response = json_response(StatusCode::CREATED, product_json(&product));
    state.products.push(product);
    response
}

fn create_user(state: &mut StoreState, body: &str) -> Response<Body> {
    let new: NewUser = match serde_json::from_str(body) {
        Ok(new) => new,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid user: {e}")),
    };

    if state.users.iter().any(|u| u.username == new.username) {
        return problem(
            StatusCode::CONFLICT,
            "User Already Exists",
            "A user with the same username already exists.",
            "https://example.com/errors/user-already-exists",
        );
    }

    let user = User {
        id: state.next_user_id,
        username: new.username,
        email: new.email,
    };
    state.next_user_id += 1;

    let response = json_response(StatusCode::CREATED, user_json(&user));
    state.users.push(user);
    response
}

fn add_cart_item(state: &mut StoreState, user_id: u64, body: &str) -> Response<Body> {
    let add: AddCartItem = match serde_json::from_str(body) {
        Ok(add) => add,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid cart item: {e}")),
    };

    let price = match state.product(add.product_id) {
        Some(product) => product.price,
        None => {
            return text(
                StatusCode::BAD_REQUEST,
                &format!("Product not found: {}", add.product_id),
            )
        }
    };

    let item_id = state.next_cart_item_id;
    let cart = state.carts.entry(user_id).or_default();
    match cart.iter_mut().find(|i| i.product_id == add.product_id) {
        Some(existing) => existing.quantity += add.quantity,
        None => {
            cart.push(CartItem {
                id: item_id,
                product_id: add.product_id,
                quantity: add.quantity,
                price,
            });
            state.next_cart_item_id += 1;
        }
    }

    ok_json(cart_json(state, user_id))
}

fn checkout_cart(state: &mut StoreState, user_id: u64) -> Response<Body> {
    let items = state.carts.get(&user_id).cloned().unwrap_or_default();
    if items.is_empty() {
        return text(StatusCode::BAD_REQUEST, "Cart is empty, cannot checkout");
    }

    let order = Order {
        id: state.next_order_id,
        user_id,
        status: "PENDING".to_string(),
        items: items
            .into_iter()
            .map(|i| OrderItem {
                product_id: i.product_id,
                quantity: i.quantity,
                price: i.price,
            })
            .collect(),
    };
    state.next_order_id += 1;
    state.carts.remove(&user_id);

    let response = json_response(StatusCode::CREATED, order_json(&order));
    state.orders.push(order);
    response
}

fn create_order(state: &mut StoreState, body: &str) -> Response<Body> {
    let new: NewOrder = match serde_json::from_str(body) {
        Ok(new) => new,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid order: {e}")),
    };

    let user_id = match state.users.iter().find(|u| u.username == new.username) {
        Some(user) => user.id,
        None => {
            return text(
                StatusCode::BAD_REQUEST,
                &format!("User not found: {}", new.username),
            )
        }
    };

    let mut items = Vec::with_capacity(new.items.len());
    for item in &new.items {
        let price = match state.product(item.product_id) {
            Some(product) => product.price,
            None => {
                return text(
                    StatusCode::BAD_REQUEST,
                    &format!("Product not found: {}", item.product_id),
                )
            }
        };
        items.push(OrderItem {
            product_id: item.product_id,
            quantity: item.quantity,
            price,
        });
    }

    let order = Order {
        id: state.next_order_id,
        user_id,
        status: "PENDING".to_string(),
        items,
    };
    state.next_order_id += 1;

    let response = json_response(StatusCode::CREATED, order_json(&order));
    state.orders.push(order);
    response
}

fn create_payment_intent(state: &StoreState, body: &str) -> Response<Body> {
    let request: PaymentRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid payment request: {e}")),
    };

    let order = match state.orders.iter().find(|o| o.id == request.order_id) {
        Some(order) => order,
        None => {
            return text(
                StatusCode::BAD_REQUEST,
                &format!("Order not found: {}", request.order_id),
            )
        }
    };

    let amount_cents = (order.total() * 100.0).round() as i64;
    ok_json(json!({
        "id": format!("pi_mock_{}", order.id),
        "clientSecret": format!("pi_mock_{}_secret", order.id),
        "amount": amount_cents,
        "currency": "usd",
        "status": "requires_payment_method"
    }))
}

fn create_checkout_session(state: &StoreState, body: &str) -> Response<Body> {
    let request: PaymentRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid payment request: {e}")),
    };

    if !state.orders.iter().any(|o| o.id == request.order_id) {
        return text(
            StatusCode::BAD_REQUEST,
            &format!("Order not found: {}", request.order_id),
        );
    }

    ok_json(json!({
        "id": format!("cs_mock_{}", request.order_id),
        "url": format!("https://checkout.example.com/pay/cs_mock_{}", request.order_id),
        "status": "open"
    }))
}

/// Event envelope dispatch: known event types must reference an existing
/// order through data.object.metadata.orderId; unknown types are
/// acknowledged and ignored.
fn handle_webhook(state: &mut StoreState, body: &str) -> Response<Body> {
    let envelope: Value = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => return text(StatusCode::BAD_REQUEST, &format!("Invalid webhook event: {e}")),
    };

    let (Some(_), Some(event_type), Some(object)) = (
        envelope.get("id").and_then(Value::as_str),
        envelope.get("type").and_then(Value::as_str),
        envelope.pointer("/data/object"),
    ) else {
        return text(
            StatusCode::BAD_REQUEST,
            "Webhook event requires id, type, and data.object",
        );
    };

    let new_status = match event_type {
        "checkout.session.completed" => "COMPLETED",
        "payment_intent.succeeded" => "PAID",
        _ => return ok_json(json!({"received": true, "status": "ignored"})),
    };

    let order_id = object
        .pointer("/metadata/orderId")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok());
    let Some(order_id) = order_id else {
        return text(StatusCode::BAD_REQUEST, "Order ID not found in event metadata");
    };

    match state.orders.iter_mut().find(|o| o.id == order_id) {
        Some(order) => {
            order.status = new_status.to_string();
            ok_json(json!({"received": true, "status": "processed"}))
        }
        None => text(StatusCode::BAD_REQUEST, &format!("Order not found: {order_id}")),
    }
}

fn product_json(product: &Product) -> Value {
    json!({
        "id": product.id,
        "sku": product.sku,
        "name": product.name,
        "slug": product.slug,
        "description": product.description,
        "price": product.price,
        "quantity": product.quantity
    })
}

fn user_json(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email
    })
}

fn cart_json(state: &StoreState, user_id: u64) -> Value {
    let empty = Vec::new();
    let items = state.carts.get(&user_id).unwrap_or(&empty);
    let rendered: Vec<Value> = items
        .iter()
        .map(|i| {
            json!({
                "id": i.id,
                "productId": i.product_id,
                "quantity": i.quantity,
                "price": i.price,
                "totalPrice": i.price * i.quantity as f64
            })
        })
        .collect();
    let total: f64 = items.iter().map(|i| i.price * i.quantity as f64).sum();

    json!({
        "id": user_id,
        "userId": user_id,
        "items": rendered,
        "totalPrice": total
    })
}

fn order_json(order: &Order) -> Value {
    let items: Vec<Value> = order
        .items
        .iter()
        .map(|i| {
            json!({
                "productId": i.product_id,
                "quantity": i.quantity,
                "price": i.price
            })
        })
        .collect();

    json!({
        "id": order.id,
        "userId": order.user_id,
        "status": order.status,
        "totalAmount": order.total(),
        "items": items
    })
}

fn json_response(status: StatusCode, value: Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("static response parts")
}

fn ok_json(value: Value) -> Response<Body> {
    json_response(StatusCode::OK, value)
}

fn text(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message.to_string()))
        .expect("static response parts")
}

fn not_found(message: &str) -> Response<Body> {
    json_response(StatusCode::NOT_FOUND, json!({"error": message}))
}

fn problem(status: StatusCode, title: &str, detail: &str, error_type: &str) -> Response<Body> {
    json_response(
        status,
        json!({
            "type": error_type,
            "title": title,
            "status": status.as_u16(),
            "detail": detail
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Test Product"), "test-product");
        assert_eq!(slugify("  Red  Onion! "), "red-onion");
        assert_eq!(slugify("Caffè Latte"), "caff-latte");
    }

    #[test]
    fn unique_slug_appends_counter() {
        let mut state = StoreState::seeded();
        assert_eq!(state.unique_slug("Test Product"), "test-product");

        state.products.push(Product {
            id: 99,
            sku: None,
            name: "Test Product".to_string(),
            slug: "test-product".to_string(),
            description: None,
            price: 1.0,
            quantity: 1,
        });
        assert_eq!(state.unique_slug("Test Product"), "test-product-2");

        state.products.push(Product {
            id: 100,
            sku: None,
            name: "Test Product".to_string(),
            slug: "test-product-2".to_string(),
            description: None,
            price: 1.0,
            quantity: 1,
        });
        assert_eq!(state.unique_slug("Test Product"), "test-product-3");
    }

    #[test]
    fn cart_json_for_unknown_user_is_empty() {
        let state = StoreState::seeded();
        let cart = cart_json(&state, 42);
        assert_eq!(cart["items"], json!([]));
        assert_eq!(cart["totalPrice"], json!(0.0));
    }
}
