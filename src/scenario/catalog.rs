//! Built-in scenarios
//!
//! Each scenario mirrors one of the manual smoke flows the commerce API
//! is exercised with: product create/fetch chains, the duplicate-SKU
//! conflict, slug uniqueness, user provisioning, cart manipulation and
//! checkout, payment intent/session creation, and webhook delivery.

use super::{Check, Scenario, Step};

/// All built-in scenarios, in a sensible execution order
pub fn all(user_id: u64) -> Vec<Scenario> {
    vec![
        greeting(),
        product_demo(),
        product_duplicate_sku(),
        slug_generation(),
        create_users(),
        cart_items(user_id),
        cart_checkout(user_id),
        payments(),
        payment_webhook(),
    ]
}

/// Names of the built-in scenarios
pub fn names(user_id: u64) -> Vec<String> {
    all(user_id).into_iter().map(|s| s.name).collect()
}

/// Look up a built-in scenario by name
pub fn find(name: &str, user_id: u64) -> Option<Scenario> {
    all(user_id).into_iter().find(|s| s.name == name)
}

fn scenario(name: &str, description: &str, steps: Vec<Step>) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: Some(description.to_string()),
        steps,
        checks: Vec::new(),
    }
}

/// GET the greeting endpoint, with and without a name
fn greeting() -> Scenario {
    scenario(
        "greeting",
        "Greeting endpoint responds with and without a name",
        vec![
            Step::get("plain", "/greet")
                .expect_success()
                .expect_contains("Hello"),
            Step::get("named", "/greet/Ada")
                .expect_success()
                .expect_contains("Ada"),
        ],
    )
}

/// Create two products and fetch each back by its extracted id
fn product_demo() -> Scenario {
    scenario(
        "product-demo",
        "Create two onion products and fetch each by extracted id",
        vec![
            Step::post(
                "yellow",
                "/products",
                r#"{"name": "Yellow Onion", "description": "Fresh yellow onion, locally grown", "price": 1.99, "quantity": 100}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::get("fetch-yellow", "/products/${yellow.id}")
                .expect_success()
                .expect_contains("Yellow Onion"),
            Step::post(
                "red",
                "/products",
                r#"{"name": "Red Onion", "description": "Sweet red onion, perfect for salads", "price": 2.49, "quantity": 75}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::get("fetch-red", "/products/${red.id}")
                .expect_success()
                .expect_contains("Red Onion"),
        ],
    )
}

/// Re-creating a SKU must yield 409 with the documented conflict title
fn product_duplicate_sku() -> Scenario {
    scenario(
        "product-duplicate-sku",
        "Second create with the same SKU is rejected with 409",
        vec![
            Step::post(
                "first",
                "/products",
                r#"{"sku": "TEST-SKU-001", "name": "Test Product", "description": "A test product for error handling", "price": 9.99, "quantity": 10}"#,
            )
            .expect_status(201),
            Step::post(
                "duplicate",
                "/products",
                r#"{"sku": "TEST-SKU-001", "name": "Duplicate SKU Product", "description": "This product has a duplicate SKU", "price": 19.99, "quantity": 5}"#,
            )
            .expect_status(409)
            .expect_contains("Product Already Exists"),
        ],
    )
}

/// Three products with the same name must receive pairwise distinct slugs
fn slug_generation() -> Scenario {
    let mut s = scenario(
        "slug-generation",
        "Same display name with distinct SKUs yields unique slugs",
        vec![
            Step::post(
                "first",
                "/products",
                r#"{"sku": "TEST-PROD-001", "name": "Test Product", "description": "Test product for slug generation", "price": 9.99, "quantity": 10}"#,
            )
            .extracts(&["slug"])
            .expect_status(201),
            Step::post(
                "second",
                "/products",
                r#"{"sku": "TEST-PROD-002", "name": "Test Product", "description": "Second test product with the same name", "price": 19.99, "quantity": 5}"#,
            )
            .extracts(&["slug"])
            .expect_status(201),
            Step::post(
                "third",
                "/products",
                r#"{"sku": "TEST-PROD-003", "name": "Test Product", "description": "Third test product with the same name", "price": 29.99, "quantity": 3}"#,
            )
            .extracts(&["slug"])
            .expect_status(201),
        ],
    );
    s.checks.push(Check {
        distinct: vec![
            "first.slug".to_string(),
            "second.slug".to_string(),
            "third.slug".to_string(),
        ],
    });
    s
}

/// Create several users; fetch each only if its create succeeded
fn create_users() -> Scenario {
    let mut steps = Vec::new();
    for (key, username, password, email) in [
        ("john", "johndoe", "password123", "john.doe@example.com"),
        ("jane", "janesmith", "securepass456", "jane.smith@example.com"),
        ("davide", "davide", "davide123", "davide@example.com"),
        ("inna", "inna2", "inna456", "inna@example.com"),
    ] {
        steps.push(
            Step::post(
                key,
                "/users",
                &format!(
                    r#"{{"username": "{username}", "password": "{password}", "email": "{email}"}}"#
                ),
            )
            .extracts(&["id"])
            .expect_status(201),
        );
        steps.push(
            Step::get(&format!("fetch-{key}"), &format!("/users/${{{key}.id}}"))
                .expect_success()
                .expect_contains(username),
        );
    }
    scenario(
        "create-users",
        "Create users and fetch each back, gated on creation succeeding",
        steps,
    )
}

/// Add two line items to the cart and verify the fetched representation
fn cart_items(user_id: u64) -> Scenario {
    scenario(
        "cart-items",
        "Two additions show up as line items in the fetched cart",
        vec![
            Step::post(
                "add-yellow",
                &format!("/users/{user_id}/cart/items"),
                r#"{"productId": 1, "quantity": 3}"#,
            )
            .expect_success(),
            Step::post(
                "add-red",
                &format!("/users/{user_id}/cart/items"),
                r#"{"productId": 2, "quantity": 2}"#,
            )
            .expect_success(),
            Step::get("cart", &format!("/users/{user_id}/cart"))
                .expect_success()
                .expect_contains(r#""productId":1"#)
                .expect_contains(r#""productId":2"#),
        ],
    )
}

/// Fill the cart, check out, and verify the cart comes back empty
fn cart_checkout(user_id: u64) -> Scenario {
    scenario(
        "cart-checkout",
        "Checkout turns the cart into an order and empties it",
        vec![
            Step::post(
                "add-yellow",
                &format!("/users/{user_id}/cart/items"),
                r#"{"productId": 1, "quantity": 3}"#,
            )
            .expect_success(),
            Step::post(
                "add-red",
                &format!("/users/{user_id}/cart/items"),
                r#"{"productId": 2, "quantity": 2}"#,
            )
            .expect_success(),
            Step::get("before", &format!("/users/{user_id}/cart"))
                .expect_success()
                .expect_contains(r#""productId":1"#)
                .expect_contains(r#""productId":2"#),
            Step::post_empty("checkout", &format!("/users/{user_id}/cart/checkout"))
                .extracts(&["id"])
                .expect_status(201),
            Step::get("after", &format!("/users/{user_id}/cart"))
                .expect_success()
                .expect_contains(r#""items":[]"#),
        ],
    )
}

/// Order an existing catalog, then create a payment intent and a checkout
/// session for the extracted order id
fn payments() -> Scenario {
    scenario(
        "payments",
        "Create an order, then a payment intent and a checkout session for it",
        vec![
            Step::post(
                "user",
                "/users",
                r#"{"username": "stripe_test_user", "email": "stripe_test@example.com", "firstName": "Stripe", "lastName": "Test"}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::post(
                "order",
                "/orders",
                r#"{"username": "stripe_test_user", "items": [{"productId": 1, "quantity": 2}, {"productId": 2, "quantity": 1}]}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::post(
                "intent",
                "/api/payments/create-intent",
                r#"{"orderId": ${order.id}}"#,
            )
            .expect_status(200)
            .expect_contains("clientSecret"),
            Step::post(
                "session",
                "/api/payments/create-checkout",
                r#"{"orderId": ${order.id}, "successUrl": "https://example.com/success", "cancelUrl": "https://example.com/cancel"}"#,
            )
            .expect_status(200),
        ],
    )
}

/// Deliver completed-checkout and succeeded-payment webhook events for an
/// order created in the same run
fn payment_webhook() -> Scenario {
    scenario(
        "payment-webhook",
        "Webhook events referencing an existing order are accepted",
        vec![
            Step::post(
                "user",
                "/users",
                r#"{"username": "webhook_test_user", "email": "webhook_test@example.com"}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::post(
                "order",
                "/orders",
                r#"{"username": "webhook_test_user", "items": [{"productId": 1, "quantity": 1}]}"#,
            )
            .extracts(&["id"])
            .expect_status(201),
            Step::post(
                "completed",
                "/api/payments/webhook",
                r#"{"id": "evt_test_checkout_session_completed", "type": "checkout.session.completed", "data": {"object": {"id": "cs_test_123456789", "object": "checkout.session", "status": "complete", "metadata": {"orderId": "${order.id}"}}}}"#,
            )
            .expect_status(200),
            Step::post(
                "succeeded",
                "/api/payments/webhook",
                r#"{"id": "evt_test_payment_intent_succeeded", "type": "payment_intent.succeeded", "data": {"object": {"id": "pi_test_123456789", "object": "payment_intent", "status": "succeeded", "metadata": {"orderId": "${order.id}"}}}}"#,
            )
            .expect_status(200),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_builtins_validate() {
        for scenario in all(2) {
            scenario
                .validate()
                .unwrap_or_else(|e| panic!("{}: {e}", scenario.name));
        }
    }

    #[test]
    fn find_is_name_based() {
        assert!(find("product-demo", 2).is_some());
        assert!(find("no-such-scenario", 2).is_none());
    }

    #[test]
    fn cart_scenarios_use_the_configured_user() {
        let scenario = cart_items(7);
        assert!(scenario.steps[0].path.starts_with("/users/7/"));
    }
}
