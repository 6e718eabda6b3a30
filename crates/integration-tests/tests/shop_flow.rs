//! End-to-end shopping: an admin stocks the shop, a user buys, the admin
//! ships.

#![allow(clippy::unwrap_used)]

use droidshop_integration_tests::{IMAGE_URL, TestApp, location, read_until};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_admin_stocks_user_buys_admin_ships() {
    let app = TestApp::spawn().await;
    let admin = app.signed_in_admin("admin@droidshop.test").await;

    // Admin adds a product with an image.
    let response = app.add_product(&admin, "Widget", "9.99").await;
    assert_eq!(
        location(&response).as_deref(),
        Some("/admin?tab=products&notice=Product+added%21")
    );
    let product_id = app.product_id("Widget").await.unwrap();
    let product = app.read(&format!("products/{product_id}")).await;
    assert_eq!(product["price"], json!(9.99));
    assert_eq!(product["image"], json!(IMAGE_URL));

    // User adds it to the cart.
    let user = app.signed_in_user("user@droidshop.test").await;
    let response = app.post(&user, &format!("/product/{product_id}/cart")).await;
    assert_eq!(
        location(&response),
        Some(format!("/product/{product_id}?notice=Added+to+cart%21"))
    );

    let cart_page = app.get(&user, "/cart").await;
    assert_eq!(cart_page.status(), StatusCode::OK);
    let html = cart_page.text().await.unwrap();
    assert!(html.contains("Widget"));
    assert!(html.contains("Total: $9.99"));

    // Checkout places one pending order and empties the cart.
    let response = app.post(&user, "/cart/checkout").await;
    assert_eq!(
        location(&response).as_deref(),
        Some("/orders?notice=Order+placed%21")
    );
    let uid = app.user_id("user@droidshop.test").await.unwrap();
    assert!(app.read(&format!("carts/{uid}")).await.is_null());

    let orders = app.read("orders").await;
    let orders = orders.as_object().unwrap();
    assert_eq!(orders.len(), 1);
    let (order_id, order) = orders.iter().next().unwrap();
    assert_eq!(order["userId"], json!(uid));
    assert_eq!(order["total"], json!(9.99));
    assert_eq!(order["status"], json!("Pending"));
    assert!(order["timestamp"].is_u64());
    assert_eq!(order["items"][&product_id]["name"], json!("Widget"));

    // The user's order view follows the status live.
    let mut live = app.get(&user, "/live/orders").await;
    assert_eq!(live.status(), StatusCode::OK);
    read_until(&mut live, "Pending").await;

    let response = app
        .post_form(&admin, &format!("/admin/orders/{order_id}/status"), &[("status", "Shipped")])
        .await;
    assert!(location(&response).unwrap().starts_with("/admin?tab=orders&notice="));
    read_until(&mut live, "Shipped").await;

    let html = app.get(&user, "/orders").await.text().await.unwrap();
    assert!(html.contains("Shipped"));
    assert!(html.contains("$9.99"));
}

#[tokio::test]
async fn test_catalog_updates_live() {
    let app = TestApp::spawn().await;
    let admin = app.signed_in_admin("admin@droidshop.test").await;
    let visitor = app.browser();

    let mut live = app.get(&visitor, "/live/products").await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(
        live.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    read_until(&mut live, "No products yet").await;

    app.add_product(&admin, "Gizmo", "5").await;
    let received = read_until(&mut live, "Gizmo").await;
    assert!(received.contains("$5.00"));

    let product_id = app.product_id("Gizmo").await.unwrap();
    let html = app
        .get(&visitor, &format!("/product/{product_id}"))
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("A fine Gizmo"));

    app.post(&admin, &format!("/admin/products/{product_id}/delete"))
        .await;
    read_until(&mut live, "No products yet").await;
    assert!(app.read("products").await.is_null());
}

#[tokio::test]
async fn test_add_product_validates_form() {
    let app = TestApp::spawn().await;
    let admin = app.signed_in_admin("admin@droidshop.test").await;

    let response = app.add_product(&admin, "Widget", "free").await;
    assert!(location(&response).unwrap().starts_with("/admin?tab=products&notice="));
    assert!(app.read("products").await.is_null());

    let response = app.add_product(&admin, "  ", "1.00").await;
    assert!(location(&response).unwrap().contains("product+name"));
    assert!(app.read("products").await.is_null());
}
