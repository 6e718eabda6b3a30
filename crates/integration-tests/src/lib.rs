//! Integration tests for DroidShop.
//!
//! Each test spawns the storefront router on an ephemeral port, backed by
//! the in-memory store and identity provider, with the image host replaced
//! by a `wiremock` server. Browsers are simulated with cookie-keeping
//! `reqwest` clients that do not follow redirects, so tests can assert on
//! where each action sends the visitor.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p droidshop-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use droidshop_storefront::config::{ImageHostConfig, StorefrontConfig};
use droidshop_storefront::realtime::{MemoryStore, RealtimeStore, StorePath};
use droidshop_storefront::router;
use droidshop_storefront::services::auth::LocalIdentityProvider;
use droidshop_storefront::state::AppState;

/// API key the fake image host expects.
pub const UPLOAD_KEY: &str = "test-upload-key";

/// URL the fake image host hands back for every upload.
pub const IMAGE_URL: &str = "https://i.ibb.co/test/widget.png";

/// Password used by test accounts.
pub const PASSWORD: &str = "droid-password";

/// A running storefront.
pub struct TestApp {
    pub base_url: String,
    pub store: MemoryStore,
    pub image_host: MockServer,
    server: JoinHandle<()>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl TestApp {
    /// Start a storefront with an empty store.
    pub async fn spawn() -> Self {
        let image_host = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/upload"))
            .and(query_param("key", UPLOAD_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "status": 200,
                "data": { "url": IMAGE_URL }
            })))
            .mount(&image_host)
            .await;

        let mut config = StorefrontConfig::local().expect("local config");
        config.images = ImageHostConfig {
            base_url: Url::parse(&image_host.uri()).expect("mock server URL"),
            api_key: Some(SecretString::from(UPLOAD_KEY)),
        };

        let store = MemoryStore::new();
        let state = AppState::new(
            config,
            Arc::new(store.clone()),
            Arc::new(LocalIdentityProvider::new()),
        )
        .expect("application state");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let server = tokio::spawn(async move {
            axum::serve(listener, router(state))
                .await
                .expect("test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            image_host,
            server,
        }
    }

    /// A fresh browser: its own cookie jar, redirects not followed.
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, browser: &Client, path: &str) -> Response {
        browser
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn post(&self, browser: &Client, path: &str) -> Response {
        self.post_form(browser, path, &[]).await
    }

    pub async fn post_form(&self, browser: &Client, path: &str, form: &[(&str, &str)]) -> Response {
        browser
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn register(&self, browser: &Client, name: &str, email: &str) -> Response {
        self.post_form(
            browser,
            "/register",
            &[("name", name), ("email", email), ("password", PASSWORD)],
        )
        .await
    }

    pub async fn login(&self, browser: &Client, email: &str) -> Response {
        self.post_form(browser, "/login", &[("email", email), ("password", PASSWORD)])
            .await
    }

    /// A signed-in browser for a new account.
    pub async fn signed_in_user(&self, email: &str) -> Client {
        let browser = self.browser();
        let response = self.register(&browser, "Test Droid", email).await;
        assert_eq!(location(&response).as_deref(), Some("/"), "registration failed");
        browser
    }

    /// A signed-in browser for a new account with `isAdmin` set.
    pub async fn signed_in_admin(&self, email: &str) -> Client {
        let browser = self.signed_in_user(email).await;
        self.promote_to_admin(email).await;
        // The profile is read at sign-in, so sign in again to pick it up.
        self.post(&browser, "/logout").await;
        let response = self.login(&browser, email).await;
        assert_eq!(location(&response).as_deref(), Some("/"), "admin login failed");
        browser
    }

    /// Grant admin rights the way an operator would: in the store.
    pub async fn promote_to_admin(&self, email: &str) {
        let uid = self.user_id(email).await.expect("no such user");
        self.store
            .set(&store_path(&format!("users/{uid}/isAdmin")), json!(true))
            .await
            .expect("promotion failed");
    }

    /// Find a user's id by email.
    pub async fn user_id(&self, email: &str) -> Option<String> {
        let users = self.read("users").await;
        users.as_object()?.iter().find_map(|(uid, user)| {
            (user.get("email").and_then(Value::as_str) == Some(email)).then(|| uid.clone())
        })
    }

    /// Read a store path as JSON, `null` when absent.
    pub async fn read(&self, at: &str) -> Value {
        self.store
            .get(&store_path(at))
            .await
            .expect("store read failed")
            .into_value()
            .unwrap_or(Value::Null)
    }

    /// Add a product through the admin form.
    pub async fn add_product(&self, admin: &Client, name: &str, price: &str) -> Response {
        let form = Form::new()
            .text("name", name.to_owned())
            .text("price", price.to_owned())
            .text("desc", format!("A fine {name}"))
            .part(
                "image",
                Part::bytes(vec![0x89, b'P', b'N', b'G'])
                    .file_name("product.png")
                    .mime_str("image/png")
                    .expect("valid mime"),
            );
        admin
            .post(self.url("/admin/products"))
            .multipart(form)
            .send()
            .await
            .expect("upload request failed")
    }

    /// Id of the product called `name`.
    pub async fn product_id(&self, name: &str) -> Option<String> {
        let products = self.read("products").await;
        products.as_object()?.iter().find_map(|(id, product)| {
            (product.get("name").and_then(Value::as_str) == Some(name)).then(|| id.clone())
        })
    }
}

/// Parse a store path, panicking on invalid input.
pub fn store_path(at: &str) -> StorePath {
    StorePath::parse(at).expect("valid store path")
}

/// The `Location` header of a redirect.
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

/// Read a streaming body until it contains `needle`, for up to five seconds.
///
/// Returns everything read so far.
pub async fn read_until(response: &mut Response, needle: &str) -> String {
    let mut received = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !received.contains(needle) {
        let chunk = tokio::time::timeout_at(deadline, response.chunk())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {received:?}"))
            .expect("stream failed");
        match chunk {
            Some(bytes) => received.push_str(&String::from_utf8_lossy(&bytes)),
            None => break,
        }
    }
    received
}
