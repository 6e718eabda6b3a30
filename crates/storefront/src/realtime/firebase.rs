//! Firebase Realtime Database backend over the REST API.
//!
//! Reads and writes map to `GET`/`PUT`/`PATCH`/`DELETE`/`POST` on
//! `{database}/{path}.json`. Subscriptions open a streaming `GET` with
//! `Accept: text/event-stream` and apply the server's `put` and `patch`
//! events to a local mirror of the watched node.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use url::Url;

use super::tree;
use super::{RealtimeStore, Snapshot, SnapshotStream, StoreError, StorePath, Subscription};

/// Realtime store backed by a Firebase Realtime Database.
#[derive(Clone)]
pub struct FirebaseStore {
    client: reqwest::Client,
    database_url: Url,
    secret: Option<SecretString>,
}

impl std::fmt::Debug for FirebaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseStore")
            .field("database_url", &self.database_url.as_str())
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

impl FirebaseStore {
    /// Create a client for the database at `database_url`.
    ///
    /// `secret` is sent as the `auth` query parameter on every request.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(database_url: Url, secret: Option<SecretString>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("droidshop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            database_url,
            secret,
        })
    }

    fn url_for(&self, path: &StorePath) -> Result<Url, StoreError> {
        let mut url = self.database_url.clone();
        let mut segments: Vec<String> = path.segments().to_vec();
        match segments.last_mut() {
            Some(last) => last.push_str(".json"),
            None => segments.push(".json".to_owned()),
        }
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidPath(format!("bad database URL {}", self.database_url)))?
            .pop_if_empty()
            .extend(&segments);
        if let Some(secret) = &self.secret {
            url.query_pairs_mut()
                .append_pair("auth", secret.expose_secret());
        }
        Ok(url)
    }

    fn request(&self, method: Method, path: &StorePath) -> Result<RequestBuilder, StoreError> {
        Ok(self.client.request(method, self.url_for(path)?))
    }

    /// A write request that asks the server not to echo the written data.
    fn silent_request(&self, method: Method, path: &StorePath) -> Result<RequestBuilder, StoreError> {
        let mut url = self.url_for(path)?;
        url.query_pairs_mut().append_pair("print", "silent");
        Ok(self.client.request(method, url))
    }

    async fn send_silent(&self, request: RequestBuilder, path: &StorePath) -> Result<(), StoreError> {
        let response = request.send().await?;
        check(response, path).await?;
        Ok(())
    }
}

/// Map error statuses to `StoreError`.
async fn check(response: Response, path: &StorePath) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(StoreError::PermissionDenied(path.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body).map_or(body, |parsed| parsed.error);
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    async fn get(&self, path: &StorePath) -> Result<Snapshot, StoreError> {
        let response = self.request(Method::GET, path)?.send().await?;
        let value: Value = check(response, path).await?.json().await?;
        Ok(Snapshot::new(path.clone(), tree::normalize(value)))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let request = self.silent_request(Method::PUT, path)?.json(&value);
        self.send_silent(request, path).await
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        let request = self.silent_request(Method::PATCH, path)?.json(&patch);
        self.send_silent(request, path).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        let request = self.silent_request(Method::DELETE, path)?;
        self.send_silent(request, path).await
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let response = self.request(Method::POST, path)?.json(&value).send().await?;
        let pushed: PushResponse = check(response, path).await?.json().await?;
        Ok(pushed.name)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        let response = self
            .request(Method::GET, path)?
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check(response, path).await?;

        let (tx, rx) = watch::channel(None);
        let watched = path.clone();
        let producer = Subscription::spawn(async move {
            match follow(response, &watched, &tx).await {
                Ok(()) => tracing::debug!(path = %watched, "Realtime listener closed"),
                Err(e) => tracing::warn!(path = %watched, error = %e, "Realtime listener failed"),
            }
        });
        Ok(SnapshotStream::new(rx, Some(producer)))
    }
}

/// Consume an event stream until the server ends or cancels it.
async fn follow(
    response: Response,
    path: &StorePath,
    tx: &watch::Sender<Option<Snapshot>>,
) -> Result<(), StoreError> {
    let mut body = response.bytes_stream();
    let mut decoder = EventDecoder::default();
    let mut mirror = Value::Null;

    while let Some(chunk) = body.next().await {
        for event in decoder.feed(&chunk?) {
            match event.name.as_str() {
                "put" | "patch" => {
                    let payload: StreamPayload = serde_json::from_str(&event.data)?;
                    apply_event(&mut mirror, &event.name, payload)?;
                    let value = tree::normalize(mirror.clone());
                    tx.send_if_modified(|slot| {
                        if slot.as_ref().is_some_and(|s| s.value() == value.as_ref()) {
                            return false;
                        }
                        *slot = Some(Snapshot::new(path.clone(), value));
                        true
                    });
                }
                "cancel" | "auth_revoked" => {
                    tracing::info!(path = %path, event = %event.name, "Realtime listener revoked");
                    return Ok(());
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// Apply one `put` or `patch` event to the mirror.
fn apply_event(mirror: &mut Value, kind: &str, payload: StreamPayload) -> Result<(), StoreError> {
    let at = StorePath::parse(&payload.path)?;
    if kind == "put" {
        tree::write(mirror, at.segments(), tree::normalize(payload.data));
        return Ok(());
    }
    let Value::Object(patch) = payload.data else {
        return Err(StoreError::InvalidPath(format!(
            "patch at {at} is not an object"
        )));
    };
    for (key, value) in patch {
        let mut target = at.clone();
        for segment in key.split('/').filter(|segment| !segment.is_empty()) {
            target = target.child(segment)?;
        }
        tree::write(mirror, target.segments(), tree::normalize(value));
    }
    Ok(())
}

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Event {
    name: String,
    data: String,
}

/// Incremental `text/event-stream` parser.
#[derive(Debug, Default)]
struct EventDecoder {
    buffer: Vec<u8>,
    name: Option<String>,
    data: Vec<String>,
}

impl EventDecoder {
    /// Feed raw bytes and return every event completed by them.
    fn feed(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => self.name = Some(value.to_owned()),
                "data" => self.data.push(value.to_owned()),
                _ => {}
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<Event> {
        let name = self.name.take();
        let data = std::mem::take(&mut self.data);
        if name.is_none() && data.is_empty() {
            return None;
        }
        Some(Event {
            name: name.unwrap_or_else(|| "message".to_owned()),
            data: data.join("\n"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = EventDecoder::default();
        assert!(decoder.feed(b"event: put\r\nda").is_empty());
        let events = decoder.feed(b"ta: {\"path\":\"/\",\"data\":1}\r\n\r\n");
        assert_eq!(
            events,
            vec![Event {
                name: "put".into(),
                data: "{\"path\":\"/\",\"data\":1}".into()
            }]
        );
    }

    #[test]
    fn test_decoder_skips_comments_and_keep_alive_data() {
        let mut decoder = EventDecoder::default();
        let events = decoder.feed(b": hello\n\nevent: keep-alive\ndata: null\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "keep-alive");
    }

    #[test]
    fn test_put_and_patch_update_mirror() {
        let mut mirror = Value::Null;
        apply_event(
            &mut mirror,
            "put",
            StreamPayload {
                path: "/".into(),
                data: json!({"o1": {"status": "Pending"}}),
            },
        )
        .unwrap();
        apply_event(
            &mut mirror,
            "patch",
            StreamPayload {
                path: "/o1".into(),
                data: json!({"status": "Shipped", "total": 5}),
            },
        )
        .unwrap();
        apply_event(
            &mut mirror,
            "put",
            StreamPayload {
                path: "/o2".into(),
                data: json!({"status": "Pending"}),
            },
        )
        .unwrap();
        assert_eq!(
            mirror,
            json!({"o1": {"status": "Shipped", "total": 5}, "o2": {"status": "Pending"}})
        );

        apply_event(
            &mut mirror,
            "put",
            StreamPayload {
                path: "/o1".into(),
                data: Value::Null,
            },
        )
        .unwrap();
        assert_eq!(mirror, json!({"o2": {"status": "Pending"}}));
    }

    #[test]
    fn test_url_carries_json_suffix_and_auth() {
        let store = FirebaseStore::new(
            Url::parse("https://shop.firebaseio.com/").unwrap(),
            Some(SecretString::from("s3cret")),
        )
        .unwrap();
        let url = store.url_for(&StorePath::parse("carts/u1").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://shop.firebaseio.com/carts/u1.json?auth=s3cret");

        let root = store.url_for(&StorePath::root()).unwrap();
        assert_eq!(root.path(), "/.json");
    }
}
