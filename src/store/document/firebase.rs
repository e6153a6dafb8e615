use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::auth::TokenProvider;
use super::sse::{SseDecoder, SseEvent};
use super::{tree, BackendKind, DocPath, DocumentBackend, Subscription};
use crate::error::{DbError, DbResult};

// ============================================================================
// Firebase Realtime Database - REST Backend
// ============================================================================
//
// Maps the handle operations onto the REST surface:
// - once      -> GET    {url}/{path}.json
// - set       -> PUT    {url}/{path}.json
// - update    -> PATCH  {url}/{path}.json   (multi-path keys allowed)
// - push      -> POST   {url}/{path}.json   (server returns {"name": key})
// - remove    -> DELETE {url}/{path}.json
// - subscribe -> GET with Accept: text/event-stream
//
// Streaming keeps a local copy of the subscribed value, applies each
// put/patch event to it and forwards the full value.
//
// ============================================================================

const SUBSCRIPTION_BUFFER: usize = 32;

pub struct FirebaseRestBackend {
    base_url: String,
    client: Client,
    stream_client: Client,
    auth: Arc<TokenProvider>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

impl FirebaseRestBackend {
    pub fn new(database_url: &str, auth: TokenProvider, request_timeout: Duration) -> DbResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DbError::Config(format!("failed to create HTTP client: {e}")))?;
        // No overall timeout: streams stay open until cancelled
        let stream_client = Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| DbError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: database_url.trim_end_matches('/').to_string(),
            client,
            stream_client,
            auth: Arc::new(auth),
        })
    }

    fn url(&self, path: &DocPath) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &DocPath) -> DbResult<Response> {
        let token = self.auth.token().await?;
        let response = token.apply(request).send().await?;
        check_status(response, path).await
    }

    async fn send_stream(&self, request: reqwest::RequestBuilder, path: &DocPath) -> DbResult<Response> {
        let token = self.auth.token().await?;
        let response = token.apply_to_stream(request).send().await?;
        check_status(response, path).await
    }
}

async fn check_status(response: Response, path: &DocPath) -> DbResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(path = %path, status = %status, "Realtime database request rejected");
    Err(DbError::Document(format!("{status} at '{path}': {body}")))
}

#[async_trait]
impl DocumentBackend for FirebaseRestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Firebase
    }

    async fn once(&self, path: &DocPath) -> DbResult<Value> {
        let response = self.send(self.client.get(self.url(path)), path).await?;
        Ok(response.json().await?)
    }

    async fn set(&self, path: &DocPath, value: Value) -> DbResult<()> {
        self.send(self.client.put(self.url(path)).json(&value), path).await?;
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> DbResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        self.send(self.client.patch(self.url(path)).json(&fields), path).await?;
        Ok(())
    }

    async fn push(&self, path: &DocPath, value: Value) -> DbResult<String> {
        let response = self.send(self.client.post(self.url(path)).json(&value), path).await?;
        let pushed: PushResponse = response.json().await?;
        Ok(pushed.name)
    }

    async fn remove(&self, path: &DocPath) -> DbResult<()> {
        self.send(self.client.delete(self.url(path)), path).await?;
        Ok(())
    }

    async fn subscribe(&self, path: &DocPath) -> DbResult<Subscription> {
        let request = self
            .stream_client
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self.send_stream(request, path).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let watched = path.clone();
        let feed = tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut snapshot = Value::Null;

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        tracing::error!(path = %watched, error = %e, "Realtime stream failed");
                        return;
                    }
                };
                for event in decoder.feed(&chunk) {
                    match apply_stream_event(&mut snapshot, &event) {
                        StreamStep::Snapshot => {
                            if tx.send(snapshot.clone()).await.is_err() {
                                return;
                            }
                        }
                        StreamStep::Ignore => {}
                        StreamStep::Close(reason) => {
                            tracing::warn!(path = %watched, reason = %reason, "Realtime stream closed by server");
                            return;
                        }
                    }
                }
            }
            tracing::debug!(path = %watched, "Realtime stream ended");
        });

        tracing::debug!(path = %path, "Subscribed to realtime database path");
        Ok(Subscription::new(path.clone(), rx, feed))
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum StreamStep {
    Snapshot,
    Ignore,
    Close(String),
}

/// Fold one streaming event into the locally held value.
pub(crate) fn apply_stream_event(snapshot: &mut Value, event: &SseEvent) -> StreamStep {
    match event.event.as_str() {
        "put" | "patch" => {
            let payload: StreamPayload = match serde_json::from_str(&event.data) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed stream payload");
                    return StreamStep::Ignore;
                }
            };
            let segments: Vec<String> = payload
                .path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();

            if event.event == "put" {
                tree::set_at(snapshot, &segments, payload.data);
            } else if let Value::Object(fields) = payload.data {
                tree::update_at(snapshot, &segments, fields);
            }
            StreamStep::Snapshot
        }
        "keep-alive" => StreamStep::Ignore,
        "cancel" => StreamStep::Close("cancelled (permission denied)".to_string()),
        "auth_revoked" => StreamStep::Close("credential expired".to_string()),
        other => {
            tracing::debug!(event = %other, "Ignoring unknown stream event");
            StreamStep::Ignore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::auth::Credentials;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> FirebaseRestBackend {
        let auth = TokenProvider::new(Credentials::Static("secret".to_string()), Client::new());
        FirebaseRestBackend::new(&server.uri(), auth, Duration::from_secs(5)).unwrap()
    }

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_once_reads_json_with_auth_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/progress/u1/c1.json"))
            .and(query_param("auth", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "lastAccessed": 10 })))
            .mount(&server)
            .await;

        let value = backend(&server).once(&p("progress/u1/c1")).await.unwrap();
        assert_eq!(value, json!({ "lastAccessed": 10 }));
    }

    #[tokio::test]
    async fn test_push_returns_server_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/comments/l1.json"))
            .and(body_json(json!({ "text": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "-NxAbc" })))
            .mount(&server)
            .await;

        let key = backend(&server).push(&p("comments/l1"), json!({ "text": "hello" })).await.unwrap();
        assert_eq!(key, "-NxAbc");
    }

    #[tokio::test]
    async fn test_update_sends_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/progress/u1/c1.json"))
            .and(body_json(json!({ "completedLessons/l1": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "completedLessons/l1": true })))
            .expect(1)
            .mount(&server)
            .await;

        let fields = json!({ "completedLessons/l1": true }).as_object().unwrap().clone();
        backend(&server).update(&p("progress/u1/c1"), fields).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_request_is_document_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Permission denied"))
            .mount(&server)
            .await;

        let err = backend(&server).set(&p("users/u1"), json!({ "name": "A" })).await.unwrap_err();
        match err {
            DbError::Document(message) => assert!(message.contains("401")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscription_applies_put_and_patch() {
        let server = MockServer::start().await;
        let stream = concat!(
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"a\":1}}\n\n",
            "event: keep-alive\ndata: null\n\n",
            "event: patch\ndata: {\"path\":\"/\",\"data\":{\"b\":2}}\n\n",
        );
        Mock::given(method("GET"))
            .and(path("/comments/l1.json"))
            .and(header("accept", "text/event-stream"))
            .and(query_param("auth", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(stream, "text/event-stream"))
            .mount(&server)
            .await;

        let mut sub = backend(&server).subscribe(&p("comments/l1")).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), json!({ "a": 1 }));
        assert_eq!(sub.next().await.unwrap(), json!({ "a": 1, "b": 2 }));
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn test_nested_put_and_cancel() {
        let mut snapshot = json!({ "a": { "x": 1 } });
        let put = SseEvent {
            event: "put".to_string(),
            data: r#"{"path":"/a/y","data":2}"#.to_string(),
        };
        assert_eq!(apply_stream_event(&mut snapshot, &put), StreamStep::Snapshot);
        assert_eq!(snapshot, json!({ "a": { "x": 1, "y": 2 } }));

        let cancel = SseEvent { event: "cancel".to_string(), data: "null".to_string() };
        assert!(matches!(apply_stream_event(&mut snapshot, &cancel), StreamStep::Close(_)));
    }
}
