//! Shared mocks for the HTTP tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use kanjo_classifiers::{ClassificationResult, Classifier, ModelAccessor, ModelLoader};
use kanjo_core::{Error, Result};
use kanjo_server::{create_router, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

/// What the mock classifier does when called
#[derive(Clone)]
pub enum Behavior {
    Label(String),
    Fail(String),
    Empty,
}

pub struct MockClassifier {
    behavior: Behavior,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<ClassificationResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Label(label) => Ok(vec![
                ClassificationResult::new(label, 0.97),
                ClassificationResult::new("runner-up", 0.03),
            ]),
            Behavior::Fail(message) => Err(Error::inference(message.clone())),
            Behavior::Empty => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Loader with construction and classification counters
pub struct MockLoader {
    behavior: Behavior,
    fail_load: Option<String>,
    delay: Duration,
    pub constructions: Arc<AtomicU32>,
    pub classify_calls: Arc<AtomicU32>,
}

impl MockLoader {
    pub fn labeling(label: &str) -> Self {
        Self::with_behavior(Behavior::Label(label.to_string()))
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            fail_load: None,
            delay: Duration::ZERO,
            constructions: Arc::new(AtomicU32::new(0)),
            classify_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing_load(message: &str) -> Self {
        Self {
            fail_load: Some(message.to_string()),
            ..Self::labeling("positive")
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self, _model_id: &str) -> Result<Box<dyn Classifier>> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if let Some(message) = &self.fail_load {
            return Err(Error::model_init(message.clone()));
        }

        Ok(Box::new(MockClassifier {
            behavior: self.behavior.clone(),
            calls: Arc::clone(&self.classify_calls),
        }))
    }
}

/// Test harness: router state plus the counters of its loader
pub struct TestApp {
    pub state: AppState,
    pub constructions: Arc<AtomicU32>,
    pub classify_calls: Arc<AtomicU32>,
}

impl TestApp {
    pub fn new(loader: MockLoader) -> Self {
        Self::build(loader, None)
    }

    /// Router with /metrics served from `handle`
    pub fn with_metrics(loader: MockLoader, handle: PrometheusHandle) -> Self {
        Self::build(loader, Some(handle))
    }

    fn build(loader: MockLoader, metrics_handle: Option<PrometheusHandle>) -> Self {
        let constructions = Arc::clone(&loader.constructions);
        let classify_calls = Arc::clone(&loader.classify_calls);
        let accessor = Arc::new(ModelAccessor::new("mock/model", Arc::new(loader)));

        Self {
            state: AppState::new(accessor, metrics_handle),
            constructions,
            classify_calls,
        }
    }

    pub fn constructions(&self) -> u32 {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn classify_calls(&self) -> u32 {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        create_router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn post_predict(&self, body: impl Into<Body>) -> (u16, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap();
        read_json(self.send(request).await).await
    }

    pub async fn get(&self, uri: &str) -> (u16, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        read_json(self.send(request).await).await
    }

    /// GET returning the raw body and its content type
    pub async fn get_text(&self, uri: &str) -> (u16, String, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.send(request).await;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }
}

pub async fn read_json(response: Response<Body>) -> (u16, serde_json::Value) {
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
