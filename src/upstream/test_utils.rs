//! In-process [`UpstreamClient`] for pipeline and query tests.
//!
//! [`FakeUpstream`] serves canned listings, details and README results,
//! counts calls, and can hold detail fetches behind a gate so tests can step
//! the Hugging Face stream one model at a time.
// Shared test utility module: not every helper is used by every test.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use super::{UpstreamClient, UpstreamError};

/// What the fake returns for a README request.
#[derive(Debug, Clone)]
pub enum ReadmeResponse {
    Html(String),
    Missing,
    Fail(u16),
    /// Never completes; for cancelling requests mid-fetch.
    Hang,
}

#[derive(Default)]
pub struct FakeUpstream {
    openrouter: Mutex<Vec<Value>>,
    huggingface: Mutex<Vec<Value>>,
    details: Mutex<HashMap<String, Value>>,
    readmes: Mutex<HashMap<String, ReadmeResponse>>,
    detail_gate: Mutex<Option<Arc<Semaphore>>>,
    detail_stall: Mutex<Option<Duration>>,
    pub openrouter_calls: AtomicUsize,
    pub huggingface_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub readme_calls: AtomicUsize,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_openrouter(&self, models: Vec<Value>) {
        *self.openrouter.lock() = models;
    }

    /// Set the Hugging Face listing. Every id also gets a detail record
    /// unless [`FakeUpstream::remove_detail`] is called afterwards.
    pub fn set_huggingface(&self, models: Vec<Value>) {
        let mut details = self.details.lock();
        details.clear();
        for model in &models {
            if let Some(id) = model.get("id").and_then(Value::as_str) {
                details.insert(id.to_string(), json!({"id": id, "downloads": 1}));
            }
        }
        *self.huggingface.lock() = models;
    }

    pub fn set_detail(&self, model_id: &str, detail: Value) {
        self.details.lock().insert(model_id.to_string(), detail);
    }

    pub fn remove_detail(&self, model_id: &str) {
        self.details.lock().remove(model_id);
    }

    pub fn set_readme(&self, model_id: &str, response: ReadmeResponse) {
        self.readmes.lock().insert(model_id.to_string(), response);
    }

    /// Block detail fetches until permits are added to the returned gate.
    pub fn gate_details(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.detail_gate.lock() = Some(gate.clone());
        gate
    }

    /// Block the worker thread inside each detail call, after the record
    /// has been looked up, without yielding to the runtime.
    pub fn stall_detail_polls(&self, duration: Duration) {
        *self.detail_stall.lock() = Some(duration);
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Minimal OpenRouter listing record.
pub fn openrouter_model(id: &str, name: &str, prompt_price: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "created": 1714564800,
        "context_length": 8192,
        "architecture": {"modality": "text->text"},
        "pricing": {"prompt": prompt_price, "completion": prompt_price}
    })
}

/// Minimal Hugging Face summary record.
pub fn huggingface_model(id: &str, likes: u64, trending_score: u64) -> Value {
    json!({
        "id": id,
        "likes": likes,
        "trendingScore": trending_score,
        "createdAt": "2024-04-17T09:35:12.000Z"
    })
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn fetch_openrouter_models(&self) -> Vec<Value> {
        self.openrouter_calls.fetch_add(1, Ordering::SeqCst);
        self.openrouter.lock().clone()
    }

    async fn fetch_huggingface_models(&self) -> Vec<Value> {
        self.huggingface_calls.fetch_add(1, Ordering::SeqCst);
        self.huggingface.lock().clone()
    }

    async fn fetch_huggingface_model(&self, model_id: &str) -> Option<Value> {
        let gate = self.detail_gate.lock().clone();
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let detail = self.details.lock().get(model_id).cloned();
        let stall = *self.detail_stall.lock();
        if let Some(stall) = stall {
            std::thread::sleep(stall);
        }
        detail
    }

    async fn fetch_huggingface_readme(
        &self,
        model_id: &str,
    ) -> Result<Option<String>, UpstreamError> {
        self.readme_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.readmes.lock().get(model_id).cloned();
        match response {
            Some(ReadmeResponse::Html(html)) => Ok(Some(html)),
            Some(ReadmeResponse::Missing) | None => Ok(None),
            Some(ReadmeResponse::Fail(status)) => Err(UpstreamError::Status {
                url: format!("fake://{model_id}/README.md"),
                status,
            }),
            Some(ReadmeResponse::Hang) => future::pending().await,
        }
    }
}
