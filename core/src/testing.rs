//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::store::{KeyValueStore, MemoryStore, StoreError};
use crate::transport::Transport;

/// Replays queued responses in order and records every request it sees.
/// Running out of responses is reported as a transport failure.
#[derive(Default)]
pub struct StubTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, status: u16, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(ApiError::Transport(reason)),
            None => Err(ApiError::Transport("no scripted response".to_string())),
        }
    }
}

/// Runs a hook while the request is in flight, then defers to a `StubTransport`.
pub struct HookTransport {
    inner: Arc<StubTransport>,
    hook: Box<dyn Fn() + Send + Sync>,
}

impl HookTransport {
    pub fn new(inner: Arc<StubTransport>, hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            inner,
            hook: Box::new(hook),
        }
    }
}

impl Transport for HookTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (self.hook)();
        self.inner.execute(request)
    }
}

/// A `MemoryStore` that counts read operations.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
    }
}

impl KeyValueStore for CountingStore {
    fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<String>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_many(keys)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        self.inner.set_many(entries)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.inner.remove_many(keys)
    }

    fn set_many_if(
        &self,
        key: &str,
        expected: &str,
        entries: &[(&str, &str)],
    ) -> Result<bool, StoreError> {
        self.inner.set_many_if(key, expected, entries)
    }
}
