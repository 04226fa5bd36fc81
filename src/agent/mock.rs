//! Scripted agent for tests and offline runs

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{AgentApi, ApiRequest, ApiResponse, Method};
use crate::core::error::AgentError;

type Script = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, AgentError> + Send + Sync>;

/// Records every request and answers from a queue of scripted results.
/// An empty queue falls back to the default responder (`200 {}` unless set).
pub struct MockAgent {
    queue: Mutex<VecDeque<Result<ApiResponse, AgentError>>>,
    routes: Mutex<Vec<(Method, String, Script)>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAgent {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue one result for the next call
    pub fn push(&self, result: Result<ApiResponse, AgentError>) -> &Self {
        self.queue.lock().push_back(result);
        self
    }

    pub fn respond(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(ApiResponse::new(status, body)))
    }

    pub fn fail(&self, err: AgentError) -> &Self {
        self.push(Err(err))
    }

    /// Answer every call matching `method` and `path` with `f`. Queued
    /// results take precedence.
    pub fn route(
        &self,
        method: Method,
        path: impl Into<String>,
        f: impl Fn(&ApiRequest) -> Result<ApiResponse, AgentError> + Send + Sync + 'static,
    ) -> &Self {
        self.routes.lock().push((method, path.into(), Box::new(f)));
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl AgentApi for MockAgent {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, AgentError> {
        self.requests.lock().push(request.clone());

        if let Some(result) = self.queue.lock().pop_front() {
            return result;
        }

        let routes = self.routes.lock();
        match routes
            .iter()
            .find(|(method, path, _)| *method == request.method && *path == request.path)
        {
            Some((_, _, script)) => script(&request),
            None => Ok(ApiResponse::ok(Value::Object(Default::default()))),
        }
    }
}
