//! Error normalization for plugin dispatch entrypoints.
//!
//! Every failure shape collapses into one [`ResponseEnvelope`] delivered
//! through the reply, and the dispatch resolves to [`Outcome::Error`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use acaflow_protocol::ResponseEnvelope;
use futures::{FutureExt, future::BoxFuture};
use serde_json::Value;
use tracing::error;

use crate::core::{
    error::{AgentError, DispatchError},
    message::Message,
    plugin::Outcome,
    reply::Reply,
};

/// Envelope describing a dispatch failure
pub fn envelope_for(err: &DispatchError) -> ResponseEnvelope {
    match err.agent_error() {
        Some(AgentError::Remote { status, data }) => ResponseEnvelope::error(*status, data.clone()),
        Some(AgentError::Transport(diagnostic)) => ResponseEnvelope::internal(diagnostic.clone()),
        None => ResponseEnvelope::internal(err.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Value {
    if let Some(s) = payload.downcast_ref::<&str>() {
        Value::from(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        Value::from(s.clone())
    } else {
        Value::from("panic with non-string payload")
    }
}

/// Run a dispatch future. Its result passes through unchanged on success;
/// an error or panic is answered on `reply` and turned into `Outcome::Error`.
pub async fn normalize<F>(reply: &Reply, dispatch: F) -> Outcome
where
    F: Future<Output = Result<Outcome, DispatchError>>,
{
    match AssertUnwindSafe(dispatch).catch_unwind().await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            error!("Dispatch failed: {}", err);
            reply.send(envelope_for(&err));
            Outcome::Error
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Dispatch panicked: {}", message);
            reply.send(ResponseEnvelope::internal(message));
            Outcome::Error
        }
    }
}

/// Wrap a dispatch function so every call goes through [`normalize`]
pub fn normalized<F, Fut>(dispatch: F) -> impl Fn(Message, Reply) -> BoxFuture<'static, Outcome>
where
    F: Fn(Message, Reply) -> Fut,
    Fut: Future<Output = Result<Outcome, DispatchError>> + Send + 'static,
{
    move |message: Message, reply: Reply| {
        let fut = dispatch(message, reply.clone());
        async move { normalize(&reply, fut).await }.boxed()
    }
}
