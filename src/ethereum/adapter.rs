use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::interface::ReturnType;
use super::output::{FromOutput, Output};
use crate::error::{ContractError, Result};

/// Annotation that asks for a method to run on a spawned task.
pub const SPAWN_ANNOTATION: &str = "spawn";

/// The deferred dispatch of one call.
pub type Thunk = Pin<Box<dyn Future<Output = Result<Output>> + Send + 'static>>;

#[async_trait]
pub trait CallAdapter: fmt::Debug + Send + Sync {
    fn can_adapt(&self, declared: &ReturnType, annotations: &[String]) -> bool;

    /// The shape the dispatch engine must produce before adaptation.
    fn actual_return_type(&self, declared: &ReturnType) -> ReturnType;

    async fn adapt(&self, thunk: Thunk) -> Result<Output>;
}

/// Runs the call inline and returns its result unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughAdapter;

#[async_trait]
impl CallAdapter for PassThroughAdapter {
    fn can_adapt(&self, _declared: &ReturnType, _annotations: &[String]) -> bool {
        true
    }

    fn actual_return_type(&self, declared: &ReturnType) -> ReturnType {
        declared.clone()
    }

    async fn adapt(&self, thunk: Thunk) -> Result<Output> {
        thunk.await
    }
}

/// Runs the call on a tokio task and returns [`Output::Pending`] right away.
///
/// Handles `future<T>` return types and methods annotated with `spawn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnAdapter;

#[async_trait]
impl CallAdapter for SpawnAdapter {
    fn can_adapt(&self, declared: &ReturnType, annotations: &[String]) -> bool {
        matches!(declared, ReturnType::Deferred(_))
            || annotations.iter().any(|a| a == SPAWN_ANNOTATION)
    }

    fn actual_return_type(&self, declared: &ReturnType) -> ReturnType {
        match declared {
            ReturnType::Deferred(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    async fn adapt(&self, thunk: Thunk) -> Result<Output> {
        Ok(Output::Pending(PendingCall::spawn(thunk)))
    }
}

/// Handle to a call running on a spawned task.
///
/// The task is started once; awaiting the handle yields its result or failure.
#[derive(Debug)]
pub struct PendingCall {
    handle: JoinHandle<Result<Output>>,
}

impl PendingCall {
    pub fn spawn(thunk: Thunk) -> Self {
        Self {
            handle: tokio::spawn(thunk),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<Output> {
        self.handle
            .await
            .map_err(|e| ContractError::Join(e.to_string()))?
    }

    pub async fn wait_as<T: FromOutput>(self) -> Result<T> {
        T::from_output(self.wait().await?)
    }
}

/// First adapter in registration order that accepts the method.
pub fn select<'a>(
    adapters: &'a [Arc<dyn CallAdapter>],
    declared: &ReturnType,
    annotations: &[String],
) -> Option<&'a Arc<dyn CallAdapter>> {
    adapters
        .iter()
        .find(|adapter| adapter.can_adapt(declared, annotations))
}
