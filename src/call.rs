//! Callback-style calls.
//!
//! A callback-style call runs eagerly on the tokio runtime. The error-first
//! callback receives the result when the call resolves or rejects, and the
//! returned [`PendingCall`] resolves to the same result for callers that
//! prefer to await it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{Result, WrapError};
use crate::method::CallResult;

/// Handle to a callback-style call in flight.
///
/// Dropping the handle does not cancel the call; the callback still fires.
#[derive(Debug)]
pub struct PendingCall {
    method: String,
    handle: JoinHandle<CallResult>,
}

impl PendingCall {
    /// Spawn `call` on the current runtime and route its result through `callback`.
    ///
    /// Returns [`WrapError::NoRuntime`] when called outside a tokio runtime.
    pub(crate) fn spawn<Fut, F>(method: &str, call: Fut, callback: F) -> Result<Self>
    where
        Fut: Future<Output = CallResult> + Send + 'static,
        F: FnOnce(CallResult) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| WrapError::NoRuntime)?;
        let handle = runtime.spawn(async move {
            let result = call.await;
            callback(result.clone());
            result
        });

        Ok(Self {
            method: method.to_string(),
            handle,
        })
    }

    /// Name of the method being called.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Check if the call and its callback have completed.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => {
                tracing::error!("Callback call for method {} did not complete: {}", self.method, e);
                Poll::Ready(Err(WrapError::Cancelled))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_callback_and_future_see_same_result() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingCall::spawn("get", async { Ok(json!(1)) }, move |r| {
            let _ = tx.send(r);
        })
        .unwrap();

        assert_eq!(pending.method(), "get");
        assert_eq!(pending.await.unwrap(), json!(1));
        assert_eq!(rx.await.unwrap().unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_callback_receives_error() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingCall::spawn(
            "get",
            async { Err(WrapError::method("get", "missing")) },
            move |r| {
                let _ = tx.send(r);
            },
        )
        .unwrap();

        assert!(pending.await.is_err());
        assert_eq!(
            rx.await.unwrap().unwrap_err(),
            WrapError::method("get", "missing")
        );
    }

    #[tokio::test]
    async fn test_dropped_handle_still_fires_callback() {
        let (tx, rx) = oneshot::channel();
        drop(PendingCall::spawn("put", async { Ok(json!("ok")) }, move |r| {
            let _ = tx.send(r);
        }));

        assert_eq!(rx.await.unwrap().unwrap(), json!("ok"));
    }

    #[tokio::test]
    async fn test_panicking_callback_is_cancelled() {
        let pending = PendingCall::spawn("put", async { Ok(json!(null)) }, |_r| {
            panic!("callback exploded");
        })
        .unwrap();

        assert_eq!(pending.await.unwrap_err(), WrapError::Cancelled);
    }

    #[test]
    fn test_spawn_outside_runtime_fails() {
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = called.clone();

        let err = PendingCall::spawn("get", async { Ok(json!(1)) }, move |_r| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap_err();

        assert_eq!(err, WrapError::NoRuntime);
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }
}
