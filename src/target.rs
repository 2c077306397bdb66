//! Target object and its builder.
//!
//! A [`Target`] is a named set of async methods with an optional readiness
//! collaborator. Installing a handler for a method captures the original
//! implementation once and replaces the method's slot with a composed
//! wrapper. From then on every call waits for readiness, snapshots the
//! handler list and runs the chain down to the original.
//!
//! # Example
//!
//! ```
//! use method_wrappers::{handler_fn, Args, Next, Target, TaskQueue};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> method_wrappers::Result<()> {
//! let queue = TaskQueue::new();
//! let target = Target::builder()
//!     .method("get", |args: Args| async move {
//!         let id: String = args.decode(0)?;
//!         Ok(json!({ "_id": id }))
//!     })
//!     .readiness(queue.clone())
//!     .build();
//!
//! let flag = handler_fn(|next: Next, args: Args| async move {
//!     let mut doc = next.call(args).await?;
//!     doc["flag"] = json!(true);
//!     Ok(doc)
//! });
//! target.install([("get", flag.clone())])?;
//!
//! queue.ready();
//! let doc = target.call("get", Args::one("x")).await?;
//! assert_eq!(doc["flag"], json!(true));
//!
//! target.uninstall([("get", flag)])?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::call::PendingCall;
use crate::config::{ChainOrder, WrapConfig};
use crate::error::{Result, WrapError};
use crate::handler::{HandlerRef, Next, WrapperRegistry};
use crate::method::{method_fn, Args, CallResult, MethodRef};
use crate::readiness::{wait_ready, Readiness, ReadinessRef};

/// What a method name currently resolves to.
enum MethodSlot {
    /// Not wrapped; calls go straight to the implementation.
    Original(MethodRef),
    /// Wrapped; calls go through the registry's chain.
    Composed,
}

enum Dispatch {
    Direct(MethodRef),
    Composed,
}

struct TargetState {
    slots: HashMap<String, MethodSlot>,
    /// `None` until the first install.
    wrappers: Option<WrapperRegistry>,
}

struct TargetInner {
    state: RwLock<TargetState>,
    readiness: Option<ReadinessRef>,
    config: WrapConfig,
}

/// Builder for configuring and creating a [`Target`].
pub struct TargetBuilder {
    methods: HashMap<String, MethodRef>,
    readiness: Option<ReadinessRef>,
    config: WrapConfig,
}

impl TargetBuilder {
    /// Create a new target builder.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            readiness: None,
            config: WrapConfig::default(),
        }
    }

    /// Expose a method implemented by an async closure.
    ///
    /// Registering the same name twice keeps the last implementation.
    pub fn method<F, Fut>(self, name: &str, method: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        self.method_ref(name, method_fn(method))
    }

    /// Expose an existing method implementation.
    pub fn method_ref(mut self, name: &str, method: MethodRef) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }

    /// Attach a readiness collaborator.
    pub fn readiness<R: Readiness>(mut self, readiness: R) -> Self {
        self.readiness = Some(Arc::new(readiness));
        self
    }

    /// Attach a shared readiness collaborator.
    pub fn readiness_ref(mut self, readiness: ReadinessRef) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Set the handler composition order.
    ///
    /// Default: [`ChainOrder::NewestOutermost`]
    pub fn order(mut self, order: ChainOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Replace the table of methods that refuse callback-style calls.
    ///
    /// Default: `changes`
    pub fn callback_exempt<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.callback_exempt = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable the readiness wait for composed calls.
    ///
    /// Default: true
    pub fn await_readiness(mut self, enabled: bool) -> Self {
        self.config.await_readiness = enabled;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: WrapConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the target.
    pub fn build(self) -> Target {
        let slots = self
            .methods
            .into_iter()
            .map(|(name, method)| (name, MethodSlot::Original(method)))
            .collect();

        Target {
            inner: Arc::new(TargetInner {
                state: RwLock::new(TargetState {
                    slots,
                    wrappers: None,
                }),
                readiness: self.readiness,
                config: self.config,
            }),
        }
    }
}

impl Default for TargetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An object whose methods can be intercepted.
///
/// Cloning a `Target` yields another handle to the same methods and registry.
#[derive(Clone)]
pub struct Target {
    inner: Arc<TargetInner>,
}

impl Target {
    /// Create a new target builder.
    pub fn builder() -> TargetBuilder {
        TargetBuilder::new()
    }

    /// Install handlers, one per `(method, handler)` entry, in order.
    ///
    /// The first handler for a method captures the original and replaces the
    /// method's slot with the composed wrapper. Later handlers are appended.
    ///
    /// # Errors
    ///
    /// Returns [`WrapError::MethodNotFound`] for a method the target does not
    /// expose. Entries before the failing one stay installed.
    pub fn install<I, S>(&self, handlers: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, HandlerRef)>,
        S: AsRef<str>,
    {
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        let registry = state.wrappers.get_or_insert_with(WrapperRegistry::new);

        for (method, handler) in handlers {
            let method = method.as_ref();
            let slot = state
                .slots
                .get_mut(method)
                .ok_or_else(|| WrapError::MethodNotFound {
                    method: method.to_string(),
                })?;

            if let MethodSlot::Original(original) = slot {
                registry.capture_original(method, original.clone());
                *slot = MethodSlot::Composed;
                tracing::debug!("Replaced method '{}' with composed wrapper", method);
            }

            let count = registry.push_handler(method, handler);
            tracing::debug!("Installed handler for '{}' ({} total)", method, count);
        }

        Ok(())
    }

    /// Remove one occurrence of each `(method, handler)` entry.
    ///
    /// The composed wrapper stays in place even when a method's list becomes
    /// empty; calls then reach the original through an empty chain.
    ///
    /// # Errors
    ///
    /// - [`WrapError::NoWrappersInstalled`] if nothing was ever installed
    /// - [`WrapError::HandlerNotInstalled`] if the exact handler is not
    ///   registered for the method; earlier entries stay removed
    pub fn uninstall<I, S>(&self, handlers: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, HandlerRef)>,
        S: AsRef<str>,
    {
        let mut state = self.inner.state.write();
        let registry = state
            .wrappers
            .as_mut()
            .ok_or(WrapError::NoWrappersInstalled)?;

        for (method, handler) in handlers {
            let method = method.as_ref();
            registry.remove_handler(method, &handler)?;
            tracing::debug!(
                "Uninstalled handler for '{}' ({} left)",
                method,
                registry.handler_count(method)
            );
        }

        Ok(())
    }

    /// Call a method in deferred style.
    ///
    /// Wrapped methods wait for readiness first, then run the chain built
    /// from the handlers registered at that moment.
    pub async fn call(&self, method: &str, args: Args) -> CallResult {
        match self.dispatch(method)? {
            Dispatch::Direct(original) => original.call(args).await,
            Dispatch::Composed => {
                self.await_ready(method).await?;
                let next = self.compose(method)?;
                tracing::trace!("Running composed call for '{}'", method);
                next.call(args).await
            }
        }
    }

    /// Call a method in callback style.
    ///
    /// The call starts immediately on the tokio runtime. `callback` receives
    /// the result, and the returned [`PendingCall`] resolves to it as well.
    ///
    /// # Errors
    ///
    /// - [`WrapError::CallbackUnsupported`] for methods in the configured
    ///   exemption table
    /// - [`WrapError::NoRuntime`] when called outside a tokio runtime
    pub fn call_with_callback<F>(
        &self,
        method: &str,
        args: Args,
        callback: F,
    ) -> Result<PendingCall>
    where
        F: FnOnce(CallResult) + Send + 'static,
    {
        if self.inner.config.is_callback_exempt(method) {
            return Err(WrapError::CallbackUnsupported {
                method: method.to_string(),
            });
        }

        let target = self.clone();
        let name = method.to_string();
        let call = async move { target.call(&name, args).await };
        PendingCall::spawn(method, call, callback)
    }

    /// Check if the target exposes a method.
    pub fn has_method(&self, method: &str) -> bool {
        self.inner.state.read().slots.contains_key(method)
    }

    /// Check if a method's slot holds the composed wrapper.
    pub fn is_wrapped(&self, method: &str) -> bool {
        matches!(
            self.inner.state.read().slots.get(method),
            Some(MethodSlot::Composed)
        )
    }

    /// Number of handlers registered for a method.
    pub fn handler_count(&self, method: &str) -> usize {
        self.inner
            .state
            .read()
            .wrappers
            .as_ref()
            .map_or(0, |w| w.handler_count(method))
    }

    /// The original implementation captured for a wrapped method.
    pub fn original(&self, method: &str) -> Option<MethodRef> {
        self.inner
            .state
            .read()
            .wrappers
            .as_ref()
            .and_then(|w| w.original(method))
    }

    /// Names of all exposed methods, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state.read().slots.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if calls can run without waiting.
    pub fn is_ready(&self) -> bool {
        self.inner
            .readiness
            .as_ref()
            .map_or(true, |r| r.is_ready())
    }

    /// The configuration this target was built with.
    pub fn config(&self) -> &WrapConfig {
        &self.inner.config
    }

    fn dispatch(&self, method: &str) -> Result<Dispatch> {
        let state = self.inner.state.read();
        match state.slots.get(method) {
            Some(MethodSlot::Original(original)) => Ok(Dispatch::Direct(original.clone())),
            Some(MethodSlot::Composed) => Ok(Dispatch::Composed),
            None => Err(WrapError::MethodNotFound {
                method: method.to_string(),
            }),
        }
    }

    fn compose(&self, method: &str) -> Result<Next> {
        let state = self.inner.state.read();
        let registry = state
            .wrappers
            .as_ref()
            .ok_or_else(|| WrapError::MethodNotFound {
                method: method.to_string(),
            })?;
        registry.compose(method, self.inner.config.order)
    }

    async fn await_ready(&self, method: &str) -> Result<()> {
        if !self.inner.config.await_readiness {
            return Ok(());
        }
        let Some(readiness) = &self.inner.readiness else {
            return Ok(());
        };
        if readiness.is_ready() {
            return Ok(());
        }

        tracing::trace!("Call to '{}' waiting for readiness", method);
        if let Err(e) = wait_ready(readiness.as_ref()).await {
            tracing::warn!("Call to '{}' failed waiting for readiness: {}", method, e);
            return Err(e);
        }
        Ok(())
    }
}

/// Install handlers on `target`. See [`Target::install`].
pub fn install<I, S>(target: &Target, handlers: I) -> Result<()>
where
    I: IntoIterator<Item = (S, HandlerRef)>,
    S: AsRef<str>,
{
    target.install(handlers)
}

/// Uninstall handlers from `target`. See [`Target::uninstall`].
pub fn uninstall<I, S>(target: &Target, handlers: I) -> Result<()>
where
    I: IntoIterator<Item = (S, HandlerRef)>,
    S: AsRef<str>,
{
    target.uninstall(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::readiness::TaskQueue;
    use serde_json::json;
    use tokio::sync::oneshot;

    fn counter_target() -> Target {
        Target::builder()
            .method("count", |args: Args| async move { Ok(json!(args.len())) })
            .method("changes", |_args: Args| async { Ok(json!([])) })
            .build()
    }

    fn passthrough() -> HandlerRef {
        handler_fn(|next: Next, args: Args| async move { next.call(args).await })
    }

    #[test]
    fn test_builder_configuration() {
        let target = Target::builder()
            .order(ChainOrder::NewestInnermost)
            .callback_exempt(["sync"])
            .await_readiness(false)
            .build();

        assert_eq!(target.config().order, ChainOrder::NewestInnermost);
        assert!(target.config().is_callback_exempt("sync"));
        assert!(!target.config().is_callback_exempt("changes"));
        assert!(!target.config().await_readiness);
    }

    #[test]
    fn test_builder_methods() {
        let target = counter_target();

        assert!(target.has_method("count"));
        assert!(!target.has_method("missing"));
        assert_eq!(target.method_names(), vec!["changes", "count"]);
        assert!(target.is_ready());
    }

    #[test]
    fn test_install_replaces_slot_once() {
        let target = counter_target();
        assert!(!target.is_wrapped("count"));
        assert!(target.original("count").is_none());

        target.install([("count", passthrough())]).unwrap();
        let first = target.original("count").unwrap();
        assert!(target.is_wrapped("count"));

        target.install([("count", passthrough())]).unwrap();
        let second = target.original("count").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(target.handler_count("count"), 2);
    }

    #[test]
    fn test_uninstall_keeps_wrapper() {
        let target = counter_target();
        let handler = passthrough();

        target.install([("count", handler.clone())]).unwrap();
        target.uninstall([("count", handler)]).unwrap();

        assert!(target.is_wrapped("count"));
        assert_eq!(target.handler_count("count"), 0);
    }

    #[test]
    fn test_failed_install_still_creates_registry() {
        let target = counter_target();

        let err = target.install([("missing", passthrough())]).unwrap_err();
        assert!(matches!(err, WrapError::MethodNotFound { .. }));

        let err = target.uninstall([("count", passthrough())]).unwrap_err();
        assert!(matches!(err, WrapError::HandlerNotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_call_unknown_method() {
        let target = counter_target();
        let err = target.call("missing", Args::new()).await.unwrap_err();
        assert!(matches!(err, WrapError::MethodNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unwrapped_call_skips_readiness() {
        let queue = TaskQueue::new();
        let target = Target::builder()
            .method("count", |args: Args| async move { Ok(json!(args.len())) })
            .readiness(queue.clone())
            .build();

        assert!(!target.is_ready());
        let result = target.call("count", Args::one(1)).await.unwrap();
        assert_eq!(result, json!(1));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_readiness_wait_can_be_disabled() {
        let target = Target::builder()
            .method("count", |args: Args| async move { Ok(json!(args.len())) })
            .readiness(TaskQueue::new())
            .await_readiness(false)
            .build();

        target.install([("count", passthrough())]).unwrap();
        let result = target.call("count", Args::new()).await.unwrap();
        assert_eq!(result, json!(0));
    }

    #[tokio::test]
    async fn test_call_with_callback() {
        let target = counter_target();
        target.install([("count", passthrough())]).unwrap();

        let (tx, rx) = oneshot::channel();
        let pending = target
            .call_with_callback("count", Args::from(vec![json!(1), json!(2)]), move |r| {
                let _ = tx.send(r);
            })
            .unwrap();

        assert_eq!(pending.await.unwrap(), json!(2));
        assert_eq!(rx.await.unwrap().unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_callback_exempt_method() {
        let target = counter_target();

        let err = target
            .call_with_callback("changes", Args::new(), |_r| {})
            .unwrap_err();
        assert_eq!(
            err,
            WrapError::CallbackUnsupported {
                method: "changes".into()
            }
        );

        // Deferred style is still available.
        assert_eq!(target.call("changes", Args::new()).await.unwrap(), json!([]));
    }

    #[test]
    fn test_call_with_callback_outside_runtime() {
        let target = counter_target();

        let err = target
            .call_with_callback("count", Args::new(), |_r| {})
            .unwrap_err();
        assert_eq!(err, WrapError::NoRuntime);
    }
}
