//! Per-target wrapper registry.
//!
//! Holds the originals map (method name to the implementation captured on the
//! first install) and the handlers map (method name to handlers in
//! registration order). The registry never touches the target's method slots;
//! [`Target`](crate::Target) decides when a slot is replaced.

use std::collections::HashMap;

use super::chain::{compose, same_handler, HandlerRef, Next};
use crate::config::ChainOrder;
use crate::error::{Result, WrapError};
use crate::method::MethodRef;

/// Registry of originals and handlers for one target.
#[derive(Default)]
pub struct WrapperRegistry {
    /// Originals by method name, captured once.
    originals: HashMap<String, MethodRef>,
    /// Handlers by method name, oldest first.
    handlers: HashMap<String, Vec<HandlerRef>>,
}

impl WrapperRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the original implementation of `method`.
    ///
    /// Returns `false` and keeps the existing entry if one was already captured.
    pub fn capture_original(&mut self, method: &str, original: MethodRef) -> bool {
        if self.originals.contains_key(method) {
            return false;
        }
        self.originals.insert(method.to_string(), original);
        true
    }

    /// Append a handler and return the new handler count for `method`.
    pub fn push_handler(&mut self, method: &str, handler: HandlerRef) -> usize {
        let list = self.handlers.entry(method.to_string()).or_default();
        list.push(handler);
        list.len()
    }

    /// Remove the earliest registered occurrence of `handler` from `method`.
    ///
    /// The method keeps its (possibly empty) handler list.
    pub fn remove_handler(&mut self, method: &str, handler: &HandlerRef) -> Result<()> {
        let not_installed = || WrapError::HandlerNotInstalled {
            method: method.to_string(),
        };

        let list = self.handlers.get_mut(method).ok_or_else(not_installed)?;
        let index = list
            .iter()
            .position(|h| same_handler(h, handler))
            .ok_or_else(not_installed)?;
        list.remove(index);
        Ok(())
    }

    /// Get the captured original for a method.
    pub fn original(&self, method: &str) -> Option<MethodRef> {
        self.originals.get(method).cloned()
    }

    /// Number of handlers currently registered for a method.
    pub fn handler_count(&self, method: &str) -> usize {
        self.handlers.get(method).map_or(0, Vec::len)
    }

    /// Build the call chain for `method` from the current handler list.
    ///
    /// The chain is a snapshot; later installs or uninstalls do not affect it.
    pub fn compose(&self, method: &str, order: ChainOrder) -> Result<Next> {
        let original = self
            .original(method)
            .ok_or_else(|| WrapError::MethodNotFound {
                method: method.to_string(),
            })?;
        let handlers = self.handlers.get(method).map_or(&[][..], Vec::as_slice);
        Ok(compose(original, handlers, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::method::{method_fn, Args};
    use crate::Next;
    use serde_json::json;

    fn passthrough() -> HandlerRef {
        handler_fn(|next: Next, args: Args| async move { next.call(args).await })
    }

    fn constant(value: i64) -> MethodRef {
        method_fn(move |_args: Args| async move { Ok(json!(value)) })
    }

    #[test]
    fn test_capture_original_once() {
        let mut registry = WrapperRegistry::new();

        assert!(registry.capture_original("get", constant(1)));
        assert!(!registry.capture_original("get", constant(2)));
        assert!(registry.original("get").is_some());
        assert!(registry.original("put").is_none());
    }

    #[test]
    fn test_push_handler_counts() {
        let mut registry = WrapperRegistry::new();

        assert_eq!(registry.push_handler("get", passthrough()), 1);
        assert_eq!(registry.push_handler("get", passthrough()), 2);
        assert_eq!(registry.push_handler("put", passthrough()), 1);
        assert_eq!(registry.handler_count("get"), 2);
        assert_eq!(registry.handler_count("missing"), 0);
    }

    #[test]
    fn test_remove_single_occurrence() {
        let mut registry = WrapperRegistry::new();
        let handler = passthrough();

        registry.push_handler("get", handler.clone());
        registry.push_handler("get", handler.clone());

        registry.remove_handler("get", &handler).unwrap();
        assert_eq!(registry.handler_count("get"), 1);

        registry.remove_handler("get", &handler).unwrap();
        assert_eq!(registry.handler_count("get"), 0);

        let err = registry.remove_handler("get", &handler).unwrap_err();
        assert!(matches!(err, WrapError::HandlerNotInstalled { method } if method == "get"));
    }

    #[test]
    fn test_remove_unknown_method() {
        let mut registry = WrapperRegistry::new();
        let err = registry.remove_handler("get", &passthrough()).unwrap_err();
        assert!(matches!(err, WrapError::HandlerNotInstalled { .. }));
    }

    #[tokio::test]
    async fn test_compose_without_handlers_runs_original() {
        let mut registry = WrapperRegistry::new();
        registry.capture_original("get", constant(5));

        let next = registry.compose("get", ChainOrder::default()).unwrap();
        assert_eq!(next.call(Args::new()).await.unwrap(), json!(5));

        assert!(registry.compose("put", ChainOrder::default()).is_err());
    }
}
