//! Handler trait, continuation and chain composition.
//!
//! A handler wraps a method call. It receives a [`Next`] continuation and the
//! call arguments, and decides whether, when and with what arguments to call
//! the rest of the chain.
//!
//! # Example
//!
//! ```
//! use method_wrappers::{handler_fn, Args, Next};
//!
//! let audit = handler_fn(|next: Next, args: Args| async move {
//!     let result = next.call(args).await?;
//!     Ok(result)
//! });
//! # let _ = audit;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ChainOrder;
use crate::method::{Args, BoxFuture, CallResult, Method, MethodRef};

/// Trait for handler functions.
pub trait Handler: Send + Sync + 'static {
    /// Handle a call, forwarding to `next` to reach the rest of the chain.
    fn call(&self, next: Next, args: Args) -> BoxFuture<'static, CallResult>;
}

/// Shared handler reference. Uninstall matches on the identity of this `Arc`.
pub type HandlerRef = Arc<dyn Handler>;

/// Wrapper that turns an async closure into a [`Handler`].
pub struct HandlerFn<F, Fut>
where
    F: Fn(Next, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    handler: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> HandlerFn<F, Fut>
where
    F: Fn(Next, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    /// Create a new closure handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Handler for HandlerFn<F, Fut>
where
    F: Fn(Next, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    fn call(&self, next: Next, args: Args) -> BoxFuture<'static, CallResult> {
        Box::pin((self.handler)(next, args))
    }
}

/// Build a [`HandlerRef`] from an async closure.
///
/// Keep a clone of the returned `Arc` if the handler should be uninstalled
/// later; a second call to `handler_fn` with the same closure body creates a
/// distinct handler.
pub fn handler_fn<F, Fut>(handler: F) -> HandlerRef
where
    F: Fn(Next, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    Arc::new(HandlerFn::new(handler))
}

/// Compare handlers by the address of their shared allocation.
///
/// Only the data pointer is compared; vtable pointers for the same type may
/// differ between codegen units.
#[inline]
pub fn same_handler(a: &HandlerRef, b: &HandlerRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Continuation handed to a handler: the rest of the chain, ending in the
/// original method.
#[derive(Clone)]
pub struct Next {
    inner: MethodRef,
}

impl Next {
    /// Wrap a method as a continuation.
    pub fn new(inner: MethodRef) -> Self {
        Self { inner }
    }

    /// Invoke the rest of the chain.
    pub fn call(&self, args: Args) -> BoxFuture<'static, CallResult> {
        self.inner.call(args)
    }
}

/// One handler bound to its continuation.
struct Link {
    handler: HandlerRef,
    next: Next,
}

impl Method for Link {
    fn call(&self, args: Args) -> BoxFuture<'static, CallResult> {
        self.handler.call(self.next.clone(), args)
    }
}

/// Fold `handlers` (in registration order) over `original`.
///
/// With [`ChainOrder::NewestOutermost`] the last registered handler is called
/// first; with [`ChainOrder::NewestInnermost`] it sits next to the original.
/// An empty slice yields the original itself.
pub fn compose(original: MethodRef, handlers: &[HandlerRef], order: ChainOrder) -> Next {
    let link = |next: Next, handler: &HandlerRef| {
        Next::new(Arc::new(Link {
            handler: handler.clone(),
            next,
        }))
    };

    let base = Next::new(original);
    match order {
        ChainOrder::NewestOutermost => handlers.iter().fold(base, link),
        ChainOrder::NewestInnermost => handlers.iter().rev().fold(base, link),
    }
}
