//! Handler module - interception and chain composition.
//!
//! Provides:
//! - [`Handler`] - a function that wraps a method call
//! - [`Next`] - the continuation a handler calls to reach the original
//! - [`WrapperRegistry`] - originals and ordered handlers for one target
//!
//! # Example
//!
//! ```
//! use method_wrappers::{handler_fn, Args, Next, Target};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> method_wrappers::Result<()> {
//! let target = Target::builder()
//!     .method("ping", |_args: Args| async { Ok(json!("pong")) })
//!     .build();
//!
//! let shout = handler_fn(|next: Next, args: Args| async move {
//!     let reply = next.call(args).await?;
//!     Ok(json!(reply.as_str().unwrap_or_default().to_uppercase()))
//! });
//!
//! target.install([("ping", shout)])?;
//! assert_eq!(target.call("ping", Args::new()).await?, json!("PONG"));
//! # Ok(())
//! # }
//! ```

mod chain;
mod registry;

pub use chain::{compose, handler_fn, same_handler, Handler, HandlerFn, HandlerRef, Next};
pub use registry::WrapperRegistry;
