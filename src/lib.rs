//! # method-wrappers
//!
//! Intercept and compose async method calls on a target object.
//!
//! Callers register handlers that wrap a named method. Handlers chain with
//! those registered earlier and can be removed later. Wrapped calls wait for
//! the target's readiness signal before running.
//!
//! ## Architecture
//!
//! - **Target** ([`Target`]): named async methods, an optional readiness
//!   collaborator and an explicit wrapper registry
//! - **Registry** ([`WrapperRegistry`]): originals captured once, plus handlers
//!   in registration order
//! - **Chain** ([`Next`]): rebuilt from a snapshot of the handlers on every call
//!
//! ## Example
//!
//! ```
//! use method_wrappers::{handler_fn, install, uninstall, Args, Next, Target};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> method_wrappers::Result<()> {
//! let target = Target::builder()
//!     .method("get", |args: Args| async move {
//!         let id: String = args.decode(0)?;
//!         Ok(json!({ "_id": id }))
//!     })
//!     .build();
//!
//! let flag = handler_fn(|next: Next, args: Args| async move {
//!     let mut doc = next.call(args).await?;
//!     doc["flag"] = json!(true);
//!     Ok(doc)
//! });
//!
//! install(&target, [("get", flag.clone())])?;
//! let doc = target.call("get", Args::one("x")).await?;
//! assert_eq!(doc["flag"], json!(true));
//!
//! uninstall(&target, [("get", flag)])?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod method;
pub mod readiness;

mod call;
mod target;

pub use call::PendingCall;
pub use config::{ChainOrder, WrapConfig};
pub use error::{Result, WrapError};
pub use handler::{handler_fn, Handler, HandlerRef, Next, WrapperRegistry};
pub use method::{method_fn, Args, CallResult, Method, MethodRef};
pub use readiness::{Readiness, ReadinessRef, TaskQueue};
pub use target::{install, uninstall, Target, TargetBuilder};
