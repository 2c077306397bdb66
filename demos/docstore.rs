//! Document store - wrapping a client that opens asynchronously.
//!
//! This example demonstrates:
//! - Exposing `put`/`get` methods on a target with the builder
//! - Gating wrapped calls on a task queue that opens after a delay
//! - Installing two handlers and removing one again
//! - Calling in both deferred and callback style
//!
//! Run with `RUST_LOG=method_wrappers=trace cargo run --example docstore`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use method_wrappers::{handler_fn, install, uninstall, Args, Next, Target, TaskQueue, WrapError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let docs: Arc<Mutex<HashMap<String, Value>>> = Arc::default();
    let put_docs = docs.clone();
    let queue = TaskQueue::new();

    let db = Target::builder()
        .method("put", move |args: Args| {
            let docs = put_docs.clone();
            async move {
                let doc = args.get(0).cloned().unwrap_or(Value::Null);
                let id = doc["_id"]
                    .as_str()
                    .ok_or_else(|| WrapError::method("put", "document has no _id"))?
                    .to_string();
                docs.lock().insert(id.clone(), doc);
                Ok(json!({ "ok": true, "id": id }))
            }
        })
        .method("get", move |args: Args| {
            let docs = docs.clone();
            async move {
                let id: String = args.decode(0)?;
                docs.lock()
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| WrapError::method("get", format!("missing: {}", id)))
            }
        })
        .readiness(queue.clone())
        .build();

    // Stamp documents on the way in, flag them on the way out.
    let stamp = handler_fn(|next: Next, mut args: Args| async move {
        if let Some(doc) = args.get_mut(0) {
            doc["stamped"] = json!(true);
        }
        next.call(args).await
    });
    let flag = handler_fn(|next: Next, args: Args| async move {
        let mut doc = next.call(args).await?;
        doc["flag"] = json!(true);
        Ok(doc)
    });
    install(&db, [("put", stamp), ("get", flag.clone())])?;

    // Open the store a little later; calls made before then wait.
    let opener = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        opener.ready();
    });

    db.call("put", Args::one(json!({ "_id": "mydoc", "title": "hello" })))
        .await?;
    let doc = db.call("get", Args::one("mydoc")).await?;
    println!("deferred: {}", doc);

    uninstall(&db, [("get", flag)])?;
    let pending = db.call_with_callback("get", Args::one("mydoc"), |result| match result {
        Ok(doc) => println!("callback: {}", doc),
        Err(e) => eprintln!("callback error: {}", e),
    })?;
    pending.await?;

    Ok(())
}
