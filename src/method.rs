//! Methods and call arguments.
//!
//! A target exposes named [`Method`]s. Arguments are positional JSON values
//! ([`Args`]) and every call resolves to a JSON [`Value`] or a [`WrapError`].

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, WrapError};

/// Boxed future for method and handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a method call.
pub type CallResult = Result<Value>;

/// Trait for method implementations exposed by a target.
pub trait Method: Send + Sync + 'static {
    /// Invoke the method with positional arguments.
    fn call(&self, args: Args) -> BoxFuture<'static, CallResult>;
}

/// Shared method reference.
pub type MethodRef = Arc<dyn Method>;

/// Wrapper that turns an async closure into a [`Method`].
pub struct MethodFn<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    method: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> MethodFn<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    /// Create a new closure method.
    pub fn new(method: F) -> Self {
        Self {
            method,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Method for MethodFn<F, Fut>
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    fn call(&self, args: Args) -> BoxFuture<'static, CallResult> {
        Box::pin((self.method)(args))
    }
}

/// Build a [`MethodRef`] from an async closure.
pub fn method_fn<F, Fut>(method: F) -> MethodRef
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallResult> + Send + 'static,
{
    Arc::new(MethodFn::new(method))
}

/// Positional call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// Empty argument list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Single argument from any serializable value.
    ///
    /// Values that fail to serialize become `null`; use [`Args::try_one`]
    /// when that must be reported.
    pub fn one<T: Serialize>(value: T) -> Self {
        Self(vec![serde_json::to_value(value).unwrap_or(Value::Null)])
    }

    /// Single argument, failing with [`WrapError::InvalidArgument`] if the
    /// value cannot be serialized.
    pub fn try_one<T: Serialize>(value: T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| WrapError::InvalidArgument {
            index: 0,
            message: e.to_string(),
        })?;
        Ok(Self(vec![value]))
    }

    /// Get an argument by position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Get a mutable argument by position.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.0.get_mut(index)
    }

    /// Decode the argument at `index` into a typed value.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.0.get(index).ok_or_else(|| WrapError::InvalidArgument {
            index,
            message: "missing argument".to_string(),
        })?;
        T::deserialize(value).map_err(|e| WrapError::InvalidArgument {
            index,
            message: e.to_string(),
        })
    }

    /// Append an argument.
    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the arguments.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Into the underlying values.
    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Args {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
