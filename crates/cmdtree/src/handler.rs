//! Command handler types.
//!
//! A handler is the business logic behind one leaf command. It receives the
//! frozen [`ResolvedContext`] as its sole argument and returns an [`Output`].
//! Handlers do not parse arguments, read the environment or apply defaults;
//! by the time they run every field of their effective schema has a value.
//!
//! # Core Types
//!
//! - [`Output`]: What a handler produces (text, structured data, or nothing)
//! - [`HandlerResult`]: The result type for handlers (`Result<Output, Error>`)
//! - [`IntoHandlerResult`]: Lets handlers return `Result<T, E>` directly
//! - [`Handler`]: A cloneable, thread-safe handle to the handler function

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::context::ResolvedContext;

/// What a handler produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Silent exit (no output produced)
    Silent,
    /// Plain text, printed as is
    Text(String),
    /// Structured data, printed as pretty JSON
    Data(serde_json::Value),
}

impl Output {
    /// Returns true if this is silent output.
    pub fn is_silent(&self) -> bool {
        matches!(self, Output::Silent)
    }

    /// The text to print for this output, if any.
    pub fn render(&self) -> Option<String> {
        match self {
            Output::Silent => None,
            Output::Text(text) => Some(text.clone()),
            Output::Data(value) => {
                Some(serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
            }
        }
    }
}

/// The result type for command handlers.
///
/// Handler errors are passed through to the caller untouched.
pub type HandlerResult = Result<Output, anyhow::Error>;

/// Trait for types that can be converted into a [`HandlerResult`].
///
/// This enables handlers to return either `Result<T, E>` directly (serialized
/// into [`Output::Data`], with `()` and `None` becoming [`Output::Silent`]) or
/// the explicit [`HandlerResult`] when fine-grained control is needed.
///
/// ```rust
/// use cmdtree::{HandlerResult, Output, IntoHandlerResult};
///
/// fn simple() -> Result<Vec<u32>, anyhow::Error> {
///     Ok(vec![1, 2])
/// }
/// assert!(matches!(simple().into_handler_result(), Ok(Output::Data(_))));
///
/// fn explicit() -> HandlerResult {
///     Ok(Output::Text("done".into()))
/// }
/// assert!(matches!(explicit().into_handler_result(), Ok(Output::Text(_))));
/// ```
pub trait IntoHandlerResult {
    /// Convert this type into a [`HandlerResult`].
    fn into_handler_result(self) -> HandlerResult;
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: Serialize,
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> HandlerResult {
        let data = self.map_err(Into::into)?;
        match serde_json::to_value(&data)? {
            serde_json::Value::Null => Ok(Output::Silent),
            value => Ok(Output::Data(value)),
        }
    }
}

impl IntoHandlerResult for HandlerResult {
    fn into_handler_result(self) -> HandlerResult {
        self
    }
}

type HandlerFn = dyn Fn(&ResolvedContext) -> HandlerResult + Send + Sync;

/// A cloneable, thread-safe command handler.
///
/// ```rust
/// use cmdtree::{Handler, HandlerResult, Output};
///
/// let hello = Handler::new(|ctx| -> HandlerResult {
///     let name = ctx.get_str("name").unwrap_or("world");
///     Ok(Output::Text(format!("hello {name}")))
/// });
/// # let _ = hello;
/// ```
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Wraps a function receiving the resolved context.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&ResolvedContext) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Handler(Arc::new(move |ctx| f(ctx).into_handler_result()))
    }

    /// Wraps a function taking a typed record deserialized from the context.
    ///
    /// The record's fields are looked up by name, so it is usually the same
    /// struct that declared them with `#[derive(Config)]`.
    pub fn typed<T, F, R>(f: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Handler(Arc::new(move |ctx| {
            let record = ctx.parse::<T>().map_err(|e| {
                anyhow::anyhow!(
                    "cannot read arguments of '{}' as {}: {}",
                    ctx.identity(),
                    std::any::type_name::<T>(),
                    e
                )
            })?;
            f(record).into_handler_result()
        }))
    }

    /// Runs the handler.
    pub fn call(&self, ctx: &ResolvedContext) -> HandlerResult {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
