//! Callback registrations and handler invocation
//!
//! A callback watches a set of component properties (inputs), reads a second
//! set without being triggered by it (state), and produces the new value of
//! one output property. Handlers come in two conventions:
//!
//! - positional: the handler receives the input then state values in
//!   registration order,
//! - expanded: the handler receives an [`ExpandedArgs`] bundle carrying the
//!   same values plus a caller-supplied [`CallContext`].

pub mod dispatch;
pub mod request;

pub use dispatch::{prepare, PreparedCall};
pub use request::{DispatchRequest, PropertyValue};

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors a handler can return
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("invalid argument {index}: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("{0}")]
    Failed(String),
}

impl CallbackError {
    pub fn invalid_argument(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            index,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type HandlerResult = Result<Value, CallbackError>;

/// Extra key/value context supplied by the host at dispatch time
pub type CallContext = IndexMap<String, Value>;

/// A component property, e.g. `slider.value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub id: String,
    pub property: String,
}

impl ComponentRef {
    pub fn new(id: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            property: property.into(),
        }
    }

    /// Callback map key: `"<id>.<property>"`
    pub fn target(&self) -> String {
        format!("{}.{}", self.id, self.property)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.property)
    }
}

/// The dependency part of a callback registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackSpec {
    pub output: ComponentRef,
    pub inputs: Vec<ComponentRef>,
    pub state: Vec<ComponentRef>,
    pub events: Vec<ComponentRef>,
}

impl CallbackSpec {
    pub fn new(output: ComponentRef) -> Self {
        Self {
            output,
            inputs: Vec::new(),
            state: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = ComponentRef>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_state(mut self, state: impl IntoIterator<Item = ComponentRef>) -> Self {
        self.state.extend(state);
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = ComponentRef>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn target(&self) -> String {
        self.output.target()
    }
}

/// Argument bundle handed to expanded handlers
#[derive(Debug, Clone, Copy)]
pub struct ExpandedArgs<'a> {
    /// Input values then state values, in registration order
    pub args: &'a [Value],
    pub context: &'a CallContext,
}

impl<'a> ExpandedArgs<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    pub fn context_value(&self, key: &str) -> Option<&'a Value> {
        self.context.get(key)
    }
}

type PositionalFn = dyn Fn(&[Value]) -> HandlerResult + Send + Sync;
type ExpandedFn = dyn Fn(ExpandedArgs<'_>) -> HandlerResult + Send + Sync;

/// A callback handler in one of the two calling conventions
#[derive(Clone)]
pub enum Handler {
    Positional(Arc<PositionalFn>),
    Expanded(Arc<ExpandedFn>),
}

impl Handler {
    pub fn positional<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Positional(Arc::new(f))
    }

    pub fn expanded<F>(f: F) -> Self
    where
        F: Fn(ExpandedArgs<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Expanded(Arc::new(f))
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Handler::Expanded(_))
    }

    /// Call the handler; positional handlers never see `context`
    pub fn invoke(&self, args: &[Value], context: &CallContext) -> HandlerResult {
        match self {
            Handler::Positional(f) => f(args),
            Handler::Expanded(f) => f(ExpandedArgs { args, context }),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Positional(_) => f.write_str("Handler::Positional(..)"),
            Handler::Expanded(_) => f.write_str("Handler::Expanded(..)"),
        }
    }
}

/// A registration as stored in a callback map
#[derive(Debug, Clone)]
pub struct CallbackDefinition {
    pub spec: CallbackSpec,
    pub handler: Handler,
}

impl CallbackDefinition {
    pub fn new(spec: CallbackSpec, handler: Handler) -> Self {
        Self { spec, handler }
    }
}

/// Registered callbacks keyed by `"<output id>.<output property>"`
pub type CallbackMap = IndexMap<String, CallbackDefinition>;

/// How the host should route update requests for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Through the wrapped framework's own update view, without context
    Framework,
    /// Through the bridge with host-supplied context for expanded handlers
    Expanded,
}
