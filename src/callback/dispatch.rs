//! Translating a request into a handler call

use serde_json::Value;
use tracing::debug;

use super::{
    CallContext, CallbackDefinition, CallbackMap, ComponentRef, DispatchRequest, Handler,
    PropertyValue,
};
use crate::error::BridgeError;

/// A resolved handler plus its ordered arguments, ready to run
///
/// Preparing and invoking are split so callers can release any lock on the
/// callback map before the handler runs.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub target: String,
    pub handler: Handler,
    pub args: Vec<Value>,
}

impl PreparedCall {
    pub fn invoke(&self, context: &CallContext) -> Result<Value, BridgeError> {
        debug!(callback = %self.target, args = self.args.len(), "invoking callback");
        self.handler
            .invoke(&self.args, context)
            .map_err(|source| BridgeError::Callback {
                target: self.target.clone(),
                source,
            })
    }
}

/// Look up the callback for the request's output and collect its arguments
pub fn prepare(
    callbacks: &CallbackMap,
    request: &DispatchRequest,
) -> Result<PreparedCall, BridgeError> {
    let target = request.target();
    let definition = callbacks
        .get(&target)
        .ok_or_else(|| BridgeError::unknown_target(&target, callbacks.keys().map(String::as_str)))?;
    let args = collect_arguments(&target, definition, request)?;
    Ok(PreparedCall {
        target,
        handler: definition.handler.clone(),
        args,
    })
}

/// Values for every registered input, then every registered state
///
/// Each registered component takes the value of the first request entry
/// with the same id and property.
pub fn collect_arguments(
    target: &str,
    definition: &CallbackDefinition,
    request: &DispatchRequest,
) -> Result<Vec<Value>, BridgeError> {
    let inputs = definition
        .spec
        .inputs
        .iter()
        .map(|c| first_match(target, &request.inputs, c));
    let state = definition
        .spec
        .state
        .iter()
        .map(|c| first_match(target, &request.state, c));
    inputs.chain(state).collect()
}

fn first_match(
    target: &str,
    entries: &[PropertyValue],
    component: &ComponentRef,
) -> Result<Value, BridgeError> {
    entries
        .iter()
        .find(|entry| entry.matches(component))
        .map(|entry| entry.value.clone())
        .ok_or_else(|| BridgeError::missing_argument(target, &component.id, &component.property))
}
