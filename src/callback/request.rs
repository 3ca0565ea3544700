//! Update-component request bodies

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ComponentRef;
use crate::error::BridgeError;

/// One `{id, property, value}` entry of a request's `inputs` or `state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    pub property: String,
    /// Absent values decode as `null`
    #[serde(default)]
    pub value: Value,
}

impl PropertyValue {
    pub fn new(id: impl Into<String>, property: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            property: property.into(),
            value,
        }
    }

    pub fn matches(&self, component: &ComponentRef) -> bool {
        self.id == component.id && self.property == component.property
    }
}

/// Body of an update-component request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub output: ComponentRef,
    #[serde(default)]
    pub inputs: Vec<PropertyValue>,
    #[serde(default)]
    pub state: Vec<PropertyValue>,
}

impl DispatchRequest {
    pub fn new(output: ComponentRef) -> Self {
        Self {
            output,
            inputs: Vec::new(),
            state: Vec::new(),
        }
    }

    pub fn with_input(mut self, id: &str, property: &str, value: Value) -> Self {
        self.inputs.push(PropertyValue::new(id, property, value));
        self
    }

    pub fn with_state(mut self, id: &str, property: &str, value: Value) -> Self {
        self.state.push(PropertyValue::new(id, property, value));
        self
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice(body).map_err(BridgeError::MalformedRequest)
    }

    pub fn target(&self) -> String {
        self.output.target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_body() {
        let body = br#"{
            "output": {"id": "out", "property": "children"},
            "inputs": [{"id": "in", "property": "value", "value": 5}],
            "state": [{"id": "s", "property": "value", "value": "x"}]
        }"#;
        let request = DispatchRequest::from_slice(body).unwrap();
        assert_eq!(request.target(), "out.children");
        assert_eq!(request.inputs[0].value, json!(5));
        assert_eq!(request.state[0].value, json!("x"));
    }

    #[test]
    fn test_lists_and_values_default() {
        let body = br#"{"output": {"id": "out", "property": "children"},
                        "inputs": [{"id": "in", "property": "n_clicks"}]}"#;
        let request = DispatchRequest::from_slice(body).unwrap();
        assert_eq!(request.inputs[0].value, Value::Null);
        assert!(request.state.is_empty());
    }

    #[test]
    fn test_missing_output_is_malformed() {
        let err = DispatchRequest::from_slice(br#"{"inputs": []}"#).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedRequest(_)));
    }
}
