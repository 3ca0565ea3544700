//! Layout trees as served to the client
//!
//! The wrapped framework serializes its component tree to JSON. The bridge
//! never interprets component types; it only needs to walk mappings and
//! sequences, look at `id` fields and substitute values. [`LayoutNode`] is that
//! minimal view of the tree.

pub mod replace;

pub use replace::{apply_replacements, PropertyOverrides, ReplacementMap};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::BridgeError;

/// Content type of layout bodies produced by the native encoder
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A node of a serialized component tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayoutNode {
    /// Ordered key/value node, e.g. a component or its props
    Mapping(IndexMap<String, LayoutNode>),
    /// Ordered list, e.g. a `children` array
    Sequence(Vec<LayoutNode>),
    /// Any scalar: string, number, bool or null
    Leaf(Value),
}

impl LayoutNode {
    /// The `id` of a mapping node, when it is a string
    pub fn id(&self) -> Option<&str> {
        match self {
            LayoutNode::Mapping(entries) => match entries.get("id") {
                Some(LayoutNode::Leaf(Value::String(id))) => Some(id),
                _ => None,
            },
            _ => None,
        }
    }

    /// Look up a key of a mapping node
    pub fn get(&self, key: &str) -> Option<&LayoutNode> {
        match self {
            LayoutNode::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LayoutNode::Leaf(Value::Null))
    }

    /// Convert back into a plain JSON value
    pub fn to_value(&self) -> Value {
        match self {
            LayoutNode::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
            LayoutNode::Sequence(items) => {
                Value::Array(items.iter().map(LayoutNode::to_value).collect())
            }
            LayoutNode::Leaf(value) => value.clone(),
        }
    }

    /// Decode a JSON body into a tree
    pub fn from_slice(body: &[u8]) -> Result<Self, BridgeError> {
        serde_json::from_slice::<Value>(body)
            .map(LayoutNode::from)
            .map_err(|e| BridgeError::malformed_layout(&e))
    }

    /// Encode with the native encoder
    pub fn to_vec(&self) -> Result<Vec<u8>, BridgeError> {
        serde_json::to_vec(self).map_err(BridgeError::Encode)
    }
}

impl From<Value> for LayoutNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => LayoutNode::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, LayoutNode::from(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                LayoutNode::Sequence(items.into_iter().map(LayoutNode::from).collect())
            }
            leaf => LayoutNode::Leaf(leaf),
        }
    }
}

impl<'de> Deserialize<'de> for LayoutNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(LayoutNode::from)
    }
}

/// A raw layout response: encoded body plus its declared content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResponse {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl LayoutResponse {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// Encode a tree as a JSON layout response
    pub fn from_node(node: &LayoutNode) -> Result<Self, BridgeError> {
        Ok(Self::new(node.to_vec()?, JSON_CONTENT_TYPE))
    }

    /// Decode the body
    pub fn decode(&self) -> Result<LayoutNode, BridgeError> {
        LayoutNode::from_slice(&self.body)
    }

    /// Body as text, for logging and the CLI
    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
