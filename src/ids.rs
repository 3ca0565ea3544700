//! Namespacing of component identifiers per instance

use serde_json::Value;

use crate::callback::{CallbackSpec, ComponentRef};
use crate::layout::LayoutNode;

/// Separator between the instance identifier and the original component id
pub const ID_SEPARATOR: &str = "_-_";

/// Rewrites component ids to `<instance>_-_<id>` when enabled
///
/// Every id that reaches the wrapped framework, whether from a callback
/// registration or from the layout tree, goes through the same rewriter so
/// dispatch lookups agree with registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdRewriter {
    instance_id: String,
    enabled: bool,
}

impl IdRewriter {
    pub fn new(instance_id: impl Into<String>, enabled: bool) -> Self {
        Self {
            instance_id: instance_id.into(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fix_id(&self, id: &str) -> String {
        if self.enabled {
            format!("{}{}{}", self.instance_id, ID_SEPARATOR, id)
        } else {
            id.to_string()
        }
    }

    pub fn fix_component(&self, component: &ComponentRef) -> ComponentRef {
        ComponentRef {
            id: self.fix_id(&component.id),
            property: component.property.clone(),
        }
    }

    /// Rewrite the output and every input, state and event of a registration
    pub fn fix_callback(&self, spec: &CallbackSpec) -> CallbackSpec {
        let fix_all = |items: &[ComponentRef]| -> Vec<ComponentRef> {
            items.iter().map(|c| self.fix_component(c)).collect()
        };
        CallbackSpec {
            output: self.fix_component(&spec.output),
            inputs: fix_all(&spec.inputs),
            state: fix_all(&spec.state),
            events: fix_all(&spec.events),
        }
    }

    /// Rewrite the id of every component in a layout tree
    ///
    /// Only a component's own `id` is touched, and only `children` is
    /// descended into; ids nested in other props (table columns, options)
    /// are data and stay as they are. Components are either flat mappings or
    /// `{type, namespace, props}` mappings with the id and children in `props`.
    ///
    /// Returns `None` when rewriting is disabled so callers can keep sharing
    /// the original tree.
    pub fn fix_layout(&self, node: &LayoutNode) -> Option<LayoutNode> {
        self.enabled.then(|| self.rewrite_component(node))
    }

    fn rewrite_component(&self, node: &LayoutNode) -> LayoutNode {
        match node {
            LayoutNode::Mapping(entries) => {
                let wrapped = matches!(entries.get("props"), Some(LayoutNode::Mapping(_)));
                LayoutNode::Mapping(
                    entries
                        .iter()
                        .map(|(key, value)| {
                            let value = match (wrapped, key.as_str()) {
                                (true, "props") => self.rewrite_props(value),
                                (true, _) => value.clone(),
                                (false, _) => self.rewrite_field(key, value),
                            };
                            (key.clone(), value)
                        })
                        .collect(),
                )
            }
            LayoutNode::Sequence(items) => {
                LayoutNode::Sequence(items.iter().map(|n| self.rewrite_component(n)).collect())
            }
            LayoutNode::Leaf(_) => node.clone(),
        }
    }

    fn rewrite_props(&self, props: &LayoutNode) -> LayoutNode {
        match props {
            LayoutNode::Mapping(entries) => LayoutNode::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), self.rewrite_field(key, value)))
                    .collect(),
            ),
            _ => props.clone(),
        }
    }

    fn rewrite_field(&self, key: &str, value: &LayoutNode) -> LayoutNode {
        match (key, value) {
            ("id", LayoutNode::Leaf(Value::String(id))) => {
                LayoutNode::Leaf(Value::String(self.fix_id(id)))
            }
            ("children", children) => self.rewrite_component(children),
            _ => value.clone(),
        }
    }
}
