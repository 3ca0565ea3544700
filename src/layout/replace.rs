//! Per-instance value substitution in the initial layout

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::LayoutNode;

/// Property name -> replacement value for one component
pub type PropertyOverrides = IndexMap<String, LayoutNode>;

/// Component id -> property overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementMap {
    entries: HashMap<String, PropertyOverrides>,
}

impl ReplacementMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override `property` of component `id`
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<LayoutNode>,
    ) {
        self.entries
            .entry(id.into())
            .or_default()
            .insert(property.into(), value.into());
    }

    /// Builder form of [`ReplacementMap::insert`]
    pub fn with(
        mut self,
        id: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<LayoutNode>,
    ) -> Self {
        self.insert(id, property, value);
        self
    }

    pub fn get(&self, id: &str) -> Option<&PropertyOverrides> {
        self.entries.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Apply `f` to every component id, keeping the overrides
    pub fn map_ids(self, f: impl Fn(&str) -> String) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(id, overrides)| (f(&id), overrides))
                .collect(),
        }
    }
}

/// Walk `node` and substitute overridden properties
///
/// For every mapping carrying a string `id` listed in `replacements`, each key
/// with an override takes the override verbatim; every other value is walked
/// recursively. A `null` override counts as no override. Sequences are walked
/// element-wise and leaves are returned unchanged.
pub fn apply_replacements(node: &LayoutNode, replacements: &ReplacementMap) -> LayoutNode {
    match node {
        LayoutNode::Mapping(entries) => {
            let overrides = node.id().and_then(|id| replacements.get(id));
            let entries = entries
                .iter()
                .map(|(key, value)| {
                    let replaced = overrides
                        .and_then(|o| o.get(key))
                        .filter(|r| !r.is_null())
                        .cloned()
                        .unwrap_or_else(|| apply_replacements(value, replacements));
                    (key.clone(), replaced)
                })
                .collect();
            LayoutNode::Mapping(entries)
        }
        LayoutNode::Sequence(items) => LayoutNode::Sequence(
            items
                .iter()
                .map(|item| apply_replacements(item, replacements))
                .collect(),
        ),
        LayoutNode::Leaf(_) => node.clone(),
    }
}
