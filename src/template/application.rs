//! Deferred application definitions

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::instance::{InstanceOptions, LiveInstance};
use crate::callback::{CallbackDefinition, CallbackSpec, ExpandedArgs, Handler, HandlerResult};
use crate::config::BridgeConfig;
use crate::layout::LayoutNode;

#[derive(Debug, Default)]
struct TemplateState {
    layout: Option<Arc<LayoutNode>>,
    callbacks: Vec<CallbackDefinition>,
    css: Vec<String>,
    scripts: Vec<String>,
    expanded_callbacks: bool,
}

/// An application definition that stamps out live instances on demand
///
/// Registrations made on the template are recorded, not applied; each
/// [`TemplateApp::instantiate`] replays the registrations made so far onto a
/// fresh [`LiveInstance`].
#[derive(Debug)]
pub struct TemplateApp {
    name: String,
    state: RwLock<TemplateState>,
}

impl TemplateApp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(TemplateState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_layout(&self, layout: impl Into<LayoutNode>) {
        self.set_shared_layout(Arc::new(layout.into()));
    }

    /// Set a layout that is already shared elsewhere
    pub fn set_shared_layout(&self, layout: Arc<LayoutNode>) {
        self.state.write().layout = Some(layout);
    }

    pub fn layout(&self) -> Option<Arc<LayoutNode>> {
        self.state.read().layout.clone()
    }

    /// Record a callback with a positional handler
    pub fn register_callback<F>(&self, spec: CallbackSpec, f: F)
    where
        F: Fn(&[Value]) -> HandlerResult + Send + Sync + 'static,
    {
        self.push_callback(spec, Handler::positional(f));
    }

    /// Record a callback with an expanded handler
    ///
    /// Switches the whole template, and every instance stamped from it from
    /// now on, to the expanded dispatch mode.
    pub fn register_callback_expanded<F>(&self, spec: CallbackSpec, f: F)
    where
        F: Fn(ExpandedArgs<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.state.write().expanded_callbacks = true;
        self.push_callback(spec, Handler::expanded(f));
    }

    fn push_callback(&self, spec: CallbackSpec, handler: Handler) {
        debug!(template = %self.name, output = %spec.output, "recorded callback");
        self.state
            .write()
            .callbacks
            .push(CallbackDefinition::new(spec, handler));
    }

    pub fn append_css(&self, href: impl Into<String>) {
        self.state.write().css.push(href.into());
    }

    pub fn append_script(&self, src: impl Into<String>) {
        self.state.write().scripts.push(src.into());
    }

    pub fn css(&self) -> Vec<String> {
        self.state.read().css.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.read().scripts.clone()
    }

    pub fn expanded_callbacks(&self) -> bool {
        self.state.read().expanded_callbacks
    }

    pub fn callback_count(&self) -> usize {
        self.state.read().callbacks.len()
    }

    /// Stamp out a live instance from the registrations made so far
    pub fn instantiate(&self, config: &BridgeConfig, options: InstanceOptions) -> LiveInstance {
        let (layout, callbacks, css, scripts, expanded) = {
            let state = self.state.read();
            (
                state.layout.clone(),
                state.callbacks.clone(),
                state.css.clone(),
                state.scripts.clone(),
                state.expanded_callbacks,
            )
        };

        let mut instance = LiveInstance::new(&self.name, config, options, expanded);
        if let Some(layout) = layout {
            instance.set_layout(layout);
        }
        for definition in callbacks {
            instance.register_callback(&definition.spec, definition.handler);
        }
        for href in css {
            instance.append_css(href);
        }
        for src in scripts {
            instance.append_script(src);
        }
        instance.mark_ready();
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{ComponentRef, DispatchMode};
    use crate::template::InstanceState;
    use serde_json::json;

    fn template() -> TemplateApp {
        let template = TemplateApp::new("calc");
        template.set_layout(json!({"id": "out", "children": []}));
        template.register_callback(
            CallbackSpec::new(ComponentRef::new("out", "children"))
                .with_inputs([ComponentRef::new("in", "value")]),
            |args| Ok(args[0].clone()),
        );
        template
    }

    #[test]
    fn test_instantiate_copies_everything() {
        let template = template();
        template.append_css("/static/a.css");
        template.append_script("/static/a.js");
        let instance = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());

        assert_eq!(instance.uid(), "calc");
        assert_eq!(instance.state(), InstanceState::Ready);
        assert_eq!(instance.callback_targets(), vec!["out.children".to_string()]);
        assert_eq!(instance.css(), vec!["/static/a.css".to_string()]);
        assert_eq!(instance.scripts(), vec!["/static/a.js".to_string()]);
        assert_eq!(instance.dispatch_mode(), DispatchMode::Framework);
    }

    #[test]
    fn test_layout_is_shared_not_copied() {
        let template = template();
        let instance = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());
        let ours = template.layout().unwrap();
        let theirs = instance.layout().unwrap();
        assert!(Arc::ptr_eq(&ours, &theirs));
    }

    #[test]
    fn test_instances_snapshot_registrations() {
        let template = template();
        let before = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());
        template.register_callback(CallbackSpec::new(ComponentRef::new("other", "value")), |_| {
            Ok(Value::Null)
        });
        let after = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());
        assert_eq!(before.callback_targets().len(), 1);
        assert_eq!(after.callback_targets().len(), 2);
    }

    #[test]
    fn test_expanded_registration_flips_whole_template() {
        let template = template();
        assert!(!template.expanded_callbacks());
        template.register_callback_expanded(
            CallbackSpec::new(ComponentRef::new("other", "value")),
            |bundle| Ok(bundle.context_value("user").cloned().unwrap_or(Value::Null)),
        );
        assert!(template.expanded_callbacks());
        assert_eq!(template.callback_count(), 2);
        let instance = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());
        assert_eq!(instance.dispatch_mode(), DispatchMode::Expanded);
        assert!(!instance.use_dash_dispatch());
    }

    #[test]
    fn test_template_without_layout() {
        let template = TemplateApp::new("empty");
        let instance = template.instantiate(&BridgeConfig::default(), InstanceOptions::default());
        assert_eq!(instance.state(), InstanceState::Ready);
        assert!(instance.layout().is_none());
    }
}
