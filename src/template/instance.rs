//! Live, independently addressable instances of a template

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::callback::{CallContext, CallbackSpec, DispatchMode, DispatchRequest, Handler};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::framework::{endpoint_name, AppCore};
use crate::ids::IdRewriter;
use crate::layout::{apply_replacements, LayoutNode, LayoutResponse, ReplacementMap};
use crate::server::{ServerShim, UrlRule, ViewFunction};

/// Per-instance choices made at instantiation time
#[derive(Debug, Clone, Default)]
pub struct InstanceOptions {
    /// Initial-layout overrides, keyed by the component ids used in the template
    pub replacements: ReplacementMap,
    /// Identifier of the instance; defaults to the template name
    pub specific_identifier: Option<String>,
    /// Namespace component ids; `None` takes the configured default
    pub adjust_id: Option<bool>,
}

impl InstanceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replacements(mut self, replacements: ReplacementMap) -> Self {
        self.replacements = replacements;
        self
    }

    pub fn with_specific_identifier(mut self, id: impl Into<String>) -> Self {
        self.specific_identifier = Some(id.into());
        self
    }

    pub fn with_adjust_id(mut self, adjust_id: bool) -> Self {
        self.adjust_id = Some(adjust_id);
        self
    }
}

/// Construction progress of a live instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Constructed,
    LayoutSet,
    /// Layout, callbacks and assets copied; only serves requests from here on
    Ready,
}

/// One running copy of a template
///
/// Wraps the framework's [`AppCore`] and intercepts layout and callback
/// registration to apply id rewriting, and layout serving to apply the
/// replacement map.
#[derive(Debug)]
pub struct LiveInstance {
    uid: String,
    template_name: String,
    rewriter: IdRewriter,
    replacements: RwLock<ReplacementMap>,
    dispatch_mode: DispatchMode,
    state: InstanceState,
    server: ServerShim,
    core: AppCore,
}

impl LiveInstance {
    pub fn new(
        template_name: &str,
        config: &BridgeConfig,
        options: InstanceOptions,
        expanded_callbacks: bool,
    ) -> Self {
        let uid = options
            .specific_identifier
            .unwrap_or_else(|| template_name.to_string());
        let adjust_id = options.adjust_id.unwrap_or(config.instances.adjust_ids);
        let rewriter = IdRewriter::new(&uid, adjust_id);
        let replacements = options.replacements.map_ids(|id| rewriter.fix_id(id));

        let mut server = ServerShim::new();
        let core = AppCore::new(&uid, config.base_pathname(&uid), &mut server);

        let dispatch_mode = if expanded_callbacks {
            DispatchMode::Expanded
        } else {
            DispatchMode::Framework
        };

        debug!(
            instance = %uid,
            template = %template_name,
            adjust_id,
            replacements = replacements.len(),
            "constructed live instance"
        );

        Self {
            uid,
            template_name: template_name.to_string(),
            rewriter,
            replacements: RwLock::new(replacements),
            dispatch_mode,
            state: InstanceState::Constructed,
            server,
            core,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    pub fn base_url(&self) -> &str {
        self.core.base_pathname()
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn adjust_id(&self) -> bool {
        self.rewriter.is_enabled()
    }

    /// The id this instance serves for a template component id
    pub fn fix_id(&self, id: &str) -> String {
        self.rewriter.fix_id(id)
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch_mode
    }

    /// Whether update requests can go straight to the framework's own view
    pub fn use_dash_dispatch(&self) -> bool {
        self.dispatch_mode == DispatchMode::Framework
    }

    /// Whether the framework's layout response is served as is
    pub fn use_dash_layout(&self) -> bool {
        self.replacements.read().is_empty()
    }

    /// Set the layout, rewriting ids when enabled
    ///
    /// Without rewriting the tree stays shared with the caller.
    pub fn set_layout(&mut self, layout: Arc<LayoutNode>) {
        let layout = match self.rewriter.fix_layout(&layout) {
            Some(fixed) => Arc::new(fixed),
            None => layout,
        };
        self.core.set_layout(layout);
        if self.state == InstanceState::Constructed {
            self.state = InstanceState::LayoutSet;
        }
    }

    pub fn layout(&self) -> Option<Arc<LayoutNode>> {
        self.core.layout()
    }

    /// Register a callback after rewriting every component it names
    pub fn register_callback(&mut self, spec: &CallbackSpec, handler: Handler) {
        self.core.callback(self.rewriter.fix_callback(spec), handler);
    }

    pub fn append_css(&mut self, href: impl Into<String>) {
        self.core.append_css(href);
    }

    pub fn append_script(&mut self, src: impl Into<String>) {
        self.core.append_script(src);
    }

    pub(crate) fn mark_ready(&mut self) {
        self.state = InstanceState::Ready;
    }

    pub fn css(&self) -> Vec<String> {
        self.core.css()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.core.scripts()
    }

    pub fn callback_targets(&self) -> Vec<String> {
        self.core.callback_targets()
    }

    /// Callback dependency listing as the framework serves it
    pub fn dependencies(&self) -> Value {
        self.core.dependencies()
    }

    /// Current replacement map, keyed by served ids
    pub fn replacements(&self) -> ReplacementMap {
        self.replacements.read().clone()
    }

    /// Replace the replacement map; keys are template component ids
    pub fn set_replacements(&self, replacements: ReplacementMap) {
        let replacements = replacements.map_ids(|id| self.rewriter.fix_id(id));
        *self.replacements.write() = replacements;
    }

    /// The layout as the wrapped framework serves it
    pub fn serve_layout(&self) -> Result<LayoutResponse, BridgeError> {
        self.core.serve_layout()
    }

    /// Apply this instance's replacement map to a raw layout response
    ///
    /// With an empty map the response comes back untouched; otherwise the
    /// body is decoded, rewritten and re-encoded under the same content type.
    pub fn augment_initial_layout(
        &self,
        base: &LayoutResponse,
    ) -> Result<LayoutResponse, BridgeError> {
        let replacements = self.replacements.read();
        if replacements.is_empty() {
            return Ok(base.clone());
        }

        let tree = base.decode()?;
        let reworked = apply_replacements(&tree, &replacements);
        debug!(instance = %self.uid, "rewrote initial layout");
        Ok(LayoutResponse::new(
            reworked.to_vec()?,
            base.content_type.clone(),
        ))
    }

    /// The initial layout this instance serves to its client
    pub fn initial_layout(&self) -> Result<LayoutResponse, BridgeError> {
        self.augment_initial_layout(&self.serve_layout()?)
    }

    /// Dispatch an update request without host context
    pub fn dispatch(&self, body: &[u8]) -> Result<Value, BridgeError> {
        self.dispatch_with_context(body, &CallContext::new())
    }

    /// Dispatch an update request, handing `context` to expanded handlers
    pub fn dispatch_with_context(
        &self,
        body: &[u8],
        context: &CallContext,
    ) -> Result<Value, BridgeError> {
        let request = DispatchRequest::from_slice(body)?;
        self.dispatch_request(&request, context)
    }

    /// Dispatch an already decoded update request
    ///
    /// Request ids are matched as served, i.e. already rewritten when the
    /// instance adjusts ids.
    pub fn dispatch_request(
        &self,
        request: &DispatchRequest,
        context: &CallContext,
    ) -> Result<Value, BridgeError> {
        let call = self.core.prepare(request)?;
        call.invoke(context)
    }

    /// The view function recorded for the base path or one of its sub-paths
    pub fn locate_endpoint_function(&self, name: Option<&str>) -> Result<ViewFunction, BridgeError> {
        let endpoint = endpoint_name(self.core.base_pathname(), name);
        self.server
            .endpoint(&endpoint)
            .map(|rule| Arc::clone(&rule.view_func))
            .ok_or_else(|| BridgeError::EndpointNotFound {
                instance: self.uid.clone(),
                endpoint,
            })
    }

    /// Every route the framework registered, in registration order
    pub fn rules(&self) -> impl Iterator<Item = &UrlRule> {
        self.server.rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ComponentRef;
    use crate::framework::LAYOUT_ROUTE;
    use crate::server::HostRequest;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn instance(options: InstanceOptions) -> LiveInstance {
        let mut instance = LiveInstance::new("calc", &BridgeConfig::default(), options, false);
        instance.set_layout(Arc::new(LayoutNode::from(json!({
            "id": "root",
            "children": [{"id": "title", "children": "Hello"}]
        }))));
        instance.register_callback(
            &CallbackSpec::new(ComponentRef::new("title", "children"))
                .with_inputs([ComponentRef::new("in", "value")]),
            Handler::positional(|args| Ok(args[0].clone())),
        );
        instance.mark_ready();
        instance
    }

    #[test]
    fn test_state_transitions() {
        let mut instance = LiveInstance::new("calc", &BridgeConfig::default(), InstanceOptions::new(), false);
        assert_eq!(instance.state(), InstanceState::Constructed);
        instance.set_layout(Arc::new(LayoutNode::from(json!({}))));
        assert_eq!(instance.state(), InstanceState::LayoutSet);
        instance.mark_ready();
        assert_eq!(instance.state(), InstanceState::Ready);
    }

    #[test]
    fn test_identity_and_base_url() {
        let instance = instance(InstanceOptions::new().with_specific_identifier("sess1"));
        assert_eq!(instance.uid(), "sess1");
        assert_eq!(instance.template_name(), "calc");
        assert_eq!(instance.base_url(), "/django_plotly_dash/sess1/");
    }

    #[test]
    fn test_empty_replacements_return_raw_response() {
        let instance = instance(InstanceOptions::new());
        assert!(instance.use_dash_layout());
        // Not valid JSON: the body must pass through without being decoded
        let raw = LayoutResponse::new(b"{not json".to_vec(), "application/json");
        assert_eq!(instance.augment_initial_layout(&raw).unwrap(), raw);
    }

    #[test]
    fn test_replacements_applied_to_initial_layout() {
        let replacements = ReplacementMap::new().with("title", "children", json!("Bonjour"));
        let instance = instance(InstanceOptions::new().with_replacements(replacements));
        assert!(!instance.use_dash_layout());
        let layout = instance.initial_layout().unwrap();
        assert_eq!(layout.content_type, "application/json");
        insta::assert_snapshot!(
            layout.body_text(),
            @r#"{"id":"root","children":[{"id":"title","children":"Bonjour"}]}"#
        );
    }

    #[test]
    fn test_augment_keeps_foreign_content_type() {
        let replacements = ReplacementMap::new().with("a", "value", json!(2));
        let instance = instance(InstanceOptions::new().with_replacements(replacements));
        let raw = LayoutResponse::new(br#"{"id":"a","value":1}"#.to_vec(), "application/vnd.custom+json");
        let out = instance.augment_initial_layout(&raw).unwrap();
        assert_eq!(out.content_type, "application/vnd.custom+json");
        assert_eq!(out.body_text(), r#"{"id":"a","value":2}"#);
    }

    #[test]
    fn test_malformed_layout_with_replacements() {
        let replacements = ReplacementMap::new().with("a", "value", json!(2));
        let instance = instance(InstanceOptions::new().with_replacements(replacements));
        let raw = LayoutResponse::new(b"{not json".to_vec(), "application/json");
        assert!(matches!(
            instance.augment_initial_layout(&raw),
            Err(BridgeError::MalformedLayout { .. })
        ));
    }

    #[test]
    fn test_adjust_id_rewrites_layout_callbacks_and_replacements() {
        let replacements = ReplacementMap::new().with("title", "children", json!("Hi"));
        let instance = instance(
            InstanceOptions::new()
                .with_specific_identifier("s1")
                .with_adjust_id(true)
                .with_replacements(replacements),
        );
        assert!(instance.adjust_id());
        assert_eq!(instance.callback_targets(), vec!["s1_-_title.children".to_string()]);
        insta::assert_snapshot!(
            instance.initial_layout().unwrap().body_text(),
            @r#"{"id":"s1_-_root","children":[{"id":"s1_-_title","children":"Hi"}]}"#
        );

        let body = br#"{"output":{"id":"s1_-_title","property":"children"},
                        "inputs":[{"id":"s1_-_in","property":"value","value":"x"}]}"#;
        assert_eq!(instance.dispatch(body).unwrap(), json!("x"));
    }

    #[test]
    fn test_set_replacements_after_ready() {
        let instance = instance(InstanceOptions::new());
        instance.set_replacements(ReplacementMap::new().with("title", "children", json!("Salut")));
        assert_eq!(instance.replacements().len(), 1);
        let body = instance.initial_layout().unwrap();
        assert!(body.body_text().contains("Salut"));
    }

    #[test]
    fn test_dispatch_with_context_reaches_expanded_handler() {
        let mut instance = LiveInstance::new("calc", &BridgeConfig::default(), InstanceOptions::new(), true);
        instance.register_callback(
            &CallbackSpec::new(ComponentRef::new("out", "children"))
                .with_inputs([ComponentRef::new("in", "value")]),
            Handler::expanded(|bundle| {
                Ok(json!([bundle.arg(0), bundle.context_value("session_state")]))
            }),
        );
        instance.mark_ready();
        assert_eq!(instance.dispatch_mode(), DispatchMode::Expanded);

        let mut context = CallContext::new();
        context.insert("session_state".to_string(), json!({"count": 1}));
        let body = br#"{"output":{"id":"out","property":"children"},
                        "inputs":[{"id":"in","property":"value","value":3}]}"#;
        assert_eq!(
            instance.dispatch_with_context(body, &context).unwrap(),
            json!([3, {"count": 1}])
        );
        assert_eq!(instance.dispatch(body).unwrap(), json!([3, null]));
    }

    #[test]
    fn test_locate_endpoint_function() {
        let instance = instance(InstanceOptions::new());
        let view = instance.locate_endpoint_function(Some(LAYOUT_ROUTE)).unwrap();
        let response = view(&HostRequest::get()).unwrap();
        assert_eq!(
            response.body,
            br#"{"id":"root","children":[{"id":"title","children":"Hello"}]}"#.to_vec()
        );
        assert!(instance.locate_endpoint_function(None).is_ok());

        let err = instance
            .locate_endpoint_function(Some("nope"))
            .err()
            .expect("endpoint should be unknown");
        assert!(matches!(
            err,
            BridgeError::EndpointNotFound { ref endpoint, .. } if endpoint == "/django_plotly_dash/calc/_nope"
        ));
    }

    #[test]
    fn test_rules_listed() {
        let instance = instance(InstanceOptions::new());
        assert_eq!(instance.rules().count(), 4);
    }
}
