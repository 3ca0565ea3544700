//! Core of the wrapped reactive framework
//!
//! [`AppCore`] is the part of the component framework the bridge composes
//! with: it holds the layout, the callback map and the asset lists, and on
//! construction registers its views on whatever [`HostServer`] it is given.
//! The views only hold a weak reference to the app state so dropping the app
//! releases everything even while a server still lists the routes.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::callback::{
    prepare, CallContext, CallbackDefinition, CallbackMap, CallbackSpec, DispatchRequest, Handler,
    PreparedCall,
};
use crate::error::BridgeError;
use crate::layout::{LayoutNode, LayoutResponse};
use crate::server::{HostRequest, HostResponse, HostServer, Method, UrlRule, ViewFunction};

/// Sub-path of the layout view
pub const LAYOUT_ROUTE: &str = "dash-layout";
/// Sub-path of the dependency listing view
pub const DEPENDENCIES_ROUTE: &str = "dash-dependencies";
/// Sub-path of the update-component view
pub const UPDATE_COMPONENT_ROUTE: &str = "dash-update-component";

/// Endpoint name of a view: the base path, suffixed with `_<name>` for sub-paths
pub fn endpoint_name(base_pathname: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{}_{}", base_pathname, name),
        None => base_pathname.to_string(),
    }
}

#[derive(Debug, Default)]
struct AppState {
    layout: Option<Arc<LayoutNode>>,
    callback_map: CallbackMap,
    css: Vec<String>,
    scripts: Vec<String>,
}

impl AppState {
    fn serve_layout(&self, app: &str) -> Result<LayoutResponse, BridgeError> {
        let layout = self.layout.as_ref().ok_or_else(|| BridgeError::LayoutNotSet {
            app: app.to_string(),
        })?;
        LayoutResponse::from_node(layout)
    }

    fn dependencies(&self) -> Value {
        let specs: Vec<&CallbackSpec> = self.callback_map.values().map(|d| &d.spec).collect();
        json!(specs)
    }

    fn index_html(&self, app: &str) -> String {
        let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str(&format!("<title>{}</title>\n", escape_html(app)));
        for href in &self.css {
            html.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">\n", escape_html(href)));
        }
        html.push_str("</head>\n<body>\n<div id=\"react-entry-point\"></div>\n");
        for src in &self.scripts {
            html.push_str(&format!("<script src=\"{}\"></script>\n", escape_html(src)));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// The wrapped framework's application object
#[derive(Debug)]
pub struct AppCore {
    name: String,
    base_pathname: String,
    state: Arc<RwLock<AppState>>,
}

impl AppCore {
    /// Create the app and register its views on `server`
    pub fn new(
        name: impl Into<String>,
        base_pathname: impl Into<String>,
        server: &mut dyn HostServer,
    ) -> Self {
        let core = Self {
            name: name.into(),
            base_pathname: base_pathname.into(),
            state: Arc::new(RwLock::new(AppState::default())),
        };
        core.register_routes(server);
        core
    }

    fn register_routes(&self, server: &mut dyn HostServer) {
        let routes: [(Option<&str>, Method, ViewFunction); 4] = [
            (
                None,
                Method::Get,
                self.view(|state, app, _| Ok(HostResponse::html(state.index_html(app)))),
            ),
            (
                Some(LAYOUT_ROUTE),
                Method::Get,
                self.view(|state, app, _| {
                    let layout = state.serve_layout(app)?;
                    Ok(HostResponse::ok(layout.body, layout.content_type))
                }),
            ),
            (
                Some(DEPENDENCIES_ROUTE),
                Method::Get,
                self.view(|state, _, _| {
                    let body = serde_json::to_vec(&state.dependencies()).map_err(BridgeError::Encode)?;
                    Ok(HostResponse::json(body))
                }),
            ),
            (Some(UPDATE_COMPONENT_ROUTE), Method::Post, self.update_component_view()),
        ];

        for (name, method, view_func) in routes {
            let endpoint = endpoint_name(&self.base_pathname, name);
            server.add_url_rule(UrlRule {
                rule: endpoint.clone(),
                endpoint,
                view_func,
                methods: vec![method],
            });
        }

        let app = self.name.clone();
        server.before_first_request(Arc::new(move || debug!(app = %app, "first request served")));
    }

    /// Wrap a read-only view over the app state
    fn view<F>(&self, f: F) -> ViewFunction
    where
        F: Fn(&AppState, &str, &HostRequest) -> Result<HostResponse, BridgeError> + Send + Sync + 'static,
    {
        let state = Arc::downgrade(&self.state);
        let app = self.name.clone();
        Arc::new(move |request: &HostRequest| {
            let state = upgrade(&state, &app)?;
            let guard = state.read();
            f(&*guard, &app, request)
        })
    }

    /// Framework-mode dispatch: positional call without host context
    fn update_component_view(&self) -> ViewFunction {
        let state = Arc::downgrade(&self.state);
        let app = self.name.clone();
        Arc::new(move |request: &HostRequest| {
            let dispatch = DispatchRequest::from_slice(&request.body)?;
            let call = {
                let state = upgrade(&state, &app)?;
                let guard = state.read();
                prepare(&guard.callback_map, &dispatch)?
            };
            let value = call.invoke(&CallContext::new())?;
            let mut props = serde_json::Map::new();
            props.insert(dispatch.output.property.clone(), value);
            let body = json!({"response": {"props": props}});
            let body = serde_json::to_vec(&body).map_err(BridgeError::Encode)?;
            Ok(HostResponse::json(body))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_pathname(&self) -> &str {
        &self.base_pathname
    }

    pub fn set_layout(&self, layout: Arc<LayoutNode>) {
        self.state.write().layout = Some(layout);
    }

    pub fn layout(&self) -> Option<Arc<LayoutNode>> {
        self.state.read().layout.clone()
    }

    /// Register a callback under its output target
    ///
    /// A second registration for the same output replaces the first.
    pub fn callback(&self, spec: CallbackSpec, handler: Handler) {
        let target = spec.target();
        let mut state = self.state.write();
        if state.callback_map.contains_key(&target) {
            warn!(app = %self.name, callback = %target, "replacing callback registered for the same output");
        }
        debug!(app = %self.name, callback = %target, "registered callback");
        state
            .callback_map
            .insert(target, CallbackDefinition::new(spec, handler));
    }

    /// Registered callback targets in registration order
    pub fn callback_targets(&self) -> Vec<String> {
        self.state.read().callback_map.keys().cloned().collect()
    }

    /// Resolve a request against the callback map, releasing the lock before returning
    pub fn prepare(&self, request: &DispatchRequest) -> Result<PreparedCall, BridgeError> {
        prepare(&self.state.read().callback_map, request)
    }

    /// The layout as the framework natively serves it
    pub fn serve_layout(&self) -> Result<LayoutResponse, BridgeError> {
        self.state.read().serve_layout(&self.name)
    }

    /// Callback dependency listing as served to the client
    pub fn dependencies(&self) -> Value {
        self.state.read().dependencies()
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
}

fn upgrade(state: &Weak<RwLock<AppState>>, app: &str) -> Result<Arc<RwLock<AppState>>, BridgeError> {
    state
        .upgrade()
        .ok_or_else(|| BridgeError::instance_not_found(app, std::iter::empty()))
}
