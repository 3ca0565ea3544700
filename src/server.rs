//! Stand-in for the wrapped framework's native server object
//!
//! The wrapped framework expects to be handed a server it can register routes
//! and lifecycle hooks on. Inside the bridge no such server runs: requests
//! arrive through the host framework, which looks up the recorded view
//! functions and calls them directly.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use crate::error::BridgeError;
use crate::layout::JSON_CONTENT_TYPE;

/// HTTP methods a route accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// A request as handed over by the host framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub method: Method,
    pub body: Vec<u8>,
}

impl HostRequest {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: Vec::new(),
        }
    }

    pub fn post(body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            body: body.into(),
        }
    }
}

/// A response for the host framework to send back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl HostResponse {
    pub fn ok(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self::ok(body, JSON_CONTENT_TYPE)
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::ok(body.into().into_bytes(), "text/html; charset=utf-8")
    }
}

pub type ViewFunction = Arc<dyn Fn(&HostRequest) -> Result<HostResponse, BridgeError> + Send + Sync>;
pub type AfterRequestHook = Arc<dyn Fn(HostResponse) -> HostResponse + Send + Sync>;
pub type StartupHook = Arc<dyn Fn() + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(&BridgeError) -> HostResponse + Send + Sync>;

/// One `add_url_rule` registration
#[derive(Clone)]
pub struct UrlRule {
    /// URL pattern the route is served under
    pub rule: String,
    /// Unique endpoint name the view is looked up by
    pub endpoint: String,
    pub view_func: ViewFunction,
    pub methods: Vec<Method>,
}

impl fmt::Debug for UrlRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlRule")
            .field("rule", &self.rule)
            .field("endpoint", &self.endpoint)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// What the wrapped framework requires of its server
pub trait HostServer: Send + Sync {
    fn add_url_rule(&mut self, rule: UrlRule);

    fn after_request(&mut self, _hook: AfterRequestHook) {}

    fn before_first_request(&mut self, _hook: StartupHook) {}

    /// Install an error handler for `status`; returns the handler as given
    fn errorhandler(&mut self, _status: u16, handler: ErrorHandler) -> ErrorHandler {
        handler
    }

    fn run(&self) {}
}

/// Records routes without serving them
#[derive(Debug, Default)]
pub struct ServerShim {
    endpoints: IndexMap<String, UrlRule>,
}

impl ServerShim {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rule registered under `endpoint`
    pub fn endpoint(&self, endpoint: &str) -> Option<&UrlRule> {
        self.endpoints.get(endpoint)
    }

    /// All recorded rules in registration order
    pub fn rules(&self) -> impl Iterator<Item = &UrlRule> {
        self.endpoints.values()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl HostServer for ServerShim {
    fn add_url_rule(&mut self, rule: UrlRule) {
        trace!(endpoint = %rule.endpoint, rule = %rule.rule, "recording url rule");
        self.endpoints.insert(rule.endpoint.clone(), rule);
    }
}
