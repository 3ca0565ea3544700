//! Dash Bridge - Multi-instance hosting of reactive dashboard applications
//!
//! This library lets one application definition (a [`TemplateApp`]) be
//! served as many independent [`LiveInstance`]s inside a host web framework,
//! each under its own identifier, base path and optionally namespaced
//! component ids.
//!
//! # Example
//!
//! ```rust
//! use dash_bridge::{BridgeConfig, InstanceOptions, Registry, ReplacementMap};
//! use serde_json::json;
//!
//! let registry = Registry::new(BridgeConfig::default());
//! let app = registry.define_template(Some("greeting")).unwrap();
//! app.set_layout(json!({"id": "title", "children": "Hello"}));
//!
//! let options = InstanceOptions::new()
//!     .with_replacements(ReplacementMap::new().with("title", "children", json!("Bonjour")));
//! let instance = registry.resolve_or_create("fr", "greeting", options).unwrap();
//!
//! let layout = instance.initial_layout().unwrap();
//! assert_eq!(layout.body_text(), r#"{"id":"title","children":"Bonjour"}"#);
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod framework;
pub mod ids;
pub mod layout;
pub mod logging;
pub mod server;
pub mod template;

pub use callback::{
    CallContext, CallbackError, CallbackSpec, ComponentRef, DispatchMode, DispatchRequest,
    ExpandedArgs, Handler, HandlerResult,
};
pub use config::{BridgeConfig, CollisionPolicy, ConfigError};
pub use error::BridgeError;
pub use framework::AppCore;
pub use ids::IdRewriter;
pub use layout::{LayoutNode, LayoutResponse, ReplacementMap};
pub use server::{HostRequest, HostResponse, HostServer, ServerShim, ViewFunction};
pub use template::{InstanceOptions, InstanceState, LiveInstance, Registry, TemplateApp};
