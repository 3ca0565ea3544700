//! Template applications and their live instances
//!
//! A [`TemplateApp`] is defined once, typically at startup, and registered by
//! name in a [`Registry`]. Each request context then asks the registry for a
//! [`LiveInstance`] by identifier; the first request for an identifier stamps
//! out a new instance from the template, later requests get the same one.
//!
//! # Example
//!
//! ```rust
//! use dash_bridge::{
//!     BridgeConfig, CallbackSpec, ComponentRef, InstanceOptions, Registry,
//! };
//! use serde_json::json;
//!
//! let registry = Registry::new(BridgeConfig::default());
//! let calc = registry.define_template(Some("calc")).unwrap();
//! calc.set_layout(json!({"id": "out", "children": []}));
//! calc.register_callback(
//!     CallbackSpec::new(ComponentRef::new("out", "children"))
//!         .with_inputs([ComponentRef::new("in", "value")]),
//!     |args| Ok(json!(args[0].as_i64().unwrap_or(0) * 2)),
//! );
//!
//! let instance = registry
//!     .resolve_or_create("calc", "calc", InstanceOptions::default())
//!     .unwrap();
//! let body = br#"{"output": {"id": "out", "property": "children"},
//!                 "inputs": [{"id": "in", "property": "value", "value": 5}]}"#;
//! assert_eq!(instance.dispatch(body).unwrap(), json!(10));
//! ```

mod application;
mod instance;
mod registry;

pub use application::TemplateApp;
pub use instance::{InstanceOptions, InstanceState, LiveInstance};
pub use registry::Registry;
