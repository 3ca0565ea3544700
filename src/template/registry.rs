//! Registry of template definitions and their live instances

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::application::TemplateApp;
use super::instance::{InstanceOptions, LiveInstance};
use crate::config::{BridgeConfig, CollisionPolicy};
use crate::error::BridgeError;
use crate::server::ViewFunction;

/// Prefix of names handed out to templates defined without one
const AUTO_NAME_PREFIX: &str = "djdash_";

/// Maps template names to definitions and instance identifiers to live instances
///
/// Shared between request handlers by reference. Whenever both maps are
/// locked, the instance map is taken first.
#[derive(Debug)]
pub struct Registry {
    config: BridgeConfig,
    templates: RwLock<HashMap<String, Arc<TemplateApp>>>,
    instances: RwLock<HashMap<String, Arc<LiveInstance>>>,
    uid_counter: AtomicUsize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl Registry {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            templates: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
            uid_counter: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Create an empty template and register it
    ///
    /// Without a name the template is called `djdash_<n>`, counting from 1.
    pub fn define_template(&self, name: Option<&str>) -> Result<Arc<TemplateApp>, BridgeError> {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let n = self.uid_counter.fetch_add(1, Ordering::Relaxed) + 1;
                format!("{}{}", AUTO_NAME_PREFIX, n)
            }
        };
        let template = Arc::new(TemplateApp::new(name.clone()));
        self.register_template(&name, Arc::clone(&template))?;
        Ok(template)
    }

    /// Register a template under `name`, following the configured collision policy
    pub fn register_template(
        &self,
        name: &str,
        template: Arc<TemplateApp>,
    ) -> Result<(), BridgeError> {
        let mut templates = self.templates.write();
        if templates.contains_key(name) {
            match self.config.instances.on_template_collision {
                CollisionPolicy::Error => {
                    return Err(BridgeError::DuplicateTemplate {
                        name: name.to_string(),
                    });
                }
                CollisionPolicy::Overwrite => {
                    warn!(template = %name, "replacing previously registered template");
                }
            }
        }
        templates.insert(name.to_string(), template);
        info!(template = %name, "registered template");
        Ok(())
    }

    /// Register a live instance under `id`, returning the one it replaced
    pub fn register_instance(
        &self,
        id: &str,
        instance: Arc<LiveInstance>,
    ) -> Option<Arc<LiveInstance>> {
        let previous = self.instances.write().insert(id.to_string(), instance);
        if previous.is_some() {
            warn!(instance = %id, "replacing previously registered instance");
        }
        previous
    }

    pub fn lookup_template(&self, name: &str) -> Option<Arc<TemplateApp>> {
        self.templates.read().get(name).cloned()
    }

    pub fn lookup_instance(&self, id: &str) -> Option<Arc<LiveInstance>> {
        self.instances.read().get(id).cloned()
    }

    /// Remove a live instance; later requests for `id` get a fresh one
    pub fn evict_instance(&self, id: &str) -> Result<Arc<LiveInstance>, BridgeError> {
        let mut instances = self.instances.write();
        match instances.remove(id) {
            Some(instance) => {
                info!(instance = %id, "evicted instance");
                Ok(instance)
            }
            None => Err(BridgeError::instance_not_found(
                id,
                instances.keys().map(String::as_str),
            )),
        }
    }

    /// The live instance for `id`, instantiating template `name` on first use
    ///
    /// The instance is always registered under `id`, whatever identifier the
    /// options carry. Concurrent first requests for one `id` get the same
    /// instance.
    pub fn resolve_or_create(
        &self,
        id: &str,
        name: &str,
        options: InstanceOptions,
    ) -> Result<Arc<LiveInstance>, BridgeError> {
        if let Some(instance) = self.lookup_instance(id) {
            return Ok(instance);
        }

        let mut instances = self.instances.write();
        if let Some(instance) = instances.get(id) {
            return Ok(Arc::clone(instance));
        }

        let template = {
            let templates = self.templates.read();
            match templates.get(name) {
                Some(template) => Arc::clone(template),
                None => {
                    return Err(BridgeError::template_not_found(
                        name,
                        templates.keys().map(String::as_str),
                    ));
                }
            }
        };

        let options = InstanceOptions {
            specific_identifier: Some(id.to_string()),
            ..options
        };
        let instance = Arc::new(template.instantiate(&self.config, options));
        instances.insert(id.to_string(), Arc::clone(&instance));
        debug!(instance = %id, template = %name, "created instance");
        Ok(instance)
    }

    /// View function of instance `id` for the base path or a named sub-path
    pub fn locate_endpoint(&self, id: &str, name: Option<&str>) -> Result<ViewFunction, BridgeError> {
        let instance = {
            let instances = self.instances.read();
            match instances.get(id) {
                Some(instance) => Arc::clone(instance),
                None => {
                    return Err(BridgeError::instance_not_found(
                        id,
                        instances.keys().map(String::as_str),
                    ));
                }
            }
        };
        instance.locate_endpoint_function(name)
    }

    /// Registered template names, sorted
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered instance identifiers, sorted
    pub fn instance_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.instances.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
