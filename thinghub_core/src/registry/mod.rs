//! TypeRegistry: the static type system a plugin's manifest populates —
//! Vendors, Plugins, ThingClasses and the built-in Interfaces they may
//! claim to implement (§4.1).

pub mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::arena::Arena;
use crate::types::{
    ActionTypeId, EventTypeId, Interface, Plugin, PluginId, StateTypeId, ThingClass, ThingClassId,
    Vendor, VendorId,
};

pub use error::{RegistryError, Result};

const SUPPORTED_API_VERSION_MAJOR: u32 = 1;

/// Built-in interfaces known to the hub. Interfaces are not
/// plugin-supplied; new ones ship with the hub itself.
fn builtin_interfaces() -> Vec<Interface> {
    vec![
        Interface {
            name: "light".into(),
            required_states: vec!["power".into()],
            required_actions: vec!["power".into()],
            required_events: vec![],
            parent_interfaces: vec![],
        },
        Interface {
            name: "dimmablelight".into(),
            required_states: vec!["brightness".into()],
            required_actions: vec!["brightness".into()],
            required_events: vec![],
            parent_interfaces: vec!["light".into()],
        },
        Interface {
            name: "temperaturesensor".into(),
            required_states: vec!["temperature".into()],
            required_actions: vec![],
            required_events: vec![],
            parent_interfaces: vec![],
        },
        Interface {
            name: "presencesensor".into(),
            required_states: vec!["isPresent".into()],
            required_actions: vec![],
            required_events: vec![],
            parent_interfaces: vec![],
        },
        Interface {
            name: "closablegate".into(),
            required_states: vec!["closed".into()],
            required_actions: vec!["open".into(), "close".into()],
            required_events: vec![],
            parent_interfaces: vec![],
        },
    ]
}

#[derive(Clone)]
pub struct TypeRegistry {
    vendors: Arena<VendorId, Vendor>,
    plugins: Arena<PluginId, Plugin>,
    thing_classes: Arena<ThingClassId, ThingClass>,
    interfaces: Arc<Mutex<HashMap<String, Interface>>>,
    /// The interfaces each ThingClass actually qualifies for, after
    /// dropping the ones its declared `interfaces` claimed but its
    /// state/action/event types don't back up.
    validated_interfaces: Arena<ThingClassId, Vec<String>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut interfaces = HashMap::new();
        for iface in builtin_interfaces() {
            interfaces.insert(iface.name.clone(), iface);
        }
        Self {
            vendors: Arena::new(),
            plugins: Arena::new(),
            thing_classes: Arena::new(),
            interfaces: Arc::new(Mutex::new(interfaces)),
            validated_interfaces: Arena::new(),
        }
    }

    pub fn register_vendor(&self, vendor: Vendor) {
        self.vendors.insert(vendor.id, vendor);
    }

    pub fn vendor(&self, id: VendorId) -> Result<Vendor> {
        self.vendors.get(&id).ok_or(RegistryError::VendorNotFound(id))
    }

    pub fn vendors(&self) -> Vec<Vendor> {
        self.vendors.values()
    }

    pub fn register_plugin(&self, plugin: Plugin) -> Result<()> {
        let major: u32 = plugin
            .api_version
            .split('.')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| RegistryError::InvalidMetadata("malformed apiVersion".into()))?;
        if major != SUPPORTED_API_VERSION_MAJOR {
            return Err(RegistryError::UnsupportedApiVersion {
                found: plugin.api_version.clone(),
                expected: format!("{SUPPORTED_API_VERSION_MAJOR}.x"),
            });
        }
        self.plugins.insert(plugin.id, plugin);
        Ok(())
    }

    pub fn plugin(&self, id: PluginId) -> Result<Plugin> {
        self.plugins.get(&id).ok_or(RegistryError::PluginNotFound(id))
    }

    pub fn plugins(&self) -> Vec<Plugin> {
        self.plugins.values()
    }

    /// Registers a ThingClass, validating every interface it claims
    /// against its own state/action/event type names. An interface that
    /// doesn't check out is dropped with a warning rather than failing
    /// registration outright (§4.1).
    pub fn register_thing_class(&self, class: ThingClass) -> Result<()> {
        let validated = self.validate_interfaces(&class);
        let id = class.id;
        self.thing_classes.insert(id, class);
        self.validated_interfaces.insert(id, validated);
        Ok(())
    }

    fn validate_interfaces(&self, class: &ThingClass) -> Vec<String> {
        let interfaces = self.interfaces.lock().unwrap();
        let mut kept = Vec::new();
        for name in &class.interfaces {
            match interfaces.get(name) {
                Some(iface) if self.class_satisfies(class, iface, &interfaces) => {
                    kept.push(name.clone());
                }
                Some(_) => {
                    warn!(
                        thing_class = %class.name,
                        interface = %name,
                        "thing class claims interface but is missing required states/actions/events; dropping"
                    );
                }
                None => {
                    warn!(
                        thing_class = %class.name,
                        interface = %name,
                        "thing class claims unknown interface; dropping"
                    );
                }
            }
        }
        kept
    }

    fn class_satisfies(
        &self,
        class: &ThingClass,
        iface: &Interface,
        all: &HashMap<String, Interface>,
    ) -> bool {
        let has_state = |n: &str| class.state_types.iter().any(|s| s.name == n);
        let has_action = |n: &str| class.action_types.iter().any(|a| a.name == n);
        let has_event = |n: &str| class.event_types.iter().any(|e| e.name == n);

        let own_ok = iface.required_states.iter().all(|n| has_state(n))
            && iface.required_actions.iter().all(|n| has_action(n))
            && iface.required_events.iter().all(|n| has_event(n));

        own_ok
            && iface.parent_interfaces.iter().all(|parent_name| {
                all.get(parent_name)
                    .map(|parent| self.class_satisfies(class, parent, all))
                    .unwrap_or(false)
            })
    }

    pub fn thing_class(&self, id: ThingClassId) -> Result<ThingClass> {
        self.thing_classes
            .get(&id)
            .ok_or(RegistryError::ThingClassNotFound(id))
    }

    pub fn thing_classes(&self) -> Vec<ThingClass> {
        self.thing_classes.values()
    }

    pub fn thing_classes_for_plugin(&self, plugin_id: PluginId) -> Vec<ThingClass> {
        self.thing_classes
            .values()
            .into_iter()
            .filter(|c| c.plugin_id == plugin_id)
            .collect()
    }

    /// The interfaces a thing class actually qualifies for, post-validation.
    pub fn interfaces_of(&self, class_id: ThingClassId) -> Vec<String> {
        self.validated_interfaces.get(&class_id).unwrap_or_default()
    }

    pub fn thing_classes_implementing(&self, interface: &str) -> Vec<ThingClassId> {
        self.thing_classes
            .ids()
            .into_iter()
            .filter(|id| self.interfaces_of(*id).iter().any(|i| i == interface))
            .collect()
    }

    pub fn state_type_id_by_name(&self, class_id: ThingClassId, name: &str) -> Option<StateTypeId> {
        self.thing_classes
            .with(&class_id, |c| {
                c.state_types.iter().find(|s| s.name == name).map(|s| s.id)
            })
            .flatten()
    }

    pub fn action_type_id_by_name(
        &self,
        class_id: ThingClassId,
        name: &str,
    ) -> Option<ActionTypeId> {
        self.thing_classes
            .with(&class_id, |c| {
                c.action_types.iter().find(|a| a.name == name).map(|a| a.id)
            })
            .flatten()
    }

    pub fn event_type_id_by_name(&self, class_id: ThingClassId, name: &str) -> Option<EventTypeId> {
        self.thing_classes
            .with(&class_id, |c| {
                c.event_types.iter().find(|e| e.name == name).map(|e| e.id)
            })
            .flatten()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ActionType, CreateMethod, SetupMethod, StateType,
    };

    fn light_class() -> ThingClass {
        let state = StateType {
            id: StateTypeId::new(),
            name: "power".into(),
            display_name: "Power".into(),
            semantic_type: crate::types::SemanticType::Bool,
            default_value: crate::types::Value::Bool(false),
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            cached: true,
            writable: true,
            display_name_event: "Power changed".into(),
            display_name_action: Some("Set power".into()),
        };
        let action = ActionType {
            id: ActionTypeId::new(),
            name: "power".into(),
            display_name: "Power".into(),
            param_types: vec![],
        };
        ThingClass {
            id: ThingClassId::new(),
            vendor_id: VendorId::new(),
            plugin_id: PluginId::new(),
            name: "dimmer".into(),
            display_name: "Dimmer".into(),
            create_methods: vec![CreateMethod::User],
            setup_method: SetupMethod::JustAdd,
            param_types: vec![],
            settings_types: vec![],
            discovery_param_types: vec![],
            state_types: vec![state],
            action_types: vec![action],
            event_types: vec![],
            interfaces: vec!["light".into(), "dimmablelight".into(), "bogus".into()],
            browsable: false,
        }
    }

    #[test]
    fn drops_interfaces_the_class_cannot_back_up() {
        let registry = TypeRegistry::new();
        let class = light_class();
        let id = class.id;
        registry.register_thing_class(class).unwrap();

        let kept = registry.interfaces_of(id);
        assert!(kept.contains(&"light".to_string()));
        assert!(!kept.contains(&"dimmablelight".to_string()));
        assert!(!kept.contains(&"bogus".to_string()));
    }

    #[test]
    fn rejects_plugin_with_unsupported_major_version() {
        let registry = TypeRegistry::new();
        let plugin = Plugin {
            id: PluginId::new(),
            name: "p".into(),
            display_name: "P".into(),
            params: vec![],
            api_version: "2.0.0".into(),
        };
        assert!(registry.register_plugin(plugin).is_err());
    }

    #[test]
    fn finds_classes_implementing_an_interface() {
        let registry = TypeRegistry::new();
        let class = light_class();
        let id = class.id;
        registry.register_thing_class(class).unwrap();

        let implementers = registry.thing_classes_implementing("light");
        assert_eq!(implementers, vec![id]);
    }
}
