//! End-to-end scenarios driving a full `Hub` (registry + plugin host +
//! thing manager + rule engine) the way a transport server would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use thinghub_core::hub_events::HubEvent;
use thinghub_core::persistence::Role;
use thinghub_core::plugin_host::{CallbackSink, Result as PluginResult, ThingPlugin};
use thinghub_core::rule_engine::ThingRemovalPolicy;
use thinghub_core::types::{
    Action, ActionExecutionStatus, ActionType, ActionTypeId, ComparisonOperator, CreateMethod,
    EventDescriptor, EventTypeId, InputType, PairingTransactionId, ParamMap, ParamType,
    ParamTypeId, Plugin, PluginId, RepeatingMode, RepeatingOption, Rule, RuleAction,
    RuleActionTarget, RuleId, SemanticType, SetupMethod, StateDescriptor, StateEvaluator,
    StateTarget, StateType, StateTypeId, Thing, ThingClass, ThingClassId, ThingDescriptor,
    ThingDescriptorId, ThingId, TimeDescriptor, TimeEventItem, Value, Vendor, VendorId,
};
use thinghub_core::Hub;

struct RecordingPlugin {
    id: PluginId,
    executed: Mutex<Vec<(ThingId, ActionTypeId)>>,
    discoveries: Vec<ThingDescriptor>,
    browser_items: Vec<thinghub_core::types::BrowserItem>,
}

impl RecordingPlugin {
    fn new(id: PluginId) -> Self {
        Self {
            id,
            executed: Mutex::new(Vec::new()),
            discoveries: Vec::new(),
            browser_items: Vec::new(),
        }
    }

    fn with_discoveries(mut self, discoveries: Vec<ThingDescriptor>) -> Self {
        self.discoveries = discoveries;
        self
    }

    fn with_browser_items(mut self, items: Vec<thinghub_core::types::BrowserItem>) -> Self {
        self.browser_items = items;
        self
    }
}

#[async_trait]
impl ThingPlugin for RecordingPlugin {
    fn id(&self) -> PluginId {
        self.id
    }

    async fn init(&self, _config_params: ParamMap, _callbacks: CallbackSink) -> PluginResult<()> {
        Ok(())
    }

    async fn start_monitoring_auto(&self) -> PluginResult<()> {
        Ok(())
    }

    async fn discover(&self, _thing_class_id: ThingClassId, _params: ParamMap) -> PluginResult<Vec<ThingDescriptor>> {
        Ok(self.discoveries.clone())
    }

    async fn setup_thing(&self, _thing: Thing) -> PluginResult<()> {
        Ok(())
    }

    async fn post_setup(&self, _thing: &Thing) -> PluginResult<()> {
        Ok(())
    }

    async fn thing_removed(&self, _thing: &Thing) -> PluginResult<()> {
        Ok(())
    }

    async fn start_pairing(&self, _thing_class_id: ThingClassId, _params: ParamMap) -> PluginResult<PairingTransactionId> {
        Ok(PairingTransactionId::new())
    }

    async fn confirm_pairing(
        &self,
        _transaction_id: PairingTransactionId,
        _username: Option<String>,
        _secret: Option<String>,
    ) -> PluginResult<()> {
        Ok(())
    }

    async fn execute_action(&self, action: Action) -> PluginResult<ActionExecutionStatus> {
        self.executed.lock().unwrap().push((action.thing_id, action.action_type_id));
        Ok(ActionExecutionStatus::Success)
    }

    async fn browse(
        &self,
        _thing: &Thing,
        _item_id: Option<String>,
        _locale: &str,
    ) -> PluginResult<Vec<thinghub_core::types::BrowserItem>> {
        Ok(self.browser_items.clone())
    }

    async fn execute_browser_item(&self, _thing: &Thing, _item_id: String) -> PluginResult<ActionExecutionStatus> {
        Ok(ActionExecutionStatus::Success)
    }

    async fn execute_browser_item_action(
        &self,
        _thing: &Thing,
        _item_id: String,
        _action_name: String,
        _params: ParamMap,
    ) -> PluginResult<ActionExecutionStatus> {
        Ok(ActionExecutionStatus::Success)
    }
}

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> chrono::DateTime<chrono::Utc> {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap().and_utc()
}

/// Registers a vendor + thing class under `class_id` (one "turnOn"
/// action type plus whatever `state`/`param_types` the caller needs)
/// and attaches `plugin` to the hub.
async fn register_switch_class(
    hub: &Hub,
    class_id: ThingClassId,
    plugin: Arc<RecordingPlugin>,
    action_type_id: ActionTypeId,
    state: Option<StateType>,
    param_types: Vec<ParamType>,
    discovery_param_types: Vec<ParamType>,
) {
    let plugin_id = plugin.id();
    hub.registry
        .register_plugin(Plugin {
            id: plugin_id,
            name: "switch_plugin".into(),
            display_name: "Switch Plugin".into(),
            params: vec![],
            api_version: "1.0".into(),
        })
        .unwrap();
    let vendor_id = VendorId::new();
    hub.registry.register_vendor(Vendor { id: vendor_id, name: "acme".into(), display_name: "Acme".into() });

    hub.registry
        .register_thing_class(ThingClass {
            id: class_id,
            vendor_id,
            plugin_id,
            name: "switch".into(),
            display_name: "Switch".into(),
            create_methods: vec![CreateMethod::User, CreateMethod::Discovery],
            setup_method: SetupMethod::JustAdd,
            param_types,
            settings_types: vec![],
            discovery_param_types,
            state_types: state.into_iter().collect(),
            action_types: vec![ActionType {
                id: action_type_id,
                name: "turnOn".into(),
                display_name: "Turn on".into(),
                param_types: vec![],
            }],
            event_types: vec![],
            interfaces: vec![],
            browsable: false,
        })
        .unwrap();

    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    hub.plugins.attach_plugin(plugin, ParamMap::new(), tx).await.unwrap();
}

#[tokio::test]
async fn daily_time_based_rule_fires_action_only_at_its_scheduled_minute() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let action_type_id = ActionTypeId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    let class_id = ThingClassId::new();
    register_switch_class(&hub, class_id, plugin.clone(), action_type_id, None, vec![], vec![]).await;

    let thing = hub.things.add_configured_thing(class_id, "Porch light".into(), ParamMap::new(), None).await.unwrap();

    let rule = Rule {
        id: RuleId::new(),
        name: "evening light".into(),
        enabled: true,
        time_descriptor: TimeDescriptor {
            calendar_items: vec![],
            time_event_items: vec![TimeEventItem {
                time: Some(NaiveTime::from_hms_opt(19, 30, 0).unwrap()),
                date_time: None,
                repeating: RepeatingOption { mode: Some(RepeatingMode::Daily), ..Default::default() },
            }],
        },
        event_descriptors: vec![],
        state_evaluator: None,
        actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: thing.id, action_type_id },
            params: vec![],
        }],
        exit_actions: vec![],
        executable: true,
        active: false,
        last_active_change: None,
    };
    hub.rules.add_rule(rule).unwrap();

    // An unrelated minute: nothing should fire.
    hub.rules.on_tick(dt(2026, 7, 27, 19, 29), &hub.things).await;
    assert!(plugin.executed.lock().unwrap().is_empty());

    // The scheduled minute: the action fires exactly once.
    hub.rules.on_tick(dt(2026, 7, 27, 19, 30), &hub.things).await;
    assert_eq!(plugin.executed.lock().unwrap().len(), 1);

    // A minute later, the item is no longer firing.
    hub.rules.on_tick(dt(2026, 7, 27, 19, 31), &hub.things).await;
    assert_eq!(plugin.executed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn state_based_rule_runs_exit_actions_when_its_gate_closes() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let turn_on = ActionTypeId::new();
    let turn_off = ActionTypeId::new();
    let state_type_id = StateTypeId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));

    let state = StateType {
        id: state_type_id,
        name: "isPresent".into(),
        display_name: "Presence".into(),
        semantic_type: SemanticType::Bool,
        default_value: Value::Bool(false),
        min_value: None,
        max_value: None,
        allowed_values: vec![],
        unit: None,
        cached: false,
        writable: false,
        display_name_event: "Presence changed".into(),
        display_name_action: None,
    };

    let plugin_id = plugin.id();
    hub.registry
        .register_plugin(Plugin {
            id: plugin_id,
            name: "presence_plugin".into(),
            display_name: "Presence Plugin".into(),
            params: vec![],
            api_version: "1.0".into(),
        })
        .unwrap();
    let vendor_id = VendorId::new();
    hub.registry.register_vendor(Vendor { id: vendor_id, name: "acme".into(), display_name: "Acme".into() });
    let class_id = ThingClassId::new();
    hub.registry
        .register_thing_class(ThingClass {
            id: class_id,
            vendor_id,
            plugin_id,
            name: "presence_sensor".into(),
            display_name: "Presence Sensor".into(),
            create_methods: vec![CreateMethod::User],
            setup_method: SetupMethod::JustAdd,
            param_types: vec![],
            settings_types: vec![],
            discovery_param_types: vec![],
            state_types: vec![state],
            action_types: vec![
                ActionType { id: turn_on, name: "turnOn".into(), display_name: "On".into(), param_types: vec![] },
                ActionType { id: turn_off, name: "turnOff".into(), display_name: "Off".into(), param_types: vec![] },
            ],
            event_types: vec![],
            interfaces: vec![],
            browsable: false,
        })
        .unwrap();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    hub.plugins.attach_plugin(plugin.clone(), ParamMap::new(), tx).await.unwrap();

    let sensor = hub.things.add_configured_thing(class_id, "Hallway sensor".into(), ParamMap::new(), None).await.unwrap();

    let rule = Rule {
        id: RuleId::new(),
        name: "light on presence".into(),
        enabled: true,
        time_descriptor: TimeDescriptor::default(),
        event_descriptors: vec![],
        state_evaluator: Some(StateEvaluator::Leaf(StateDescriptor {
            target: StateTarget::Thing { thing_id: sensor.id, state_type_id },
            operator: ComparisonOperator::Eq,
            value: Value::Bool(true),
        })),
        actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: sensor.id, action_type_id: turn_on },
            params: vec![],
        }],
        exit_actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: sensor.id, action_type_id: turn_off },
            params: vec![],
        }],
        executable: true,
        active: false,
        last_active_change: None,
    };
    hub.rules.add_rule(rule).unwrap();

    // No state written yet: the gate is closed, nothing dispatches.
    hub.rules.on_tick(dt(2026, 7, 27, 8, 0), &hub.things).await;
    assert!(plugin.executed.lock().unwrap().is_empty());

    // Presence becomes true: the rule activates and runs `actions`.
    hub.things.set_state_value(sensor.id, state_type_id, Value::Bool(true)).unwrap();
    hub.rules.on_tick(dt(2026, 7, 27, 8, 1), &hub.things).await;
    assert_eq!(plugin.executed.lock().unwrap().last(), Some(&(sensor.id, turn_on)));

    // Presence clears: the rule deactivates and runs `exit_actions`.
    hub.things.set_state_value(sensor.id, state_type_id, Value::Bool(false)).unwrap();
    hub.rules.on_tick(dt(2026, 7, 27, 8, 2), &hub.things).await;
    assert_eq!(plugin.executed.lock().unwrap().last(), Some(&(sensor.id, turn_off)));
    assert_eq!(plugin.executed.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn mixed_rule_only_fires_inside_its_midnight_crossing_calendar_window() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let action_type_id = ActionTypeId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    let class_id = ThingClassId::new();
    register_switch_class(&hub, class_id, plugin.clone(), action_type_id, None, vec![], vec![]).await;
    let thing = hub.things.add_configured_thing(class_id, "Night light".into(), ParamMap::new(), None).await.unwrap();

    let rule = Rule {
        id: RuleId::new(),
        name: "late night chime".into(),
        enabled: true,
        time_descriptor: TimeDescriptor {
            calendar_items: vec![thinghub_core::types::CalendarItem {
                start_time: Some(NaiveTime::from_hms_opt(23, 0, 0).unwrap()),
                start_date_time: None,
                duration: 120,
                repeating: RepeatingOption { mode: Some(RepeatingMode::Daily), ..Default::default() },
            }],
            time_event_items: vec![TimeEventItem {
                time: Some(NaiveTime::from_hms_opt(23, 30, 0).unwrap()),
                date_time: None,
                repeating: RepeatingOption { mode: Some(RepeatingMode::Daily), ..Default::default() },
            }],
        },
        event_descriptors: vec![],
        state_evaluator: None,
        actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: thing.id, action_type_id },
            params: vec![],
        }],
        exit_actions: vec![],
        executable: true,
        active: false,
        last_active_change: None,
    };
    hub.rules.add_rule(rule).unwrap();

    // Time event minute matches, but well outside the calendar window.
    hub.rules.on_tick(dt(2026, 3, 1, 10, 0), &hub.things).await;
    // Inside the calendar window, but not the event's own minute.
    hub.rules.on_tick(dt(2026, 3, 1, 23, 31), &hub.things).await;
    assert!(plugin.executed.lock().unwrap().is_empty());

    // Both the calendar gate and the time event line up.
    hub.rules.on_tick(dt(2026, 3, 1, 23, 30), &hub.things).await;
    assert_eq!(plugin.executed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn discovered_thing_lets_user_supplied_params_override_descriptor_params() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let ip_param_id = ParamTypeId::new();
    let label_param_id = ParamTypeId::new();
    let action_type_id = ActionTypeId::new();
    let class_id = ThingClassId::new();
    let descriptor_id = ThingDescriptorId::new();

    let descriptor = ThingDescriptor {
        id: descriptor_id,
        thing_class_id: class_id,
        title: "Found switch".into(),
        description: "at 10.0.0.5".into(),
        parent_id: None,
        existing_thing_id: None,
        params: {
            let mut m = ParamMap::new();
            m.insert(ip_param_id, Value::String("10.0.0.5".into()));
            m.insert(label_param_id, Value::String("Garage".into()));
            m
        },
    };
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()).with_discoveries(vec![descriptor]));

    let param_types = vec![
        ParamType {
            id: ip_param_id,
            name: "ip".into(),
            display_name: "IP address".into(),
            semantic_type: SemanticType::String,
            default_value: None,
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            input_type: InputType::IPv4Address,
            read_only: false,
            index: 0,
        },
        ParamType {
            id: label_param_id,
            name: "label".into(),
            display_name: "Factory label".into(),
            semantic_type: SemanticType::String,
            default_value: None,
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            input_type: InputType::None,
            read_only: true,
            index: 1,
        },
    ];
    register_switch_class(&hub, class_id, plugin, action_type_id, None, param_types, vec![]).await;

    let descriptors = hub.things.discover_things(class_id, ParamMap::new()).await.unwrap();
    assert_eq!(descriptors.len(), 1);

    let overrides = {
        let mut m = ParamMap::new();
        m.insert(ip_param_id, Value::String("10.0.0.9".into()));
        m
    };
    let thing = hub
        .things
        .add_discovered_thing("Garage switch".into(), descriptors[0].id, overrides, None)
        .await
        .unwrap();

    assert_eq!(thing.param_value(ip_param_id), Some(&Value::String("10.0.0.9".into())));
    assert_eq!(thing.param_value(label_param_id), Some(&Value::String("Garage".into())));
}

#[tokio::test]
async fn reconfigure_rejects_a_read_only_param_but_allows_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let ip_param_id = ParamTypeId::new();
    let serial_param_id = ParamTypeId::new();
    let action_type_id = ActionTypeId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    let class_id = ThingClassId::new();

    let param_types = vec![
        ParamType {
            id: ip_param_id,
            name: "ip".into(),
            display_name: "IP address".into(),
            semantic_type: SemanticType::String,
            default_value: None,
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            input_type: InputType::IPv4Address,
            read_only: false,
            index: 0,
        },
        ParamType {
            id: serial_param_id,
            name: "serial".into(),
            display_name: "Serial number".into(),
            semantic_type: SemanticType::String,
            default_value: Some(Value::String("factory".into())),
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            input_type: InputType::None,
            read_only: true,
            index: 1,
        },
    ];
    register_switch_class(&hub, class_id, plugin, action_type_id, None, param_types, vec![]).await;

    let initial_params = {
        let mut m = ParamMap::new();
        m.insert(ip_param_id, Value::String("1.2.3.4".into()));
        m
    };
    let thing = hub.things.add_configured_thing(class_id, "Switch".into(), initial_params, None).await.unwrap();
    assert_eq!(thing.param_value(serial_param_id), Some(&Value::String("factory".into())));

    // Attempting to also set the read-only serial number is rejected.
    let bad_params = {
        let mut m = ParamMap::new();
        m.insert(ip_param_id, Value::String("9.9.9.9".into()));
        m.insert(serial_param_id, Value::String("hacked".into()));
        m
    };
    assert!(hub.things.reconfigure_thing(thing.id, bad_params, false).await.is_err());
    // The rejected attempt didn't leave the thing half-updated.
    assert_eq!(hub.things.thing(thing.id).unwrap().param_value(ip_param_id), Some(&Value::String("1.2.3.4".into())));

    // Reconfiguring without the read-only field succeeds normally.
    let good_params = {
        let mut m = ParamMap::new();
        m.insert(ip_param_id, Value::String("9.9.9.9".into()));
        m
    };
    let updated = hub.things.reconfigure_thing(thing.id, good_params, false).await.unwrap();
    assert_eq!(updated.param_value(ip_param_id), Some(&Value::String("9.9.9.9".into())));
}

#[tokio::test]
async fn removing_a_thing_cascades_to_its_children() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let action_type_id = ActionTypeId::new();
    let class_id = ThingClassId::new();

    // Fix the parent's id before it exists so the discovered children's
    // descriptors can carry a real parent_id from the start.
    let parent_id = ThingId::new();
    let first_descriptor = ThingDescriptor {
        id: ThingDescriptorId::new(),
        thing_class_id: class_id,
        title: "Outlet A".into(),
        description: String::new(),
        parent_id: Some(parent_id),
        existing_thing_id: None,
        params: ParamMap::new(),
    };
    let second_descriptor = ThingDescriptor {
        id: ThingDescriptorId::new(),
        thing_class_id: class_id,
        title: "Outlet B".into(),
        description: String::new(),
        parent_id: Some(parent_id),
        existing_thing_id: None,
        params: ParamMap::new(),
    };
    let plugin = Arc::new(
        RecordingPlugin::new(PluginId::new())
            .with_discoveries(vec![first_descriptor, second_descriptor]),
    );
    register_switch_class(&hub, class_id, plugin, action_type_id, None, vec![], vec![]).await;

    let parent = hub
        .things
        .add_configured_thing(class_id, "Hub bridge".into(), ParamMap::new(), Some(parent_id))
        .await
        .unwrap();
    assert_eq!(parent.id, parent_id);

    let descriptors = hub.things.discover_things(class_id, ParamMap::new()).await.unwrap();
    let a_id = descriptors.iter().find(|d| d.title == "Outlet A").unwrap().id;
    let b_id = descriptors.iter().find(|d| d.title == "Outlet B").unwrap().id;
    let first_child =
        hub.things.add_discovered_thing("Outlet A".into(), a_id, ParamMap::new(), None).await.unwrap();
    let second_child =
        hub.things.add_discovered_thing("Outlet B".into(), b_id, ParamMap::new(), None).await.unwrap();
    assert_eq!(first_child.parent_id, Some(parent_id));
    assert_eq!(second_child.parent_id, Some(parent_id));

    let mut events = hub.subscribe();
    hub.things.remove_configured_thing(parent_id).await.unwrap();

    assert!(hub.things.thing(parent_id).is_err());
    assert!(hub.things.thing(first_child.id).is_err());
    assert!(hub.things.thing(second_child.id).is_err());

    let mut removed_ids = std::collections::HashSet::new();
    while removed_ids.len() < 3 {
        match events.recv().await.unwrap() {
            HubEvent::ThingRemoved(id) => {
                removed_ids.insert(id);
            }
            _ => continue,
        }
    }
    assert!(removed_ids.contains(&parent_id));
    assert!(removed_ids.contains(&first_child.id));
    assert!(removed_ids.contains(&second_child.id));
}

#[tokio::test]
async fn rule_engine_applies_cascade_and_update_removal_policies_independently() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());
    let action_type_id = ActionTypeId::new();

    let removed_thing_id = ThingId::new();
    let other_thing_id = ThingId::new();

    let cascade_rule = Rule {
        id: RuleId::new(),
        name: "cascade me".into(),
        enabled: true,
        time_descriptor: TimeDescriptor::default(),
        event_descriptors: vec![EventDescriptor {
            thing_id: removed_thing_id,
            event_type_id: EventTypeId::new(),
            param_values: vec![],
        }],
        state_evaluator: None,
        actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: removed_thing_id, action_type_id },
            params: vec![],
        }],
        exit_actions: vec![],
        executable: true,
        active: false,
        last_active_change: None,
    };
    let cascade_rule_id = hub.rules.add_rule(cascade_rule).unwrap();

    let update_rule = Rule {
        id: RuleId::new(),
        name: "prune me".into(),
        enabled: true,
        time_descriptor: TimeDescriptor::default(),
        event_descriptors: vec![
            EventDescriptor { thing_id: removed_thing_id, event_type_id: EventTypeId::new(), param_values: vec![] },
            EventDescriptor { thing_id: other_thing_id, event_type_id: EventTypeId::new(), param_values: vec![] },
        ],
        state_evaluator: None,
        actions: vec![RuleAction {
            target: RuleActionTarget::Thing { thing_id: other_thing_id, action_type_id },
            params: vec![],
        }],
        exit_actions: vec![],
        executable: true,
        active: false,
        last_active_change: None,
    };
    let update_rule_id = hub.rules.add_rule(update_rule).unwrap();

    let mut policies = HashMap::new();
    policies.insert(cascade_rule_id, ThingRemovalPolicy::Cascade);
    policies.insert(update_rule_id, ThingRemovalPolicy::Update);
    hub.rules.handle_thing_removed(removed_thing_id, &policies);

    // The cascade-policy rule is gone entirely.
    assert!(hub.rules.rule(cascade_rule_id).is_err());
    // The update-policy rule survives, pruned down to its one remaining
    // reference to `other_thing_id`.
    let survivor = hub.rules.rule(update_rule_id).unwrap();
    assert_eq!(survivor.event_descriptors.len(), 1);
    assert_eq!(survivor.event_descriptors[0].thing_id, other_thing_id);
}

#[tokio::test]
async fn restoring_a_fresh_hub_from_the_same_storage_brings_back_things_state_and_rules() {
    let dir = tempfile::tempdir().unwrap();

    let action_type_id = ActionTypeId::new();
    let class_id = ThingClassId::new();
    let state_type_id = StateTypeId::new();
    // A manifest's pluginId is fixed in the manifest file, so the same
    // plugin comes back under the same id across restarts.
    let plugin_id = PluginId::new();
    let thing_id;
    let rule_id;

    {
        let hub = Hub::new(dir.path());
        let plugin = Arc::new(RecordingPlugin::new(plugin_id));
        let state = StateType {
            id: state_type_id,
            name: "power".into(),
            display_name: "Power".into(),
            semantic_type: SemanticType::Bool,
            default_value: Value::Bool(false),
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            cached: true,
            writable: false,
            display_name_event: "Power changed".into(),
            display_name_action: None,
        };
        register_switch_class(&hub, class_id, plugin, action_type_id, Some(state), vec![], vec![]).await;

        let thing = hub.things.add_configured_thing(class_id, "Lamp".into(), ParamMap::new(), None).await.unwrap();
        thing_id = thing.id;
        hub.things.set_state_value(thing_id, state_type_id, Value::Bool(true)).unwrap();

        let rule = Rule {
            id: RuleId::new(),
            name: "restored rule".into(),
            enabled: true,
            time_descriptor: TimeDescriptor {
                calendar_items: vec![],
                time_event_items: vec![TimeEventItem {
                    time: Some(NaiveTime::from_hms_opt(7, 0, 0).unwrap()),
                    date_time: None,
                    repeating: RepeatingOption { mode: Some(RepeatingMode::Daily), ..Default::default() },
                }],
            },
            event_descriptors: vec![],
            state_evaluator: None,
            actions: vec![RuleAction {
                target: RuleActionTarget::Thing { thing_id, action_type_id },
                params: vec![],
            }],
            exit_actions: vec![],
            executable: true,
            active: false,
            last_active_change: None,
        };
        rule_id = hub.rules.add_rule(rule).unwrap();
        // Process exit, registry and in-memory arenas are gone; only
        // what was written to `dir` survives to the next Hub.
    }

    let hub = Hub::new(dir.path());
    let plugin = Arc::new(RecordingPlugin::new(plugin_id));
    register_switch_class(
        &hub,
        class_id,
        plugin.clone(),
        action_type_id,
        Some(StateType {
            id: state_type_id,
            name: "power".into(),
            display_name: "Power".into(),
            semantic_type: SemanticType::Bool,
            default_value: Value::Bool(false),
            min_value: None,
            max_value: None,
            allowed_values: vec![],
            unit: None,
            cached: true,
            writable: false,
            display_name_event: "Power changed".into(),
            display_name_action: None,
        }),
        vec![],
        vec![],
    )
    .await;

    hub.restore().await;

    let restored = hub.things.thing(thing_id).unwrap();
    assert_eq!(restored.name, "Lamp");
    assert!(restored.is_operational());
    assert_eq!(restored.state_value(state_type_id), Some(&Value::Bool(true)));

    let restored_rule = hub.rules.rule(rule_id).unwrap();
    assert_eq!(restored_rule.name, "restored rule");

    // Removing the restored thing still cascades the persisted groups.
    hub.things.remove_configured_thing(thing_id).await.unwrap();
    assert!(hub.store.groups(Role::Things).is_empty());
    assert!(hub.store.groups(Role::ThingStates).is_empty());
}

#[tokio::test]
async fn a_thing_whose_class_is_no_longer_loaded_is_skipped_on_restore() {
    let dir = tempfile::tempdir().unwrap();
    let thing_id;
    let class_id = ThingClassId::new();

    {
        let hub = Hub::new(dir.path());
        let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
        register_switch_class(&hub, class_id, plugin, ActionTypeId::new(), None, vec![], vec![]).await;
        let thing = hub.things.add_configured_thing(class_id, "Orphan".into(), ParamMap::new(), None).await.unwrap();
        thing_id = thing.id;
    }

    // No plugin/thing class is re-registered this time.
    let hub = Hub::new(dir.path());
    hub.restore().await;

    assert!(hub.things.thing(thing_id).is_err());
    // Still retained in storage, just not instantiated.
    assert!(!hub.store.groups(Role::Things).is_empty());
}

async fn register_pairing_class(hub: &Hub, class_id: ThingClassId, plugin: Arc<RecordingPlugin>) {
    let plugin_id = plugin.id();
    hub.registry
        .register_plugin(Plugin {
            id: plugin_id,
            name: "cloud_plugin".into(),
            display_name: "Cloud Plugin".into(),
            params: vec![],
            api_version: "1.0".into(),
        })
        .unwrap();
    let vendor_id = VendorId::new();
    hub.registry.register_vendor(Vendor { id: vendor_id, name: "cloudco".into(), display_name: "CloudCo".into() });
    hub.registry
        .register_thing_class(ThingClass {
            id: class_id,
            vendor_id,
            plugin_id,
            name: "cloudThing".into(),
            display_name: "Cloud Thing".into(),
            create_methods: vec![CreateMethod::User],
            setup_method: SetupMethod::UserAndPassword,
            param_types: vec![],
            settings_types: vec![],
            discovery_param_types: vec![],
            state_types: vec![],
            action_types: vec![],
            event_types: vec![],
            interfaces: vec![],
            browsable: true,
        })
        .unwrap();
    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    hub.plugins.attach_plugin(plugin, ParamMap::new(), tx).await.unwrap();
}

#[tokio::test]
async fn pairing_a_class_that_just_adds_is_rejected_but_a_credentialed_class_confirms_into_a_thing() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());
    let class_id = ThingClassId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    register_pairing_class(&hub, class_id, plugin).await;

    let transaction = hub
        .things
        .pairing_start(class_id, "Cloud Account".into(), ParamMap::new(), None)
        .await
        .unwrap();

    let thing = hub
        .things
        .confirm_pairing(transaction.id, Some("user".into()), Some("secret".into()))
        .await
        .unwrap();

    assert_eq!(thing.name, "Cloud Account");
    assert!(thing.is_operational());
    // The transaction is single-use: a second confirm on the same id fails.
    assert!(hub.things.confirm_pairing(transaction.id, None, None).await.is_err());
}

#[tokio::test]
async fn pairing_start_rejects_a_thing_class_that_does_not_need_pairing() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());
    let class_id = ThingClassId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    register_switch_class(&hub, class_id, plugin, ActionTypeId::new(), None, vec![], vec![]).await;

    let err = hub
        .things
        .pairing_start(class_id, "Lamp".into(), ParamMap::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, thinghub_core::thing_manager::ThingManagerError::SetupMethodNotSupported));
}

#[tokio::test]
async fn browsing_a_browsable_thing_lists_and_executes_items_while_a_non_browsable_thing_rejects_it() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let browsable_class = ThingClassId::new();
    let plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    register_pairing_class(&hub, browsable_class, plugin).await;
    let transaction = hub
        .things
        .pairing_start(browsable_class, "Cloud Account".into(), ParamMap::new(), None)
        .await
        .unwrap();
    let browsable_thing = hub
        .things
        .confirm_pairing(transaction.id, Some("user".into()), Some("secret".into()))
        .await
        .unwrap();

    let items = hub.things.browse(browsable_thing.id, None, "en_US").await.unwrap();
    assert!(items.is_empty());
    let status = hub
        .things
        .execute_browser_item(browsable_thing.id, "root-item".into())
        .await
        .unwrap();
    assert_eq!(status, ActionExecutionStatus::Success);

    let plain_class = ThingClassId::new();
    let plain_plugin = Arc::new(RecordingPlugin::new(PluginId::new()));
    register_switch_class(&hub, plain_class, plain_plugin, ActionTypeId::new(), None, vec![], vec![]).await;
    let plain_thing = hub
        .things
        .add_configured_thing(plain_class, "Lamp".into(), ParamMap::new(), None)
        .await
        .unwrap();
    assert!(hub.things.browse(plain_thing.id, None, "en_US").await.is_err());
}

#[tokio::test]
async fn browse_localizes_item_display_names_through_the_hubs_translation_service() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Hub::new(dir.path());

    let class_id = ThingClassId::new();
    let plugin_id = PluginId::new();
    let root_item = thinghub_core::types::BrowserItem {
        item_id: "root-item".into(),
        thing_id: ThingId::new(),
        display_name: "Root Folder".into(),
        description: String::new(),
        icon: None,
        executable: false,
        browsable: true,
    };
    let plugin = Arc::new(RecordingPlugin::new(plugin_id).with_browser_items(vec![root_item]));
    register_pairing_class(&hub, class_id, plugin).await;
    let transaction = hub
        .things
        .pairing_start(class_id, "Cloud Account".into(), ParamMap::new(), None)
        .await
        .unwrap();
    let thing = hub
        .things
        .confirm_pairing(transaction.id, Some("user".into()), Some("secret".into()))
        .await
        .unwrap();

    let mut table = thinghub_core::translation::TranslationTable::default();
    table.insert("de_DE", "Root Folder", "Stammordner");
    hub.translations.load_table(plugin_id, table);

    let items = hub.things.browse(thing.id, None, "de_DE").await.unwrap();
    assert_eq!(items[0].display_name, "Stammordner");

    let items = hub.things.browse(thing.id, None, "en_US").await.unwrap();
    assert_eq!(items[0].display_name, "Root Folder");
}
