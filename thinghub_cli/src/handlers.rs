use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use thinghub_core::types::{ParamMap, ParamTypeId, Rule, RuleId, ThingClassId, ThingId, Value};
use thinghub_core::Hub;

use crate::logging::log_hub_event;

fn json_params_to_param_map(json: &str) -> ParamMap {
    let value: serde_json::Value = serde_json::from_str(json).unwrap_or_else(|e| {
        eprintln!("failed to parse params as JSON: {e}");
        std::process::exit(1);
    });
    let serde_json::Value::Object(map) = value else {
        eprintln!("params must be a JSON object");
        std::process::exit(1);
    };
    let mut params = ParamMap::new();
    for (key, v) in map {
        let Ok(uuid) = Uuid::parse_str(&key) else {
            eprintln!("param key {key} is not a valid paramTypeId uuid");
            std::process::exit(1);
        };
        params.insert(ParamTypeId(uuid), json_value_to_value(v));
    }
    params
}

fn json_value_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) if n.is_i64() => Value::Int(n.as_i64().unwrap()),
        serde_json::Value::Number(n) => Value::Double(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Value::String(s),
        other => Value::Variant(other),
    }
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or_else(|_| {
        eprintln!("invalid {what}: {raw}");
        std::process::exit(1);
    })
}

pub async fn handle_load_plugin(hub: &Hub, manifest: String) {
    println!("\n=== Loading Plugin Manifest ===");
    match hub.plugins.read_manifest_file(&manifest).await {
        Ok(doc) => match hub.plugins.register_manifest(&doc) {
            Ok(()) => {
                println!("Registered plugin: {}", doc.plugin.name);
                println!("Thing classes: {}", doc.thing_classes.len());
            }
            Err(e) => {
                eprintln!("Failed to register manifest: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Failed to read manifest: {e}");
            std::process::exit(1);
        }
    }
}

pub async fn handle_discover(hub: &Hub, thing_class_id: String, params: String) {
    let thing_class_id: ThingClassId = parse_uuid(&thing_class_id, "thingClassId").into();
    let params = json_params_to_param_map(&params);

    println!("\n=== Discovering Things ===");
    match hub.things.discover_things(thing_class_id, params).await {
        Ok(descriptors) => {
            println!("Found {} candidate(s):", descriptors.len());
            for d in descriptors {
                println!("  - {} [{}] (descriptorId {})", d.title, d.description, d.id);
            }
        }
        Err(e) => {
            eprintln!("Discovery failed: {e}");
            std::process::exit(1);
        }
    }
}

pub async fn handle_add_thing(hub: &Hub, thing_class_id: String, name: String, params: String) {
    let thing_class_id: ThingClassId = parse_uuid(&thing_class_id, "thingClassId").into();
    let params = json_params_to_param_map(&params);

    println!("\n=== Adding Thing ===");
    match hub.things.add_configured_thing(thing_class_id, name, params, None).await {
        Ok(thing) => {
            println!("Thing added: {} ({})", thing.name, thing.id);
            println!("Setup status: {:?}", thing.setup_status);
        }
        Err(e) => {
            eprintln!("Failed to add thing: {e}");
            std::process::exit(1);
        }
    }
}

pub fn handle_list_things(hub: &Hub) {
    println!("\n=== Configured Things ===");
    let things = hub.things.things();
    if things.is_empty() {
        println!("No things configured.");
        return;
    }
    for thing in things {
        println!("  - {} ({}) [{:?}]", thing.name, thing.id, thing.setup_status);
    }
}

pub async fn handle_remove_thing(hub: &Hub, thing_id: String) {
    let thing_id: ThingId = parse_uuid(&thing_id, "thingId").into();
    println!("\n=== Removing Thing ===");
    match hub.things.remove_configured_thing(thing_id).await {
        Ok(()) => println!("Thing removed: {thing_id}"),
        Err(e) => {
            eprintln!("Failed to remove thing: {e}");
            std::process::exit(1);
        }
    }
}

pub fn handle_add_rule(hub: &Hub, file: String) {
    println!("\n=== Adding Rule ===");
    let content = std::fs::read_to_string(&file).unwrap_or_else(|e| {
        eprintln!("failed to read rule file: {e}");
        std::process::exit(1);
    });
    let rule: Rule = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("failed to parse rule definition: {e}");
        std::process::exit(1);
    });
    match hub.rules.add_rule(rule) {
        Ok(id) => println!("Rule added: {id}"),
        Err(e) => {
            eprintln!("Failed to add rule: {e}");
            std::process::exit(1);
        }
    }
}

pub fn handle_list_rules(hub: &Hub) {
    println!("\n=== Rules ===");
    let rules = hub.rules.rules();
    if rules.is_empty() {
        println!("No rules configured.");
        return;
    }
    for rule in rules {
        println!(
            "  - {} ({}) enabled={} active={}",
            rule.name, rule.id, rule.enabled, rule.active
        );
    }
}

pub fn handle_set_rule_enabled(hub: &Hub, rule_id: String, enabled: bool) {
    let rule_id: RuleId = parse_uuid(&rule_id, "ruleId").into();
    match hub.rules.set_enabled(rule_id, enabled) {
        Ok(()) => println!("Rule {rule_id} enabled={enabled}"),
        Err(e) => {
            eprintln!("Failed to update rule: {e}");
            std::process::exit(1);
        }
    }
}

pub fn handle_remove_rule(hub: &Hub, rule_id: String) {
    let rule_id: RuleId = parse_uuid(&rule_id, "ruleId").into();
    match hub.rules.remove_rule(rule_id) {
        Ok(()) => println!("Rule removed: {rule_id}"),
        Err(e) => {
            eprintln!("Failed to remove rule: {e}");
            std::process::exit(1);
        }
    }
}

pub async fn handle_run(hub: Arc<Hub>) {
    println!("\n=== Hub running (Ctrl+C to stop) ===");
    let mut subscriber = hub.subscribe();
    let logger = tokio::spawn(async move {
        while let Ok(event) = subscriber.recv().await {
            log_hub_event(&event);
        }
    });

    // No plugins are attached in this CLI session, so nothing will ever
    // send on this channel; keeping the sender alive just stops the
    // hub's event loop from exiting the moment the channel closes.
    let (_callback_tx, rx) = mpsc::channel(64);
    tokio::select! {
        _ = hub.run(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, stopping hub");
            hub.time.stop();
        }
    }
    logger.abort();
}
