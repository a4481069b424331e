use thinghub_core::HubEvent;
use tracing::{debug, info};
use tracing_subscriber::fmt::format::FmtSpan;

pub fn init() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_ids(true)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

pub fn log_hub_event(event: &HubEvent) {
    match event {
        HubEvent::ThingAdded(thing) => info!(thing_id = %thing.id, name = %thing.name, "thing added"),
        HubEvent::ThingRemoved(id) => info!(thing_id = %id, "thing removed"),
        HubEvent::ThingChanged(thing) => debug!(thing_id = %thing.id, "thing changed"),
        HubEvent::ThingSettingChanged { thing_id, .. } => debug!(%thing_id, "thing setting changed"),
        HubEvent::StateChanged { thing_id, state_type_id, .. } => {
            debug!(%thing_id, %state_type_id, "state changed")
        }
        HubEvent::EventTriggered(event) => debug!(thing_id = %event.thing_id, "event triggered"),
        HubEvent::RuleAdded(id) => info!(rule_id = %id, "rule added"),
        HubEvent::RuleRemoved(id) => info!(rule_id = %id, "rule removed"),
        HubEvent::RuleActiveChanged { rule_id, active } => info!(%rule_id, active, "rule active state changed"),
        HubEvent::RuleConfigurationChanged(id) => debug!(rule_id = %id, "rule configuration changed"),
        HubEvent::PluginConfigChanged(id) => debug!(plugin_id = %id, "plugin config changed"),
        HubEvent::Tick(now) => debug!(%now, "tick"),
        HubEvent::DateTimeChanged(now) => info!(%now, "date time changed"),
    }
}
