mod commands;
mod handlers;
mod logging;

use std::sync::Arc;

use clap::Parser;
use commands::{Cli, Commands};
use thinghub_core::Hub;

#[tokio::main]
async fn main() {
    logging::init();

    let cli = Cli::parse();
    let hub = Arc::new(Hub::new(&cli.storage_dir));

    match cli.command {
        Commands::LoadPlugin { manifest } => {
            handlers::handle_load_plugin(&hub, manifest).await;
            // Things whose class this manifest just registered can now
            // come back; anything still missing a class stays parked in
            // storage (§4.1).
            hub.restore().await;
        }
        Commands::Discover { thing_class_id, params } => {
            handlers::handle_discover(&hub, thing_class_id, params).await;
        }
        Commands::AddThing { thing_class_id, name, params } => {
            handlers::handle_add_thing(&hub, thing_class_id, name, params).await;
        }
        Commands::ListThings => {
            handlers::handle_list_things(&hub);
        }
        Commands::RemoveThing { thing_id } => {
            handlers::handle_remove_thing(&hub, thing_id).await;
        }
        Commands::AddRule { file } => {
            handlers::handle_add_rule(&hub, file);
        }
        Commands::ListRules => {
            handlers::handle_list_rules(&hub);
        }
        Commands::SetRuleEnabled { rule_id, enabled } => {
            handlers::handle_set_rule_enabled(&hub, rule_id, enabled);
        }
        Commands::RemoveRule { rule_id } => {
            handlers::handle_remove_rule(&hub, rule_id);
        }
        Commands::Run => {
            handlers::handle_run(hub).await;
        }
    }
}
