use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "thinghub", version = "0.1.0")]
pub struct Cli {
    /// Directory the hub persists its state under.
    #[arg(long, default_value = "./thinghub-data")]
    pub storage_dir: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a plugin manifest and register its vendors/thing classes.
    LoadPlugin {
        #[arg(long)]
        manifest: String,
    },
    /// Run thing discovery for a thing class (prints the candidate descriptors).
    Discover {
        #[arg(long)]
        thing_class_id: String,
        /// Discovery params as a JSON object, e.g. '{"ip":"10.0.0.5"}'.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Add a configured thing directly (CreateMethod::User).
    AddThing {
        #[arg(long)]
        thing_class_id: String,
        #[arg(long)]
        name: String,
        /// Params as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// List every configured thing.
    ListThings,
    /// Remove a configured thing (and its children).
    RemoveThing {
        #[arg(long)]
        thing_id: String,
    },
    /// Add a rule from a JSON rule definition file.
    AddRule {
        #[arg(long)]
        file: String,
    },
    /// List every rule.
    ListRules,
    /// Enable or disable a rule.
    SetRuleEnabled {
        #[arg(long)]
        rule_id: String,
        #[arg(long)]
        enabled: bool,
    },
    /// Remove a rule.
    RemoveRule {
        #[arg(long)]
        rule_id: String,
    },
    /// Run the hub's event loop (ticks, rule evaluation) until interrupted.
    Run,
}
